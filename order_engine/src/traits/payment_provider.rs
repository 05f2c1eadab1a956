use opg_common::Cents;
use thiserror::Error;

use crate::db_types::OrderId;

#[derive(Debug, Error)]
pub enum PaymentProviderError {
    #[error("Payment processor request failed: {0}")]
    RequestFailed(String),
    #[error("Payment processor returned an unusable response: {0}")]
    BadResponse(String),
}

/// One line of a checkout session at the payment processor: a cart item, priced per unit. The delivery fee travels
/// separately in [`CheckoutSessionRequest`] so providers can model it as a shipping charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount: Cents,
    pub quantity: i64,
}

/// Everything the processor needs to mint a checkout session. The amounts are the engine's authoritative,
/// recomputed figures; nothing client-supplied crosses this boundary.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub order_id: OrderId,
    pub restaurant_id: String,
    pub line_items: Vec<CheckoutLineItem>,
    pub delivery_fee: Cents,
}

/// The processor's handle on a freshly-created session: an opaque reference plus the URL to send the customer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

/// The payment processor's session-creation API.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    /// Creates a checkout session for the given order. Calls must have a bounded timeout; a failure is surfaced as
    /// an error and never retried automatically.
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentProviderError>;
}
