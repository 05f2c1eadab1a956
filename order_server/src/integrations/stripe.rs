//! Bridges the engine's [`PaymentProvider`] seam onto the Stripe client.

use log::*;
use order_engine::traits::{CheckoutSession, CheckoutSessionRequest, PaymentProvider, PaymentProviderError};
use stripe_tools::{SessionLineItem, StripeApi, StripeApiError};

#[derive(Clone)]
pub struct StripeGateway {
    api: StripeApi,
}

impl StripeGateway {
    pub fn new(api: StripeApi) -> Self {
        Self { api }
    }
}

impl PaymentProvider for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentProviderError> {
        let line_items = request
            .line_items
            .iter()
            .map(|li| SessionLineItem { name: li.name.clone(), unit_amount: li.unit_amount, quantity: li.quantity })
            .collect::<Vec<SessionLineItem>>();
        let session = self
            .api
            .create_checkout_session(
                request.order_id.as_str(),
                &request.restaurant_id,
                &line_items,
                request.delivery_fee,
            )
            .await
            .map_err(|e| match e {
                StripeApiError::QueryError { status, message } => {
                    warn!("🛒️ Stripe rejected the session request with status {status}");
                    PaymentProviderError::RequestFailed(format!("Stripe returned {status}: {message}"))
                },
                other => PaymentProviderError::RequestFailed(other.to_string()),
            })?;
        let redirect_url = session.url.ok_or_else(|| {
            PaymentProviderError::BadResponse(format!("Session {} came back without a redirect URL", session.id))
        })?;
        Ok(CheckoutSession { session_id: session.id, redirect_url })
    }
}
