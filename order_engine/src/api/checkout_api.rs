use std::fmt::Debug;

use log::*;
use opg_common::Cents;

use crate::{
    api::CheckoutError,
    db_types::{Order, OrderId, OrderStatus, PaymentSessionRef},
    pricing::calculate_order_total,
    traits::{
        CheckoutLineItem,
        CheckoutSession,
        CheckoutSessionRequest,
        OrderStore,
        OrderStoreError,
        PaymentProvider,
    },
};

const MAX_CAS_ATTEMPTS: u32 = 3;

/// `CheckoutApi` mints payment sessions for confirmed orders.
///
/// Payment is only initiated after restaurant acceptance: an order that is not `Confirmed` is turned away,
/// whether or not a session was minted earlier. The create call is idempotent; a `Confirmed` order that already
/// carries a session ref gets the stored session back instead of a duplicate, so at most one session is ever
/// active per order.
pub struct CheckoutApi<B, P> {
    db: B,
    provider: P,
}

impl<B, P> Debug for CheckoutApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, P> CheckoutApi<B, P> {
    pub fn new(db: B, provider: P) -> Self {
        Self { db, provider }
    }
}

impl<B, P> CheckoutApi<B, P>
where
    B: OrderStore,
    P: PaymentProvider,
{
    /// Creates (or returns the existing) checkout session for the order.
    ///
    /// The authoritative total is recomputed from the cart snapshot here; the processor is given one line item per
    /// cart item plus the delivery fee. The session ref is persisted via compare-and-swap. If a concurrent call
    /// stored a session first, that session wins and is returned; the one minted here is simply dropped (the
    /// processor expires unused sessions on its own).
    pub async fn create_session(&self, id: &OrderId) -> Result<CheckoutSession, CheckoutError> {
        let order = self.fetch(id).await?;
        // Eligibility is checked before replay. A stored session on an order that has since left `Confirmed`
        // (a rejection, say) must not be handed out again.
        if order.status != OrderStatus::Confirmed {
            return Err(CheckoutError::IllegalOrderState { status: order.status });
        }
        if let Some(existing) = &order.payment_session {
            debug!("🛒️ Order {id} already has session {}; returning it", existing.session_id);
            return Ok(CheckoutSession {
                session_id: existing.session_id.clone(),
                redirect_url: existing.redirect_url.clone(),
            });
        }
        let total = calculate_order_total(&order.cart_items, order.delivery_fee)?;
        let line_items = order
            .cart_items
            .iter()
            .map(|item| CheckoutLineItem {
                name: item.name.clone(),
                unit_amount: item.unit_price,
                quantity: item.quantity,
            })
            .collect();
        let request = CheckoutSessionRequest {
            order_id: order.id.clone(),
            restaurant_id: order.restaurant_id.clone(),
            line_items,
            delivery_fee: order.delivery_fee,
        };
        let session = self.provider.create_checkout_session(request).await?;
        info!("🛒️ Created payment session {} for order {id} ({total})", session.session_id);
        self.persist_session(id, &session, total).await
    }

    /// Stores the session ref on the order, retrying around concurrent mutations. A racer that stored a session
    /// first wins; a racer that made the order ineligible (e.g. a rejection) surfaces as `IllegalOrderState`.
    async fn persist_session(
        &self,
        id: &OrderId,
        session: &CheckoutSession,
        total: Cents,
    ) -> Result<CheckoutSession, CheckoutError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = self.fetch(id).await?;
            if order.status != OrderStatus::Confirmed {
                return Err(CheckoutError::IllegalOrderState { status: order.status });
            }
            if let Some(existing) = &order.payment_session {
                debug!("🛒️ Order {id} gained session {} concurrently; using it", existing.session_id);
                return Ok(CheckoutSession {
                    session_id: existing.session_id.clone(),
                    redirect_url: existing.redirect_url.clone(),
                });
            }
            let expected_version = order.version;
            order.total_amount = total;
            order.payment_session = Some(PaymentSessionRef {
                session_id: session.session_id.clone(),
                redirect_url: session.redirect_url.clone(),
            });
            match self.db.compare_and_swap(&order, expected_version).await {
                Ok(_) => return Ok(session.clone()),
                Err(OrderStoreError::Conflict) if attempt < MAX_CAS_ATTEMPTS => {
                    debug!("🛒️ Version conflict storing session for order {id}, attempt {attempt}. Re-reading.");
                    continue;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn fetch(&self, id: &OrderId) -> Result<Order, CheckoutError> {
        self.db.fetch_order(id).await?.ok_or_else(|| CheckoutError::OrderNotFound(id.clone()))
    }
}
