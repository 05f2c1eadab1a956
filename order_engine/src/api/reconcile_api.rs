use std::{fmt::Debug, time::Duration};

use log::*;
use opg_common::Cents;

use crate::{
    api::PaymentEventError,
    db_types::{NewAnomaly, Order, OrderId, OrderStatus},
    state_machine::{apply_transition, Actor},
    traits::{OrderStore, OrderStoreError},
};

/// The one event type that drives a state transition. Everything else is acknowledged and ignored.
pub const CHECKOUT_COMPLETED_EVENT: &str = "checkout.session.completed";

const MAX_CAS_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// A payment-processor notification, already authenticated and parsed by the server layer. Signature verification
/// happens against the raw request body *before* this struct exists; by the time the reconciler sees an event it is
/// known to be genuine.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub event_id: String,
    pub event_type: String,
    pub order_id: Option<OrderId>,
    /// The amount the processor actually settled, in minor units. Source of truth for the order total at
    /// settlement time.
    pub amount: Option<Cents>,
    pub session_id: Option<String>,
}

/// The reconciler's verdict on an event. Every variant is an acknowledgement; the processor should only redeliver
/// when [`PaymentEventError::Transient`] comes back instead.
#[derive(Debug, Clone)]
pub enum Ack {
    /// The order was transitioned to `Paid`.
    Processed(Box<Order>),
    /// The order is already `Paid` or further along; the event is a redelivery and nothing was changed.
    Duplicate,
    /// Not a payment-completion event; acknowledged without state change.
    Ignored { event_type: String },
    /// The order was in a state where the payment cannot be applied; an anomaly record was written for an
    /// operator and no transition was forced.
    AnomalyRecorded,
}

/// `ReconcileApi` maps authenticated payment events onto order transitions, idempotently, under duplicate and
/// out-of-order delivery.
pub struct ReconcileApi<B> {
    db: B,
}

impl<B> Debug for ReconcileApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcileApi")
    }
}

impl<B> ReconcileApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ReconcileApi<B>
where B: OrderStore
{
    /// Applies a payment event to the order it references.
    ///
    /// * Non-completion event types are ignored (acknowledged, no state change).
    /// * An order already `Paid` or later is a duplicate delivery: success, no mutation.
    /// * A `Confirmed` order is moved to `Paid` and its total set to the processor-reported amount, through a
    ///   bounded compare-and-swap loop; the order is re-read and re-checked after every conflict, because a racing
    ///   rejection may have made the transition illegal in the meantime.
    /// * Any other status is a genuine anomaly (e.g. rejected after payment was initiated): recorded, acknowledged,
    ///   never auto-resolved.
    pub async fn handle_event(&self, event: PaymentEvent) -> Result<Ack, PaymentEventError> {
        if event.event_type != CHECKOUT_COMPLETED_EVENT {
            debug!("💰️ Ignoring event {} of type '{}'", event.event_id, event.event_type);
            return Ok(Ack::Ignored { event_type: event.event_type });
        }
        let order_id = event.order_id.clone().ok_or_else(|| PaymentEventError::MissingOrderId(event.event_id.clone()))?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let order = self
                .db
                .fetch_order(&order_id)
                .await
                .map_err(|e| PaymentEventError::DatabaseError(e.to_string()))?
                .ok_or_else(|| PaymentEventError::OrderNotFound {
                    event_id: event.event_id.clone(),
                    order_id: order_id.clone(),
                })?;
            if order.status.is_paid_or_later() {
                debug!("💰️ Event {} is a duplicate delivery for order {order_id}; already settled", event.event_id);
                return Ok(Ack::Duplicate);
            }
            if order.status != OrderStatus::Confirmed {
                return self.record_anomaly(&event, order).await;
            }
            let mut updated = order.clone();
            let expected_version = updated.version;
            // The edge is Confirmed -> Paid by construction, so this cannot fail; treat a failure as corruption.
            apply_transition(&mut updated, OrderStatus::Paid, Actor::PaymentWebhook, None)
                .map_err(|e| PaymentEventError::DatabaseError(e.to_string()))?;
            if let Some(amount) = event.amount {
                updated.total_amount = amount;
            }
            match self.db.compare_and_swap(&updated, expected_version).await {
                Ok(saved) => {
                    info!(
                        "💰️ Order {order_id} marked as paid ({}) by event {}",
                        saved.total_amount, event.event_id
                    );
                    return Ok(Ack::Processed(Box::new(saved)));
                },
                Err(OrderStoreError::Conflict) if attempt < MAX_CAS_ATTEMPTS => {
                    debug!("💰️ Version conflict applying event {} to {order_id}, attempt {attempt}", event.event_id);
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    continue;
                },
                Err(OrderStoreError::Conflict) => {
                    warn!("💰️ Giving up on event {} for {order_id} after {attempt} attempts", event.event_id);
                    return Err(PaymentEventError::Transient);
                },
                Err(e) => return Err(PaymentEventError::DatabaseError(e.to_string())),
            }
        }
    }

    async fn record_anomaly(&self, event: &PaymentEvent, order: Order) -> Result<Ack, PaymentEventError> {
        warn!(
            "💰️ Payment event {} arrived for order {} in status '{}'; recording anomaly for operator review",
            event.event_id, order.id, order.status
        );
        let anomaly = NewAnomaly {
            order_id: order.id.clone(),
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            order_status: order.status,
            amount: event.amount,
            note: format!(
                "Payment completion reported while order was '{}'; no transition was applied",
                order.status
            ),
        };
        self.db.record_anomaly(anomaly).await.map_err(|e| PaymentEventError::DatabaseError(e.to_string()))?;
        Ok(Ack::AnomalyRecorded)
    }
}
