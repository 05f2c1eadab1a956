//! The order state machine.
//!
//! This module is pure: it knows nothing about identity, storage or the payment processor. Callers are responsible
//! for authorization checks *before* invoking a transition; the machine only cares about which edges exist and what
//! bookkeeping each entry performs.
//!
//! The transition table:
//!
//! | From           | To                            |
//! |----------------|-------------------------------|
//! | Placed         | Confirmed, Rejected           |
//! | Confirmed      | Paid (webhook only), Rejected |
//! | Paid           | InProgress, Rejected          |
//! | InProgress     | OutForDelivery, Rejected      |
//! | OutForDelivery | Delivered, Rejected           |
//! | Rejected       | Resolved                      |
//! | Delivered      | (terminal)                    |
//! | Resolved       | (terminal)                    |

use std::fmt::Display;

use chrono::Utc;
use thiserror::Error;

use crate::db_types::{Order, OrderStatus, PaymentPhase, StatusMessage};

pub const REJECTED_PRE_PAYMENT_MSG: &str = "Out of stock, dragons flying to get ingredients.";
pub const REJECTED_POST_PAYMENT_MSG: &str = "Refund pending.";
pub const RESOLVED_PRE_PAYMENT_MSG: &str = "Order cancelled due to stock issues and dragons' wings.";
pub const RESOLVED_POST_PAYMENT_MSG: &str = "Underground dragons refunded successfully.";

//--------------------------------------        Actor          -------------------------------------------------------
/// Who is asking for the transition. The machine only distinguishes the webhook reconciler from everyone else
/// (the `Paid` edge asserts an external financial fact and must never be user-triggered); finer-grained
/// authorization happens at the server layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer,
    RestaurantOwner,
    PaymentWebhook,
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Customer => write!(f, "customer"),
            Actor::RestaurantOwner => write!(f, "restaurant owner"),
            Actor::PaymentWebhook => write!(f, "payment webhook"),
        }
    }
}

//--------------------------------------   TransitionError     -------------------------------------------------------
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Transition {from} -> {to} not allowed")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error("Only the payment webhook may mark an order as paid (attempted by {0})")]
    WebhookOnly(Actor),
}

/// Whether the edge `from -> to` exists in the transition table.
pub fn is_legal_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Placed, Confirmed | Rejected)
            | (Confirmed, Paid | Rejected)
            | (Paid, InProgress | Rejected)
            | (InProgress, OutForDelivery | Rejected)
            | (OutForDelivery, Delivered | Rejected)
            | (Rejected, Resolved)
    )
}

/// Applies `target` to the order in place, performing the entry bookkeeping for the new status.
///
/// Side effects on entry:
/// * `Rejected` - captures the [`PaymentPhase`] from the outgoing status and sets the rejection message (caller
///   text wins over the phase default). The message is set exactly once.
/// * `Resolved` - sets the resolution message keyed on the captured phase, once.
/// * `Delivered` - stamps `delivered_at`.
/// * `Paid` - only the [`Actor::PaymentWebhook`] may take this edge.
///
/// The caller persists the mutated order via compare-and-swap; this function never touches storage.
pub fn apply_transition(
    order: &mut Order,
    target: OrderStatus,
    actor: Actor,
    message: Option<String>,
) -> Result<(), TransitionError> {
    let from = order.status;
    if !is_legal_transition(from, target) {
        return Err(TransitionError::IllegalTransition { from, to: target });
    }
    match target {
        OrderStatus::Paid => {
            if actor != Actor::PaymentWebhook {
                return Err(TransitionError::WebhookOnly(actor));
            }
        },
        OrderStatus::Rejected => {
            let phase = match from {
                OrderStatus::Placed | OrderStatus::Confirmed => PaymentPhase::PrePayment,
                _ => PaymentPhase::PostPayment,
            };
            order.payment_phase.get_or_insert(phase);
            if order.rejection_message.is_none() {
                let text = message.unwrap_or_else(|| default_rejection_message(phase).to_string());
                order.rejection_message = Some(StatusMessage::now(text));
            }
        },
        OrderStatus::Resolved => {
            if order.resolution_message.is_none() {
                let phase = order.payment_phase.unwrap_or(PaymentPhase::PrePayment);
                let text = message.unwrap_or_else(|| default_resolution_message(phase).to_string());
                order.resolution_message = Some(StatusMessage::now(text));
            }
        },
        OrderStatus::Delivered => {
            order.delivered_at = Some(Utc::now());
        },
        _ => {},
    }
    order.status = target;
    Ok(())
}

pub fn default_rejection_message(phase: PaymentPhase) -> &'static str {
    match phase {
        PaymentPhase::PrePayment => REJECTED_PRE_PAYMENT_MSG,
        PaymentPhase::PostPayment => REJECTED_POST_PAYMENT_MSG,
    }
}

pub fn default_resolution_message(phase: PaymentPhase) -> &'static str {
    match phase {
        PaymentPhase::PrePayment => RESOLVED_PRE_PAYMENT_MSG,
        PaymentPhase::PostPayment => RESOLVED_POST_PAYMENT_MSG,
    }
}
