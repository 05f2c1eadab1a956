use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use opg_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
/// An opaque, immutable order identifier, assigned when the order record is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh random order id.
    pub fn random() -> Self {
        Self(format!("ord-{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------     OrderStatus       -------------------------------------------------------
/// The lifecycle state of an order. Legal transitions between states are defined by
/// [`crate::state_machine`]; every other edge is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    /// The customer has placed the order. No money has changed hands yet.
    Placed,
    /// The restaurant has accepted the order. Checkout may now proceed.
    Confirmed,
    /// The payment processor has confirmed settlement via webhook.
    Paid,
    /// The kitchen is preparing the order.
    InProgress,
    /// The order has left the restaurant.
    OutForDelivery,
    /// The order has been handed to the customer. Terminal.
    Delivered,
    /// The order was turned down, pre- or post-payment.
    Rejected,
    /// The rejection has been settled (refund issued or nothing owed). Terminal.
    Resolved,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Resolved)
    }

    /// True for `Paid` and every status downstream of it on the happy path. Used by the webhook
    /// reconciler to classify redelivered settlement events as duplicates.
    pub fn is_paid_or_later(self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::InProgress | OrderStatus::OutForDelivery | OrderStatus::Delivered
        )
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Paid => "paid",
            OrderStatus::InProgress => "inProgress",
            OrderStatus::OutForDelivery => "outForDelivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Resolved => "resolved",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(pub String);

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(Self::Placed),
            "confirmed" => Ok(Self::Confirmed),
            "paid" => Ok(Self::Paid),
            "inProgress" => Ok(Self::InProgress),
            "outForDelivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "rejected" => Ok(Self::Rejected),
            "resolved" => Ok(Self::Resolved),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------    PaymentPhase       -------------------------------------------------------
/// Captured on the order at the moment it enters `Rejected`: records whether money had already been taken.
/// The resolution wording keys off this tag rather than off the content of any earlier message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentPhase {
    PrePayment,
    PostPayment,
}

impl Display for PaymentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentPhase::PrePayment => write!(f, "prePayment"),
            PaymentPhase::PostPayment => write!(f, "postPayment"),
        }
    }
}

impl FromStr for PaymentPhase {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prePayment" => Ok(Self::PrePayment),
            "postPayment" => Ok(Self::PostPayment),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------      CartItem         -------------------------------------------------------
/// A single line of the cart, snapshotted at order-creation time. Name and unit price come from the catalog at the
/// moment the order was placed; later menu edits never flow back into existing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: Cents,
    pub quantity: i64,
}

//--------------------------------------   DeliveryDetails     -------------------------------------------------------
/// Recipient contact and address details, snapshotted at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub email: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub cellphone: String,
}

//--------------------------------------    StatusMessage      -------------------------------------------------------
/// A system- or operator-supplied message attached to a rejection or resolution. Set exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusMessage {
    pub fn now<S: Into<String>>(text: S) -> Self {
        Self { text: text.into(), timestamp: Utc::now() }
    }
}

//--------------------------------------  PaymentSessionRef    -------------------------------------------------------
/// Reference to the checkout session most recently created for an order at the payment processor.
/// At most one session is active per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionRef {
    pub session_id: String,
    pub redirect_url: String,
}

//--------------------------------------        Order          -------------------------------------------------------
/// The central entity tracked by the engine. Mutations only ever happen through
/// [`crate::traits::OrderStore::compare_and_swap`], which makes `version` the serialization point for concurrent
/// restaurant actions and webhook deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub restaurant_id: String,
    pub customer_id: String,
    pub cart_items: Vec<CartItem>,
    pub delivery_details: DeliveryDetails,
    pub delivery_fee: Cents,
    pub total_amount: Cents,
    pub status: OrderStatus,
    pub payment_phase: Option<PaymentPhase>,
    pub rejection_message: Option<StatusMessage>,
    pub resolution_message: Option<StatusMessage>,
    pub payment_session: Option<PaymentSessionRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub version: i64,
}

//--------------------------------------      NewOrder         -------------------------------------------------------
/// A fully-priced order ready for insertion. Built by [`crate::OrderFlowApi::place_order`] after the catalog lookup;
/// clients never supply prices or totals directly.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub restaurant_id: String,
    pub customer_id: String,
    pub cart_items: Vec<CartItem>,
    pub delivery_details: DeliveryDetails,
    pub delivery_fee: Cents,
    pub total_amount: Cents,
}

//--------------------------------------      Anomalies        -------------------------------------------------------
/// A payment event that arrived for an order in a state where it cannot be applied. Recorded for operator follow-up;
/// never auto-resolved by guessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationAnomaly {
    pub id: i64,
    pub order_id: OrderId,
    pub event_id: String,
    pub event_type: String,
    pub order_status: OrderStatus,
    pub amount: Option<Cents>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnomaly {
    pub order_id: OrderId,
    pub event_id: String,
    pub event_type: String,
    pub order_status: OrderStatus,
    pub amount: Option<Cents>,
    pub note: String,
}
