use std::collections::HashMap;

use opg_common::Cents;
use serde::{Deserialize, Serialize};

//--------------------------------------   SessionLineItem     -------------------------------------------------------
/// One line of a checkout-session request: a product name, unit amount in minor units, and a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub unit_amount: Cents,
    pub quantity: i64,
}

//--------------------------------------  CheckoutSessionData  -------------------------------------------------------
/// The subset of Stripe's Checkout Session object the gateway cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSessionData {
    pub id: String,
    /// The hosted-checkout URL to redirect the customer to. Present on freshly-created sessions.
    #[serde(default)]
    pub url: Option<String>,
    /// The settled total, in minor units. Present on completed sessions.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

//--------------------------------------     StripeEvent       -------------------------------------------------------
/// A webhook event envelope. `data.object` varies by event type; [`StripeEventObject`] keeps every field optional
/// except the id so that any object shape deserializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEventData {
    pub object: StripeEventObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEventObject {
    pub id: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeEvent {
    /// The order id this event refers to, if the session was created with one in its metadata.
    pub fn order_id(&self) -> Option<&str> {
        self.data.object.metadata.get("orderId").map(String::as_str)
    }
}
