use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatus},
    pricing::InvalidCartError,
    state_machine::TransitionError,
    traits::{CatalogError, OrderStoreError, PaymentProviderError},
};

//--------------------------------------    OrderFlowError     -------------------------------------------------------
#[derive(Debug, Error)]
pub enum OrderFlowError {
    #[error(transparent)]
    InvalidCart(#[from] InvalidCartError),
    #[error("Restaurant '{restaurant_id}' has no menu item '{menu_item_id}'")]
    UnknownMenuItem { restaurant_id: String, menu_item_id: String },
    #[error("Unknown restaurant '{0}'")]
    UnknownRestaurant(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("The order was modified concurrently too many times; giving up")]
    Conflict,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<OrderStoreError> for OrderFlowError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            OrderStoreError::Conflict => Self::Conflict,
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

//--------------------------------------    CheckoutError      -------------------------------------------------------
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order is not ready for checkout (status is '{status}', must be 'confirmed')")]
    IllegalOrderState { status: OrderStatus },
    #[error(transparent)]
    InvalidCart(#[from] InvalidCartError),
    #[error(transparent)]
    PaymentProvider(#[from] PaymentProviderError),
    #[error("The order was modified concurrently too many times; giving up")]
    Conflict,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<OrderStoreError> for CheckoutError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            OrderStoreError::Conflict => Self::Conflict,
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

//--------------------------------------   PaymentEventError   -------------------------------------------------------
/// Failures while reconciling an inbound payment event. Only [`Self::Transient`] should cause the processor to
/// redeliver; everything else must be acknowledged so the event is not retried forever.
#[derive(Debug, Error)]
pub enum PaymentEventError {
    #[error("Payment event {0} carries no order id")]
    MissingOrderId(String),
    #[error("Payment event {event_id} refers to unknown order {order_id}")]
    OrderNotFound { event_id: String, order_id: OrderId },
    #[error("Could not apply payment event after repeated version conflicts; the processor should redeliver")]
    Transient,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl PaymentEventError {
    /// Whether the processor should redeliver this event. Anything else must be acknowledged, or the processor
    /// keeps retrying a delivery that can never succeed.
    pub fn must_retry(&self) -> bool {
        matches!(self, Self::Transient | Self::DatabaseError(_))
    }
}
