//! Order lifecycle & payment reconciliation engine.
//!
//! This crate owns the one subsystem of the ordering platform with real state-machine and consistency concerns:
//! tracking an order from creation through checkout, payment confirmation (via an asynchronous webhook from the
//! payment processor), fulfilment, and terminal rejection/resolution - while staying consistent under out-of-order,
//! duplicate, or delayed processor notifications.
//!
//! The crate is split into:
//! 1. The core types and pure logic: [`db_types`], [`pricing`] (the price calculator) and [`state_machine`] (the
//!    transition table and its entry side effects).
//! 2. The seams to the outside world ([`traits`]): durable storage, the catalog service, and the payment
//!    processor's session API. A SQLite backend is provided behind the `sqlite` feature.
//! 3. The public APIs ([`OrderFlowApi`], [`CheckoutApi`], [`ReconcileApi`]) that compose the above. Identity and
//!    authorization live with the caller; every API here is pure with respect to who is asking.

pub mod db_types;
pub mod pricing;
pub mod state_machine;
pub mod traits;

mod api;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use api::{
    Ack,
    CartSelection,
    CheckoutApi,
    CheckoutError,
    OrderFlowApi,
    OrderFlowError,
    OrderRequest,
    PaymentEvent,
    PaymentEventError,
    ReconcileApi,
    CHECKOUT_COMPLETED_EVENT,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteOrderStore;
