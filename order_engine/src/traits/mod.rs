//! The seams between the engine and the outside world.
//!
//! Backends and external collaborators implement these traits:
//! * [`OrderStore`] - durable order records with optimistic-concurrency mutation.
//! * [`CatalogLookup`] - read-only menu/price lookups used when pricing a cart.
//! * [`PaymentProvider`] - the payment processor's session-creation API.

mod catalog;
mod order_store;
mod payment_provider;

pub use catalog::{CatalogError, CatalogItem, CatalogLookup};
pub use order_store::{OrderStore, OrderStoreError};
pub use payment_provider::{
    CheckoutLineItem,
    CheckoutSession,
    CheckoutSessionRequest,
    PaymentProvider,
    PaymentProviderError,
};
