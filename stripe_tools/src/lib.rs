//! A minimal Stripe client for the order payment gateway.
//!
//! Only the two surfaces the gateway needs are covered:
//! * creating Checkout Sessions ([`StripeApi::create_checkout_session`]), and
//! * verifying the `Stripe-Signature` header on inbound webhook deliveries ([`webhook::verify_signature`]).
//!
//! Signature verification must always be fed the *raw* request body: any re-serialization of the JSON before
//! verification invalidates the signature.

mod api;
mod config;
mod data_objects;
mod error;
pub mod webhook;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{CheckoutSessionData, SessionLineItem, StripeEvent, StripeEventData, StripeEventObject};
pub use error::StripeApiError;
