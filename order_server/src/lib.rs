//! # Order payment gateway server
//!
//! REST front end for the order lifecycle engine. It is responsible for:
//! * accepting new orders and status transitions from customers and restaurant owners,
//! * minting Stripe checkout sessions for confirmed orders, and
//! * receiving `checkout.session.completed` webhooks from Stripe and feeding them to the reconciler.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Identity
//! Authentication is terminated upstream (at the API gateway). This server trusts the `X-Auth-*` headers it
//! receives and enforces *authorization* only: ownership checks happen in the route handlers, and nowhere else.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
