mod checkout_api;
mod errors;
mod order_flow_api;
mod reconcile_api;

pub use checkout_api::CheckoutApi;
pub use errors::{CheckoutError, OrderFlowError, PaymentEventError};
pub use order_flow_api::{CartSelection, OrderFlowApi, OrderRequest};
pub use reconcile_api::{Ack, PaymentEvent, ReconcileApi, CHECKOUT_COMPLETED_EVENT};
