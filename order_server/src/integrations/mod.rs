mod catalog;
mod stripe;

pub use catalog::RestCatalog;
pub use stripe::StripeGateway;
