use log::*;
use opg_common::Secret;

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    /// The secret API key (`sk_…`) used for session-creation calls.
    pub secret_key: Secret<String>,
    /// The endpoint secret (`whsec_…`) used to verify webhook signatures.
    pub webhook_secret: Secret<String>,
    /// Where Stripe redirects the customer after a successful payment.
    pub success_url: String,
    /// Where Stripe redirects the customer if they abandon the session.
    pub cancel_url: String,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let secret_key = Secret::new(std::env::var("OPG_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("OPG_STRIPE_SECRET_KEY not set, using a useless default");
            "sk_test_000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("OPG_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("OPG_STRIPE_WEBHOOK_SECRET not set, using a useless default");
            "whsec_000000000000".to_string()
        }));
        let success_url = std::env::var("OPG_STRIPE_SUCCESS_URL").unwrap_or_else(|_| {
            warn!("OPG_STRIPE_SUCCESS_URL not set, using http://localhost:3000/order-status?success=true");
            "http://localhost:3000/order-status?success=true".to_string()
        });
        let cancel_url = std::env::var("OPG_STRIPE_CANCEL_URL").unwrap_or_else(|_| {
            warn!("OPG_STRIPE_CANCEL_URL not set, using http://localhost:3000/order-status?cancelled=true");
            "http://localhost:3000/order-status?cancelled=true".to_string()
        });
        Self { secret_key, webhook_secret, success_url, cancel_url }
    }
}
