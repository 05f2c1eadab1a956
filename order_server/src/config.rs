use std::env;

use log::*;
use opg_common::env_flag;
use stripe_tools::StripeConfig;

const DEFAULT_OPG_HOST: &str = "127.0.0.1";
const DEFAULT_OPG_PORT: u16 = 8360;
const DEFAULT_CATALOG_URL: &str = "http://localhost:8370";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Base URL of the catalog service, used to price carts at order-creation time.
    pub catalog_url: String,
    /// If false, the Stripe-Signature check on the webhook endpoint is skipped. **DANGER**: only ever disable
    /// this in local testing.
    pub stripe_signature_checks: bool,
    pub stripe_config: StripeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OPG_HOST.to_string(),
            port: DEFAULT_OPG_PORT,
            database_url: String::default(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            stripe_signature_checks: true,
            stripe_config: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("OPG_HOST").ok().unwrap_or_else(|| DEFAULT_OPG_HOST.into());
        let port = env::var("OPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for OPG_PORT. {e} Using the default, {DEFAULT_OPG_PORT}, instead."
                    );
                    DEFAULT_OPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_OPG_PORT);
        let database_url = env::var("OPG_DATABASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ OPG_DATABASE_URL is not set. Using an in-memory sqlite database. Data will not survive a restart.");
            "sqlite::memory:".into()
        });
        let catalog_url = env::var("OPG_CATALOG_URL").unwrap_or_else(|_| {
            info!("🪛️ OPG_CATALOG_URL is not set. Using the default, {DEFAULT_CATALOG_URL}.");
            DEFAULT_CATALOG_URL.into()
        });
        let stripe_signature_checks = env_flag(env::var("OPG_STRIPE_SIGNATURE_CHECKS").ok(), true);
        if !stripe_signature_checks {
            warn!(
                "🪛️ Stripe signature checks are DISABLED. Anyone can mark orders as paid. Never run like this in \
                 production."
            );
        }
        let stripe_config = StripeConfig::new_from_env_or_default();
        Self { host, port, database_url, catalog_url, stripe_signature_checks, stripe_config }
    }
}
