//! Shared helpers for the engine integration tests: a throwaway SQLite store, an in-memory catalog, and a canned
//! payment provider.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use log::info;
use opg_common::Cents;
use order_engine::{
    traits::{
        CatalogError,
        CatalogItem,
        CatalogLookup,
        CheckoutSession,
        CheckoutSessionRequest,
        PaymentProvider,
        PaymentProviderError,
    },
    SqliteOrderStore,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_store() -> SqliteOrderStore {
    let _ = env_logger::try_init();
    let url = format!("sqlite://{}/opg_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>());
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating test database");
    let store = SqliteOrderStore::new_with_url(&url, 5).await.expect("Error connecting to test database");
    store.run_migrations().await.expect("Error running migrations");
    info!("🚀️ Test database ready at {url}");
    store
}

//--------------------------------------     TestCatalog       -------------------------------------------------------
#[derive(Clone, Default)]
pub struct TestCatalog {
    items: HashMap<(String, String), CatalogItem>,
    fees: HashMap<String, Cents>,
}

impl TestCatalog {
    pub fn with_restaurant(mut self, restaurant_id: &str, delivery_fee: i64) -> Self {
        self.fees.insert(restaurant_id.to_string(), Cents::from(delivery_fee));
        self
    }

    pub fn with_item(mut self, restaurant_id: &str, menu_item_id: &str, name: &str, price: i64) -> Self {
        self.items.insert(
            (restaurant_id.to_string(), menu_item_id.to_string()),
            CatalogItem { name: name.to_string(), unit_price: Cents::from(price) },
        );
        self
    }
}

impl CatalogLookup for TestCatalog {
    async fn item_price(&self, restaurant_id: &str, menu_item_id: &str) -> Result<Option<CatalogItem>, CatalogError> {
        Ok(self.items.get(&(restaurant_id.to_string(), menu_item_id.to_string())).cloned())
    }

    async fn delivery_fee(&self, restaurant_id: &str) -> Result<Option<Cents>, CatalogError> {
        Ok(self.fees.get(restaurant_id).copied())
    }
}

//--------------------------------------    TestProvider       -------------------------------------------------------
#[derive(Clone, Default)]
pub struct TestProvider {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl TestProvider {
    /// A provider whose every session-creation call fails.
    pub fn failing() -> Self {
        Self { fail: true, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PaymentProvider for TestProvider {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(PaymentProviderError::RequestFailed("canned failure".to_string()));
        }
        Ok(CheckoutSession {
            session_id: format!("cs_test_{n}_{}", request.order_id.as_str()),
            redirect_url: format!("https://pay.example.com/c/cs_test_{n}"),
        })
    }
}
