use mockall::mock;
use opg_common::Cents;
use order_engine::traits::{
    CatalogError,
    CatalogItem,
    CatalogLookup,
    CheckoutSession,
    CheckoutSessionRequest,
    PaymentProvider,
    PaymentProviderError,
};

mock! {
    pub Catalog {}
    impl CatalogLookup for Catalog {
        async fn item_price(&self, restaurant_id: &str, menu_item_id: &str) -> Result<Option<CatalogItem>, CatalogError>;
        async fn delivery_fee(&self, restaurant_id: &str) -> Result<Option<Cents>, CatalogError>;
    }
}

mock! {
    pub Provider {}
    impl PaymentProvider for Provider {
        async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> Result<CheckoutSession, PaymentProviderError>;
    }
}

/// A catalog where every restaurant exists, every item costs `unit_price`, and delivery is `delivery_fee`.
pub fn flat_catalog(unit_price: i64, delivery_fee: i64) -> MockCatalog {
    let mut catalog = MockCatalog::new();
    catalog.expect_item_price().returning(move |_, item_id| {
        Ok(Some(CatalogItem { name: format!("Item {item_id}"), unit_price: Cents::from(unit_price) }))
    });
    catalog.expect_delivery_fee().returning(move |_| Ok(Some(Cents::from(delivery_fee))));
    catalog
}
