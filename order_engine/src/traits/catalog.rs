use opg_common::Cents;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog lookup failed: {0}")]
    LookupFailed(String),
}

/// A menu item as the catalog knows it right now. Orders snapshot these values at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub name: String,
    pub unit_price: Cents,
}

/// Read-only interface onto the catalog service. The engine only ever asks for the current price/name of a menu
/// item and the restaurant's delivery fee; everything else about restaurants and menus is someone else's problem.
#[allow(async_fn_in_trait)]
pub trait CatalogLookup {
    /// The current name and price of a menu item, or `None` if the restaurant has no such item.
    async fn item_price(&self, restaurant_id: &str, menu_item_id: &str) -> Result<Option<CatalogItem>, CatalogError>;

    /// The restaurant's current delivery fee, or `None` if the restaurant is unknown.
    async fn delivery_fee(&self, restaurant_id: &str) -> Result<Option<Cents>, CatalogError>;
}
