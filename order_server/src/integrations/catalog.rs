//! REST client for the catalog service, bridging it onto the engine's [`CatalogLookup`] seam.
//!
//! The catalog owns restaurants and menus. This client only ever asks two questions: what does this menu item
//! cost right now, and what is this restaurant's delivery fee. A 404 from the catalog is a domain answer (no such
//! item / no such restaurant), not an error.

use std::{sync::Arc, time::Duration};

use log::*;
use opg_common::Cents;
use order_engine::traits::{CatalogError, CatalogItem, CatalogLookup};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::errors::ServerError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct RestCatalog {
    base_url: String,
    client: Arc<Client>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuItemResponse {
    name: String,
    unit_price: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestaurantResponse {
    delivery_fee: i64,
}

impl RestCatalog {
    pub fn new(base_url: &str) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>, CatalogError> {
        let url = format!("{}{path}", self.base_url);
        trace!("🛍️ Catalog lookup: {url}");
        let response =
            self.client.get(&url).send().await.map_err(|e| CatalogError::LookupFailed(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body = response.json::<T>().await.map_err(|e| CatalogError::LookupFailed(e.to_string()))?;
                Ok(Some(body))
            },
            s => {
                warn!("🛍️ Catalog returned {s} for {url}");
                Err(CatalogError::LookupFailed(format!("Catalog returned {s}")))
            },
        }
    }
}

impl CatalogLookup for RestCatalog {
    async fn item_price(&self, restaurant_id: &str, menu_item_id: &str) -> Result<Option<CatalogItem>, CatalogError> {
        let path = format!("/restaurants/{restaurant_id}/menu-items/{menu_item_id}");
        let item = self.fetch::<MenuItemResponse>(&path).await?;
        Ok(item.map(|i| CatalogItem { name: i.name, unit_price: Cents::from(i.unit_price) }))
    }

    async fn delivery_fee(&self, restaurant_id: &str) -> Result<Option<Cents>, CatalogError> {
        let path = format!("/restaurants/{restaurant_id}");
        let restaurant = self.fetch::<RestaurantResponse>(&path).await?;
        Ok(restaurant.map(|r| Cents::from(r.delivery_fee)))
    }
}
