use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    api::OrderFlowError,
    db_types::{CartItem, DeliveryDetails, NewOrder, Order, OrderId, OrderStatus, ReconciliationAnomaly},
    pricing::calculate_order_total,
    state_machine::{apply_transition, Actor},
    traits::{CatalogLookup, OrderStore, OrderStoreError},
};

/// How many times a transition is retried against a moving order before the conflict is surfaced.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// One cart line as the client submits it: a menu-item reference and a quantity. Names and prices are looked up
/// server-side; nothing price-shaped is accepted from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSelection {
    pub menu_item_id: String,
    pub quantity: i64,
}

/// A request to place a new order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub restaurant_id: String,
    pub customer_id: String,
    pub items: Vec<CartSelection>,
    pub delivery_details: DeliveryDetails,
}

/// `OrderFlowApi` handles order creation and status transitions driven by human actions.
///
/// Authorization (role and ownership of the referenced restaurant/order) is the caller's responsibility; by the time
/// a call lands here the actor is assumed to be allowed to attempt it, and only the transition table has a say.
pub struct OrderFlowApi<B, C> {
    db: B,
    catalog: C,
}

impl<B, C> Debug for OrderFlowApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, C> OrderFlowApi<B, C> {
    pub fn new(db: B, catalog: C) -> Self {
        Self { db, catalog }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, C> OrderFlowApi<B, C>
where
    B: OrderStore,
    C: CatalogLookup,
{
    /// Prices the cart against the catalog and persists a new order in `Placed` status.
    ///
    /// Every cart line is snapshotted (name + unit price) from the catalog at this moment; later menu edits do not
    /// flow back into the order. The total is computed here and nowhere else.
    pub async fn place_order(&self, request: OrderRequest) -> Result<Order, OrderFlowError> {
        if request.items.is_empty() {
            return Err(crate::pricing::InvalidCartError::EmptyCart.into());
        }
        let mut cart_items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let item = self
                .catalog
                .item_price(&request.restaurant_id, &line.menu_item_id)
                .await?
                .ok_or_else(|| OrderFlowError::UnknownMenuItem {
                    restaurant_id: request.restaurant_id.clone(),
                    menu_item_id: line.menu_item_id.clone(),
                })?;
            cart_items.push(CartItem {
                menu_item_id: line.menu_item_id.clone(),
                name: item.name,
                unit_price: item.unit_price,
                quantity: line.quantity,
            });
        }
        let delivery_fee = self
            .catalog
            .delivery_fee(&request.restaurant_id)
            .await?
            .ok_or_else(|| OrderFlowError::UnknownRestaurant(request.restaurant_id.clone()))?;
        let total_amount = calculate_order_total(&cart_items, delivery_fee)?;
        let order = self
            .db
            .insert_order(NewOrder {
                restaurant_id: request.restaurant_id,
                customer_id: request.customer_id,
                cart_items,
                delivery_details: request.delivery_details,
                delivery_fee,
                total_amount,
            })
            .await?;
        info!("📦️ Order {} placed for {} ({} items)", order.id, order.total_amount, order.cart_items.len());
        Ok(order)
    }

    /// Applies a status transition on behalf of `actor`, retrying the read-transition-write cycle a bounded number
    /// of times if the order is being mutated concurrently.
    ///
    /// After a version conflict the order is re-read and the transition re-checked against the fresh status: a
    /// rejection that raced ahead of this call may have made the intended edge illegal, in which case the error
    /// reflects the *current* state of the world, not the stale snapshot.
    pub async fn transition_order(
        &self,
        id: &OrderId,
        target: OrderStatus,
        actor: Actor,
        message: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order =
                self.db.fetch_order(id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(id.clone()))?;
            let expected_version = order.version;
            let from = order.status;
            apply_transition(&mut order, target, actor, message.clone())?;
            match self.db.compare_and_swap(&order, expected_version).await {
                Ok(updated) => {
                    info!("📦️ Order {} moved {from} -> {target} by {actor}", updated.id);
                    return Ok(updated);
                },
                Err(OrderStoreError::Conflict) if attempt < MAX_CAS_ATTEMPTS => {
                    debug!("📦️ Version conflict on order {id} ({from} -> {target}), attempt {attempt}. Re-reading.");
                    continue;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        Ok(self.db.fetch_order(id).await?)
    }

    pub async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderFlowError> {
        Ok(self.db.fetch_orders_for_customer(customer_id).await?)
    }

    pub async fn orders_for_restaurant(&self, restaurant_id: &str) -> Result<Vec<Order>, OrderFlowError> {
        Ok(self.db.fetch_orders_for_restaurant(restaurant_id).await?)
    }

    pub async fn anomalies(&self) -> Result<Vec<ReconciliationAnomaly>, OrderFlowError> {
        Ok(self.db.fetch_anomalies().await?)
    }
}
