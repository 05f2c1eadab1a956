use actix_web::test::TestRequest;
use log::info;
use order_engine::SqliteOrderStore;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::auth::{RESTAURANT_ID_HEADER, ROLE_HEADER, USER_ID_HEADER};

pub async fn prepare_test_store() -> SqliteOrderStore {
    let _ = env_logger::try_init();
    let url = format!("sqlite://{}/opg_server_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>());
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating test database");
    let store = SqliteOrderStore::new_with_url(&url, 5).await.expect("Error connecting to test database");
    store.run_migrations().await.expect("Error running migrations");
    info!("🚀️ Test database ready at {url}");
    store
}

pub fn as_customer(req: TestRequest, user_id: &str) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id)).insert_header((ROLE_HEADER, "customer"))
}

pub fn as_owner(req: TestRequest, user_id: &str, restaurant_id: &str) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id))
        .insert_header((ROLE_HEADER, "restaurantOwner"))
        .insert_header((RESTAURANT_ID_HEADER, restaurant_id))
}

pub fn new_order_body(restaurant_id: &str) -> serde_json::Value {
    serde_json::json!({
        "restaurantId": restaurant_id,
        "items": [
            { "menuItemId": "pizza-1", "quantity": 2 },
            { "menuItemId": "cola-1", "quantity": 1 }
        ],
        "deliveryDetails": {
            "email": "alice@example.com",
            "name": "Alice",
            "address": "1 Main St",
            "city": "Springfield",
            "cellphone": "555-0100"
        }
    })
}
