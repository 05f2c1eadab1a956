use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
    web,
    App,
};
use order_engine::{state_machine::Actor, CheckoutApi, OrderFlowApi, SqliteOrderStore};
use order_engine::db_types::OrderStatus;
use order_engine::traits::CheckoutSession;

use super::{
    helpers::{as_customer, as_owner, new_order_body, prepare_test_store},
    mocks::{flat_catalog, MockCatalog, MockProvider},
};
use crate::routes::{
    CheckoutRoute,
    CreateOrderRoute,
    GetOrderRoute,
    MyOrdersRoute,
    RestaurantOrdersRoute,
    TransitionOrderRoute,
};

macro_rules! order_app {
    ($db:expr, $catalog:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(OrderFlowApi::new($db.clone(), $catalog)))
                .service(CreateOrderRoute::<SqliteOrderStore, MockCatalog>::new())
                .service(MyOrdersRoute::<SqliteOrderStore, MockCatalog>::new())
                .service(GetOrderRoute::<SqliteOrderStore, MockCatalog>::new())
                .service(RestaurantOrdersRoute::<SqliteOrderStore, MockCatalog>::new())
                .service(TransitionOrderRoute::<SqliteOrderStore, MockCatalog>::new()),
        )
        .await
    };
}

#[actix_web::test]
async fn placing_an_order_prices_the_cart_server_side() {
    let db = prepare_test_store().await;
    let app = order_app!(db, flat_catalog(1200, 300));
    let req = as_customer(TestRequest::post().uri("/orders"), "alice").set_json(new_order_body("resto-1")).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: serde_json::Value = test::read_body_json(res).await;
    // 2x1200 + 1x1200 from the catalog, plus the 300 delivery fee. Client-side prices do not exist.
    assert_eq!(order["totalAmount"], 3900);
    assert_eq!(order["status"], "placed");
    assert_eq!(order["customerId"], "alice");
    assert_eq!(order["version"], 1);
}

#[actix_web::test]
async fn requests_without_identity_headers_are_unauthorized() {
    let db = prepare_test_store().await;
    let app = order_app!(db, flat_catalog(1200, 300));
    let req = TestRequest::post().uri("/orders").set_json(new_order_body("resto-1")).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn customers_cannot_see_orders_that_are_not_theirs() {
    let db = prepare_test_store().await;
    let app = order_app!(db, flat_catalog(1000, 200));
    let req = as_customer(TestRequest::post().uri("/orders"), "alice").set_json(new_order_body("resto-1")).to_request();
    let order: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let req = as_customer(TestRequest::get().uri(&uri), "mallory").to_request();
    let res = test::call_service(&app, req).await;
    // Not 403. Someone else's order id should not even be confirmed to exist.
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let req = as_customer(TestRequest::get().uri(&uri), "alice").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn owners_move_orders_through_the_lifecycle() {
    let db = prepare_test_store().await;
    let app = order_app!(db, flat_catalog(1000, 200));
    let req = as_customer(TestRequest::post().uri("/orders"), "alice").set_json(new_order_body("resto-1")).to_request();
    let order: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/orders/{}/status", order["id"].as_str().unwrap());

    let req = as_owner(TestRequest::patch().uri(&uri), "bob", "resto-1")
        .set_json(serde_json::json!({ "status": "confirmed" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(updated["status"], "confirmed");
    assert_eq!(updated["version"], 2);

    // delivered straight from confirmed is not an edge in the lifecycle
    let req = as_owner(TestRequest::patch().uri(&uri), "bob", "resto-1")
        .set_json(serde_json::json!({ "status": "delivered" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn customers_can_only_cancel_their_unpaid_orders() {
    let db = prepare_test_store().await;
    let app = order_app!(db, flat_catalog(1000, 200));
    let req = as_customer(TestRequest::post().uri("/orders"), "alice").set_json(new_order_body("resto-1")).to_request();
    let order: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/orders/{}/status", order["id"].as_str().unwrap());

    // Confirming your own order is the restaurant's call, not the customer's.
    let req = as_customer(TestRequest::patch().uri(&uri), "alice")
        .set_json(serde_json::json!({ "status": "confirmed" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Cancelling it before payment is allowed.
    let req = as_customer(TestRequest::patch().uri(&uri), "alice")
        .set_json(serde_json::json!({ "status": "rejected" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cancelled: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(cancelled["status"], "rejected");
}

#[actix_web::test]
async fn customers_cannot_cancel_once_payment_landed() {
    let db = prepare_test_store().await;
    let orders_api = OrderFlowApi::new(db.clone(), flat_catalog(1000, 200));
    let app = order_app!(db, flat_catalog(1000, 200));
    let req = as_customer(TestRequest::post().uri("/orders"), "alice").set_json(new_order_body("resto-1")).to_request();
    let order: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let id: order_engine::db_types::OrderId = order["id"].as_str().unwrap().to_string().into();
    orders_api.transition_order(&id, OrderStatus::Confirmed, Actor::RestaurantOwner, None).await.unwrap();
    orders_api.transition_order(&id, OrderStatus::Paid, Actor::PaymentWebhook, None).await.unwrap();

    let uri = format!("/orders/{}/status", id.as_str());
    let req = as_customer(TestRequest::patch().uri(&uri), "alice")
        .set_json(serde_json::json!({ "status": "rejected" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn paid_is_not_reachable_through_the_status_endpoint() {
    let db = prepare_test_store().await;
    let app = order_app!(db, flat_catalog(1000, 200));
    let req = as_customer(TestRequest::post().uri("/orders"), "alice").set_json(new_order_body("resto-1")).to_request();
    let order: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/orders/{}/status", order["id"].as_str().unwrap());

    let req = as_owner(TestRequest::patch().uri(&uri), "bob", "resto-1")
        .set_json(serde_json::json!({ "status": "confirmed" }))
        .to_request();
    test::call_service(&app, req).await;
    let req = as_owner(TestRequest::patch().uri(&uri), "bob", "resto-1")
        .set_json(serde_json::json!({ "status": "paid" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn restaurant_order_lists_require_ownership() {
    let db = prepare_test_store().await;
    let app = order_app!(db, flat_catalog(1000, 200));
    let req = as_customer(TestRequest::post().uri("/orders"), "alice").set_json(new_order_body("resto-1")).to_request();
    test::call_service(&app, req).await;

    let req = as_owner(TestRequest::get().uri("/restaurants/resto-1/orders"), "eve", "resto-2").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = as_owner(TestRequest::get().uri("/restaurants/resto-1/orders"), "bob", "resto-1").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let orders: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn checkout_is_idempotent_at_the_http_layer() {
    let db = prepare_test_store().await;
    // One order will be checked out twice; Stripe must only ever be asked once.
    let mut provider = MockProvider::new();
    provider.expect_create_checkout_session().times(1).returning(|req| {
        Ok(CheckoutSession {
            session_id: "cs_test_1".to_string(),
            redirect_url: format!("https://checkout.stripe.com/pay/{}", req.order_id.as_str()),
        })
    });
    let orders_api = OrderFlowApi::new(db.clone(), flat_catalog(1000, 200));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(OrderFlowApi::new(db.clone(), flat_catalog(1000, 200))))
            .app_data(web::Data::new(CheckoutApi::new(db.clone(), provider)))
            .service(CreateOrderRoute::<SqliteOrderStore, MockCatalog>::new())
            .service(CheckoutRoute::<SqliteOrderStore, MockCatalog, MockProvider>::new()),
    )
    .await;
    let req = as_customer(TestRequest::post().uri("/orders"), "alice").set_json(new_order_body("resto-1")).to_request();
    let order: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let id = order["id"].as_str().unwrap().to_string();
    orders_api
        .transition_order(&id.clone().into(), OrderStatus::Confirmed, Actor::RestaurantOwner, None)
        .await
        .unwrap();

    let uri = format!("/orders/{id}/checkout");
    let req = as_customer(TestRequest::post().uri(&uri), "alice").to_request();
    let first: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let req = as_customer(TestRequest::post().uri(&uri), "alice").to_request();
    let second: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(first["sessionId"], "cs_test_1");
    assert_eq!(first, second);
}

#[actix_web::test]
async fn checkout_needs_a_confirmed_order() {
    let db = prepare_test_store().await;
    let mut provider = MockProvider::new();
    provider.expect_create_checkout_session().times(0);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(OrderFlowApi::new(db.clone(), flat_catalog(1000, 200))))
            .app_data(web::Data::new(CheckoutApi::new(db.clone(), provider)))
            .service(CreateOrderRoute::<SqliteOrderStore, MockCatalog>::new())
            .service(CheckoutRoute::<SqliteOrderStore, MockCatalog, MockProvider>::new()),
    )
    .await;
    let req = as_customer(TestRequest::post().uri("/orders"), "alice").set_json(new_order_body("resto-1")).to_request();
    let order: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/orders/{}/checkout", order["id"].as_str().unwrap());
    let req = as_customer(TestRequest::post().uri(&uri), "alice").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
