use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
    web,
    App,
};
use opg_common::Secret;
use order_engine::{
    db_types::{OrderId, OrderStatus},
    state_machine::Actor,
    OrderFlowApi,
    ReconcileApi,
    SqliteOrderStore,
};
use stripe_tools::webhook::{sign_payload, SIGNATURE_HEADER};

use super::{
    helpers::{new_order_body, prepare_test_store},
    mocks::flat_catalog,
};
use crate::{middleware::StripeSignatureMiddlewareFactory, routes::StripeWebhookRoute};

const WEBHOOK_SECRET: &str = "whsec_endpoint_test";

macro_rules! webhook_app {
    ($db:expr) => {
        test::init_service(
            App::new().app_data(web::Data::new(ReconcileApi::new($db.clone()))).service(
                web::scope("/webhook")
                    .wrap(StripeSignatureMiddlewareFactory::new(Secret::new(WEBHOOK_SECRET.to_string()), true))
                    .service(StripeWebhookRoute::<SqliteOrderStore>::new()),
            ),
        )
        .await
    };
}

async fn confirmed_order(db: &SqliteOrderStore) -> OrderId {
    let api = OrderFlowApi::new(db.clone(), flat_catalog(1000, 200));
    let body = new_order_body("resto-1");
    let request = order_engine::OrderRequest {
        restaurant_id: "resto-1".to_string(),
        customer_id: "alice".to_string(),
        items: serde_json::from_value(body["items"].clone()).unwrap(),
        delivery_details: serde_json::from_value(body["deliveryDetails"].clone()).unwrap(),
    };
    let order = api.place_order(request).await.unwrap();
    api.transition_order(&order.id, OrderStatus::Confirmed, Actor::RestaurantOwner, None).await.unwrap();
    order.id
}

fn completed_event(order_id: &OrderId, amount: i64) -> String {
    serde_json::json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_1",
                "amount_total": amount,
                "metadata": { "orderId": order_id.as_str(), "restaurantId": "resto-1" }
            }
        }
    })
    .to_string()
}

fn signed_request(payload: &str) -> TestRequest {
    let ts = chrono::Utc::now().timestamp();
    let signature = sign_payload(payload.as_bytes(), WEBHOOK_SECRET, ts).unwrap();
    TestRequest::post()
        .uri("/webhook/stripe")
        .insert_header((SIGNATURE_HEADER, signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload.to_string())
}

#[actix_web::test]
async fn a_signed_completed_event_marks_the_order_paid() {
    let db = prepare_test_store().await;
    let app = webhook_app!(db);
    let id = confirmed_order(&db).await;
    let payload = completed_event(&id, 3200);
    let res = test::call_service(&app, signed_request(&payload).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let order = db_order(&db, &id).await;
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.total_amount, opg_common::Cents::from(3200));
}

#[actix_web::test]
async fn redeliveries_are_acknowledged_without_changing_the_order() {
    let db = prepare_test_store().await;
    let app = webhook_app!(db);
    let id = confirmed_order(&db).await;
    let payload = completed_event(&id, 3200);
    test::call_service(&app, signed_request(&payload).to_request()).await;
    let before = db_order(&db, &id).await;

    let res = test::call_service(&app, signed_request(&payload).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let after = db_order(&db, &id).await;
    assert_eq!(after.version, before.version);
    assert_eq!(after.updated_at, before.updated_at);
}

#[actix_web::test]
async fn unsigned_deliveries_are_rejected() {
    let db = prepare_test_store().await;
    let app = webhook_app!(db);
    let id = confirmed_order(&db).await;
    let payload = completed_event(&id, 3200);
    let req = TestRequest::post()
        .uri("/webhook/stripe")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload)
        .to_request();
    let status = match test::try_call_service(&app, req).await {
        Ok(res) => res.status(),
        Err(err) => err.error_response().status(),
    };
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(db_order(&db, &id).await.status, OrderStatus::Confirmed);
}

#[actix_web::test]
async fn a_tampered_body_is_rejected() {
    let db = prepare_test_store().await;
    let app = webhook_app!(db);
    let id = confirmed_order(&db).await;
    let payload = completed_event(&id, 3200);
    let ts = chrono::Utc::now().timestamp();
    let signature = sign_payload(payload.as_bytes(), WEBHOOK_SECRET, ts).unwrap();
    let tampered = completed_event(&id, 1);
    let req = TestRequest::post()
        .uri("/webhook/stripe")
        .insert_header((SIGNATURE_HEADER, signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(tampered)
        .to_request();
    let status = match test::try_call_service(&app, req).await {
        Ok(res) => res.status(),
        Err(err) => err.error_response().status(),
    };
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(db_order(&db, &id).await.status, OrderStatus::Confirmed);
}

#[actix_web::test]
async fn irrelevant_event_types_are_acknowledged() {
    let db = prepare_test_store().await;
    let app = webhook_app!(db);
    let payload = serde_json::json!({
        "id": "evt_2",
        "type": "payment_intent.created",
        "data": { "object": { "id": "pi_1" } }
    })
    .to_string();
    let res = test::call_service(&app, signed_request(&payload).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn events_for_unknown_orders_are_acknowledged_to_stop_redelivery() {
    let db = prepare_test_store().await;
    let app = webhook_app!(db);
    let payload = completed_event(&OrderId("ord-doesnotexist".to_string()), 100);
    let res = test::call_service(&app, signed_request(&payload).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn unparseable_bodies_are_acknowledged_to_stop_redelivery() {
    let db = prepare_test_store().await;
    let app = webhook_app!(db);
    // Correctly signed, but not a Stripe event. A 4xx here would make Stripe resend it forever.
    let res = test::call_service(&app, signed_request("{\"hello\": \"world\"}").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(body["success"], false);
}

async fn db_order(db: &SqliteOrderStore, id: &OrderId) -> order_engine::db_types::Order {
    use order_engine::traits::OrderStore;
    db.fetch_order(id).await.unwrap().expect("order should exist")
}
