use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::info;
use order_engine::{CheckoutApi, OrderFlowApi, ReconcileApi, SqliteOrderStore};
use stripe_tools::StripeApi;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{RestCatalog, StripeGateway},
    middleware::StripeSignatureMiddlewareFactory,
    routes::{
        health,
        AnomaliesRoute,
        CheckoutRoute,
        CreateOrderRoute,
        GetOrderRoute,
        MyOrdersRoute,
        RestaurantOrdersRoute,
        StripeWebhookRoute,
        TransitionOrderRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteOrderStore::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Database migrations are up to date");
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteOrderStore) -> Result<Server, ServerError> {
    let stripe_api =
        StripeApi::new(config.stripe_config.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let catalog = RestCatalog::new(&config.catalog_url).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let bind_address = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let gateway = StripeGateway::new(stripe_api.clone());
        let orders_api = OrderFlowApi::new(db.clone(), catalog.clone());
        let checkout_api = CheckoutApi::new(db.clone(), gateway);
        let reconcile_api = ReconcileApi::new(db.clone());
        let signature_checks = StripeSignatureMiddlewareFactory::new(
            config.stripe_config.webhook_secret.clone(),
            config.stripe_signature_checks,
        );
        let webhook_scope =
            web::scope("/webhook").wrap(signature_checks).service(StripeWebhookRoute::<SqliteOrderStore>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("opg::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(reconcile_api))
            .service(health)
            .service(CreateOrderRoute::<SqliteOrderStore, RestCatalog>::new())
            .service(MyOrdersRoute::<SqliteOrderStore, RestCatalog>::new())
            .service(GetOrderRoute::<SqliteOrderStore, RestCatalog>::new())
            .service(RestaurantOrdersRoute::<SqliteOrderStore, RestCatalog>::new())
            .service(TransitionOrderRoute::<SqliteOrderStore, RestCatalog>::new())
            .service(CheckoutRoute::<SqliteOrderStore, RestCatalog, StripeGateway>::new())
            .service(AnomaliesRoute::<SqliteOrderStore, RestCatalog>::new())
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(bind_address)?
    .run();
    Ok(srv)
}
