//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Authorization happens here and only here: every handler that touches an order decides, from the
//! [`AuthContext`], whether the caller may act on it, before handing the work to the engine APIs. The engine
//! itself is identity-blind.

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use opg_common::Cents;
use order_engine::{
    db_types::{OrderId, OrderStatus},
    traits::{CatalogLookup, OrderStore, PaymentProvider},
    Ack,
    CheckoutApi,
    OrderFlowApi,
    OrderRequest,
    PaymentEvent,
    ReconcileApi,
};
use stripe_tools::StripeEvent;

use crate::{
    auth::{AuthContext, Role},
    data_objects::{CheckoutResponse, JsonResponse, NewOrderRequest, TransitionRequest},
    errors::{AuthError, ServerError},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderStore, CatalogLookup);
/// Route handler for placing a new order.
///
/// The client submits menu-item references and quantities only. Names, unit prices, the delivery fee and the
/// total are all resolved server-side against the catalog, so a tampered request body cannot influence what the
/// customer is eventually charged.
pub async fn create_order<B, C>(
    ctx: AuthContext,
    api: web::Data<OrderFlowApi<B, C>>,
    body: web::Json<NewOrderRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    C: CatalogLookup,
{
    ctx.require_role(Role::Customer)?;
    let request = body.into_inner();
    debug!("💻️ POST order for customer {} at restaurant {}", ctx.user_id, request.restaurant_id);
    let order = api
        .place_order(OrderRequest {
            restaurant_id: request.restaurant_id,
            customer_id: ctx.user_id,
            items: request.items,
            delivery_details: request.delivery_details,
        })
        .await?;
    Ok(HttpResponse::Created().json(order))
}

route!(get_order => Get "/orders/{id}" impl OrderStore, CatalogLookup);
pub async fn get_order<B, C>(
    ctx: AuthContext,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    C: CatalogLookup,
{
    let id = OrderId(path.into_inner());
    debug!("💻️ GET order {id} for {}", ctx.user_id);
    let order = api.fetch_order(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    // A caller probing someone else's order id learns nothing, not even that it exists.
    if !ctx.can_view_order(&order) {
        return Err(ServerError::NoRecordFound(format!("Order {id}")));
    }
    Ok(HttpResponse::Ok().json(order))
}

route!(my_orders => Get "/orders" impl OrderStore, CatalogLookup);
pub async fn my_orders<B, C>(
    ctx: AuthContext,
    api: web::Data<OrderFlowApi<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    C: CatalogLookup,
{
    debug!("💻️ GET orders for customer {}", ctx.user_id);
    let orders = api.orders_for_customer(&ctx.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(restaurant_orders => Get "/restaurants/{id}/orders" impl OrderStore, CatalogLookup);
pub async fn restaurant_orders<B, C>(
    ctx: AuthContext,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    C: CatalogLookup,
{
    let restaurant_id = path.into_inner();
    if !ctx.owns_restaurant(&restaurant_id) {
        return Err(AuthError::InsufficientPermissions(format!(
            "{} does not manage restaurant {restaurant_id}",
            ctx.user_id
        ))
        .into());
    }
    debug!("💻️ GET orders for restaurant {restaurant_id}");
    let orders = api.orders_for_restaurant(&restaurant_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(transition_order => Patch "/orders/{id}/status" impl OrderStore, CatalogLookup);
/// Route handler for status transitions driven by people.
///
/// The target status travels in the body. Customers get exactly one move, cancelling their own unpaid order;
/// every other edge belongs to the restaurant side. Whether the edge itself is legal is the transition table's
/// decision. `paid` is not reachable through this endpoint at all, it belongs to the payment webhook.
pub async fn transition_order<B, C>(
    ctx: AuthContext,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, C>>,
    body: web::Json<TransitionRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    C: CatalogLookup,
{
    let id = OrderId(path.into_inner());
    let request = body.into_inner();
    let order = api.fetch_order(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    if !ctx.can_view_order(&order) {
        return Err(ServerError::NoRecordFound(format!("Order {id}")));
    }
    if ctx.role == Role::Customer && (request.status != OrderStatus::Rejected || order.status.is_paid_or_later()) {
        return Err(AuthError::InsufficientPermissions(format!(
            "Customers may only cancel their own unpaid orders, not set them to {}",
            request.status
        ))
        .into());
    }
    debug!("💻️ PATCH order {id}: {} -> {} by {}", order.status, request.status, ctx.user_id);
    let updated = api.transition_order(&id, request.status, ctx.actor(), request.message).await?;
    Ok(HttpResponse::Ok().json(updated))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/orders/{id}/checkout" impl OrderStore, CatalogLookup, PaymentProvider);
/// Route handler for minting a Stripe checkout session for a confirmed order.
///
/// Idempotent: repeating the call for the same order returns the session already on record instead of creating
/// a second one.
pub async fn checkout<B, C, P>(
    ctx: AuthContext,
    path: web::Path<String>,
    orders: web::Data<OrderFlowApi<B, C>>,
    api: web::Data<CheckoutApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    C: CatalogLookup,
    P: PaymentProvider,
{
    ctx.require_role(Role::Customer)?;
    let id = OrderId(path.into_inner());
    let order = orders.fetch_order(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    if !ctx.can_view_order(&order) {
        return Err(ServerError::NoRecordFound(format!("Order {id}")));
    }
    debug!("💻️ POST checkout for order {id} by {}", ctx.user_id);
    let session = api.create_session(&id).await?;
    Ok(HttpResponse::Ok().json(CheckoutResponse { session_id: session.session_id, redirect_url: session.redirect_url }))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(stripe_webhook => Post "/stripe" impl OrderStore);
/// Route handler for Stripe webhook deliveries.
///
/// By the time this runs, the signature middleware has already verified the body. Deliveries that can never be
/// applied (no order id, unknown order) are acknowledged with a 2xx anyway; bouncing them would only make Stripe
/// redeliver the same poison event forever. Only transient failures return a 5xx so that Stripe retries.
pub async fn stripe_webhook<B>(
    body: web::Bytes,
    api: web::Data<ReconcileApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
{
    // A body that cannot be parsed will not parse on redelivery either, so it is acknowledged rather than
    // bounced. Bouncing it would keep Stripe resending the same poison delivery until the event expires.
    let event = match serde_json::from_slice::<StripeEvent>(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("💻️ Webhook body is not a Stripe event and was acknowledged to stop redelivery. {e}");
            return Ok(HttpResponse::Ok().json(JsonResponse::failure(format!("Not a Stripe event: {e}"))));
        },
    };
    debug!("💻️ Received Stripe event {} ({})", event.id, event.event_type);
    let payment_event = PaymentEvent {
        event_id: event.id.clone(),
        event_type: event.event_type.clone(),
        order_id: event.order_id().map(|id| OrderId(id.to_string())),
        amount: event.data.object.amount_total.map(Cents::from),
        session_id: Some(event.data.object.id.clone()),
    };
    match api.handle_event(payment_event).await {
        Ok(Ack::Processed(order)) => {
            info!("💻️ Event {} marked order {} as paid", event.id, order.id);
            Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {} is paid", order.id))))
        },
        Ok(Ack::Duplicate) => {
            debug!("💻️ Event {} was a redelivery. Nothing to do.", event.id);
            Ok(HttpResponse::Ok().json(JsonResponse::success("Already processed")))
        },
        Ok(Ack::Ignored { event_type }) => {
            trace!("💻️ Ignoring event {} of type {event_type}", event.id);
            Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Ignored event type {event_type}"))))
        },
        Ok(Ack::AnomalyRecorded) => {
            warn!("💻️ Event {} could not be applied cleanly. An anomaly was recorded.", event.id);
            Ok(HttpResponse::Ok().json(JsonResponse::success("Anomaly recorded")))
        },
        Err(e) if e.must_retry() => {
            warn!("💻️ Event {} hit a transient failure. Asking Stripe to redeliver. {e}", event.id);
            Err(e.into())
        },
        Err(e) => {
            warn!("💻️ Event {} is unprocessable and was acknowledged to stop redelivery. {e}", event.id);
            Ok(HttpResponse::Ok().json(JsonResponse::failure(e)))
        },
    }
}

//----------------------------------------------   Anomalies  ----------------------------------------------------
route!(anomalies => Get "/anomalies" impl OrderStore, CatalogLookup);
pub async fn anomalies<B, C>(
    ctx: AuthContext,
    api: web::Data<OrderFlowApi<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    C: CatalogLookup,
{
    ctx.require_role(Role::Admin)?;
    debug!("💻️ GET anomalies for {}", ctx.user_id);
    let anomalies = api.anomalies().await?;
    Ok(HttpResponse::Ok().json(anomalies))
}
