use std::{sync::Arc, time::Duration};

use log::*;
use opg_common::{Cents, DEFAULT_CURRENCY_CODE};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
};

use crate::{
    config::StripeConfig,
    data_objects::{CheckoutSessionData, SessionLineItem},
    error::StripeApiError,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val =
            HeaderValue::from_str(bearer.as_str()).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Creates a hosted Checkout Session for the given order.
    ///
    /// The Checkout API takes form-encoded bodies with bracketed keys rather than JSON, so the request is assembled
    /// as a flat parameter list. The order and restaurant ids ride along in the session metadata and come back
    /// unchanged inside the `checkout.session.completed` event, which is how payments are matched to orders.
    pub async fn create_checkout_session(
        &self,
        order_id: &str,
        restaurant_id: &str,
        line_items: &[SessionLineItem],
        delivery_fee: Cents,
    ) -> Result<CheckoutSessionData, StripeApiError> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("success_url".into(), self.config.success_url.clone()),
            ("cancel_url".into(), self.config.cancel_url.clone()),
            ("metadata[orderId]".into(), order_id.into()),
            ("metadata[restaurantId]".into(), restaurant_id.into()),
        ];
        for (i, item) in line_items.iter().enumerate() {
            params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
            params.push((format!("line_items[{i}][price_data][currency]"), DEFAULT_CURRENCY_CODE.into()));
            params.push((format!("line_items[{i}][price_data][unit_amount]"), item.unit_amount.value().to_string()));
            params.push((format!("line_items[{i}][price_data][product_data][name]"), item.name.clone()));
        }
        params.push(("shipping_options[0][shipping_rate_data][display_name]".into(), "Delivery".into()));
        params.push(("shipping_options[0][shipping_rate_data][type]".into(), "fixed_amount".into()));
        params.push((
            "shipping_options[0][shipping_rate_data][fixed_amount][amount]".into(),
            delivery_fee.value().to_string(),
        ));
        params.push((
            "shipping_options[0][shipping_rate_data][fixed_amount][currency]".into(),
            DEFAULT_CURRENCY_CODE.into(),
        ));
        let url = format!("{STRIPE_API_BASE}/checkout/sessions");
        trace!("💳️ Creating checkout session for order {order_id} ({} line items)", line_items.len());
        let response = self
            .client
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| StripeApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            let session =
                response.json::<CheckoutSessionData>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))?;
            debug!("💳️ Checkout session {} created for order {order_id}", session.id);
            Ok(session)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            warn!("💳️ Checkout session request for order {order_id} failed with status {status}");
            Err(StripeApiError::QueryError { status, message })
        }
    }
}
