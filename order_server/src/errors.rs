use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use order_engine::{CheckoutError, OrderFlowError, PaymentEventError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    IllegalRequest(String),
    #[error("The resource is busy. Try the request again.")]
    Conflict,
    #[error("The payment event could not be processed yet. Retry the delivery.")]
    RetryPaymentEvent,
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::IllegalRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingHeader(_) => StatusCode::UNAUTHORIZED,
                AuthError::MalformedHeader(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::RetryPaymentEvent => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("The {0} header is missing.")]
    MissingHeader(String),
    #[error("The {0} header could not be read.")]
    MalformedHeader(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            OrderFlowError::UnknownMenuItem { .. } | OrderFlowError::UnknownRestaurant(_) => {
                Self::IllegalRequest(e.to_string())
            },
            OrderFlowError::InvalidCart(_) => Self::IllegalRequest(e.to_string()),
            OrderFlowError::Transition(_) => Self::IllegalRequest(e.to_string()),
            OrderFlowError::Conflict => Self::Conflict,
            OrderFlowError::Catalog(e) => Self::BackendError(e.to_string()),
            OrderFlowError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            CheckoutError::IllegalOrderState { .. } | CheckoutError::InvalidCart(_) => {
                Self::IllegalRequest(e.to_string())
            },
            CheckoutError::Conflict => Self::Conflict,
            CheckoutError::PaymentProvider(e) => Self::BackendError(e.to_string()),
            CheckoutError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<PaymentEventError> for ServerError {
    fn from(e: PaymentEventError) -> Self {
        match e {
            // Only transient failures may bounce; Stripe redelivers anything that is not acknowledged with a 2xx.
            PaymentEventError::Transient => Self::RetryPaymentEvent,
            PaymentEventError::DatabaseError(_) => Self::RetryPaymentEvent,
            other => Self::IllegalRequest(other.to_string()),
        }
    }
}
