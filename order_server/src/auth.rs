//! Caller identity, as asserted by the upstream gateway.
//!
//! The API gateway in front of this server terminates authentication and forwards the verified identity in three
//! headers: `X-Auth-User-Id`, `X-Auth-Role`, and (for restaurant staff) `X-Auth-Restaurant-Id`. [`AuthContext`]
//! extracts those headers; the route handlers then make the actual authorization decision. Handlers are the single
//! authorization point in this server, so a missing ownership check is a bug in exactly one place.

use std::{future::Ready, str::FromStr};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use log::*;
use order_engine::state_machine::Actor;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "X-Auth-User-Id";
pub const ROLE_HEADER: &str = "X-Auth-Role";
pub const RESTAURANT_ID_HEADER: &str = "X-Auth-Restaurant-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Customer,
    RestaurantOwner,
    Admin,
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "restaurantOwner" => Ok(Role::RestaurantOwner),
            "admin" => Ok(Role::Admin),
            _ => Err(AuthError::MalformedHeader(ROLE_HEADER.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
    pub restaurant_id: Option<String>,
}

impl AuthContext {
    /// The state-machine actor this caller acts as.
    pub fn actor(&self) -> Actor {
        match self.role {
            Role::Customer => Actor::Customer,
            Role::RestaurantOwner | Role::Admin => Actor::RestaurantOwner,
        }
    }

    /// Whether this caller may look at the given order.
    pub fn can_view_order(&self, order: &order_engine::db_types::Order) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Customer => order.customer_id == self.user_id,
            Role::RestaurantOwner => self.owns_restaurant(&order.restaurant_id),
        }
    }

    pub fn owns_restaurant(&self, restaurant_id: &str) -> bool {
        self.role == Role::Admin ||
            (self.role == Role::RestaurantOwner && self.restaurant_id.as_deref() == Some(restaurant_id))
    }

    pub fn require_role(&self, role: Role) -> Result<(), ServerError> {
        if self.role == role || self.role == Role::Admin {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions(format!("This endpoint requires the {role:?} role")).into())
        }
    }

    fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let user_id = required_header(headers, USER_ID_HEADER)?;
        let role = required_header(headers, ROLE_HEADER)?.parse::<Role>()?;
        let restaurant_id = match headers.get(RESTAURANT_ID_HEADER) {
            Some(v) => {
                Some(v.to_str().map_err(|_| AuthError::MalformedHeader(RESTAURANT_ID_HEADER.to_string()))?.to_string())
            },
            None => None,
        };
        Ok(Self { user_id, role, restaurant_id })
    }
}

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, AuthError> {
    let value = headers.get(name).ok_or_else(|| AuthError::MissingHeader(name.to_string()))?;
    Ok(value.to_str().map_err(|_| AuthError::MalformedHeader(name.to_string()))?.to_string())
}

impl FromRequest for AuthContext {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = AuthContext::from_headers(req.headers()).map_err(|e| {
            debug!("💻️ Request to {} carried no usable identity. {e}", req.path());
            ServerError::from(e)
        });
        std::future::ready(result)
    }
}
