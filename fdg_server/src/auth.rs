//! Request actor identification.
//!
//! Authentication happens upstream of this service. The gateway in front of it forwards the caller's identity in two
//! headers:
//! * `fdg_actor` - either `customer` or `operator`.
//! * `fdg_customer_id` - the customer's id. Required when `fdg_actor` is `customer`, ignored otherwise.
//!
//! Handlers take a [`RequestActor`] argument to receive the parsed [`Actor`]; the ACL middleware uses
//! [`actor_from_headers`] to check roles before the handler runs.
use std::{
    fmt::Display,
    future::{ready, Ready},
    ops::Deref,
    str::FromStr,
};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use fdg_engine::order_objects::Actor;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

pub const ACTOR_HEADER: &str = "fdg_actor";
pub const CUSTOMER_ID_HEADER: &str = "fdg_customer_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Operator,
}

impl ActorRole {
    pub fn of(actor: &Actor) -> Self {
        match actor {
            Actor::Customer(_) => Self::Customer,
            Actor::Operator => Self::Operator,
        }
    }
}

impl Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Operator => write!(f, "operator"),
        }
    }
}

impl FromStr for ActorRole {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "operator" => Ok(Self::Operator),
            other => Err(AuthError::InvalidActor(format!("'{other}' is not a known actor role"))),
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, AuthError> {
    headers
        .get(name)
        .map(|v| v.to_str().map_err(|_| AuthError::InvalidActor(format!("The {name} header is not valid text"))))
        .transpose()
}

/// Builds the engine [`Actor`] from the identity headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AuthError> {
    let role = header_value(headers, ACTOR_HEADER)?.ok_or(AuthError::MissingActor)?.parse::<ActorRole>()?;
    match role {
        ActorRole::Operator => Ok(Actor::Operator),
        ActorRole::Customer => {
            let id = header_value(headers, CUSTOMER_ID_HEADER)?.map(str::trim).unwrap_or_default();
            if id.is_empty() {
                return Err(AuthError::InvalidActor(format!("Customers must supply the {CUSTOMER_ID_HEADER} header")));
            }
            Ok(Actor::customer(id))
        },
    }
}

/// An extractor for the identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestActor(pub Actor);

impl RequestActor {
    pub fn into_inner(self) -> Actor {
        self.0
    }

    pub fn role(&self) -> ActorRole {
        ActorRole::of(&self.0)
    }

    /// The customer id, or an error if the caller is an operator.
    pub fn customer_id(&self) -> Result<&str, ServerError> {
        match &self.0 {
            Actor::Customer(id) => Ok(id.as_str()),
            Actor::Operator => {
                Err(AuthError::InsufficientPermissions("This endpoint is only available to customers".into()).into())
            },
        }
    }
}

impl Deref for RequestActor {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for RequestActor {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = actor_from_headers(req.headers()).map(RequestActor).map_err(ServerError::from);
        if let Ok(actor) = &result {
            trace!("💻️ Request made by {}", actor.0);
        }
        ready(result)
    }
}
