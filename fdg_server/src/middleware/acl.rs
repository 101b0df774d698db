//! Access control middleware for the delivery gateway server.
//! This middleware can be placed on any route or service.
//!
//! It reads the caller's identity from the actor headers (see [`crate::auth`]) and checks it against the roles allowed
//! on the route. If the caller holds one of the allowed roles, the request continues. Otherwise, a 403 Forbidden
//! response is returned. Requests without valid actor headers get a 401.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::warn;

use crate::{
    auth::{actor_from_headers, ActorRole},
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<ActorRole>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[ActorRole]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<ActorRole>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let actor = actor_from_headers(req.headers()).map_err(|e| {
                warn!("💻️ Rejecting request to {} without a valid actor. {e}", req.path());
                Error::from(ServerError::from(e))
            })?;
            let role = ActorRole::of(&actor);
            if allowed_roles.contains(&role) {
                service.call(req).await
            } else {
                warn!("💻️ {actor} may not access {}", req.path());
                let e = AuthError::InsufficientPermissions(format!("The {role} role may not access this endpoint"));
                Err(ServerError::from(e).into())
            }
        })
    }
}
