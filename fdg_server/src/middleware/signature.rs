//! Signature checks for payment gateway callbacks.
//!
//! The gateway signs every callback with HMAC-SHA256 over the raw body, keyed with `FDG_PAYMENT_WEBHOOK_SECRET`. The
//! digest is sent base64-encoded in the `x-fdg-signature` header, optionally prefixed with `sha256=`.
//!
//! [`CallbackSignatureFactory`] wraps the `/payments` scope. A callback only reaches the order engine if its signature
//! matches and its body decodes as a [`PaymentCallback`]. With signature checks disabled the body is still decoded.

use std::{pin::Pin, rc::Rc};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    http::header::HeaderValue,
    web,
    Error,
};
use fdg_common::Secret;
use fdg_engine::engine_api::payments::PaymentCallback;
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;
use thiserror::Error;

use crate::helpers::verify_hmac;

pub const SIGNATURE_HEADER: &str = "x-fdg-signature";
const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackRejection {
    #[error("No payment signature found.")]
    MissingSignature,
    #[error("The payment signature is not valid base64.")]
    MalformedSignature,
    #[error("Invalid payment signature.")]
    BadSignature,
    #[error("The callback is not a payment notification. {0}")]
    NotACallback(String),
}

impl From<CallbackRejection> for Error {
    fn from(rejection: CallbackRejection) -> Self {
        match rejection {
            CallbackRejection::NotACallback(_) => ErrorBadRequest(rejection.to_string()),
            _ => ErrorForbidden(rejection.to_string()),
        }
    }
}

/// Decodes the signature header into the raw digest bytes.
pub fn parse_signature(header: Option<&HeaderValue>) -> Result<Vec<u8>, CallbackRejection> {
    let value = header.ok_or(CallbackRejection::MissingSignature)?;
    let value = value.to_str().map_err(|_| CallbackRejection::MalformedSignature)?.trim();
    let digest = value.strip_prefix(SIGNATURE_PREFIX).unwrap_or(value);
    if digest.is_empty() {
        return Err(CallbackRejection::MissingSignature);
    }
    base64::decode(digest).map_err(|_| CallbackRejection::MalformedSignature)
}

pub fn decode_callback(body: &[u8]) -> Result<PaymentCallback, CallbackRejection> {
    serde_json::from_slice(body).map_err(|e| CallbackRejection::NotACallback(e.to_string()))
}

/// Checks `body` against the signature header and decodes it.
pub fn verify_callback(
    secret: &Secret<String>,
    signature: Option<&HeaderValue>,
    body: &[u8],
) -> Result<PaymentCallback, CallbackRejection> {
    let digest = parse_signature(signature)?;
    if !verify_hmac(secret.reveal(), body, &digest) {
        return Err(CallbackRejection::BadSignature);
    }
    decode_callback(body)
}

pub struct CallbackSignatureFactory {
    secret: Secret<String>,
    checks_enabled: bool,
}

impl CallbackSignatureFactory {
    pub fn new(secret: Secret<String>, checks_enabled: bool) -> Self {
        Self { secret, checks_enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CallbackSignatureFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = CallbackSignatureService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CallbackSignatureService {
            secret: self.secret.clone(),
            checks_enabled: self.checks_enabled,
            service: Rc::new(service),
        })
    }
}

pub struct CallbackSignatureService<S> {
    secret: Secret<String>,
    checks_enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for CallbackSignatureService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.clone();
        let checks_enabled = self.checks_enabled;
        Box::pin(async move {
            let body = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Could not read the payment callback body. {e}");
                ErrorBadRequest("Could not read the callback body.")
            })?;
            let checked = if checks_enabled {
                verify_callback(&secret, req.headers().get(SIGNATURE_HEADER), &body)
            } else {
                trace!("🔐️ Payment signature checks are disabled");
                decode_callback(&body)
            };
            let callback = checked.map_err(|e| {
                warn!("🔐️ Rejecting payment callback to {}. {e}", req.path());
                Error::from(e)
            })?;
            debug!("🔐️ Payment callback for [{}] accepted", callback.reference);
            req.set_payload(replay_body(body));
            service.call(req).await
        })
    }
}

// The handler reads the body again, so it has to be put back.
fn replay_body(body: web::Bytes) -> Payload {
    let (_, mut payload) = h1::Payload::create(true);
    payload.unread_data(body);
    Payload::from(payload)
}
