//! Signature middleware for payment notifications.
//!
//! The payment provider signs every notification with the webhook secret configured in its dashboard. The signature
//! arrives in the `x-signature` header as `ts=<timestamp>,v1=<hex hmac>`, and covers the manifest
//! `id:<data.id>;request-id:<x-request-id>;ts:<timestamp>;`.
//!
//! The reconciler never trusts the contents of a notification, so checks are optional. When enabled, unsigned or
//! badly signed `POST`s are refused with `403 Forbidden`. Other methods always pass.

use std::{
    collections::HashMap,
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    http::Method,
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace, warn};
use sfg_common::Secret;

use crate::{
    helpers::{signature_manifest, verify_signature, SignatureHeader},
    webhook::WebhookNotification,
};

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct SignatureMiddlewareFactory {
    key: Secret<String>,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl SignatureMiddlewareFactory {
    pub fn new(key: Secret<String>, enabled: bool) -> Self {
        SignatureMiddlewareFactory { key, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService { key: self.key.clone(), enabled: self.enabled, service: Rc::new(service) }))
    }
}

pub struct SignatureMiddlewareService<S> {
    key: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.reveal().clone();
        let enabled = self.enabled;
        Box::pin(async move {
            if !enabled || req.method() != Method::POST {
                trace!("🔐️ Signature checks do not apply. Allowing request.");
                return service.call(req).await;
            }
            let header = req
                .headers()
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    warn!("🔐️ No signature found in notification. Denying access.");
                    ErrorForbidden("No signature found.")
                })?
                .parse::<SignatureHeader>()
                .map_err(|e| {
                    warn!("🔐️ {e}. Denying access.");
                    ErrorForbidden("Malformed signature.")
                })?;
            let request_id =
                req.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()).map(String::from);
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let query = web::Query::<HashMap<String, String>>::from_query(req.query_string())
                .map(web::Query::into_inner)
                .unwrap_or_default();
            // Without a data id the manifest cannot be rebuilt. The handler rejects such requests anyway.
            let Ok(notification) = WebhookNotification::parse(&query, data.as_ref()) else {
                debug!("🔐️ Notification has no data id. Passing it on for rejection.");
                req.set_payload(bytes_to_payload(data));
                return service.call(req).await;
            };
            let manifest = signature_manifest(Some(notification.data_id()), request_id.as_deref(), &header.ts);
            if verify_signature(&secret, &manifest, &header.v1) {
                trace!("🔐️ Signature check for notification ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid signature found in notification. Denying access.");
                Err(ErrorForbidden("Invalid signature."))
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
