//! Cross-site request forgery checks and response hardening headers.

use std::future::{Ready, ready};
use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::Method;
use actix_web::http::header::{self, HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage, ResponseError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::LocalBoxFuture;
use rand::RngCore;
use reqwest::Url;

use crate::error::ApiError;

/// Rejects state-changing requests whose declared origin is not trusted.
#[derive(Clone)]
pub struct CsrfGuard {
    trusted: Arc<Vec<String>>,
}

impl CsrfGuard {
    pub fn new(trusted: Vec<String>) -> Self {
        CsrfGuard {
            trusted: Arc::new(trusted),
        }
    }
}

fn is_safe_method(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS].contains(method)
}

fn header_str(req: &ServiceRequest, name: HeaderName) -> Option<&str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// The `Origin` header, else the origin of `Referer`.
fn declared_origin(req: &ServiceRequest) -> Option<String> {
    if let Some(origin) = header_str(req, header::ORIGIN) {
        return Some(origin.trim_end_matches('/').to_owned());
    }
    let referer = Url::parse(header_str(req, header::REFERER)?).ok()?;
    let origin = referer.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

fn origin_allowed(req: &ServiceRequest, trusted: &[String]) -> bool {
    let Some(declared) = declared_origin(req) else {
        return false;
    };
    let own = {
        let info = req.connection_info();
        format!("{}://{}", info.scheme(), info.host())
    };
    declared == own || trusted.iter().any(|origin| *origin == declared)
}

impl<S, B> Transform<S, ServiceRequest> for CsrfGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CsrfGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CsrfGuardService {
            service: Rc::new(service),
            trusted: Arc::clone(&self.trusted),
        }))
    }
}

pub struct CsrfGuardService<S> {
    service: Rc<S>,
    trusted: Arc<Vec<String>>,
}

impl<S, B> Service<ServiceRequest> for CsrfGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !is_safe_method(req.method()) && !origin_allowed(&req, &self.trusted) {
            tracing::warn!(method = %req.method(), path = %req.path(), "cross-origin request rejected");
            let response = ApiError::Forbidden.error_response();
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }
        let svc = Rc::clone(&self.service);
        Box::pin(async move { svc.call(req).await.map(|res| res.map_into_left_body()) })
    }
}

/// Per-request CSP nonce, available to handlers through request extensions.
#[derive(Debug, Clone)]
pub struct CspNonce(pub String);

impl CspNonce {
    fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        CspNonce(STANDARD.encode(bytes))
    }
}

pub fn content_security_policy(nonce: Option<&CspNonce>) -> String {
    let (script, style) = match nonce {
        Some(CspNonce(nonce)) => (
            format!("script-src 'self' 'nonce-{nonce}'"),
            format!("style-src 'self' 'nonce-{nonce}'"),
        ),
        None => (
            "script-src 'self' 'unsafe-inline' 'unsafe-eval'".to_owned(),
            "style-src 'self' 'unsafe-inline'".to_owned(),
        ),
    };
    [
        "default-src 'self'".to_owned(),
        "img-src 'self' data:".to_owned(),
        style,
        script,
        "connect-src 'self' https:".to_owned(),
        "frame-ancestors 'none'".to_owned(),
    ]
    .join("; ")
}

/// Adds hardening headers to every response. With `nonces` on, each request
/// gets a fresh CSP nonce instead of the permissive development policy.
#[derive(Clone, Copy)]
pub struct SecurityHeaders {
    nonces: bool,
}

impl SecurityHeaders {
    pub fn new(nonces: bool) -> Self {
        SecurityHeaders { nonces }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SecurityHeadersService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersService {
            service: Rc::new(service),
            nonces: self.nonces,
        }))
    }
}

pub struct SecurityHeadersService<S> {
    service: Rc<S>,
    nonces: bool,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let nonce = self.nonces.then(CspNonce::generate);
        if let Some(nonce) = &nonce {
            req.extensions_mut().insert(nonce.clone());
        }
        let svc = Rc::clone(&self.service);
        Box::pin(async move {
            let mut res = svc.call(req).await?;
            let headers = res.headers_mut();
            headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
            headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
            headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
            match HeaderValue::from_str(&content_security_policy(nonce.as_ref())) {
                Ok(policy) => {
                    headers.insert(header::CONTENT_SECURITY_POLICY, policy);
                }
                Err(err) => tracing::error!(error = %err, "invalid content security policy"),
            }
            Ok(res)
        })
    }
}
