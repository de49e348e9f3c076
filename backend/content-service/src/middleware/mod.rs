/// HTTP middleware utilities for content-service
///
/// Provides gateway identity extraction and request metrics. Authentication
/// happens upstream; the gateway forwards the verified caller id in
/// [`USER_ID_HEADER`].
use crate::error::AppError;
use crate::metrics::http::HTTP_REQUEST_DURATION_SECONDS;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";

// =====================================================================
// Gateway identity
// =====================================================================

/// Extracted user identifier stored in request extensions by
/// [`GatewayIdentityMiddleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

fn caller_id(req: &ServiceRequest) -> Result<Uuid, AppError> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing caller identity".into()))?;

    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Unauthorized("invalid caller identity".into()))
}

/// Actix middleware that requires the gateway's caller id header.
pub struct GatewayIdentityMiddleware;

impl<S, B> Transform<S, ServiceRequest> for GatewayIdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = GatewayIdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GatewayIdentityMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct GatewayIdentityMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for GatewayIdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let user_id = caller_id(&req)?;
            req.extensions_mut().insert(UserId(user_id));

            service.call(req).await
        })
    }
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .copied()
                .ok_or_else(|| AppError::Unauthorized("User ID missing".into()).into()),
        )
    }
}

// =====================================================================
// Metrics middleware
// =====================================================================

pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        // Label by pattern so path ids do not explode cardinality.
        let route = req
            .match_pattern()
            .unwrap_or_else(|| "unmatched".to_string());
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let res = service.call(req).await;
            let elapsed = start.elapsed();
            let status = match &res {
                Ok(resp) => resp.status().as_u16(),
                Err(err) => err.as_response_error().status_code().as_u16(),
            };

            HTTP_REQUEST_DURATION_SECONDS
                .with_label_values(&[method.as_str(), route.as_str(), &status.to_string()])
                .observe(elapsed.as_secs_f64());
            tracing::debug!(
                %method,
                %route,
                status,
                elapsed_ms = elapsed.as_millis() as u64,
                "request completed"
            );
            res
        })
    }
}
