use axum::http::{HeaderName, HeaderValue, Request, Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};

use super::Config;

/// Headers added to every API response.
const API_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

/// Only meaningful behind HTTPS, so it is sent in production only.
const HSTS: (&str, &str) = (
    "strict-transport-security",
    "max-age=31536000; includeSubDomains",
);

#[derive(Clone)]
pub struct SecurityHeadersLayer {
    include_hsts: bool,
}

impl SecurityHeadersLayer {
    pub fn new(include_hsts: bool) -> Self {
        Self { include_hsts }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            include_hsts: self.include_hsts,
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    include_hsts: bool,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecurityHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = SecurityHeadersFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        SecurityHeadersFuture {
            future: self.inner.call(request),
            include_hsts: self.include_hsts,
        }
    }
}

#[pin_project::pin_project]
pub struct SecurityHeadersFuture<F> {
    #[pin]
    future: F,
    include_hsts: bool,
}

impl<F, ResBody, E> std::future::Future for SecurityHeadersFuture<F>
where
    F: std::future::Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let include_hsts = *this.include_hsts;

        this.future.poll(cx).map_ok(|mut response| {
            let headers = response.headers_mut();
            let extra = include_hsts.then_some(HSTS);
            for (name, value) in API_HEADERS.into_iter().chain(extra) {
                headers.insert(
                    HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                );
            }
            response
        })
    }
}

pub fn create_security_headers_layer(config: &Config) -> SecurityHeadersLayer {
    if config.production {
        tracing::info!("Security: HSTS header enabled (production mode)");
    } else {
        tracing::info!("Security: HSTS header disabled (development mode)");
    }

    SecurityHeadersLayer::new(config.production)
}
