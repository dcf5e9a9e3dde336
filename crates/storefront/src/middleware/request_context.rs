//! Per-request correlation context.
//!
//! Every request carries an `x-request-id`, taken from the upstream proxy
//! when it sent a usable one and generated otherwise. The id and the
//! restaurant or order the path addresses are recorded on the request span
//! and tagged on the Sentry scope, and the id is echoed in the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{Span, field::Empty};
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream request id that is trusted as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// The tenant resource a storefront path addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathContext<'a> {
    /// `/restaurants/{id}/...`
    Restaurant(&'a str),
    /// `/orders/{id}`
    Order(&'a str),
    /// Cart, checkout and health routes carry no id in the path.
    None,
}

/// Extract the restaurant or order id from a request path.
#[must_use]
pub fn path_context(path: &str) -> PathContext<'_> {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some("restaurants"), Some(id)) if !id.is_empty() => PathContext::Restaurant(id),
        (Some("orders"), Some(id)) if !id.is_empty() => PathContext::Order(id),
        _ => PathContext::None,
    }
}

/// The upstream request id if it is short and printable, else a new UUID v4.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Span for one storefront request, with empty slots the middleware fills.
pub fn make_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = Empty,
        restaurant_id = Empty,
        order_id = Empty,
    )
}

/// Record the request id and path context, then echo the id in the response.
pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let request_id = request_id(request.headers());

    {
        let span = Span::current();
        let context = path_context(request.uri().path());
        span.record("request_id", request_id.as_str());
        match context {
            PathContext::Restaurant(id) => {
                span.record("restaurant_id", id);
            }
            PathContext::Order(id) => {
                span.record("order_id", id);
            }
            PathContext::None => {}
        }

        sentry::configure_scope(|scope| {
            scope.set_tag("request_id", &request_id);
            match context {
                PathContext::Restaurant(id) => scope.set_tag("restaurant_id", id),
                PathContext::Order(id) => scope.set_tag("order_id", id),
                PathContext::None => {}
            }
        });
    }

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_path_context() {
        assert_eq!(
            path_context("/restaurants/thai-garden/menu"),
            PathContext::Restaurant("thai-garden")
        );
        assert_eq!(path_context("/orders/o-123"), PathContext::Order("o-123"));
        assert_eq!(path_context("/restaurants"), PathContext::None);
        assert_eq!(path_context("/restaurants/"), PathContext::None);
        assert_eq!(path_context("/cart/add"), PathContext::None);
        assert_eq!(path_context("/"), PathContext::None);
    }

    #[test]
    fn test_upstream_request_id_is_kept() {
        assert_eq!(request_id(&headers("cf-ray-8a1b2c")), "cf-ray-8a1b2c");
    }

    #[test]
    fn test_unusable_request_id_is_replaced() {
        let long = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        for value in ["", "has space", long.as_str()] {
            let id = request_id(&headers(value));
            assert_ne!(id, value);
            assert!(Uuid::parse_str(&id).is_ok());
        }
        assert!(Uuid::parse_str(&request_id(&HeaderMap::new())).is_ok());
    }
}
