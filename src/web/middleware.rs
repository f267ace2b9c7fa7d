//! HTTP middleware
//!
//! Header policies applied to the service endpoints.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";
const NO_CACHE: &str = "no-cache, no-store, no-transform, must-revalidate, private, max-age=0";
const X_ACCEL_EXPIRES: &str = "x-accel-expires";
const X_XSS_PROTECTION: &str = "x-xss-protection";

pub fn apply_no_cache_headers(headers: &mut HeaderMap) {
    headers.insert(header::EXPIRES, HeaderValue::from_static(EPOCH));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(HeaderName::from_static(X_ACCEL_EXPIRES), HeaderValue::from_static("0"));
}

pub fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(HeaderName::from_static(X_XSS_PROTECTION), HeaderValue::from_static("1; mode=block"));
}

/// Forbid any intermediate or client caching of the response
pub async fn no_cache_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_no_cache_headers(response.headers_mut());
    response
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut());
    response
}
