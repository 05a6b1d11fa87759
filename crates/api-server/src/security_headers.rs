use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Adds the baseline security headers to every response.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // scores change on every refresh
    headers.insert("cache-control", HeaderValue::from_static("no-store"));

    response
}
