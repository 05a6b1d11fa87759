use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_FORWARDED_LEN: usize = 128;

#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Caller-supplied id when it is usable, a fresh UUID v4 otherwise
fn resolve_request_id(headers: &HeaderMap) -> String {
    match headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(id) if !id.is_empty() && id.len() <= MAX_FORWARDED_LEN => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

/// Tags the trace span, the handler extensions and the response with one id.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = resolve_request_id(request.headers());
    tracing::Span::current().record("request_id", id.as_str());
    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
