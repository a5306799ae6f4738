use super::errors::ServerError;
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

/// Page handlers return bare strings; serve those as HTML. Responses that
/// already declare a content type other than plain text (JSON from the API
/// routes) are left alone.
pub async fn html_headers<B>(
    request: Request<B>,
    next: Next<B>,
) -> Result<Response, ServerError> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    let is_plain = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(true, |v| v.starts_with("text/plain"));
    if is_plain {
        headers.insert(CONTENT_TYPE, HeaderValue::from_str("text/html")?);
    }

    Ok(response)
}
