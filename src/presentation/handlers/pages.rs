use axum::{http::HeaderMap, response::Html};

use crate::presentation::middleware::{
    error::AppError, locale::LOCALE_HEADER, security::NONCE_HEADER,
};

fn forwarded<'a>(headers: &'a HeaderMap, name: &axum::http::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Localized page shell.
///
/// Inline scripts carry the nonce forwarded by the edge pipeline, so they
/// satisfy the response's Content-Security-Policy.
pub async fn render_page(headers: HeaderMap) -> Result<Html<String>, AppError> {
    let nonce = forwarded(&headers, &NONCE_HEADER).ok_or_else(|| AppError::Internal {
        message: "Page requested without an edge nonce".to_string(),
    })?;
    let locale = forwarded(&headers, &LOCALE_HEADER).unwrap_or("en");

    Ok(Html(format!(
        "<!doctype html>\
         <html lang=\"{locale}\">\
         <head><meta charset=\"utf-8\"><title>Edge Gateway</title>\
         <script nonce=\"{nonce}\">window.__LOCALE__ = \"{locale}\";</script></head>\
         <body><main id=\"app\"></main></body>\
         </html>"
    )))
}

/// Fallback for unmatched paths
pub async fn page_not_found() -> AppError {
    AppError::NotFound { resource: "page".to_string() }
}
