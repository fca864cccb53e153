//! Response-header layer applied to every route.
//!
//! Baseline security headers go on all responses. Anything served under
//! the static `/downloads/` tree additionally gets download-forcing
//! headers so browsers save the file instead of rendering it.

use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use crate::mime;

pub async fn security_headers(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    if let Some(filename) = static_download_filename(&path) {
        if let Some(mime) = mime::from_filename(filename) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
        }
        // Skip the disposition header rather than fail the response when a
        // filename doesn't form a valid header value.
        if let Ok(disposition) =
            HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        {
            headers.insert(header::CONTENT_DISPOSITION, disposition);
        }
        headers.insert("x-download-options", HeaderValue::from_static("noopen"));
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    }

    response
}

/// Trailing filename segment for paths under the static downloads tree.
fn static_download_filename(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/downloads/")?;
    rest.rsplit('/').next().filter(|f| !f.is_empty())
}
