//! Static repository files for the dumb protocol.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use super::RequestContext;
use crate::api::ApiError;
use crate::headers::CachePolicy;

/// Content type of plain text repository files.
pub const TEXT_PLAIN: &str = "text/plain";

/// Content type of generated ref and pack lists.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Serves `ctx.file` from the repository directory.
///
/// Range and conditional requests are answered with 206 and 304, which is
/// what lets an interrupted dumb-protocol pack download resume.
pub async fn send_file(
    ctx: RequestContext,
    content_type: &'static str,
    policy: CachePolicy,
) -> Result<Response, ApiError> {
    let RequestContext {
        request, dir, file, ..
    } = ctx;
    let path = dir.join(&file);

    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => {
            debug!(path = %path.display(), size = metadata.len(), "Sending file");
        }
        _ => return Err(ApiError::FileNotFound(path)),
    }

    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});

    if response.status() == StatusCode::NOT_FOUND {
        return Err(ApiError::FileNotFound(path));
    }

    let mut response = response.map(Body::new);
    let headers = response.headers_mut();
    policy.apply(headers);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

    Ok(response)
}
