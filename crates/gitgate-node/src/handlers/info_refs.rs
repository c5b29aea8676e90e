//! `GET info/refs`: ref advertisement.

use axum::body::Body;
use axum::http::{header, HeaderValue, Uri};
use axum::response::Response;
use bytes::BytesMut;
use gitgate_git::Service;
use tracing::{debug, warn};

use super::{send_file, RequestContext, TEXT_PLAIN_UTF8};
use crate::api::{ApiError, AppState, GIT_PROTOCOL_HEADER};
use crate::bridge::Invocation;
use crate::headers::CachePolicy;

/// Serves the smart advertisement when `?service=git-<name>` names a known
/// service, otherwise the static `info/refs` file.
pub async fn get_info_refs(state: &AppState, ctx: RequestContext) -> Result<Response, ApiError> {
    let service = requested_service(ctx.request.uri());
    let Some(service) = service else {
        return dumb_info_refs(state, ctx).await;
    };

    if !state.service_enabled(service) {
        return Err(ApiError::ServiceDisabled(service));
    }

    let protocol = ctx
        .request
        .headers()
        .get(GIT_PROTOCOL_HEADER)
        .and_then(|v| v.to_str().ok());
    let invocation = Invocation::advertise_refs(&ctx.dir, service).with_protocol(protocol);

    let refs = state
        .backend
        .run(invocation)
        .await
        .map_err(|source| ApiError::Subprocess {
            operation: "advertise-refs",
            source,
        })?;

    let preamble = service.advertisement_preamble();
    let mut body = BytesMut::with_capacity(preamble.len() + refs.len());
    body.extend_from_slice(&preamble);
    body.extend_from_slice(&refs);

    let mut response = Response::new(Body::from(body.freeze()));
    let headers = response.headers_mut();
    CachePolicy::NoCache.apply(headers);
    if let Ok(value) = HeaderValue::from_str(&service.advertisement_content_type()) {
        headers.insert(header::CONTENT_TYPE, value);
    }

    Ok(response)
}

async fn dumb_info_refs(state: &AppState, ctx: RequestContext) -> Result<Response, ApiError> {
    let invocation = Invocation::update_server_info(&ctx.dir);
    debug!(dir = %ctx.dir.display(), "Updating server info");
    if let Err(e) = state.backend.run(invocation).await {
        warn!(dir = %ctx.dir.display(), error = %e, "update-server-info failed");
    }

    send_file(ctx, TEXT_PLAIN_UTF8, CachePolicy::NoCache).await
}

/// The first `service` query parameter decides, as for an HTML form.
fn requested_service(uri: &Uri) -> Option<Service> {
    let query = uri.query()?;
    let (_, value) = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "service")?;
    Service::from_query(&value)
}
