//! `POST git-upload-pack` / `POST git-receive-pack`: stateless RPC.
//!
//! The status line is committed by the first byte of subprocess output.
//! Until then a failure becomes a 500; afterwards it can only be logged.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use bytes::Bytes;
use futures::{future, stream, StreamExt, TryStreamExt};
use gitgate_git::Service;
use std::io;
use tracing::{debug, error, warn};

use super::{body, RequestContext};
use crate::api::{ApiError, AppState, GIT_PROTOCOL_HEADER};
use crate::bridge::{BridgeError, Invocation, RpcProcess};
use crate::headers::CachePolicy;

/// Streams the request body through `git <service> --stateless-rpc`.
pub async fn service_rpc(state: &AppState, ctx: RequestContext) -> Result<Response, ApiError> {
    let RequestContext {
        request,
        service,
        dir,
        file,
    } = ctx;
    let service = service.ok_or(ApiError::RouteNotFound(file))?;

    if !state.service_enabled(service) {
        return Err(ApiError::ServiceDisabled(service));
    }

    let (parts, request_body) = request.into_parts();

    let expected = service.request_content_type();
    if header_str(&parts.headers, header::CONTENT_TYPE.as_str()) != Some(expected.as_str()) {
        return Err(ApiError::ContentTypeMismatch { expected });
    }

    let gzip = header_str(&parts.headers, header::CONTENT_ENCODING.as_str()) == Some("gzip");
    let stdin = body::request_stream(request_body, gzip)
        .await
        .map_err(ApiError::Decompression)?;

    let mut invocation = Invocation::stateless_rpc(&dir, service)
        .with_protocol(header_str(&parts.headers, GIT_PROTOCOL_HEADER));
    if service == Service::ReceivePack {
        invocation = invocation.with_envs(state.hooks.envs());
    }

    let subprocess = |source| ApiError::Subprocess {
        operation: service.name(),
        source,
    };

    let RpcProcess { mut stdout, exit } = state.backend.spawn(invocation, stdin).map_err(subprocess)?;

    let first = match stdout.next().await {
        Some(Ok(chunk)) => chunk,
        Some(Err(e)) => {
            let source = exit.await.err().unwrap_or(BridgeError::Io(e));
            return Err(subprocess(source));
        }
        None => {
            exit.await.map_err(subprocess)?;
            debug!(service = %service, dir = %dir.display(), "RPC finished without output");
            return Ok(rpc_response(service, Body::empty()));
        }
    };

    debug!(service = %service, dir = %dir.display(), "RPC output started");

    let rest = stdout.inspect_err(move |e| {
        warn!(service = %service, error = %e, "RPC output interrupted");
    });
    let trailer = stream::once(async move {
        if let Err(e) = exit.await {
            // The status line is already on the wire.
            error!(service = %service, error = %e, "RPC failed after response started");
        }
        None::<io::Result<Bytes>>
    })
    .filter_map(future::ready);

    let output = stream::once(future::ready(Ok::<_, io::Error>(first)))
        .chain(rest)
        .chain(trailer);

    Ok(rpc_response(service, Body::from_stream(output)))
}

fn rpc_response(service: Service, body: Body) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    CachePolicy::NoCache.apply(headers);
    if let Ok(value) = HeaderValue::from_str(&service.result_content_type()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
