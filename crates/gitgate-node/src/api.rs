//! HTTP entry point for the gateway.
//!
//! A single catch-all handler matches each request against the ordered
//! route table, checks the method, resolves the repository and hands a
//! [`RequestContext`] to the bound protocol handler.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, Version},
    response::{IntoResponse, Response},
    Router,
};
use gitgate_git::Service;
use percent_encoding::percent_decode_str;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::bridge::{BridgeError, DefaultHookEnvironment, GitBackend, GitCommand, HookEnvironment};
use crate::config::Config;
use crate::handlers::{self, RequestContext};
use crate::observability::request_id_middleware;
use crate::resolver::{RepoResolver, ResolveError};
use crate::routes::{match_route, residual_path};

/// Request header carrying the client's protocol version hint.
pub const GIT_PROTOCOL_HEADER: &str = "git-protocol";

/// Application state shared across requests. Read-only once built.
#[derive(Clone)]
pub struct AppState {
    /// Gateway configuration.
    pub config: Arc<Config>,
    /// Repository resolver rooted at `config.project_root`.
    pub resolver: RepoResolver,
    /// Runs git.
    pub backend: Arc<dyn GitBackend>,
    /// Environment added to push operations.
    pub hooks: Arc<dyn HookEnvironment>,
}

impl AppState {
    /// Creates state that shells out to the configured git executable.
    pub fn new(config: Config) -> Self {
        let backend = Arc::new(GitCommand::new(config.git_bin_path.clone()));
        Self {
            resolver: RepoResolver::new(config.project_root.clone()),
            config: Arc::new(config),
            backend,
            hooks: Arc::new(DefaultHookEnvironment),
        }
    }

    /// Replaces the git backend.
    pub fn with_backend(mut self, backend: Arc<dyn GitBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Replaces the push hook environment.
    pub fn with_hooks(mut self, hooks: Arc<dyn HookEnvironment>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Whether `service` is enabled in the configuration.
    pub fn service_enabled(&self, service: Service) -> bool {
        match service {
            Service::UploadPack => self.config.upload_pack,
            Service::ReceivePack => self.config.receive_pack,
        }
    }
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no route for {0}")]
    RouteNotFound(String),
    #[error("method not allowed")]
    MethodNotAllowed { version: Version },
    #[error(transparent)]
    RepoNotFound(#[from] ResolveError),
    #[error("service disabled: {0}")]
    ServiceDisabled(Service),
    #[error("content type mismatch, expected {expected}")]
    ContentTypeMismatch { expected: String },
    #[error("failed to decode request body: {0}")]
    Decompression(#[source] io::Error),
    #[error("{operation} failed: {source}")]
    Subprocess {
        operation: &'static str,
        #[source]
        source: BridgeError,
    },
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::RouteNotFound(_) | ApiError::RepoNotFound(_) | ApiError::FileNotFound(_) => {
                (StatusCode::NOT_FOUND, "Not Found")
            }
            ApiError::MethodNotAllowed { version } if *version == Version::HTTP_11 => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
            }
            ApiError::MethodNotAllowed { .. } => (StatusCode::BAD_REQUEST, "Bad Request"),
            ApiError::ServiceDisabled(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::ContentTypeMismatch { .. } => (StatusCode::UNAUTHORIZED, ""),
            ApiError::Decompression(_) | ApiError::Subprocess { .. } | ApiError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "")
            }
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Body::from(body)).into_response()
    }
}

/// Creates the gateway router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Catch-all handler.
async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_string(), |ConnectInfo(addr)| addr.to_string());
    info!(
        remote = %remote,
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
        "Inbound request"
    );

    route_request(&state, request)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn route_request(state: &AppState, request: Request) -> Result<Response, ApiError> {
    let raw_path = request.uri().path();
    let full_path =
        decode_path(raw_path).ok_or_else(|| ApiError::RouteNotFound(raw_path.to_string()))?;
    let path = strip_route_prefix(&state.config.route_prefix, &full_path)
        .ok_or_else(|| ApiError::RouteNotFound(full_path.clone()))?;

    let matched = match_route(path).ok_or_else(|| ApiError::RouteNotFound(path.to_string()))?;

    if request.method() != matched.route.method {
        return Err(ApiError::MethodNotAllowed {
            version: request.version(),
        });
    }

    let dir = state.resolver.resolve(matched.repo).await?;
    let file = residual_path(path, matched.repo);

    let ctx = RequestContext {
        request,
        service: matched.route.service,
        dir,
        file,
    };
    handlers::handle(state, matched.route.handler, ctx).await
}

/// Percent-decodes the request path. Paths that do not decode to UTF-8 match
/// no route.
fn decode_path(path: &str) -> Option<String> {
    percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn strip_route_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    path.strip_prefix(prefix)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
}
