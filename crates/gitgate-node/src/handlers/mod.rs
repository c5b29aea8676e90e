//! Per-route protocol handlers.

pub mod body;
mod files;
mod info_refs;
mod rpc;

use axum::extract::Request;
use axum::response::Response;
use gitgate_git::Service;
use std::path::PathBuf;

use crate::api::{ApiError, AppState};
use crate::headers::CachePolicy;
use crate::routes::Handler;

pub use files::{send_file, TEXT_PLAIN, TEXT_PLAIN_UTF8};

/// Everything a handler needs about one request.
///
/// Built by the dispatcher once the route and repository are known, and
/// consumed by the handler.
#[derive(Debug)]
pub struct RequestContext {
    /// The incoming request.
    pub request: Request,
    /// Pack service bound to the route, if any.
    pub service: Option<Service>,
    /// Resolved repository directory.
    pub dir: PathBuf,
    /// Requested path relative to `dir`.
    pub file: String,
}

/// Runs the handler bound to a route.
pub async fn handle(
    state: &AppState,
    handler: Handler,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    match handler {
        Handler::ServiceRpc => rpc::service_rpc(state, ctx).await,
        Handler::InfoRefs => info_refs::get_info_refs(state, ctx).await,
        Handler::TextFile => send_file(ctx, TEXT_PLAIN, CachePolicy::NoCache).await,
        Handler::InfoPacks => send_file(ctx, TEXT_PLAIN_UTF8, CachePolicy::Forever).await,
        Handler::LooseObject => {
            send_file(ctx, "application/x-git-loose-object", CachePolicy::Forever).await
        }
        Handler::PackFile => {
            send_file(ctx, "application/x-git-packed-objects", CachePolicy::Forever).await
        }
        Handler::IdxFile => {
            send_file(
                ctx,
                "application/x-git-packed-objects-toc",
                CachePolicy::Forever,
            )
            .await
        }
    }
}
