//! The git HTTP route table.
//!
//! Patterns overlap (the generic `objects/info/*` entry also matches
//! `objects/info/packs`), so the table is an ordered list and the first
//! match wins. Every pattern captures the repository prefix in group 1.

use axum::http::Method;
use gitgate_git::Service;
use once_cell::sync::Lazy;
use regex::Regex;

/// Which handler serves a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Stateless RPC (`git-upload-pack` / `git-receive-pack`).
    ServiceRpc,
    /// Ref advertisement, smart or dumb.
    InfoRefs,
    /// Plain text file that must not be cached.
    TextFile,
    /// `objects/info/packs`.
    InfoPacks,
    /// Loose object.
    LooseObject,
    /// Pack file.
    PackFile,
    /// Pack index.
    IdxFile,
}

/// A route table entry.
#[derive(Debug)]
pub struct Route {
    /// Path pattern; group 1 is the repository prefix.
    pub pattern: Regex,
    /// Required HTTP method.
    pub method: Method,
    /// Bound handler.
    pub handler: Handler,
    /// Pack service for RPC routes.
    pub service: Option<Service>,
}

impl Route {
    fn new(pattern: &str, method: Method, handler: Handler, service: Option<Service>) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("Invalid regex"),
            method,
            handler,
            service,
        }
    }
}

/// Result of matching a path against the table.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a> {
    /// The matched route.
    pub route: &'a Route,
    /// Everything before the git-specific suffix.
    pub repo: &'a str,
}

/// Routes, most specific first.
pub static ROUTES: Lazy<Vec<Route>> = Lazy::new(|| {
    vec![
        Route::new(
            r"^(.*?)/git-upload-pack$",
            Method::POST,
            Handler::ServiceRpc,
            Some(Service::UploadPack),
        ),
        Route::new(
            r"^(.*?)/git-receive-pack$",
            Method::POST,
            Handler::ServiceRpc,
            Some(Service::ReceivePack),
        ),
        Route::new(r"^(.*?)/info/refs$", Method::GET, Handler::InfoRefs, None),
        Route::new(r"^(.*?)/HEAD$", Method::GET, Handler::TextFile, None),
        Route::new(
            r"^(.*?)/objects/info/alternates$",
            Method::GET,
            Handler::TextFile,
            None,
        ),
        Route::new(
            r"^(.*?)/objects/info/http-alternates$",
            Method::GET,
            Handler::TextFile,
            None,
        ),
        Route::new(
            r"^(.*?)/objects/info/packs$",
            Method::GET,
            Handler::InfoPacks,
            None,
        ),
        Route::new(
            r"^(.*?)/objects/info/[^/]*$",
            Method::GET,
            Handler::TextFile,
            None,
        ),
        Route::new(
            r"^(.*?)/objects/[0-9a-f]{2}/[0-9a-f]{38}$",
            Method::GET,
            Handler::LooseObject,
            None,
        ),
        Route::new(
            r"^(.*?)/objects/pack/pack-[0-9a-f]{40}\.pack$",
            Method::GET,
            Handler::PackFile,
            None,
        ),
        Route::new(
            r"^(.*?)/objects/pack/pack-[0-9a-f]{40}\.idx$",
            Method::GET,
            Handler::IdxFile,
            None,
        ),
    ]
});

/// Finds the first route matching `path`.
pub fn match_route(path: &str) -> Option<RouteMatch<'_>> {
    ROUTES.iter().find_map(|route| {
        let captures = route.pattern.captures(path)?;
        let repo = captures.get(1).map_or("", |m| m.as_str());
        Some(RouteMatch { route, repo })
    })
}

/// Path of the requested file relative to the repository directory.
pub fn residual_path(path: &str, repo: &str) -> String {
    path.replacen(&format!("{repo}/"), "", 1)
}
