//! # Gitgate Node
//!
//! Serves git repositories over HTTP using both the smart protocol
//! (`git upload-pack` / `git receive-pack` run as stateless RPC) and the dumb
//! protocol (static repository files).
//!
//! ## Architecture
//!
//! ```text
//! request ──► dispatcher ──► route table ──► resolver ──► handler
//!                                                          │
//!                 ┌────────────────────────────────────────┤
//!                 ▼                   ▼                    ▼
//!           header policy      pkt-line codec      subprocess bridge ──► git
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cargo run --bin gitgate-node -- --project-root /srv/git --listen-addr 127.0.0.1:8600
//! git clone http://127.0.0.1:8600/project.git
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Router, dispatcher and error mapping
//! - [`routes`] - Ordered route table
//! - [`resolver`] - Repository path resolution
//! - [`handlers`] - Ref advertisement, RPC and static file handlers
//! - [`bridge`] - Running the git executable
//! - [`headers`] - Cache header policies
//! - [`config`] - Gateway configuration
//! - [`observability`] - Logging and request IDs
//!
//! ## Example: Building a Router
//!
//! ```rust,no_run
//! use gitgate_node::api::{create_router, AppState};
//! use gitgate_node::config::Config;
//!
//! let state = AppState::new(Config::with_project_root("/srv/git"));
//! let app = create_router(state);
//! ```

pub mod api;
pub mod bridge;
pub mod config;
pub mod handlers;
pub mod headers;
pub mod observability;
pub mod resolver;
pub mod routes;
