//! # Observability Module
//!
//! - **Structured Logging**: pretty or JSON logs through `tracing-subscriber`
//! - **Request Tracing**: a request ID on every request span and response
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gitgate_node::observability::{init_logging, request_id_middleware, LogFormat};
//!
//! init_logging("info", LogFormat::Pretty);
//! let app: axum::Router<()> =
//!     axum::Router::new().layer(axum::middleware::from_fn(request_id_middleware));
//! ```

mod logging;
pub mod middleware;

pub use logging::{init_logging, LogFormat};
pub use middleware::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
