//! Blog backend with a hardened input-handling layer.
//!
//! User values reach the database only as bound statement parameters,
//! user-authored text is HTML-escaped on the way out, files are served only
//! from inside their directory, and sessions are opaque random ids held in
//! memory.

pub mod api;
pub mod config;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod session;

pub use config::BlogConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
