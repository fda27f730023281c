//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (cap body size)
//!     → handler
//!         → path.rs (contain file names inside their base directory)
//!         → escape.rs (escape user text on the way out)
//!     → headers.rs (hardening response headers)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input; stored data is raw, output is escaped

pub mod escape;
pub mod headers;
pub mod limits;
pub mod path;

pub use escape::{escape_html, HtmlEscape};
pub use path::{is_safe_file, resolve_within, sanitize_upload_name, ContainedPath, PathError};
