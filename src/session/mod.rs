//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie: sessionId=<id>
//!     → middleware.rs (parse cookie, look up id)
//!     → store.rs (DashMap<id, user>, idle expiry)
//!     → Session extension on the request
//!
//! Login:  store.rotate(old id) → new id → Set-Cookie
//! Logout: store.remove(id) → clearing Set-Cookie
//! ```
//!
//! # Design Decisions
//! - Ids are opaque random strings; nothing is derived from user data
//! - A new id is issued on every login (no fixation)
//! - Malformed or unknown cookies yield an anonymous session

pub mod cookie;
pub mod middleware;
pub mod store;

pub use cookie::CookieSettings;
pub use middleware::{session_middleware, Session};
pub use store::{generate_session_id, SessionStore};
