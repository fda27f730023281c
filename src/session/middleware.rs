//! Session lookup middleware.
//!
//! Reads the session cookie, resolves it against the [`SessionStore`] and
//! attaches a [`Session`] to the request so handlers can tell who is signed in.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::db::UserRecord;
use crate::session::store::{is_well_formed_session_id, SessionStore};

/// Session context attached to every request.
#[derive(Clone, Debug, Default)]
pub struct Session {
    id: Option<String>,
    user: Option<UserRecord>,
}

impl Session {
    /// The id presented by the client, if it named a live session.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }
}

pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let session = match store.cookie().find_in(req.headers()) {
        Some(id) if is_well_formed_session_id(id) => match store.get(id) {
            Some(user) => Session {
                id: Some(id.to_string()),
                user: Some(user),
            },
            None => Session::default(),
        },
        Some(_) => {
            tracing::debug!("Ignoring malformed session cookie");
            Session::default()
        }
        None => Session::default(),
    };

    req.extensions_mut().insert(session);
    next.run(req).await
}
