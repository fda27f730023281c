//! Session cookie parsing and formatting.

use axum::http::{header, HeaderMap};

use crate::config::{SameSite, SessionConfig};

/// How the session cookie is named and flagged.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl CookieSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            http_only: config.http_only,
            same_site: config.same_site,
        }
    }

    /// Value of this cookie in the request's `Cookie` headers, if present and non-empty.
    pub fn find_in<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.name && !value.is_empty())
            .map(|(_, value)| value.trim_matches('"'))
    }

    /// `Set-Cookie` value issuing `session_id`.
    pub fn issue(&self, session_id: &str) -> String {
        self.render(session_id, None)
    }

    /// `Set-Cookie` value that makes the browser drop the cookie.
    pub fn clear(&self) -> String {
        self.render("", Some(0))
    }

    fn render(&self, value: &str, max_age: Option<u64>) -> String {
        let mut cookie = format!("{}={}; Path=/", self.name, value);
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site.as_str());
        if self.same_site == SameSite::None {
            // Browsers drop SameSite=None cookies that are not Secure.
            cookie.push_str("; Secure");
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie
    }
}
