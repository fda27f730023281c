//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges, address formats and
//! cross-field constraints. Every violation is reported, not just the first.

use std::net::SocketAddr;

use crate::config::schema::BlogConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BlogConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.storage.public_dir.trim().is_empty() {
        errors.push(ValidationError::new("storage.public_dir", "must not be empty"));
    }
    if config.storage.uploads_dir.trim().is_empty() {
        errors.push(ValidationError::new("storage.uploads_dir", "must not be empty"));
    }

    let cookie = &config.session.cookie_name;
    if cookie.is_empty() {
        errors.push(ValidationError::new("session.cookie_name", "must not be empty"));
    } else if !cookie.bytes().all(is_cookie_token_byte) {
        errors.push(ValidationError::new(
            "session.cookie_name",
            format!("'{}' contains characters not allowed in a cookie name", cookie),
        ));
    }
    if config.session.idle_timeout_secs == 0 {
        errors.push(ValidationError::new("session.idle_timeout_secs", "must be greater than 0"));
    }
    if config.session.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("session.sweep_interval_secs", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let security = &config.security;
    if security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }
    if security.max_upload_size == 0 || security.max_upload_size > security.max_body_size {
        errors.push(ValidationError::new(
            "security.max_upload_size",
            "must be greater than 0 and not exceed max_body_size",
        ));
    }
    if security.allowed_image_extensions.is_empty() {
        errors.push(ValidationError::new(
            "security.allowed_image_extensions",
            "must list at least one extension",
        ));
    }
    for ext in &security.allowed_image_extensions {
        if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
            errors.push(ValidationError::new(
                "security.allowed_image_extensions",
                format!("'{}' must be a bare alphanumeric extension", ext),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// RFC 6265 token characters.
fn is_cookie_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
