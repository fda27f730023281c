//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the blog server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the blog server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BlogConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Directories for static assets and uploads.
    pub storage: StorageConfig,

    /// Session cookie and lifetime settings.
    pub session: SessionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Input-handling limits and response hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Filesystem locations served by the file routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the static front end.
    pub public_dir: String,

    /// Directory receiving uploaded images.
    pub uploads_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_dir: "public".to_string(),
            uploads_dir: "uploads".to_string(),
        }
    }
}

/// SameSite attribute for the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the session id.
    pub cookie_name: String,

    /// Mark the cookie HttpOnly so page scripts cannot read it.
    pub http_only: bool,

    /// SameSite attribute.
    pub same_site: SameSite,

    /// Sessions idle longer than this are dropped.
    pub idle_timeout_secs: u64,

    /// How often the background sweeper purges idle sessions.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sessionId".to_string(),
            http_only: true,
            same_site: SameSite::Lax,
            idle_timeout_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub enable_headers: bool,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
    /// Maximum size of a single uploaded image in bytes.
    pub max_upload_size: usize,
    /// Lowercase extensions accepted for uploaded images.
    pub allowed_image_extensions: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
            max_upload_size: 5 * 1024 * 1024, // 5MB
            allowed_image_extensions: ["png", "jpg", "jpeg", "gif", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
