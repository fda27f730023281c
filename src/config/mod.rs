//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BlogConfig (validated, immutable)
//!     → shared via Arc to handlers and middleware
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BlogConfig;
pub use schema::ListenerConfig;
pub use schema::{ObservabilityConfig, SameSite, SecurityConfig, SessionConfig, StorageConfig, TimeoutConfig};
pub use validation::{validate_config, ValidationError};
