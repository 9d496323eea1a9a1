//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → node_map() seeds the node registry once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the node set never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use schema::AppConfig;
pub use schema::HealthCheckConfig;
pub use schema::NodeConfig;
pub use schema::ObservabilityConfig;
pub use schema::RateLimitConfig;
pub use schema::ServerConfig;
