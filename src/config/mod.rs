//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into ProxyPolicy / transport / listener at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps its Arc<ProxyPolicy>
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Reload never touches the default target set through the control plane

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ControlConfig, HeadersConfig, InterceptConfig, ListenerConfig, ObservabilityConfig,
    PoolConfig, ProxyConfig, RoutingConfig, TargetConfig, TimeoutConfig,
};
pub use validation::ValidationError;
