//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → Messenger::connect / IntelchainClient::from_config
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → apply_config_updates reconfigures the Messenger
//! ```
//!
//! # Design Decisions
//! - Every field has a default except the shard list
//! - Validation separates syntactic (serde) from semantic checks
//! - An invalid reload is logged and dropped; the running config stays

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ChainConfig, ClientConfig, ConfirmationConfig, ObservabilityConfig, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::{apply_config_updates, ConfigWatcher};
