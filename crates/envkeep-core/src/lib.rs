//! # envkeep-core
//!
//! Shared building blocks for envkeep:
//!
//! - **Configuration**: caller context (project, backend, key) from file and environment
//! - **Secrets**: [`SecretString`], a zeroizing, redacting plaintext holder
//! - **Utilities**: path resolution and `.env` parsing

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;

pub use config::{BackendDriver, Config, GLOBAL_PROJECT};
pub use error::{ConfigError, Result};
pub use secret::SecretString;
