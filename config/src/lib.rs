/// Base Config
pub mod base;
pub use base::*;

/// Core Config
pub mod config;
pub use crate::config::*;

/// Cli Config
pub mod cli;
pub use cli::*;

/// Generic Config Types
pub mod types;
pub use types::*;
