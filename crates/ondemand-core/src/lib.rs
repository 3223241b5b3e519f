pub mod config;
pub mod types;

pub use config::{ConfigError, OndemandConfig, ProviderKind};
pub use types::*;
