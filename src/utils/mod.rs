//! Configuration utilities
//!
//! - [`toml_config`]: `molecule-insight.toml` loading, validation and the
//!   shared [`ConfigManager`](toml_config::ConfigManager)

pub mod toml_config;
