//! Shared types, error model, and configuration for deepresearch.
//!
//! This crate is the foundation depended on by all other deepresearch crates.
//! It provides:
//! - [`ResearchError`] — the unified error type
//! - Domain types ([`RunId`], [`GenerateOptions`])
//! - Configuration ([`AppConfig`], resolved [`SearchSettings`] / [`ModelSettings`])

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EnvConfig, ModelConfig, ModelSettings, ResolvedConfig, SearchConfig,
    SearchSettings, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ResearchError, Result};
pub use types::{GenerateOptions, RunId};
