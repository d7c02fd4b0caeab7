//! ---
//! fp_section: "01-core-functionality"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Configuration and logging shared across the workspace."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
//! Shared primitives for the Flowplane workspace.
//! This crate exposes configuration loading and logging utilities
//! consumed by the core, the API facade, and the CLI.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LabelConfig, LoadedAppConfig, LoggingConfig, PagingConfig, WatchConfig};
pub use logging::{init_tracing, LogFormat};
