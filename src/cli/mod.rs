//! CLI module
//!
//! Command-line interface on top of [`crate::HydraConnector`].
//!
//! # Commands
//!
//! - `login` / `logout` - Manage a Hydra session
//! - `projects`, `project`, `jobset`, `evals`, `eval`, `build` - Query entities
//! - `modify-*` / `delete-*` - Create, update and delete projects and jobsets
//! - `build-product`, `raw-log`, `reproduce` - Download build artifacts
//! - `queue`, `status`, `clear-*` - Queue inspection and administration

mod commands;
mod render;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, SettingsSource};
pub use runner::{load_settings, Runner};
