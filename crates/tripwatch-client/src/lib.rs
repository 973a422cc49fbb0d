//! CLI, configuration and daemon wiring
//!
//! This crate provides the `tripwatch` command-line interface.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
#[cfg(test)]
mod testing;

pub use app::App;
pub use cli::Cli;
pub use error::{ClientError, ClientResult};
