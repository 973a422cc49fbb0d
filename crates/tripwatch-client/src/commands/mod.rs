//! Subcommand implementations.

pub mod booking;
pub mod config;
pub mod inspect;
pub mod run;
