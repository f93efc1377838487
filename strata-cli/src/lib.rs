//! Strata CLI - Command-line interface for the Strata multi-tenancy
//! toolkit.
//!
//! Provides the `strata` binary for per-schema migrations, dynamic
//! tenant management, host resolution, and store repair.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
