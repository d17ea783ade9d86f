//! Terminal display utilities for the CLI.
//!
//! Provides styled tables and themed status lines.

pub mod tables;
pub mod theme;

pub use tables::{create_cluster_table, create_failure_table, create_results_table};
pub use theme::{THEME, Theme};
