//! Input/Output handling for the CLI.
//!
//! This module provides:
//! - Exit codes scripts can branch on
//! - Query vector parsing for `semdex search`

pub mod exit_code;
pub mod input;

pub use exit_code::ExitCode;
pub use input::parse_vector;
