//! CLI command implementations
//!
//! Handles all command-line interface operations:
//! - status: Show index statistics
//! - clear: Remove every recorded fact
//! - optimize: Compact the database file

mod commands;
mod db_utils;

pub use commands::*;
pub use db_utils::*;
