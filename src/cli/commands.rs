//! Command implementations for CLI operations

use anyhow::{Context, Result};
use tracing::info;

use crate::writer::IndexWriter;

use super::db_utils::{database_path, open_existing_database};

/// Show statistics for a database
pub fn status_command(path: &str) -> Result<()> {
    let db_path = database_path(path);
    let mut writer = open_existing_database(&db_path)?;

    let stats = writer
        .database()
        .context("Database is not open")?
        .get_stats()?;

    println!("symdb Index Status");
    println!("==================");
    println!("Database: {}", db_path.display());
    match stats.version {
        Some(version) => println!("Storage version: {}", version),
        None => println!("Storage version: unknown"),
    }
    println!("Files: {}", stats.total_files);
    println!("Symbols: {}", stats.total_symbols);
    println!("References: {}", stats.total_references);
    println!("Locations: {}", stats.total_locations);
    if stats.total_errors > 0 {
        println!("Errors: {}", stats.total_errors);
    }
    println!("Size: {:.2} KB", stats.db_size_bytes as f64 / 1024.0);

    if !stats.symbol_kinds.is_empty() {
        println!("\nSymbol Kinds:");
        for (kind, count) in &stats.symbol_kinds {
            println!("  {}: {}", kind.as_str(), count);
        }
    }

    writer.close()?;
    Ok(())
}

/// Remove every recorded fact from a database
pub fn clear_command(path: &str) -> Result<()> {
    let db_path = database_path(path);
    let mut writer = open_existing_database(&db_path)?;
    writer.clear()?;
    writer.close()?;

    info!("Cleared {}", db_path.display());
    println!("Cleared {}", db_path.display());
    Ok(())
}

/// Compact a database file
pub fn optimize_command(path: &str) -> Result<()> {
    let db_path = database_path(path);
    let mut writer = open_existing_database(&db_path)?;
    writer.optimize_database_memory()?;
    writer.close()?;

    println!("Optimized {}", db_path.display());
    Ok(())
}

/// Print the crate and storage versions
pub fn version_command() {
    println!("symdb {}", env!("CARGO_PKG_VERSION"));
    println!("Interface version: {}", IndexWriter::version_string());
    println!(
        "Supported database version: {}",
        IndexWriter::supported_database_version()
    );
}
