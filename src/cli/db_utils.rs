//! Database path and opening utilities

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::writer::IndexWriter;

const DB_EXTENSION: &str = "srctrldb";

/// Resolve a command-line argument to a database path, adding the
/// `.srctrldb` extension when none is given
pub fn database_path(arg: &str) -> PathBuf {
    let path = PathBuf::from(arg);
    if path.extension().is_none() {
        path.with_extension(DB_EXTENSION)
    } else {
        path
    }
}

/// Fail unless a database file exists at `path`
pub fn require_database(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("No database found at {}", path.display());
    }
    Ok(())
}

/// Open an existing database for writing
pub fn open_existing_database(path: &Path) -> Result<IndexWriter> {
    require_database(path)?;
    let mut writer = IndexWriter::with_config(StorageConfig::default());
    writer
        .open(path)
        .with_context(|| format!("Could not open {}", path.display()))?;
    Ok(writer)
}
