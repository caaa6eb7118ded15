//! The recording API
//!
//! [`IndexWriter`] owns at most one open [`Database`] and exposes every
//! recording operation on it. Each call returns a typed [`Result`]; failures
//! are also kept as the handle's last error and taint an open transaction.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::db::schema::SUPPORTED_DATABASE_VERSION;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::name::NameHierarchy;
use crate::state::{TransactionState, WriterState};
use crate::types::{
    DefinitionKind, EdgeKind, FileMetadata, LocationKind, ReferenceKind, SourceRange, SymbolKind,
};

const PROJECT_FILE_EXTENSION: &str = "srctrlprj";

const PROJECT_FILE_CONTENT: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<config>
    <version>0</version>
</config>
"#;

/// Writer handle for a symbol index database
#[derive(Default)]
pub struct IndexWriter {
    config: StorageConfig,
    database: Option<Database>,
    database_path: Option<PathBuf>,
    state: WriterState,
}

impl IndexWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StorageConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// The only storage version this crate reads and writes
    pub fn supported_database_version() -> i32 {
        SUPPORTED_DATABASE_VERSION
    }

    /// `v<interface>.db<storage version>.p<patch>`
    pub fn version_string() -> String {
        format!(
            "v{}.db{}.p{}",
            env!("CARGO_PKG_VERSION_MAJOR"),
            SUPPORTED_DATABASE_VERSION,
            env!("CARGO_PKG_VERSION_PATCH")
        )
    }

    pub fn last_error(&self) -> &str {
        self.state.last_error()
    }

    pub fn clear_last_error(&mut self) {
        self.state.clear_last_error();
    }

    pub fn transaction_state(&self) -> &TransactionState {
        self.state.transaction()
    }

    /// Read access to the open database
    pub fn database(&self) -> Option<&Database> {
        self.database.as_ref()
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.database_path.as_deref()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open or create the database at `path`. A database that is already
    /// open on this handle is closed first.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let result = self.open_database(path.as_ref());
        self.lifecycle(result)
    }

    fn open_database(&mut self, path: &Path) -> Result<()> {
        if self.database.is_some() {
            self.close_database()?;
        }

        let database = Database::open(path, &self.config)?;
        self.database = Some(database);
        self.database_path = Some(path.to_path_buf());

        if self.config.create_project_file {
            let project_file = project_file_path(path);
            if !project_file.exists() {
                write_project_file(&project_file)?;
            }
        }
        Ok(())
    }

    /// Release the database. An open transaction is rolled back.
    pub fn close(&mut self) -> Result<()> {
        let result = self.close_database();
        self.lifecycle(result)
    }

    fn close_database(&mut self) -> Result<()> {
        let database = self
            .database
            .take()
            .ok_or(Error::NotOpen("close database"))?;

        if self.state.transaction().is_open() {
            warn!("Closing database with an open transaction, rolling back");
            self.state.finish()?;
            database.rollback()?;
        }
        database.close()?;

        if let Some(path) = self.database_path.take() {
            info!("Closed database {}", path.display());
        }
        Ok(())
    }

    /// Remove every recorded fact, keeping the database file
    pub fn clear(&mut self) -> Result<()> {
        let result = self.clear_database();
        self.lifecycle(result)
    }

    fn clear_database(&mut self) -> Result<()> {
        let database = self
            .database
            .as_ref()
            .ok_or(Error::NotOpen("clear database"))?;
        if self.state.transaction().is_open() {
            return Err(Error::TransactionState(
                "cannot clear the database while a transaction is open".to_string(),
            ));
        }
        database.clear_tables()?;

        if self.config.create_project_file {
            if let Some(ref path) = self.database_path {
                write_project_file(&project_file_path(path))?;
            }
        }
        Ok(())
    }

    /// True iff no file and no symbol has been recorded
    pub fn is_empty(&mut self) -> Result<bool> {
        let result = self.open_db("check if database is empty")
            .and_then(|db| db.is_empty());
        self.lifecycle(result)
    }

    pub fn is_compatible(&mut self) -> Result<bool> {
        let result = self
            .open_db("check database compatibility")
            .and_then(|db| db.is_compatible());
        self.lifecycle(result)
    }

    pub fn loaded_database_version(&mut self) -> Result<Option<i32>> {
        let result = self
            .open_db("read database version")
            .and_then(|db| db.loaded_database_version());
        self.lifecycle(result)
    }

    /// Compact the database file
    pub fn optimize_database_memory(&mut self) -> Result<()> {
        let result = self.optimize_database();
        self.lifecycle(result)
    }

    fn optimize_database(&self) -> Result<()> {
        let database = self.open_db("optimize database memory")?;
        if self.state.transaction().is_open() {
            return Err(Error::TransactionState(
                "cannot optimize the database while a transaction is open".to_string(),
            ));
        }
        database.optimize()?;
        info!("Optimized database");
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub fn begin_transaction(&mut self) -> Result<()> {
        let result = self.begin();
        self.lifecycle(result)
    }

    fn begin(&mut self) -> Result<()> {
        let database = self
            .database
            .as_ref()
            .ok_or(Error::NotOpen("begin transaction"))?;
        self.state.begin()?;
        if let Err(err) = database.begin_transaction() {
            self.state.finish()?;
            return Err(err);
        }
        debug!("Began transaction");
        Ok(())
    }

    /// Commit the open transaction. A transaction in which any recording call
    /// failed is rolled back instead and the first failure is reported.
    pub fn commit_transaction(&mut self) -> Result<()> {
        let result = self.commit();
        self.lifecycle(result)
    }

    fn commit(&mut self) -> Result<()> {
        let database = self
            .database
            .as_ref()
            .ok_or(Error::NotOpen("commit transaction"))?;

        match self.state.finish()? {
            TransactionState::Tainted { first_error } => {
                database.rollback()?;
                warn!("Rolled back transaction after failure: {}", first_error);
                Err(Error::TransactionState(format!(
                    "transaction rolled back because a recording call failed: {}",
                    first_error
                )))
            }
            _ => {
                if let Err(err) = database.commit() {
                    database.rollback()?;
                    return Err(err);
                }
                debug!("Committed transaction");
                Ok(())
            }
        }
    }

    /// Discard everything recorded since `begin_transaction`
    pub fn rollback_transaction(&mut self) -> Result<()> {
        let result = self.rollback();
        self.lifecycle(result)
    }

    fn rollback(&mut self) -> Result<()> {
        let database = self
            .database
            .as_ref()
            .ok_or(Error::NotOpen("rollback transaction"))?;
        self.state.finish()?;
        database.rollback()?;
        debug!("Rolled back transaction");
        Ok(())
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Record a source file by path. When the file exists on disk its
    /// modification time, line count and content hash are stored with it.
    pub fn record_file(&mut self, path: &str) -> Result<i64> {
        let store_content = self.config.store_file_content;
        self.record("record file", |db| {
            if path.is_empty() {
                return Err(Error::InvalidPath("file path is empty".to_string()));
            }
            if let Some(file) = db.get_file_by_path(path)? {
                return Ok(file.id);
            }
            let metadata = read_file_metadata(Path::new(path), store_content)?;
            db.add_file(path, &metadata)
        })
    }

    pub fn record_file_language(&mut self, file_id: i64, language: &str) -> Result<()> {
        self.record("record file language", |db| {
            db.set_file_language(file_id, language)
        })
    }

    // =========================================================================
    // Symbols
    // =========================================================================

    /// Record a symbol and every enclosing symbol of its name. Returns the
    /// id of the innermost one.
    pub fn record_symbol(&mut self, name: &NameHierarchy) -> Result<i64> {
        self.record("record symbol", |db| {
            name.validate()?;
            let mut parent_id = None;
            for ancestor in name.ancestry() {
                let id = db.add_node(&ancestor.encode()?)?;
                if let Some(parent) = parent_id {
                    db.add_edge(parent, id, EdgeKind::Member)?;
                }
                parent_id = Some(id);
            }
            let id = parent_id.ok_or_else(|| {
                Error::MalformedName("a name hierarchy needs at least one element".to_string())
            })?;
            debug!("Recorded symbol {} ({})", id, name.display_name());
            Ok(id)
        })
    }

    pub fn record_symbol_kind(&mut self, symbol_id: i64, kind: SymbolKind) -> Result<()> {
        self.record("record symbol kind", |db| db.set_node_kind(symbol_id, kind))
    }

    pub fn record_symbol_definition_kind(
        &mut self,
        symbol_id: i64,
        kind: DefinitionKind,
    ) -> Result<()> {
        self.record("record symbol definition kind", |db| {
            db.set_definition_kind(symbol_id, kind)
        })
    }

    /// Set the location of the symbol's name, replacing any previous one
    pub fn record_symbol_location(&mut self, symbol_id: i64, range: SourceRange) -> Result<()> {
        self.record("record symbol location", |db| {
            replace_symbol_location(db, symbol_id, &range, LocationKind::Token)
        })
    }

    /// Set the location of the symbol's body, replacing any previous one
    pub fn record_symbol_scope_location(
        &mut self,
        symbol_id: i64,
        range: SourceRange,
    ) -> Result<()> {
        self.record("record symbol scope location", |db| {
            replace_symbol_location(db, symbol_id, &range, LocationKind::Scope)
        })
    }

    /// Set the location of the symbol's signature, replacing any previous one
    pub fn record_symbol_signature_location(
        &mut self,
        symbol_id: i64,
        range: SourceRange,
    ) -> Result<()> {
        self.record("record symbol signature location", |db| {
            replace_symbol_location(db, symbol_id, &range, LocationKind::Signature)
        })
    }

    /// Add a location where the symbol is used as a qualifier
    pub fn record_qualifier_location(&mut self, symbol_id: i64, range: SourceRange) -> Result<()> {
        self.record("record qualifier location", |db| {
            require_symbol(db, symbol_id)?;
            require_range(db, &range)?;
            db.record_occurrence(symbol_id, &range, LocationKind::Qualifier)
        })
    }

    // =========================================================================
    // References
    // =========================================================================

    pub fn record_reference(
        &mut self,
        source_id: i64,
        target_id: i64,
        kind: ReferenceKind,
    ) -> Result<i64> {
        self.record("record reference", |db| {
            require_symbol(db, source_id)?;
            require_symbol(db, target_id)?;
            db.add_edge(source_id, target_id, EdgeKind::Reference(kind))
        })
    }

    /// Add an occurrence of the reference
    pub fn record_reference_location(
        &mut self,
        reference_id: i64,
        range: SourceRange,
    ) -> Result<()> {
        self.record("record reference location", |db| {
            if !db.reference_exists(reference_id)? {
                return Err(Error::UnknownReference(reference_id));
            }
            require_range(db, &range)?;
            db.record_occurrence(reference_id, &range, LocationKind::Reference)
        })
    }

    pub fn record_reference_is_ambiguous(&mut self, reference_id: i64) -> Result<()> {
        self.record("record reference is ambiguous", |db| {
            db.set_reference_ambiguous(reference_id)
        })
    }

    /// Record a reference whose target could not be resolved. All such
    /// references point at one shared placeholder symbol.
    pub fn record_reference_to_unsolved_symbol(
        &mut self,
        source_id: i64,
        kind: ReferenceKind,
        range: SourceRange,
    ) -> Result<i64> {
        self.record("record reference to unsolved symbol", |db| {
            require_symbol(db, source_id)?;
            require_range(db, &range)?;
            let target_id = db.add_unsolved_symbol()?;
            let reference_id = db.add_edge(source_id, target_id, EdgeKind::Reference(kind))?;
            db.record_occurrence(reference_id, &range, LocationKind::Unsolved)?;
            Ok(reference_id)
        })
    }

    // =========================================================================
    // Local Symbols, Ranges and Errors
    // =========================================================================

    pub fn record_local_symbol(&mut self, name: &str) -> Result<i64> {
        self.record("record local symbol", |db| {
            if name.is_empty() {
                return Err(Error::MalformedName(
                    "local symbol name is empty".to_string(),
                ));
            }
            db.add_local_symbol(name)
        })
    }

    pub fn record_local_symbol_location(
        &mut self,
        local_symbol_id: i64,
        range: SourceRange,
    ) -> Result<()> {
        self.record("record local symbol location", |db| {
            if !db.local_symbol_exists(local_symbol_id)? {
                return Err(Error::UnknownLocalSymbol(local_symbol_id));
            }
            require_range(db, &range)?;
            db.record_occurrence(local_symbol_id, &range, LocationKind::LocalSymbol)
        })
    }

    /// Mark a range that readers must never split, such as a multi-line
    /// string or comment
    pub fn record_atomic_source_range(&mut self, range: SourceRange) -> Result<()> {
        self.record("record atomic source range", |db| {
            require_range(db, &range)?;
            db.add_source_location(&range, LocationKind::Atomic)?;
            Ok(())
        })
    }

    /// Record an indexing error at a location. Returns the error's id.
    pub fn record_error(&mut self, message: &str, fatal: bool, range: SourceRange) -> Result<i64> {
        self.record("record error", |db| {
            require_range(db, &range)?;
            let error_id = db.add_error(message, fatal)?;
            db.record_occurrence(error_id, &range, LocationKind::Error)?;
            Ok(error_id)
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn open_db(&self, action: &'static str) -> Result<&Database> {
        self.database.as_ref().ok_or(Error::NotOpen(action))
    }

    /// Run a recording operation atomically against the open database
    fn record<T>(
        &mut self,
        action: &'static str,
        operation: impl FnOnce(&Database) -> Result<T>,
    ) -> Result<T> {
        let result = match self.database.as_ref() {
            Some(db) => db.atomically(|| operation(db)),
            None => Err(Error::NotOpen(action)),
        };
        if let Err(ref err) = result {
            debug!("Failed to {}: {}", action, err);
            self.state.record_failure(err);
        }
        result
    }

    fn lifecycle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref err) = result {
            self.state.set_last_error(err);
        }
        result
    }
}

fn require_symbol(db: &Database, symbol_id: i64) -> Result<()> {
    if !db.symbol_exists(symbol_id)? {
        return Err(Error::UnknownSymbol(symbol_id));
    }
    Ok(())
}

fn require_range(db: &Database, range: &SourceRange) -> Result<()> {
    range.validate()?;
    if !db.file_exists(range.file_id)? {
        return Err(Error::UnknownFile(range.file_id));
    }
    Ok(())
}

fn replace_symbol_location(
    db: &Database,
    symbol_id: i64,
    range: &SourceRange,
    kind: LocationKind,
) -> Result<()> {
    require_symbol(db, symbol_id)?;
    require_range(db, range)?;
    db.record_occurrence(symbol_id, range, kind)
}

/// Gather on-disk facts for a file. Paths that do not exist yield empty
/// metadata; existing files that cannot be read are an error.
fn read_file_metadata(path: &Path, store_content: bool) -> Result<FileMetadata> {
    if !path.is_file() {
        return Ok(FileMetadata::default());
    }

    let bytes = fs::read(path)?;
    let modification_time = fs::metadata(path)?
        .modified()
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let content_hash = hex::encode(hasher.finalize());

    let text = String::from_utf8_lossy(&bytes);
    let line_count = text.lines().count() as u32;

    Ok(FileMetadata {
        modification_time,
        line_count,
        content_hash: Some(content_hash),
        content: store_content.then(|| text.into_owned()),
    })
}

fn project_file_path(database_path: &Path) -> PathBuf {
    database_path.with_extension(PROJECT_FILE_EXTENSION)
}

fn write_project_file(path: &Path) -> Result<()> {
    fs::write(path, PROJECT_FILE_CONTENT)?;
    debug!("Wrote project file {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::NameElement;

    fn writer() -> (tempfile::TempDir, IndexWriter) {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = IndexWriter::new();
        writer.open(dir.path().join("test.srctrldb")).unwrap();
        (dir, writer)
    }

    fn name(parts: &[&str]) -> NameHierarchy {
        NameHierarchy::from_names(".", parts.iter().copied())
    }

    #[test]
    fn test_version_string() {
        let version = IndexWriter::version_string();
        assert!(version.starts_with('v'));
        assert!(version.contains(&format!(".db{}.", SUPPORTED_DATABASE_VERSION)));
        assert_eq!(IndexWriter::supported_database_version(), 25);
    }

    #[test]
    fn test_calls_without_database_fail_with_not_open() {
        let mut writer = IndexWriter::new();
        let err = writer.record_symbol(&name(&["a"])).unwrap_err();
        assert!(matches!(err, Error::NotOpen("record symbol")));
        assert_eq!(
            writer.last_error(),
            "Unable to record symbol, because no database is currently open."
        );
        assert!(matches!(writer.close(), Err(Error::NotOpen(_))));
        assert!(matches!(writer.is_empty(), Err(Error::NotOpen(_))));
    }

    #[test]
    fn test_record_symbol_interns_and_creates_parents() {
        let (_dir, mut writer) = writer();
        let child = writer.record_symbol(&name(&["MyType", "my_member"])).unwrap();
        let again = writer.record_symbol(&name(&["MyType", "my_member"])).unwrap();
        assert_eq!(child, again);

        let db = writer.database().unwrap();
        let parent = db.find_symbol(&name(&["MyType"])).unwrap().unwrap();
        assert_eq!(db.get_member_ids(parent.id).unwrap(), vec![child]);
        assert!(db.get_references().unwrap().is_empty());
    }

    #[test]
    fn test_record_symbol_rejects_malformed_name() {
        let (_dir, mut writer) = writer();
        let empty = NameHierarchy::new(".");
        assert!(matches!(
            writer.record_symbol(&empty),
            Err(Error::MalformedName(_))
        ));
        let reserved = NameHierarchy::new(".").push(NameElement::named("a\tnb"));
        assert!(matches!(
            writer.record_symbol(&reserved),
            Err(Error::MalformedName(_))
        ));
        assert!(writer.is_empty().unwrap());
    }

    #[test]
    fn test_record_file_interns_by_path() {
        let (dir, mut writer) = writer();
        let source = dir.path().join("a.py");
        fs::write(&source, "class MyType:\n    pass\n").unwrap();
        let path = source.to_string_lossy().to_string();

        let first = writer.record_file(&path).unwrap();
        let second = writer.record_file(&path).unwrap();
        assert_eq!(first, second);

        let file = writer.database().unwrap().get_file(first).unwrap().unwrap();
        assert_eq!(file.line_count, 2);
        assert_eq!(file.content_hash.as_ref().map(|h| h.len()), Some(64));
        assert!(file.modification_time > 0);
    }

    #[test]
    fn test_record_file_rejects_empty_path() {
        let (_dir, mut writer) = writer();
        assert!(matches!(writer.record_file(""), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_record_file_language() {
        let (_dir, mut writer) = writer();
        let file = writer.record_file("virtual/a.py").unwrap();
        writer.record_file_language(file, "python").unwrap();
        let record = writer.database().unwrap().get_file(file).unwrap().unwrap();
        assert_eq!(record.language.as_deref(), Some("python"));
        assert!(matches!(
            writer.record_file_language(file + 100, "python"),
            Err(Error::UnknownFile(_))
        ));
    }

    #[test]
    fn test_symbol_kind_overwrites() {
        let (_dir, mut writer) = writer();
        let id = writer.record_symbol(&name(&["f"])).unwrap();
        writer.record_symbol_kind(id, SymbolKind::Function).unwrap();
        writer.record_symbol_kind(id, SymbolKind::Method).unwrap();
        writer
            .record_symbol_definition_kind(id, DefinitionKind::Explicit)
            .unwrap();

        let symbol = writer.database().unwrap().get_symbol(id).unwrap().unwrap();
        assert_eq!(symbol.kind, Some(SymbolKind::Method));
        assert_eq!(symbol.definition_kind, DefinitionKind::Explicit);
    }

    #[test]
    fn test_new_symbol_defaults_to_non_indexed() {
        let (_dir, mut writer) = writer();
        let id = writer.record_symbol(&name(&["f"])).unwrap();
        let symbol = writer.database().unwrap().get_symbol(id).unwrap().unwrap();
        assert_eq!(symbol.kind, None);
        assert_eq!(symbol.definition_kind, DefinitionKind::NonIndexed);
    }

    #[test]
    fn test_reference_locations_accumulate() {
        let (_dir, mut writer) = writer();
        let file = writer.record_file("a.py").unwrap();
        let a = writer.record_symbol(&name(&["a"])).unwrap();
        let b = writer.record_symbol(&name(&["b"])).unwrap();
        let reference = writer.record_reference(a, b, ReferenceKind::Call).unwrap();
        assert_eq!(
            writer.record_reference(a, b, ReferenceKind::Call).unwrap(),
            reference
        );

        writer
            .record_reference_location(reference, SourceRange::new(file, 1, 1, 1, 3))
            .unwrap();
        writer
            .record_reference_location(reference, SourceRange::new(file, 5, 1, 5, 3))
            .unwrap();

        let locations = writer.database().unwrap().get_locations(reference).unwrap();
        assert_eq!(locations.len(), 2);
        assert!(locations.iter().all(|l| l.kind == LocationKind::Reference));
    }

    #[test]
    fn test_location_validation() {
        let (_dir, mut writer) = writer();
        let file = writer.record_file("a.py").unwrap();
        let symbol = writer.record_symbol(&name(&["a"])).unwrap();

        assert!(matches!(
            writer.record_symbol_location(symbol, SourceRange::new(file, 3, 1, 2, 1)),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            writer.record_symbol_location(symbol, SourceRange::new(file + 50, 1, 1, 1, 1)),
            Err(Error::UnknownFile(_))
        ));
        assert!(matches!(
            writer.record_symbol_location(symbol + 50, SourceRange::new(file, 1, 1, 1, 1)),
            Err(Error::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_ambiguous_and_unsolved_references() {
        let (_dir, mut writer) = writer();
        let file = writer.record_file("a.py").unwrap();
        let source = writer.record_symbol(&name(&["main"])).unwrap();

        let unsolved = writer
            .record_reference_to_unsolved_symbol(
                source,
                ReferenceKind::Call,
                SourceRange::new(file, 2, 5, 2, 9),
            )
            .unwrap();
        writer.record_reference_is_ambiguous(unsolved).unwrap();

        let db = writer.database().unwrap();
        let reference = db.get_reference(unsolved).unwrap().unwrap();
        assert!(reference.ambiguous);
        assert_eq!(reference.source_id, source);
        // the placeholder target is not a recorded symbol
        assert_eq!(db.get_stats().unwrap().total_symbols, 1);
        assert!(matches!(
            writer.record_reference_is_ambiguous(unsolved + 100),
            Err(Error::UnknownReference(_))
        ));
    }

    #[test]
    fn test_local_symbols_and_errors() {
        let (_dir, mut writer) = writer();
        let file = writer.record_file("a.py").unwrap();
        let local = writer.record_local_symbol("a.py<3:5>").unwrap();
        assert_eq!(writer.record_local_symbol("a.py<3:5>").unwrap(), local);
        writer
            .record_local_symbol_location(local, SourceRange::new(file, 3, 5, 3, 6))
            .unwrap();
        writer
            .record_local_symbol_location(local, SourceRange::new(file, 4, 9, 4, 10))
            .unwrap();
        assert!(matches!(
            writer.record_local_symbol(""),
            Err(Error::MalformedName(_))
        ));

        writer
            .record_atomic_source_range(SourceRange::new(file, 6, 1, 8, 3))
            .unwrap();
        let error = writer
            .record_error("unexpected token", false, SourceRange::new(file, 9, 1, 9, 4))
            .unwrap();

        let db = writer.database().unwrap();
        let locals = db.get_local_symbols().unwrap();
        assert_eq!(locals.len(), 1);
        assert_eq!(locals[0].id, local);
        assert_eq!(locals[0].name, "a.py<3:5>");
        assert_eq!(db.get_locations(local).unwrap().len(), 2);
        assert_eq!(
            db.get_file_locations(file, LocationKind::Atomic).unwrap().len(),
            1
        );
        assert_eq!(db.get_errors().unwrap()[0].id, error);
        assert_eq!(db.get_locations(error).unwrap()[0].kind, LocationKind::Error);
    }

    #[test]
    fn test_scope_and_signature_locations_overwrite() {
        let (_dir, mut writer) = writer();
        let file = writer.record_file("a.py").unwrap();
        let symbol = writer.record_symbol(&name(&["MyType"])).unwrap();

        writer
            .record_symbol_scope_location(symbol, SourceRange::new(file, 2, 1, 7, 1))
            .unwrap();
        writer
            .record_symbol_scope_location(symbol, SourceRange::new(file, 3, 1, 9, 1))
            .unwrap();
        writer
            .record_symbol_signature_location(symbol, SourceRange::new(file, 2, 1, 2, 14))
            .unwrap();
        writer
            .record_symbol_signature_location(symbol, SourceRange::new(file, 3, 1, 3, 14))
            .unwrap();

        let db = writer.database().unwrap();
        let locations = db.get_locations(symbol).unwrap();
        let scopes: Vec<_> = locations
            .iter()
            .filter(|l| l.kind == LocationKind::Scope)
            .collect();
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].range, SourceRange::new(file, 3, 1, 9, 1));

        let signatures: Vec<_> = locations
            .iter()
            .filter(|l| l.kind == LocationKind::Signature)
            .collect();
        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].range.start_line, 3);

        // replaced rows are gone from the file too
        assert_eq!(
            db.get_file_locations(file, LocationKind::Scope).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_file_content_stored_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.py");
        fs::write(&source, "x = 1\n").unwrap();
        let path = source.to_string_lossy().to_string();

        let mut writer = IndexWriter::with_config(StorageConfig {
            store_file_content: true,
            ..Default::default()
        });
        writer.open(dir.path().join("content.srctrldb")).unwrap();
        let file = writer.record_file(&path).unwrap();

        let db = writer.database().unwrap();
        assert_eq!(
            db.get_file_content(file).unwrap().as_deref(),
            Some("x = 1\n")
        );
        assert_eq!(db.get_file(file).unwrap().unwrap().line_count, 1);
    }

    #[test]
    fn test_file_content_not_stored_by_default() {
        let (dir, mut writer) = writer();
        let source = dir.path().join("a.py");
        fs::write(&source, "x = 1\n").unwrap();

        let file = writer
            .record_file(&source.to_string_lossy())
            .unwrap();

        let db = writer.database().unwrap();
        assert_eq!(db.get_file_content(file).unwrap(), None);
        assert!(db.get_file(file).unwrap().unwrap().content_hash.is_some());
    }

    #[test]
    fn test_optimize_database_memory() {
        let (_dir, mut writer) = writer();
        writer.record_symbol(&name(&["a"])).unwrap();
        writer.optimize_database_memory().unwrap();
        assert!(!writer.is_empty().unwrap());

        writer.begin_transaction().unwrap();
        assert!(matches!(
            writer.optimize_database_memory(),
            Err(Error::TransactionState(_))
        ));
        // a refused optimize does not taint the transaction
        assert_eq!(writer.transaction_state(), &TransactionState::Open);
        writer.commit_transaction().unwrap();
    }

    #[test]
    fn test_rolled_back_ids_are_handed_out_again() {
        let (_dir, mut writer) = writer();
        let kept = writer.record_symbol(&name(&["kept"])).unwrap();

        writer.begin_transaction().unwrap();
        let discarded = writer.record_symbol(&name(&["discarded"])).unwrap();
        writer.rollback_transaction().unwrap();

        let next = writer.record_symbol(&name(&["next"])).unwrap();
        assert!(next > kept);
        assert_eq!(next, discarded);
        let symbol = writer.database().unwrap().get_symbol(next).unwrap().unwrap();
        assert_eq!(symbol.name, name(&["next"]));
    }

    #[test]
    fn test_second_writer_is_locked_out() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("locked.srctrldb");
        let mut first = IndexWriter::new();
        first.open(&db_path).unwrap();

        let mut second = IndexWriter::with_config(StorageConfig {
            busy_timeout_ms: 50,
            ..Default::default()
        });
        match second.open(&db_path) {
            Err(Error::Open(msg)) => assert!(msg.contains("locked"), "unexpected message: {}", msg),
            other => panic!("expected a lock error, got {:?}", other.map(|_| ())),
        }
        assert!(second.database().is_none());

        first.close().unwrap();
        second.open(&db_path).unwrap();
    }

    #[test]
    fn test_transaction_state_errors() {
        let (_dir, mut writer) = writer();
        assert!(matches!(
            writer.commit_transaction(),
            Err(Error::TransactionState(_))
        ));
        assert!(matches!(
            writer.rollback_transaction(),
            Err(Error::TransactionState(_))
        ));
        writer.begin_transaction().unwrap();
        assert!(matches!(
            writer.begin_transaction(),
            Err(Error::TransactionState(_))
        ));
        assert!(matches!(writer.clear(), Err(Error::TransactionState(_))));
        writer.commit_transaction().unwrap();
    }

    #[test]
    fn test_rollback_discards_recorded_facts() {
        let (_dir, mut writer) = writer();
        writer.begin_transaction().unwrap();
        writer.record_symbol(&name(&["a"])).unwrap();
        writer.rollback_transaction().unwrap();
        assert!(writer.is_empty().unwrap());
    }

    #[test]
    fn test_tainted_transaction_commit_rolls_back() {
        let (_dir, mut writer) = writer();
        writer.begin_transaction().unwrap();
        writer.record_symbol(&name(&["a"])).unwrap();
        assert!(writer.record_symbol_kind(999, SymbolKind::Class).is_err());
        assert!(matches!(
            writer.transaction_state(),
            TransactionState::Tainted { .. }
        ));

        let err = writer.commit_transaction().unwrap_err();
        assert!(err.to_string().contains("Unknown symbol id: 999"));
        assert!(writer.is_empty().unwrap());
        assert_eq!(writer.transaction_state(), &TransactionState::Idle);
    }

    #[test]
    fn test_last_error_survives_success_until_cleared() {
        let (_dir, mut writer) = writer();
        assert!(writer.record_symbol_kind(42, SymbolKind::Class).is_err());
        writer.record_symbol(&name(&["a"])).unwrap();
        assert_eq!(writer.last_error(), "Unknown symbol id: 42");
        writer.clear_last_error();
        assert_eq!(writer.last_error(), "");
    }

    #[test]
    fn test_project_file_created_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("project.srctrldb");
        let mut writer = IndexWriter::with_config(StorageConfig {
            create_project_file: true,
            ..Default::default()
        });
        writer.open(&db_path).unwrap();

        let project_file = dir.path().join("project.srctrlprj");
        assert_eq!(fs::read_to_string(&project_file).unwrap(), PROJECT_FILE_CONTENT);

        fs::write(&project_file, "edited").unwrap();
        writer.clear().unwrap();
        assert_eq!(fs::read_to_string(&project_file).unwrap(), PROJECT_FILE_CONTENT);
    }

    #[test]
    fn test_close_rolls_back_open_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.srctrldb");
        let mut writer = IndexWriter::new();
        writer.open(&db_path).unwrap();
        writer.begin_transaction().unwrap();
        writer.record_symbol(&name(&["a"])).unwrap();
        writer.close().unwrap();

        writer.open(&db_path).unwrap();
        assert!(writer.is_empty().unwrap());
        assert_eq!(writer.transaction_state(), &TransactionState::Idle);
    }
}
