//! Database module for symdb
//!
//! Handles SQLite storage for the symbol index including:
//! - Schema creation, version stamping and the version gate
//! - Id allocation and interning of symbols, files and references
//! - Source location storage
//! - Query operations used by readers and tests

pub mod schema;

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::name::NameHierarchy;
use crate::types::{
    DatabaseStats, DefinitionKind, EdgeKind, ErrorRecord, FileMetadata, FileRecord,
    LocalSymbolRecord, LocationKind, LocationRecord, ReferenceKind, ReferenceRecord, SourceRange,
    SymbolKind, SymbolRecord,
};

use schema::{AMBIGUOUS_COMPONENT, SUPPORTED_DATABASE_VERSION, UNSOLVED_SYMBOL_KEY, VERSION_KEY};

const OPERATION_SAVEPOINT: &str = "symdb_operation";

/// Database handle for the symbol index
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path
    ///
    /// A new or empty file is stamped with [`SUPPORTED_DATABASE_VERSION`]. A
    /// file stamped with any other version is refused.
    pub fn open<P: AsRef<Path>>(path: P, config: &StorageConfig) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| Error::Open(format!("{}: {}", path.display(), e)))?;
        let db = Self { conn };
        db.initialize(config).map_err(|e| match e {
            Error::Open(msg) => Error::Open(format!("{}: {}", path.display(), msg)),
            other => Error::Open(format!("{}: {}", path.display(), other)),
        })?;
        info!("Opened database {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize(&StorageConfig::default())?;
        Ok(db)
    }

    /// Apply connection settings, check the stamped version and create tables
    fn initialize(&self, config: &StorageConfig) -> Result<()> {
        self.conn
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if config.exclusive_lock {
            self.conn
                .query_row("PRAGMA locking_mode = EXCLUSIVE", [], |_| Ok(()))?;
        }

        if let Some(version) = self.loaded_database_version()? {
            if version != SUPPORTED_DATABASE_VERSION {
                return Err(Error::Open(format!(
                    "database version {} is not supported, expected version {}",
                    version, SUPPORTED_DATABASE_VERSION
                )));
            }
        }
        self.setup_tables()
    }

    fn setup_tables(&self) -> Result<()> {
        self.conn.execute_batch(schema::SCHEMA)?;
        self.conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![VERSION_KEY, SUPPORTED_DATABASE_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Close the connection, surfacing any error from the final flush
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Storage(e))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drop every table and recreate the schema, resetting all id counters
    pub fn clear_tables(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        for table in schema::TABLES {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS main.{};", table))?;
        }
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.setup_tables()?;
        info!("Cleared database tables");
        Ok(())
    }

    /// True when no file and no symbol has been recorded
    pub fn is_empty(&self) -> Result<bool> {
        let files: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))?;
        let nodes: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM node", [], |row| row.get(0))?;
        Ok(files == 0 && nodes == 0)
    }

    /// The version stamped into the loaded file, `None` for a fresh file
    pub fn loaded_database_version(&self) -> Result<Option<i32>> {
        let has_meta: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'meta')",
            [],
            |row| row.get(0),
        )?;
        if !has_meta {
            return Ok(None);
        }

        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![VERSION_KEY],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();

        match value {
            Some(v) => v
                .trim()
                .parse::<i32>()
                .map(Some)
                .map_err(|_| Error::Open(format!("unreadable storage version {:?}", v))),
            None => Ok(None),
        }
    }

    pub fn is_compatible(&self) -> Result<bool> {
        Ok(match self.loaded_database_version()? {
            Some(version) => version == SUPPORTED_DATABASE_VERSION,
            None => true,
        })
    }

    /// Reduce the on-disk size of the database to a minimum
    pub fn optimize(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM;")?;
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Begin a transaction
    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION;")?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT TRANSACTION;")?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK TRANSACTION;")?;
        Ok(())
    }

    /// Run `operation` inside a savepoint so that it either applies completely
    /// or leaves no trace. Outside of a transaction the savepoint commits on
    /// release.
    pub fn atomically<T>(&self, operation: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn
            .execute_batch(&format!("SAVEPOINT {};", OPERATION_SAVEPOINT))?;
        match operation() {
            Ok(value) => {
                self.conn
                    .execute_batch(&format!("RELEASE {};", OPERATION_SAVEPOINT))?;
                Ok(value)
            }
            Err(err) => {
                self.conn.execute_batch(&format!(
                    "ROLLBACK TO {0}; RELEASE {0};",
                    OPERATION_SAVEPOINT
                ))?;
                Err(err)
            }
        }
    }

    // =========================================================================
    // Id Allocation
    // =========================================================================

    /// Allocate the next element id
    fn next_id(&self) -> Result<i64> {
        self.conn
            .execute("INSERT INTO element DEFAULT VALUES", [])?;
        Ok(self.conn.last_insert_rowid())
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Intern a node by serialized name and return its id
    pub fn add_node(&self, serialized_name: &str) -> Result<i64> {
        if let Some(id) = self.find_node_id(serialized_name)? {
            return Ok(id);
        }
        let id = self.next_id()?;
        self.conn.execute(
            "INSERT INTO node (id, serialized_name) VALUES (?1, ?2)",
            params![id, serialized_name],
        )?;
        debug!("Added node {}", id);
        Ok(id)
    }

    pub fn find_node_id(&self, serialized_name: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM node WHERE serialized_name = ?1",
                params![serialized_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Intern the placeholder node that unresolved references point to
    pub fn add_unsolved_symbol(&self) -> Result<i64> {
        self.add_node(UNSOLVED_SYMBOL_KEY)
    }

    pub fn set_node_kind(&self, node_id: i64, kind: SymbolKind) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE node SET kind = ?1 WHERE id = ?2",
            params![kind.as_str(), node_id],
        )?;
        if updated == 0 {
            return Err(Error::UnknownSymbol(node_id));
        }
        Ok(())
    }

    pub fn set_definition_kind(&self, node_id: i64, kind: DefinitionKind) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE node SET definition_kind = ?1 WHERE id = ?2",
            params![kind.as_str(), node_id],
        )?;
        if updated == 0 {
            return Err(Error::UnknownSymbol(node_id));
        }
        Ok(())
    }

    pub fn symbol_exists(&self, id: i64) -> Result<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM node WHERE id = ?1)", id)
    }

    /// Get a symbol by ID
    pub fn get_symbol(&self, id: i64) -> Result<Option<SymbolRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, serialized_name, kind, definition_kind FROM node WHERE id = ?1",
                params![id],
                Self::row_to_symbol_parts,
            )
            .optional()?;
        row.map(Self::parts_to_symbol).transpose()
    }

    /// Find a symbol by its full name hierarchy
    pub fn find_symbol(&self, name: &NameHierarchy) -> Result<Option<SymbolRecord>> {
        match self.find_node_id(&name.encode()?)? {
            Some(id) => self.get_symbol(id),
            None => Ok(None),
        }
    }

    /// All recorded symbols ordered by id
    pub fn get_symbols(&self) -> Result<Vec<SymbolRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, serialized_name, kind, definition_kind FROM node
             WHERE serialized_name != ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![UNSOLVED_SYMBOL_KEY], Self::row_to_symbol_parts)?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(Self::parts_to_symbol(row?)?);
        }
        Ok(symbols)
    }

    fn row_to_symbol_parts(
        row: &rusqlite::Row,
    ) -> rusqlite::Result<(i64, String, Option<String>, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn parts_to_symbol(
        (id, serialized_name, kind, definition_kind): (i64, String, Option<String>, String),
    ) -> Result<SymbolRecord> {
        let name = if serialized_name == UNSOLVED_SYMBOL_KEY {
            NameHierarchy::from_names("", ["unsolved symbol"])
        } else {
            NameHierarchy::decode(&serialized_name)?
        };
        let kind = kind
            .map(|k| SymbolKind::from_str(&k).ok_or_else(|| Error::invalid_enum("symbol kind", k)))
            .transpose()?;
        let definition_kind = DefinitionKind::from_str(&definition_kind)
            .ok_or_else(|| Error::invalid_enum("definition kind", &definition_kind))?;

        Ok(SymbolRecord {
            id,
            name,
            kind,
            definition_kind,
        })
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Intern an edge by (source, target, kind) and return its id
    pub fn add_edge(&self, source_id: i64, target_id: i64, kind: EdgeKind) -> Result<i64> {
        let existing = self
            .conn
            .query_row(
                "SELECT id FROM edge WHERE source_node_id = ?1 AND target_node_id = ?2 AND kind = ?3",
                params![source_id, target_id, kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = self.next_id()?;
        self.conn.execute(
            "INSERT INTO edge (id, kind, source_node_id, target_node_id) VALUES (?1, ?2, ?3, ?4)",
            params![id, kind.as_str(), source_id, target_id],
        )?;
        debug!("Added {} edge {} ({} -> {})", kind.as_str(), id, source_id, target_id);
        Ok(id)
    }

    /// True for recorded references; member edges do not count
    pub fn reference_exists(&self, id: i64) -> Result<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM edge WHERE id = ?1 AND kind != 'member')",
            id,
        )
    }

    pub fn set_reference_ambiguous(&self, reference_id: i64) -> Result<()> {
        if !self.reference_exists(reference_id)? {
            return Err(Error::UnknownReference(reference_id));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO component_access (edge_id, type) VALUES (?1, ?2)",
            params![reference_id, AMBIGUOUS_COMPONENT],
        )?;
        Ok(())
    }

    pub fn get_reference(&self, id: i64) -> Result<Option<ReferenceRecord>> {
        let mut references = self.query_references("e.id = ?1", id)?;
        Ok(references.pop())
    }

    /// References pointing at the given symbol
    pub fn get_incoming_references(&self, node_id: i64) -> Result<Vec<ReferenceRecord>> {
        self.query_references("e.target_node_id = ?1", node_id)
    }

    /// References originating from the given symbol
    pub fn get_outgoing_references(&self, node_id: i64) -> Result<Vec<ReferenceRecord>> {
        self.query_references("e.source_node_id = ?1", node_id)
    }

    /// All recorded references ordered by id
    pub fn get_references(&self) -> Result<Vec<ReferenceRecord>> {
        self.query_references("?1 = ?1", 0)
    }

    fn query_references(&self, filter: &str, value: i64) -> Result<Vec<ReferenceRecord>> {
        let sql = format!(
            r#"
            SELECT e.id, e.source_node_id, e.target_node_id, e.kind,
                   EXISTS(SELECT 1 FROM component_access c WHERE c.edge_id = e.id AND c.type = ?2)
            FROM edge e
            WHERE e.kind != 'member' AND {}
            ORDER BY e.id
            "#,
            filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![value, AMBIGUOUS_COMPONENT], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut references = Vec::new();
        for row in rows {
            let (id, source_id, target_id, kind, ambiguous) = row?;
            let kind = ReferenceKind::from_str(&kind)
                .ok_or_else(|| Error::invalid_enum("reference kind", &kind))?;
            references.push(ReferenceRecord {
                id,
                source_id,
                target_id,
                kind,
                ambiguous,
            });
        }
        Ok(references)
    }

    /// Ids of the symbols nested directly below the given symbol
    pub fn get_member_ids(&self, node_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT target_node_id FROM edge WHERE source_node_id = ?1 AND kind = 'member' ORDER BY target_node_id",
        )?;
        let rows = stmt.query_map(params![node_id], |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    // =========================================================================
    // File Operations
    // =========================================================================

    /// Intern a file by path. Metadata is only written when the file is new.
    pub fn add_file(&self, path: &str, metadata: &FileMetadata) -> Result<i64> {
        let existing = self
            .conn
            .query_row("SELECT id FROM file WHERE path = ?1", params![path], |row| {
                row.get(0)
            })
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = self.next_id()?;
        self.conn.execute(
            r#"
            INSERT INTO file (id, path, modification_time, line_count, content_hash)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                id,
                path,
                metadata.modification_time,
                metadata.line_count as i64,
                metadata.content_hash,
            ],
        )?;
        if let Some(ref content) = metadata.content {
            self.conn.execute(
                "INSERT INTO filecontent (id, content) VALUES (?1, ?2)",
                params![id, content],
            )?;
        }
        debug!("Added file {} ({})", id, path);
        Ok(id)
    }

    pub fn set_file_language(&self, file_id: i64, language: &str) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE file SET language = ?1 WHERE id = ?2",
            params![language, file_id],
        )?;
        if updated == 0 {
            return Err(Error::UnknownFile(file_id));
        }
        Ok(())
    }

    pub fn file_exists(&self, id: i64) -> Result<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM file WHERE id = ?1)", id)
    }

    /// Get a file record by ID
    pub fn get_file(&self, id: i64) -> Result<Option<FileRecord>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, path, language, modification_time, line_count, content_hash FROM file WHERE id = ?1",
                params![id],
                Self::row_to_file,
            )
            .optional()?;
        Ok(result)
    }

    /// Get a file record by path
    pub fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, path, language, modification_time, line_count, content_hash FROM file WHERE path = ?1",
                params![path],
                Self::row_to_file,
            )
            .optional()?;
        Ok(result)
    }

    pub fn get_files(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, language, modification_time, line_count, content_hash FROM file ORDER BY id",
        )?;
        let rows = stmt.query_map([], Self::row_to_file)?;

        let mut files = Vec::new();
        for row in rows {
            files.push(row?);
        }
        Ok(files)
    }

    /// Stored text of a file, if content storage was enabled when it was recorded
    pub fn get_file_content(&self, file_id: i64) -> Result<Option<String>> {
        let content = self
            .conn
            .query_row(
                "SELECT content FROM filecontent WHERE id = ?1",
                params![file_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
        Ok(FileRecord {
            id: row.get(0)?,
            path: row.get(1)?,
            language: row.get(2)?,
            modification_time: row.get(3)?,
            line_count: row.get::<_, i64>(4)? as u32,
            content_hash: row.get(5)?,
        })
    }

    // =========================================================================
    // Local Symbols and Errors
    // =========================================================================

    /// Intern a local symbol by its unique name
    pub fn add_local_symbol(&self, name: &str) -> Result<i64> {
        let existing = self
            .conn
            .query_row(
                "SELECT id FROM local_symbol WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = self.next_id()?;
        self.conn.execute(
            "INSERT INTO local_symbol (id, name) VALUES (?1, ?2)",
            params![id, name],
        )?;
        Ok(id)
    }

    pub fn local_symbol_exists(&self, id: i64) -> Result<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM local_symbol WHERE id = ?1)", id)
    }

    pub fn get_local_symbols(&self) -> Result<Vec<LocalSymbolRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM local_symbol ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(LocalSymbolRecord {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut locals = Vec::new();
        for row in rows {
            locals.push(row?);
        }
        Ok(locals)
    }

    /// Intern an indexing error by (message, fatal)
    pub fn add_error(&self, message: &str, fatal: bool) -> Result<i64> {
        let existing = self
            .conn
            .query_row(
                "SELECT id FROM error WHERE message = ?1 AND fatal = ?2",
                params![message, fatal],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = self.next_id()?;
        self.conn.execute(
            "INSERT INTO error (id, message, fatal) VALUES (?1, ?2, ?3)",
            params![id, message, fatal],
        )?;
        Ok(id)
    }

    pub fn get_errors(&self) -> Result<Vec<ErrorRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, message, fatal FROM error ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ErrorRecord {
                id: row.get(0)?,
                message: row.get(1)?,
                fatal: row.get(2)?,
            })
        })?;

        let mut errors = Vec::new();
        for row in rows {
            errors.push(row?);
        }
        Ok(errors)
    }

    // =========================================================================
    // Source Locations
    // =========================================================================

    /// Intern a source location and return its id
    pub fn add_source_location(&self, range: &SourceRange, kind: LocationKind) -> Result<i64> {
        let existing = self
            .conn
            .query_row(
                r#"
                SELECT id FROM source_location
                WHERE file_node_id = ?1 AND start_line = ?2 AND start_column = ?3
                  AND end_line = ?4 AND end_column = ?5 AND type = ?6
                "#,
                params![
                    range.file_id,
                    range.start_line,
                    range.start_column,
                    range.end_line,
                    range.end_column,
                    kind.as_str(),
                ],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            r#"
            INSERT INTO source_location (file_node_id, start_line, start_column, end_line, end_column, type)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                range.file_id,
                range.start_line,
                range.start_column,
                range.end_line,
                range.end_column,
                kind.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn add_occurrence(&self, element_id: i64, source_location_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO occurrence (element_id, source_location_id) VALUES (?1, ?2)",
            params![element_id, source_location_id],
        )?;
        Ok(())
    }

    /// Attach a location to an element. Single-valued kinds first detach any
    /// previous location of the same kind.
    pub fn record_occurrence(
        &self,
        element_id: i64,
        range: &SourceRange,
        kind: LocationKind,
    ) -> Result<()> {
        if kind.is_single_valued() {
            self.remove_occurrences(element_id, kind)?;
        }
        let location_id = self.add_source_location(range, kind)?;
        self.add_occurrence(element_id, location_id)
    }

    fn remove_occurrences(&self, element_id: i64, kind: LocationKind) -> Result<()> {
        self.conn.execute(
            r#"
            DELETE FROM occurrence
            WHERE element_id = ?1
              AND source_location_id IN (SELECT id FROM source_location WHERE type = ?2)
            "#,
            params![element_id, kind.as_str()],
        )?;
        // drop locations nothing occurs at any more
        self.conn.execute(
            r#"
            DELETE FROM source_location
            WHERE type = ?1
              AND id NOT IN (SELECT source_location_id FROM occurrence)
            "#,
            params![kind.as_str()],
        )?;
        Ok(())
    }

    /// All locations attached to an element, ordered by position
    pub fn get_locations(&self, element_id: i64) -> Result<Vec<LocationRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.file_node_id, s.start_line, s.start_column, s.end_line, s.end_column, s.type
            FROM source_location s
            INNER JOIN occurrence o ON o.source_location_id = s.id
            WHERE o.element_id = ?1
            ORDER BY s.file_node_id, s.start_line, s.start_column, s.id
            "#,
        )?;
        self.collect_locations(&mut stmt, params![element_id])
    }

    /// Locations of a given kind in a file, including ones with no element
    pub fn get_file_locations(
        &self,
        file_id: i64,
        kind: LocationKind,
    ) -> Result<Vec<LocationRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, file_node_id, start_line, start_column, end_line, end_column, type
            FROM source_location
            WHERE file_node_id = ?1 AND type = ?2
            ORDER BY start_line, start_column, id
            "#,
        )?;
        self.collect_locations(&mut stmt, params![file_id, kind.as_str()])
    }

    fn collect_locations(
        &self,
        stmt: &mut rusqlite::Statement,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<LocationRecord>> {
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                SourceRange {
                    file_id: row.get(1)?,
                    start_line: row.get(2)?,
                    start_column: row.get(3)?,
                    end_line: row.get(4)?,
                    end_column: row.get(5)?,
                },
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut locations = Vec::new();
        for row in rows {
            let (id, range, kind) = row?;
            let kind = LocationKind::from_str(&kind)
                .ok_or_else(|| Error::invalid_enum("location kind", &kind))?;
            locations.push(LocationRecord { id, kind, range });
        }
        Ok(locations)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        let total_files = count("SELECT COUNT(*) FROM file")?;
        let total_symbols: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM node WHERE serialized_name != ?1",
            params![UNSOLVED_SYMBOL_KEY],
            |row| row.get(0),
        )?;
        let total_references = count("SELECT COUNT(*) FROM edge WHERE kind != 'member'")?;
        let total_locations = count("SELECT COUNT(*) FROM source_location")?;
        let total_errors = count("SELECT COUNT(*) FROM error")?;

        // Get database file size
        let db_size_bytes: u64 = self
            .conn
            .query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .unwrap_or(0);

        // Get symbol kind distribution
        let mut stmt = self.conn.prepare(
            "SELECT kind, COUNT(*) FROM node WHERE kind IS NOT NULL GROUP BY kind ORDER BY kind",
        )?;
        let kind_rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut symbol_kinds = Vec::new();
        for row in kind_rows {
            let (kind, n) = row?;
            let kind = SymbolKind::from_str(&kind)
                .ok_or_else(|| Error::invalid_enum("symbol kind", &kind))?;
            symbol_kinds.push((kind, n as u64));
        }

        Ok(DatabaseStats {
            version: self.loaded_database_version()?,
            total_files,
            total_symbols: total_symbols as u64,
            total_references,
            total_locations,
            total_errors,
            db_size_bytes,
            symbol_kinds,
        })
    }

    fn exists(&self, sql: &str, id: i64) -> Result<bool> {
        let found: bool = self.conn.query_row(sql, params![id], |row| row.get(0))?;
        Ok(found)
    }
}
