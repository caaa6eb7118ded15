//! symdb: a file-backed symbol index writer
//!
//! Records source-code structure into a single SQLite file so that editors,
//! browsers and visualizers can later ask what a symbol is, where it is
//! defined and what it references. Parsing is the caller's job; symdb stores
//! and retrieves the facts it is given.
//!
//! ## Features
//!
//! - Hierarchical symbol names with a lossless encoded form
//! - Interning of files, symbols, references and local symbols
//! - Token, scope and signature locations, plus accumulating reference,
//!   qualifier and local symbol locations
//! - Transactions with all-or-nothing visibility
//! - A version-stamped storage format
//!
//! ## Example
//!
//! ```no_run
//! use symdb::{IndexWriter, NameHierarchy, SourceRange, SymbolKind};
//!
//! let mut writer = IndexWriter::new();
//! writer.open("project.srctrldb")?;
//! writer.begin_transaction()?;
//! let file = writer.record_file("a.py")?;
//! let class = writer.record_symbol(&NameHierarchy::from_names(".", ["MyType"]))?;
//! writer.record_symbol_kind(class, SymbolKind::Class)?;
//! writer.record_symbol_location(class, SourceRange::new(file, 2, 7, 2, 12))?;
//! writer.commit_transaction()?;
//! writer.close()?;
//! # Ok::<(), symdb::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod name;
pub mod state;
pub mod types;
pub mod writer;

pub use config::StorageConfig;
pub use db::schema::SUPPORTED_DATABASE_VERSION;
pub use db::Database;
pub use error::{Error, Result};
pub use graph::{ReferenceHit, SymbolGraph};
pub use name::{NameElement, NameHierarchy};
pub use state::TransactionState;
pub use types::{
    DatabaseStats, DefinitionKind, FileRecord, LocationKind, LocationRecord, ReferenceKind,
    ReferenceRecord, SourceRange, SymbolKind, SymbolRecord,
};
pub use writer::IndexWriter;
