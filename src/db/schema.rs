//! Database schema definition

/// Version stamped into every database this crate creates. Databases with
/// any other stamped version are refused.
pub const SUPPORTED_DATABASE_VERSION: i32 = 25;

/// Meta key holding the stamped version
pub const VERSION_KEY: &str = "storage_version";

/// Serialized name of the node that stands in for every unresolved
/// reference target. Encoded name hierarchies always contain a `\tm`
/// marker, so this key can never collide with a recorded symbol.
pub const UNSOLVED_SYMBOL_KEY: &str = "\tunsolved symbol";

/// Tables in drop order
pub const TABLES: &[&str] = &[
    "meta",
    "error",
    "component_access",
    "occurrence",
    "source_location",
    "local_symbol",
    "filecontent",
    "file",
    "edge",
    "node",
    "element",
];

pub const SCHEMA: &str = r#"
-- Key/value metadata, including the stamped storage version
CREATE TABLE IF NOT EXISTS meta (
    id INTEGER PRIMARY KEY,
    key TEXT NOT NULL UNIQUE,
    value TEXT
);

-- Global id allocator: every file, symbol, reference, local symbol and
-- error takes its id from here. Committed ids are never reused; ids handed
-- out inside a rolled-back transaction are rewound with it.
CREATE TABLE IF NOT EXISTS element (
    id INTEGER PRIMARY KEY AUTOINCREMENT
);

-- Nodes table: symbols interned by encoded name hierarchy
CREATE TABLE IF NOT EXISTS node (
    id INTEGER PRIMARY KEY,
    serialized_name TEXT NOT NULL UNIQUE,
    kind TEXT,
    definition_kind TEXT NOT NULL DEFAULT 'non_indexed',
    FOREIGN KEY (id) REFERENCES element(id) ON DELETE CASCADE
);

-- Edges table: recorded references plus implicit member edges
CREATE TABLE IF NOT EXISTS edge (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    source_node_id INTEGER NOT NULL,
    target_node_id INTEGER NOT NULL,
    UNIQUE (source_node_id, target_node_id, kind),
    FOREIGN KEY (id) REFERENCES element(id) ON DELETE CASCADE,
    FOREIGN KEY (source_node_id) REFERENCES node(id) ON DELETE CASCADE,
    FOREIGN KEY (target_node_id) REFERENCES node(id) ON DELETE CASCADE
);

-- Files table: interned by path
CREATE TABLE IF NOT EXISTS file (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    language TEXT,
    modification_time INTEGER NOT NULL DEFAULT 0,
    line_count INTEGER NOT NULL DEFAULT 0,
    content_hash TEXT,
    FOREIGN KEY (id) REFERENCES element(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS filecontent (
    id INTEGER PRIMARY KEY,
    content TEXT NOT NULL,
    FOREIGN KEY (id) REFERENCES file(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS local_symbol (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    FOREIGN KEY (id) REFERENCES element(id) ON DELETE CASCADE
);

-- Source locations, shared between all elements that occur there
CREATE TABLE IF NOT EXISTS source_location (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_node_id INTEGER NOT NULL,
    start_line INTEGER NOT NULL,
    start_column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL,
    type TEXT NOT NULL,
    UNIQUE (file_node_id, start_line, start_column, end_line, end_column, type),
    FOREIGN KEY (file_node_id) REFERENCES file(id) ON DELETE CASCADE
);

-- Links an element to the source locations where it occurs
CREATE TABLE IF NOT EXISTS occurrence (
    element_id INTEGER NOT NULL,
    source_location_id INTEGER NOT NULL,
    PRIMARY KEY (element_id, source_location_id),
    FOREIGN KEY (element_id) REFERENCES element(id) ON DELETE CASCADE,
    FOREIGN KEY (source_location_id) REFERENCES source_location(id) ON DELETE CASCADE
);

-- Extra flags on edges (currently only "ambiguous")
CREATE TABLE IF NOT EXISTS component_access (
    edge_id INTEGER NOT NULL,
    type TEXT NOT NULL,
    PRIMARY KEY (edge_id, type),
    FOREIGN KEY (edge_id) REFERENCES edge(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS error (
    id INTEGER PRIMARY KEY,
    message TEXT NOT NULL,
    fatal INTEGER NOT NULL,
    UNIQUE (message, fatal),
    FOREIGN KEY (id) REFERENCES element(id) ON DELETE CASCADE
);

-- Indexes for efficient queries
CREATE INDEX IF NOT EXISTS idx_edge_source ON edge(source_node_id);
CREATE INDEX IF NOT EXISTS idx_edge_target ON edge(target_node_id);
CREATE INDEX IF NOT EXISTS idx_edge_kind ON edge(kind);
CREATE INDEX IF NOT EXISTS idx_node_kind ON node(kind);
CREATE INDEX IF NOT EXISTS idx_occurrence_location ON occurrence(source_location_id);
"#;

/// Component flag marking a reference as ambiguous
pub const AMBIGUOUS_COMPONENT: &str = "is_ambiguous";
