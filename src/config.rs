//! Storage configuration

/// Options applied when opening an index database
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Hold an exclusive SQLite lock for the lifetime of the connection so
    /// that a second process cannot write to the same file
    pub exclusive_lock: bool,
    /// Store the full text of recorded files that exist on disk
    pub store_file_content: bool,
    /// How long to wait for a lock held by another connection
    pub busy_timeout_ms: u64,
    /// Write a minimal `.srctrlprj` project file next to the database
    pub create_project_file: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            exclusive_lock: true,
            store_file_content: false,
            busy_timeout_ms: 1000,
            create_project_file: false,
        }
    }
}
