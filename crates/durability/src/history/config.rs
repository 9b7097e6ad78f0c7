//! History storage configuration

use localvcs_core::Error;

/// How hard a save works to survive a crash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync the history file and its directory before a save returns
    #[default]
    Strict,
    /// Rename into place without fsync; a crash may lose the latest save
    Relaxed,
}

impl DurabilityMode {
    /// True if saves fsync
    pub fn syncs(&self) -> bool {
        matches!(self, DurabilityMode::Strict)
    }
}

/// Name of the content store directory inside the history directory
pub const CONTENTS_DIR: &str = "contents";

/// History storage configuration
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Durability mode for saves
    pub durability: DurabilityMode,
    /// Check the file checksum on load
    pub verify_checksums: bool,
    /// File name of the history inside its directory
    pub file_name: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            durability: DurabilityMode::Strict,
            verify_checksums: true,
            file_name: "history.lvcs".to_string(),
        }
    }
}

impl HistoryConfig {
    /// Create config with strict durability (default)
    pub fn strict() -> Self {
        HistoryConfig {
            durability: DurabilityMode::Strict,
            ..Default::default()
        }
    }

    /// Create config that skips fsync
    pub fn relaxed() -> Self {
        HistoryConfig {
            durability: DurabilityMode::Relaxed,
            ..Default::default()
        }
    }

    /// Create config for testing
    pub fn for_testing() -> Self {
        HistoryConfig {
            durability: DurabilityMode::Relaxed,
            verify_checksums: true,
            file_name: "test-history.lvcs".to_string(),
        }
    }

    /// Set durability mode
    pub fn with_durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }

    /// Enable or disable checksum verification
    pub fn with_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Set the history file name
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.file_name;
        if name.is_empty() {
            return Err(ConfigError::InvalidFileName("empty".into()));
        }
        if name.contains('/') || name.contains('\\') || name == ".." {
            return Err(ConfigError::InvalidFileName(format!(
                "{:?} is not a plain file name",
                name
            )));
        }
        if name.starts_with('.') {
            return Err(ConfigError::InvalidFileName(format!(
                "{:?} would be treated as a temporary file",
                name
            )));
        }
        if name == CONTENTS_DIR {
            return Err(ConfigError::InvalidFileName(format!(
                "{:?} is reserved for the content store",
                name
            )));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Unusable history file name
    #[error("Invalid history file name: {0}")]
    InvalidFileName(String),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::InvalidOperation(e.to_string())
    }
}
