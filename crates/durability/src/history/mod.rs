//! On-disk history
//!
//! - `config`: [`HistoryConfig`] and [`DurabilityMode`]
//! - `format`: file header, footer and framing
//! - `storage`: [`HistoryStorage`] save/load

pub mod config;
pub mod format;
pub mod storage;

pub use config::{ConfigError, DurabilityMode, HistoryConfig, CONTENTS_DIR};
pub use format::{HistoryHeader, FORMAT_VERSION, HISTORY_MAGIC};
pub use storage::{History, HistoryStorage, SaveInfo};
