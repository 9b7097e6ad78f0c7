//! Crash-safe file replacement
//!
//! 1. Write to a temporary file in the target directory
//! 2. fsync the temporary file
//! 3. Atomic rename to the final path
//! 4. fsync the parent directory
//!
//! Readers see either the old file or the complete new one. Steps 2 and 4
//! are skipped when `sync` is false.
//!
//! Every write gets its own temporary name, so concurrent writers of the
//! same target never share a temporary file. The last rename wins.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Suffix of in-flight temporary files
pub const TEMP_SUFFIX: &str = ".tmp";

/// Replace `dir/file_name` with `bytes`
pub fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8], sync: bool) -> io::Result<()> {
    let final_path = dir.join(file_name);
    let temp_path = temp_path_for(dir, file_name);

    let result = write_then_rename(&temp_path, &final_path, bytes, sync);
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result?;

    if sync {
        File::open(dir)?.sync_all()?;
    }
    Ok(())
}

fn temp_path_for(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(format!(
        ".{}.{}{}",
        file_name,
        Uuid::new_v4().simple(),
        TEMP_SUFFIX
    ))
}

fn write_then_rename(temp_path: &Path, final_path: &Path, bytes: &[u8], sync: bool) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(temp_path)?;
    file.write_all(bytes)?;
    if sync {
        file.sync_all()?;
    }
    drop(file);

    std::fs::rename(temp_path, final_path)
}

/// Remove temporary files left behind by interrupted writes
pub fn cleanup_temp_files(dir: &Path) -> io::Result<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') && name.ends_with(TEMP_SUFFIX) {
            std::fs::remove_file(entry.path())?;
            count += 1;
        }
    }

    Ok(count)
}
