//! Key file helpers
//!
//! Writes PEM files into temporary directories and pins their modification
//! times, so reload behaviour does not depend on filesystem timestamp
//! granularity.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Base modification time used by [`write_key_file_at`] callers: 2023-11-14.
pub const BASE_MTIME_SECS: u64 = 1_700_000_000;

/// Modification time `offset_secs` after [`BASE_MTIME_SECS`]
pub fn mtime(offset_secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(BASE_MTIME_SECS + offset_secs)
}

/// Write `contents` to `dir/name` and return the path
pub fn write_key_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write key file");
    path
}

/// Write `contents` to `path` and set its modification time to `modified`
pub fn write_key_file_at(path: &Path, contents: &str, modified: SystemTime) {
    fs::write(path, contents).expect("write key file");
    set_mtime(path, modified);
}

/// Set the modification time of an existing file
pub fn set_mtime(path: &Path, modified: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .expect("open key file")
        .set_modified(modified)
        .expect("set modification time");
}

/// Current modification time of a file
pub fn current_mtime(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .expect("read modification time")
}
