//!
//! Content-addressed snapshots of documents that failed validation.
//!
//! Snapshots live at `<dir>/<sha1 of body>.html`, so validating the same bytes
//! again overwrites the same file.

use sha1::{Digest, Sha1};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Lowercase hex SHA-1 of the raw body
pub fn digest(body: &[u8]) -> String {
    format!("{:x}", Sha1::digest(body))
}

/// Where the snapshot of `body` is stored inside `dir`
pub fn snapshot_file(dir: &Path, body: &[u8]) -> PathBuf {
    dir.join(format!("{}.html", digest(body)))
}

/// Write `body` verbatim to its snapshot file, creating `dir` if needed
pub fn write_snapshot(dir: &Path, body: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|source| Error::SnapshotDir {
        source,
        path: dir.to_path_buf(),
    })?;
    let path = snapshot_file(dir, body);
    fs::write(&path, body).map_err(|source| Error::SnapshotWrite {
        source,
        path: path.clone(),
    })?;
    log::debug!("Saved invalid html snapshot to {}", path.display());
    Ok(path)
}
