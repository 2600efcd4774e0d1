//! Build lock management.
//!
//! The build step changes the process working directory for the duration of
//! the cmake invocations, so two builds sharing a root must never overlap.
//! An exclusive advisory lock on a file inside the root prevents that.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Error, Result};

/// How old a lock file can be before it's considered stale (2 hours)
const STALE_LOCK_AGE_SECS: u64 = 7200;

const LOCK_FILE_NAME: &str = ".geos-build.lock";

/// Check if a lock file is stale (older than STALE_LOCK_AGE_SECS)
fn is_stale_lock(lock_path: &Path) -> bool {
    if let Ok(metadata) = std::fs::metadata(lock_path)
        && let Ok(modified) = metadata.modified()
        && let Ok(age) = std::time::SystemTime::now().duration_since(modified)
    {
        return age.as_secs() > STALE_LOCK_AGE_SECS;
    }
    false
}

/// Acquire an exclusive lock on a working root to prevent concurrent builds.
/// Returns a guard that releases the lock when dropped.
pub fn acquire_build_lock(root: &Path) -> Result<BuildLock> {
    let lock_path = root.join(LOCK_FILE_NAME);

    // Check for stale lock and clean up if found
    if lock_path.exists() && is_stale_lock(&lock_path) {
        let _ = std::fs::remove_file(&lock_path);
    }

    let lock_file = File::create(&lock_path)
        .map_err(Error::fs(format!("cannot create lock file {}", lock_path.display())))?;

    if lock_file.try_lock_exclusive().is_err() {
        drop(lock_file);
        return Err(Error::Build(format!(
            "root '{}' is already being built by another process. \
             If this is incorrect, delete '{}'",
            root.display(),
            lock_path.display()
        )));
    }

    Ok(BuildLock {
        _file: lock_file,
        path: lock_path,
    })
}

/// RAII guard for the build lock - releases it and deletes the lock file
/// when dropped.
#[derive(Debug)]
pub struct BuildLock {
    _file: File,
    path: PathBuf,
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
