//! Transient state cleanup.
//!
//! Runs after every artifact is on disk, so nothing here can fail the run:
//! removal errors are collected as warnings and logged.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::download::ARCHIVES_DIR;
use crate::extract::EXTRACTED_DIR;

/// A target that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub message: String,
}

/// What a cleanup pass removed and what it could not.
#[derive(Debug, Default, Clone)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub warnings: Vec<CleanupWarning>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn remove(&mut self, path: &Path, result: io::Result<()>) {
        match result {
            Ok(()) => self.removed.push(path.to_path_buf()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cleanup failed");
                self.warnings.push(CleanupWarning {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Remove extracted trees, downloaded archives and apt `*.bin` caches.
///
/// Idempotent: absent targets are skipped.
pub fn cleanup(work_dir: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    for name in [EXTRACTED_DIR, ARCHIVES_DIR] {
        let dir = work_dir.join(name);
        report.remove(&dir, fs::remove_dir_all(&dir));
    }

    // apt-get collateral: pkgcache.bin, srcpkgcache.bin
    match fs::read_dir(work_dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "bin") {
                    report.remove(&path, fs::remove_file(&path));
                }
            }
        }
        Err(e) => report.remove(work_dir, Err(e)),
    }

    if report.removed.is_empty() {
        println!("Nothing to clean in {}", work_dir.display());
    } else {
        println!("Cleaned {} path(s) in {}", report.removed.len(), work_dir.display());
    }
    for warning in &report.warnings {
        println!("  [WARN] could not remove {}: {}", warning.path.display(), warning.message);
    }

    report
}
