//! Tarball repackaging.
//!
//! Archives the `opt` subtree of an extracted payload as
//! `{output_dir}/{full_name}.tgz`, with paths relative to `opt`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{RepackError, Result};
use crate::extract::ExtractedTree;
use crate::process::{Cmd, CommandRunner};

/// Extension of produced artifacts.
pub const ARTIFACT_EXTENSION: &str = "tgz";

/// A tarball ready for the release builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepackagedArtifact {
    pub path: PathBuf,
    /// Filesystem entries archived below `opt`, excluding `opt` itself.
    pub entries: usize,
    /// Hex sha256 of the tarball.
    pub sha256: String,
}

/// Artifact path for a derived full name.
pub fn artifact_path(output_dir: &Path, full_name: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", full_name, ARTIFACT_EXTENSION))
}

/// Archive `tree/opt` into `{output_dir}/{full_name}.tgz`.
pub fn repackage<R: CommandRunner + ?Sized>(
    runner: &R,
    tree: &ExtractedTree,
    full_name: &str,
    output_dir: &Path,
) -> Result<RepackagedArtifact> {
    let opt = tree.opt_dir();
    if !opt.is_dir() {
        return Err(RepackError::precondition(format!(
            "{} does not install under /opt: {} is missing",
            full_name,
            opt.display()
        )));
    }

    fs::create_dir_all(output_dir).map_err(|e| RepackError::io(output_dir, e))?;
    let tarball = artifact_path(output_dir, full_name);

    println!("Repackaging {}", full_name);
    runner.run(
        &Cmd::new("tar")
            .arg("czf")
            .arg_path(&tarball)
            .arg("-C")
            .arg_path(&opt)
            .arg(".")
            .error_msg(format!("Could not create {}", tarball.display())),
    )?;

    let entries = count_entries(&opt)?;
    let sha256 = sha256_file(&tarball)?;

    println!("created: {}", tarball.display());
    println!("  {} entries, sha256 {}", entries, sha256);

    Ok(RepackagedArtifact {
        path: tarball,
        entries,
        sha256,
    })
}

fn count_entries(root: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(root).min_depth(1) {
        entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            RepackError::io(path, io::Error::other(e))
        })?;
        count += 1;
    }
    Ok(count)
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| RepackError::io(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| RepackError::io(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}
