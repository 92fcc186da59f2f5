//! Payload extraction.
//!
//! `dpkg -x` unpacks only the data archive of a `.deb`, keeping the
//! installed directory layout and ignoring maintainer scripts.

use std::fs;
use std::path::{Path, PathBuf};

use crate::download::DownloadedPackage;
use crate::error::{RepackError, Result};
use crate::process::{Cmd, CommandRunner};

/// Subdirectory of the work dir holding one tree per extracted package.
pub const EXTRACTED_DIR: &str = "extracted";

/// Subdirectory of the payload that gets repackaged.
pub const PAYLOAD_SUBDIR: &str = "opt";

/// A package payload unpacked under `{work_dir}/extracted/{full_name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTree {
    root: PathBuf,
}

impl ExtractedTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `opt` subtree, present for packages that install under `/opt`.
    pub fn opt_dir(&self) -> PathBuf {
        self.root.join(PAYLOAD_SUBDIR)
    }
}

/// Where the payload for `full_name` is unpacked.
pub fn extraction_dir(work_dir: &Path, full_name: &str) -> PathBuf {
    work_dir.join(EXTRACTED_DIR).join(full_name)
}

/// Unpack the payload of `package` into its extraction directory.
///
/// On failure the partial tree stays on disk for diagnosis.
pub fn extract<R: CommandRunner + ?Sized>(
    runner: &R,
    package: &DownloadedPackage,
    full_name: &str,
    work_dir: &Path,
) -> Result<ExtractedTree> {
    let dest = extraction_dir(work_dir, full_name);
    fs::create_dir_all(&dest).map_err(|e| RepackError::io(&dest, e))?;

    runner.run(
        &Cmd::new("dpkg")
            .arg("-x")
            .arg_path(&package.path)
            .arg_path(&dest)
            .error_msg(format!("Could not unpack {}", package.filename)),
    )?;

    Ok(ExtractedTree::new(dest))
}
