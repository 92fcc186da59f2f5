//! Package download into a private apt cache.
//!
//! apt-get runs in download-only mode against `cache_dir` with locking
//! disabled; the build host is assumed to be exclusive. Downloaded archives
//! land in `{cache_dir}/archives`.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::{RepackError, Result};
use crate::process::{Cmd, CommandRunner};

/// Subdirectory of the cache where apt stores fetched archives.
pub const ARCHIVES_DIR: &str = "archives";

/// A fetched `.deb` archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedPackage {
    /// Package name as configured.
    pub name: String,
    /// Full path of the archive.
    pub path: PathBuf,
    /// Archive filename as apt wrote it.
    pub filename: String,
}

/// Download `names` into `cache_dir` and locate one archive per name.
///
/// A failing apt-get is an external command error. A successful apt-get
/// that leaves zero or several candidate archives for a name is a
/// precondition error.
pub fn download<R: CommandRunner + ?Sized>(
    runner: &R,
    names: &[String],
    cache_dir: &Path,
) -> Result<Vec<DownloadedPackage>> {
    fs::create_dir_all(cache_dir).map_err(|e| RepackError::io(cache_dir, e))?;

    println!("Downloading packages");
    runner.run(
        &Cmd::new("apt-get")
            .args(["install", "-y", "--download-only"])
            .args(names)
            .arg(format!("-o=dir::cache={}", cache_dir.display()))
            .args(["-o", "Debug::NoLocking=1"]),
    )?;

    names
        .iter()
        .map(|name| -> Result<DownloadedPackage> {
            let package = locate_package(cache_dir, name)?;
            println!("Downloaded {}", package.filename);
            Ok(package)
        })
        .collect()
}

/// Find the single archive matching `{name}*.deb` under `{cache_dir}/archives`.
pub fn locate_package(cache_dir: &Path, name: &str) -> Result<DownloadedPackage> {
    let archives = cache_dir.join(ARCHIVES_DIR);
    let pattern_text = format!("{}*.deb", Pattern::escape(name));
    let pattern = Pattern::new(&pattern_text).map_err(|e| {
        RepackError::precondition(format!("invalid package name '{}': {}", name, e))
    })?;

    let entries = fs::read_dir(&archives).map_err(|e| {
        RepackError::precondition(format!(
            "cannot read archive directory {} after download: {}",
            archives.display(),
            e
        ))
    })?;

    let mut matches: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RepackError::io(&archives, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        if pattern.matches(&filename) {
            matches.push((filename, path));
        }
    }
    matches.sort();

    match matches.len() {
        1 => {
            let (filename, path) = matches.remove(0);
            Ok(DownloadedPackage {
                name: name.to_string(),
                path,
                filename,
            })
        }
        0 => Err(RepackError::precondition(format!(
            "no archive matching {} in {}",
            pattern_text,
            archives.display()
        ))),
        n => Err(RepackError::precondition(format!(
            "{} archives match {} in {}: {}",
            n,
            pattern_text,
            archives.display(),
            matches
                .iter()
                .map(|(f, _)| f.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedRunner;
    use crate::process::CommandResult;
    use tempfile::TempDir;

    fn cache_with(files: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        let archives = temp.path().join(ARCHIVES_DIR);
        fs::create_dir_all(archives.join("partial")).unwrap();
        for file in files {
            fs::write(archives.join(file), b"!<arch>\n").unwrap();
        }
        temp
    }

    #[test]
    fn test_locate_single_match() {
        let cache = cache_with(&["agent_1.2.3_amd64.bionic.deb", "lock"]);
        let package = locate_package(cache.path(), "agent").unwrap();
        assert_eq!(package.name, "agent");
        assert_eq!(package.filename, "agent_1.2.3_amd64.bionic.deb");
        assert_eq!(
            package.path,
            cache.path().join("archives/agent_1.2.3_amd64.bionic.deb")
        );
    }

    #[test]
    fn test_locate_no_match_is_precondition() {
        let cache = cache_with(&["extractor_1.0_amd64.bionic.deb"]);
        let err = locate_package(cache.path(), "agent").unwrap_err();
        assert!(err.is_precondition());
        assert!(err.to_string().contains("agent*.deb"));
    }

    #[test]
    fn test_locate_two_matches_is_precondition() {
        let cache = cache_with(&[
            "agent_1.2.3_amd64.bionic.deb",
            "agent-plugins_1.2.3_amd64.bionic.deb",
        ]);
        let err = locate_package(cache.path(), "agent").unwrap_err();
        assert!(err.is_precondition());
        let msg = err.to_string();
        assert!(msg.contains("2 archives"));
        assert!(msg.contains("agent-plugins_1.2.3_amd64.bionic.deb"));
    }

    #[test]
    fn test_locate_missing_archives_dir() {
        let temp = TempDir::new().unwrap();
        assert!(locate_package(temp.path(), "agent")
            .unwrap_err()
            .is_precondition());
    }

    #[test]
    fn test_locate_escapes_glob_metacharacters() {
        let cache = cache_with(&["agent[x]_1_amd64.bionic.deb", "agentx_1_amd64.bionic.deb"]);
        let package = locate_package(cache.path(), "agent[x]").unwrap();
        assert_eq!(package.filename, "agent[x]_1_amd64.bionic.deb");
    }

    #[test]
    fn test_download_invokes_apt_get_download_only() {
        let cache = cache_with(&[
            "agent_1.2.3_amd64.bionic.deb",
            "extractor_2.0_amd64.bionic.deb",
        ]);
        let runner = ScriptedRunner::new();
        let names = vec!["agent".to_string(), "extractor".to_string()];

        let packages = download(&runner, &names, cache.path()).unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[1].filename, "extractor_2.0_amd64.bionic.deb");

        let log = runner.log.borrow();
        assert_eq!(log.len(), 1);
        assert!(!log[0].is_privileged());
        let args = log[0].arguments();
        assert_eq!(&args[..5], &["install", "-y", "--download-only", "agent", "extractor"]);
        assert!(args.contains(&format!("-o=dir::cache={}", cache.path().display())));
        assert!(args.contains(&"Debug::NoLocking=1".to_string()));
    }

    #[test]
    fn test_download_failure_is_external_not_precondition() {
        let cache = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("apt-get", |_| {
            CommandResult::failed(100, "E: Unable to locate package agent")
        });
        let err = download(&runner, &["agent".to_string()], cache.path()).unwrap_err();
        assert!(err.is_external());
        assert!(err.to_string().contains("Unable to locate package"));
    }
}
