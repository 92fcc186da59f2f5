//! Host environment checks (distribution family, writable directories).

use std::fs;
use std::path::Path;

use crate::config::Config;

use super::types::CheckResult;

/// Check the host can run the pipeline with this configuration.
pub fn check_environment(config: &Config, debian_marker: &Path) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if debian_marker.exists() {
        results.push(CheckResult::pass("Debian-family host"));
    } else {
        results.push(CheckResult::fail(
            "Debian-family host",
            &format!(
                "{} not found - apt and dpkg are required",
                debian_marker.display()
            ),
        ));
    }

    results.push(check_writable("cache dir", &config.cache_dir));
    if config.output_dir != config.cache_dir {
        results.push(check_writable("output dir", &config.output_dir));
    }

    results
}

/// Check a directory exists (creating it if needed) and accepts writes.
fn check_writable(name: &str, dir: &Path) -> CheckResult {
    if let Err(e) = fs::create_dir_all(dir) {
        return CheckResult::fail(name, &format!("Cannot create {}: {}", dir.display(), e));
    }

    let probe = dir.join(".preflight-test");
    match fs::write(&probe, "test") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            CheckResult::pass_with(name, &dir.display().to_string())
        }
        Err(e) => CheckResult::fail(name, &format!("Cannot write to {}: {}", dir.display(), e)),
    }
}
