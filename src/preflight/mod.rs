//! Preflight checks for a repackaging run.
//!
//! Validates host tools and directories before touching apt state.
//! Run with `agent-repack preflight` to check everything is ready.

mod environment;
mod host_tools;
mod types;

use std::path::Path;

use anyhow::{bail, Result};

use crate::config::Config;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Marker file present on Debian-family hosts.
const DEBIAN_MARKER: &str = "/etc/debian_version";

/// Run all preflight checks.
pub fn run_preflight(config: &Config) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools(
        config.repo.use_sudo,
        config.codename.is_some(),
    ));

    println!("Checking environment...");
    checks.extend(environment::check_environment(config, Path::new(DEBIAN_MARKER)));

    println!();

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(config: &Config) -> Result<()> {
    let report = run_preflight(config);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before running.",
            report.fail_count()
        );
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
