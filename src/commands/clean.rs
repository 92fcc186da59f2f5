//! Clean command - removes state left behind by a failed run.

use anyhow::{bail, Result};

use agent_repack::clean;
use agent_repack::config::Config;

/// Execute the clean command.
///
/// Artifacts in the output directory are never touched.
pub fn cmd_clean(config: &Config) -> Result<()> {
    println!("Cleaning {}...", config.cache_dir.display());
    let report = clean::cleanup(&config.cache_dir);
    if !report.is_clean() {
        bail!(
            "{} path(s) could not be removed",
            report.warnings.len()
        );
    }
    Ok(())
}
