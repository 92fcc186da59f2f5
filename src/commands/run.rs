//! Run command - the full fetch and repackage pipeline.

use anyhow::{Context, Result};

use agent_repack::config::Config;
use agent_repack::pipeline::Pipeline;
use agent_repack::process::SystemRunner;

/// Execute the pipeline against the host.
pub fn cmd_run(config: &Config) -> Result<()> {
    println!(
        "Repackaging {} package(s) into {}\n",
        config.packages.len(),
        config.output_dir.display()
    );

    let mut pipeline = Pipeline::new(config, &SystemRunner);
    match pipeline.run() {
        Ok(report) => {
            println!("\nProduced {} artifact(s):", report.artifacts.len());
            for artifact in &report.artifacts {
                println!("  {}", artifact.path.display());
            }
            if !report.cleanup.is_clean() {
                println!(
                    "{} cleanup warning(s); leftover state can be removed with 'agent-repack clean'",
                    report.cleanup.warnings.len()
                );
            }
            Ok(())
        }
        Err(failure) => {
            if !failure.artifacts.is_empty() {
                println!("\nArtifacts written before the failure (kept):");
                for artifact in &failure.artifacts {
                    println!("  {}", artifact.path.display());
                }
            }
            println!(
                "Work state left in {} for diagnosis.",
                config.cache_dir.display()
            );
            let stage = failure.stage.clone();
            Err(failure).with_context(|| format!("repackaging stopped after '{}'", stage))
        }
    }
}
