//! Fetch and repackage pipeline.
//!
//! Stages run strictly in order:
//!
//! ```text
//! Start -> RepoConfigured -> PackagesDownloaded
//!       -> { NameDerived -> Extracted -> Repackaged }*   (per package)
//!       -> CleanedUp -> Done
//! ```
//!
//! The first error moves the pipeline to `Failed` and stops it. Artifacts
//! already written stay on disk and nothing is cleaned, so the failed
//! package's state can be inspected.

use std::fmt;

use thiserror::Error;

use crate::clean::{self, CleanupReport};
use crate::config::Config;
use crate::download;
use crate::error::{RepackError, Result};
use crate::extract;
use crate::naming::derive_full_name;
use crate::process::CommandRunner;
use crate::repackage::{self, RepackagedArtifact};
use crate::repo;
use crate::timing::Timer;

/// Position in the pipeline state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Start,
    RepoConfigured,
    PackagesDownloaded,
    NameDerived(String),
    Extracted(String),
    Repackaged(String),
    CleanedUp,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Start => write!(f, "start"),
            Stage::RepoConfigured => write!(f, "repository configured"),
            Stage::PackagesDownloaded => write!(f, "packages downloaded"),
            Stage::NameDerived(pkg) => write!(f, "name derived for {}", pkg),
            Stage::Extracted(pkg) => write!(f, "{} extracted", pkg),
            Stage::Repackaged(pkg) => write!(f, "{} repackaged", pkg),
            Stage::CleanedUp => write!(f, "cleaned up"),
            Stage::Done => write!(f, "done"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub artifacts: Vec<RepackagedArtifact>,
    pub cleanup: CleanupReport,
}

/// A run that stopped early.
#[derive(Debug, Error)]
#[error("pipeline failed after stage '{stage}': {error}")]
pub struct PipelineFailure {
    /// Last stage reached before the error.
    pub stage: Stage,
    #[source]
    pub error: RepackError,
    /// Artifacts written before the failure; they are not rolled back.
    pub artifacts: Vec<RepackagedArtifact>,
}

pub struct Pipeline<'a, R: CommandRunner + ?Sized> {
    config: &'a Config,
    runner: &'a R,
    stage: Stage,
}

impl<'a, R: CommandRunner + ?Sized> Pipeline<'a, R> {
    pub fn new(config: &'a Config, runner: &'a R) -> Self {
        Self {
            config,
            runner,
            stage: Stage::Start,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Run every stage to completion or to the first failure.
    pub fn run(&mut self) -> std::result::Result<RunReport, PipelineFailure> {
        let mut artifacts = Vec::new();
        match self.execute(&mut artifacts) {
            Ok(cleanup) => {
                self.advance(Stage::Done);
                Ok(RunReport { artifacts, cleanup })
            }
            Err(error) => {
                let stage = std::mem::replace(&mut self.stage, Stage::Failed);
                tracing::error!(stage = %stage, error = %error, "pipeline failed");
                Err(PipelineFailure {
                    stage,
                    error,
                    artifacts,
                })
            }
        }
    }

    fn execute(&mut self, artifacts: &mut Vec<RepackagedArtifact>) -> Result<CleanupReport> {
        let config = self.config;
        let runner = self.runner;

        let codename = match &config.codename {
            Some(codename) => codename.clone(),
            None => repo::detect_codename(runner)?,
        };

        let timer = Timer::start("repository");
        repo::configure(runner, &config.repo, &codename)?;
        timer.finish();
        self.advance(Stage::RepoConfigured);

        let timer = Timer::start("download");
        let packages = download::download(runner, &config.packages, &config.cache_dir)?;
        timer.finish();
        self.advance(Stage::PackagesDownloaded);

        for package in &packages {
            let timer = Timer::start(format!("repackage {}", package.name));

            let full_name = derive_full_name(&package.filename);
            if full_name.is_empty() {
                return Err(RepackError::precondition(format!(
                    "cannot derive an artifact name from {}",
                    package.filename
                )));
            }
            self.advance(Stage::NameDerived(package.name.clone()));

            let tree = extract::extract(runner, package, &full_name, &config.cache_dir)?;
            self.advance(Stage::Extracted(package.name.clone()));

            let artifact = repackage::repackage(runner, &tree, &full_name, &config.output_dir)?;
            artifacts.push(artifact);
            self.advance(Stage::Repackaged(package.name.clone()));

            timer.finish();
        }

        let report = clean::cleanup(&config.cache_dir);
        self.advance(Stage::CleanedUp);
        Ok(report)
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }
}
