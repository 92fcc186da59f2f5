//! Configuration management for agent-repack.
//!
//! Reads configuration from environment variables (a `.env` file is loaded
//! into the environment by `main` first). CLI flags are applied on top with
//! [`Config::apply`].

use std::path::{Path, PathBuf};

use crate::download::ARCHIVES_DIR;
use crate::error::{RepackError, Result};
use crate::extract::EXTRACTED_DIR;

pub const DEFAULT_REPO_HOST: &str = "repo.stackdriver.com";
pub const DEFAULT_APP_HOST: &str = "app.stackdriver.com";
pub const DEFAULT_PACKAGE: &str = "stackdriver-agent";
pub const DEFAULT_CACHE_DIR: &str = "stackdriver-agent";
pub const DEFAULT_SOURCES_LIST: &str = "/etc/apt/sources.list.d/stackdriver.list";

/// Where the package source and its signing key come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSettings {
    /// Host serving `<codename>.list` source descriptors.
    pub repo_host: String,
    /// Host serving the repository signing key.
    pub app_host: String,
    /// Destination of the source descriptor.
    pub sources_list: PathBuf,
    /// Run system-mutating commands through sudo.
    pub use_sudo: bool,
}

/// Resolved configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub repo: RepoSettings,
    /// Packages to fetch, in order, without duplicates.
    pub packages: Vec<String>,
    /// Download cache and extraction work directory.
    pub cache_dir: PathBuf,
    /// Destination of the repackaged tarballs.
    pub output_dir: PathBuf,
    /// Distribution codename; detected with lsb_release when unset.
    pub codename: Option<String>,
}

/// Values given on the command line. `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub repo_host: Option<String>,
    pub app_host: Option<String>,
    pub packages: Vec<String>,
    pub cache_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub codename: Option<String>,
    pub no_sudo: bool,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load(base_dir: &Path) -> Result<Self> {
        Self::from_lookup(base_dir, |key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Relative directories resolve against `base_dir`.
    pub fn from_lookup(base_dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let cache_dir = resolve_dir(
            base_dir,
            get("CACHE_DIR").unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string()),
        );
        let output_dir = get("OUTPUT_DIR")
            .map(|dir| resolve_dir(base_dir, dir))
            .unwrap_or_else(|| cache_dir.clone());

        let packages = match get("PACKAGES") {
            Some(list) => parse_package_list(list.split(',')),
            None => vec![DEFAULT_PACKAGE.to_string()],
        };

        let use_sudo = match get("USE_SUDO") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                RepackError::config(format!("USE_SUDO must be a boolean, got '{}'", value))
            })?,
            None => true,
        };

        let config = Self {
            repo: RepoSettings {
                repo_host: get("REPO_HOST").unwrap_or_else(|| DEFAULT_REPO_HOST.to_string()),
                app_host: get("APP_HOST").unwrap_or_else(|| DEFAULT_APP_HOST.to_string()),
                sources_list: get("SOURCES_LIST")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCES_LIST)),
                use_sudo,
            },
            packages,
            cache_dir,
            output_dir,
            codename: get("CODENAME"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded values.
    pub fn apply(mut self, base_dir: &Path, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(host) = overrides.repo_host {
            self.repo.repo_host = host;
        }
        if let Some(host) = overrides.app_host {
            self.repo.app_host = host;
        }
        if !overrides.packages.is_empty() {
            self.packages = parse_package_list(overrides.packages.iter().map(String::as_str));
        }
        if let Some(dir) = overrides.cache_dir {
            let follow = self.output_dir == self.cache_dir;
            self.cache_dir = resolve_dir(base_dir, dir);
            // OUTPUT_DIR defaults to the cache dir and keeps following it
            if follow && overrides.output_dir.is_none() {
                self.output_dir = self.cache_dir.clone();
            }
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = resolve_dir(base_dir, dir);
        }
        if overrides.codename.is_some() {
            self.codename = overrides.codename;
        }
        if overrides.no_sudo {
            self.repo.use_sudo = false;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.packages.is_empty() {
            return Err(RepackError::config("at least one package must be configured"));
        }
        if self.repo.repo_host.is_empty() || self.repo.app_host.is_empty() {
            return Err(RepackError::config("repository hosts must not be empty"));
        }
        // Cleanup deletes these subtrees, artifacts included
        for name in [ARCHIVES_DIR, EXTRACTED_DIR] {
            let transient = self.cache_dir.join(name);
            if self.output_dir.starts_with(&transient) {
                return Err(RepackError::config(format!(
                    "output directory {} is inside {}, which is removed after every run",
                    self.output_dir.display(),
                    transient.display()
                )));
            }
        }
        Ok(())
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  REPO_HOST:    {}", self.repo.repo_host);
        println!("  APP_HOST:     {}", self.repo.app_host);
        println!("  SOURCES_LIST: {}", self.repo.sources_list.display());
        println!("  USE_SUDO:     {}", self.repo.use_sudo);
        println!("  PACKAGES:     {}", self.packages.join(","));
        println!("  CACHE_DIR:    {}", self.cache_dir.display());
        println!("  OUTPUT_DIR:   {}", self.output_dir.display());
        match &self.codename {
            Some(codename) => println!("  CODENAME:     {}", codename),
            None => println!("  CODENAME:     (detected with lsb_release -sc)"),
        }
    }
}

fn resolve_dir(base_dir: &Path, dir: impl Into<PathBuf>) -> PathBuf {
    let path = dir.into();
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// Trim entries, drop empty ones and duplicates, keep first-seen order.
fn parse_package_list<'a>(entries: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut packages: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.trim();
        if !entry.is_empty() && !packages.iter().any(|p| p == entry) {
            packages.push(entry.to_string());
        }
    }
    packages
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
