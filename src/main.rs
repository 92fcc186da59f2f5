//! agent-repack - fetch agent packages and repackage them for release.
//!
//! Adds the agent apt repository, downloads the configured `.deb` files
//! without installing them, and turns each package's `/opt` payload into
//! `<package>_<version>_<arch>.tgz`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use agent_repack::config::{Config, ConfigOverrides};

#[derive(Parser)]
#[command(name = "agent-repack")]
#[command(about = "Fetch agent packages and repackage them as release tarballs")]
#[command(
    after_help = "QUICK START:\n  agent-repack preflight  Check host tools\n  agent-repack            Fetch and repackage\n  agent-repack clean      Remove state left by a failed run"
)]
struct Cli {
    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags layered over `.env` and the environment.
#[derive(Args)]
struct OverrideArgs {
    /// Host serving `<codename>.list` (env: REPO_HOST)
    #[arg(long, global = true)]
    repo_host: Option<String>,

    /// Host serving the signing key (env: APP_HOST)
    #[arg(long, global = true)]
    app_host: Option<String>,

    /// Package to fetch; repeat for several (env: PACKAGES, comma-separated)
    #[arg(short, long = "package", global = true)]
    packages: Vec<String>,

    /// Download cache and work directory (env: CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Where tarballs are written (env: OUTPUT_DIR, default: cache dir)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Distribution codename instead of `lsb_release -sc` (env: CODENAME)
    #[arg(long, global = true)]
    codename: Option<String>,

    /// Run repository setup without sudo (env: USE_SUDO=0)
    #[arg(long, global = true)]
    no_sudo: bool,
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            repo_host: args.repo_host,
            app_host: args.app_host,
            packages: args.packages,
            cache_dir: args.cache_dir,
            output_dir: args.output_dir,
            codename: args.codename,
            no_sudo: args.no_sudo,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add the repository, download, repackage and clean up (default)
    Run,

    /// Remove extracted trees, downloaded archives and apt caches
    Clean,

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Check host tools and directories before a run
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show resolved configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base_dir = std::env::current_dir().context("Cannot determine current directory")?;

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load(&base_dir)
        .and_then(|config| config.apply(&base_dir, cli.overrides.into()))
        .context("Invalid configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::cmd_run(&config)?,
        Commands::Clean => commands::cmd_clean(&config)?,
        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
            };
            commands::cmd_show(show_target, &config)?;
        }
        Commands::Preflight { strict } => commands::cmd_preflight(&config, strict)?,
    }

    Ok(())
}
