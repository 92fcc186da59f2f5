//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `run` - Fetch and repackage (the default)
//! - `clean` - Remove transient work state
//! - `show` - Display information
//! - `preflight` - Check host tools and directories

pub mod clean;
mod preflight;
mod run;
pub mod show;

pub use clean::cmd_clean;
pub use preflight::cmd_preflight;
pub use run::cmd_run;
pub use show::cmd_show;
