//! Show command - displays information.

use anyhow::Result;

use agent_repack::config::Config;
use agent_repack::repo;

/// Show target for the show command.
pub enum ShowTarget {
    /// Resolved configuration and the URLs it implies
    Config,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => {
            config.print();
            println!();
            println!("Repository:");
            match &config.codename {
                Some(codename) => println!(
                    "  source list:  {}",
                    repo::sources_list_url(&config.repo.repo_host, codename)
                ),
                None => println!(
                    "  source list:  https://{}/<codename>.list",
                    config.repo.repo_host
                ),
            }
            println!(
                "  signing key:  {}",
                repo::signing_key_url(&config.repo.app_host)
            );
        }
    }
    Ok(())
}
