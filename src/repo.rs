//! Package repository registration.
//!
//! Adds the agent's apt source and signing key, then refreshes the index.
//! This mutates system-wide apt state: never run two instances against the
//! same host.

use crate::config::RepoSettings;
use crate::error::{RepackError, Result};
use crate::process::{Cmd, CommandRunner};

/// Path of the signing key on the key server.
pub const SIGNING_KEY_PATH: &str = "RPM-GPG-KEY-stackdriver";

/// URL of the source descriptor for a distribution codename.
pub fn sources_list_url(repo_host: &str, codename: &str) -> String {
    format!("https://{}/{}.list", repo_host, codename)
}

/// URL of the repository signing key.
pub fn signing_key_url(app_host: &str) -> String {
    format!("https://{}/{}", app_host, SIGNING_KEY_PATH)
}

/// Read the host's distribution codename (`lsb_release -sc`).
pub fn detect_codename<R: CommandRunner + ?Sized>(runner: &R) -> Result<String> {
    let result = runner.run(&Cmd::new("lsb_release").arg("-sc"))?;
    let codename = result.stdout_trimmed();
    if codename.is_empty() {
        return Err(RepackError::precondition(
            "lsb_release -sc printed no distribution codename",
        ));
    }
    Ok(codename.to_string())
}

/// Register the package source and its key, then update the apt cache.
///
/// Stops at the first failing command; a failed key fetch never reaches
/// `apt-key` or `apt-get update`.
pub fn configure<R: CommandRunner + ?Sized>(
    runner: &R,
    repo: &RepoSettings,
    codename: &str,
) -> Result<()> {
    println!("Adding apt repository for {}", codename);

    runner.run(
        &Cmd::new("curl")
            .args(["-s", "-S", "-f", "-o"])
            .arg_path(&repo.sources_list)
            .arg(sources_list_url(&repo.repo_host, codename))
            .privileged(repo.use_sudo),
    )?;

    let key = runner.run(
        &Cmd::new("curl")
            .args(["-s", "-f"])
            .arg(signing_key_url(&repo.app_host))
            .error_msg("Could not fetch the repository signing key"),
    )?;
    if key.stdout_trimmed().is_empty() {
        return Err(RepackError::precondition(format!(
            "signing key download from {} was empty",
            signing_key_url(&repo.app_host)
        )));
    }

    runner.run(
        &Cmd::new("apt-key")
            .args(["add", "-"])
            .stdin(key.stdout.into_bytes())
            .privileged(repo.use_sudo),
    )?;

    println!("Updating apt cache");
    runner.run(
        &Cmd::new("apt-get")
            .args(["-q", "update"])
            .privileged(repo.use_sudo),
    )?;

    Ok(())
}
