//! Host tool availability checks.

use super::types::CheckResult;

/// Tools every run needs, with the Debian package that ships them.
pub const REQUIRED_TOOLS: &[(&str, &str, &str)] = &[
    ("apt-get", "apt", "Required to refresh the index and download packages"),
    ("apt-key", "apt", "Required to trust the repository signing key"),
    ("dpkg", "dpkg", "Required to extract package payloads"),
    ("tar", "tar", "Required to build the output tarballs"),
    ("curl", "curl", "Required to fetch the source list and signing key"),
];

/// Check host tools are installed.
pub fn check_host_tools(use_sudo: bool, codename_configured: bool) -> Vec<CheckResult> {
    let mut results: Vec<CheckResult> = REQUIRED_TOOLS
        .iter()
        .map(|(tool, package, purpose)| check_tool_exists(tool, package, purpose, true))
        .collect();

    // Only needed when the codename has to be detected
    results.push(check_tool_exists(
        "lsb_release",
        "lsb-release",
        "Required to detect the distribution codename (or set CODENAME)",
        !codename_configured,
    ));

    if use_sudo {
        results.push(check_tool_exists(
            "sudo",
            "sudo",
            "Required for repository setup (or set USE_SUDO=0 when running as root)",
            true,
        ));
    }

    results
}

fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        Err(_) => {
            let msg = format!("Not found. Install '{}' package. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}
