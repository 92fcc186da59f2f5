//! Shared test utilities for agent-repack tests.
//!
//! [`FakeRunner`] stands in for the host: it answers curl, apt and dpkg
//! from a scripted package set and hands `tar` to the real system so the
//! produced archives can be listed.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use agent_repack::config::Config;
use agent_repack::error::Result;
use agent_repack::process::{Cmd, CommandResult, CommandRunner, SystemRunner};
use tempfile::TempDir;

pub const SIGNING_KEY: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----\nfake\n-----END PGP PUBLIC KEY BLOCK-----\n";

/// Test environment with a temporary cache and output directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache_dir = temp_dir.path().join("cache");
        let output_dir = temp_dir.path().join("out");
        Self {
            _temp_dir: temp_dir,
            cache_dir,
            output_dir,
        }
    }

    /// Configuration for `packages` without sudo; the codename is detected.
    pub fn config(&self, packages: &[&str]) -> Config {
        let mut vars = HashMap::new();
        vars.insert("PACKAGES", packages.join(","));
        vars.insert("CACHE_DIR", self.cache_dir.display().to_string());
        vars.insert("OUTPUT_DIR", self.output_dir.display().to_string());
        vars.insert("USE_SUDO", "0".to_string());
        vars.insert("REPO_HOST", "repo.example.com".to_string());
        vars.insert("APP_HOST", "app.example.com".to_string());
        Config::from_lookup(self._temp_dir.path(), |key| vars.get(key).cloned())
            .expect("test config should be valid")
    }
}

/// Scripted stand-in for the host's curl, apt-get, apt-key, dpkg and lsb_release.
#[derive(Default)]
pub struct FakeRunner {
    /// Archive filenames apt-get "downloads" into `<cache>/archives`.
    pub archives: Vec<String>,
    /// Files (relative to the extraction root) each archive unpacks to.
    pub payloads: HashMap<String, Vec<String>>,
    pub fail_key_fetch: bool,
    pub fail_download: bool,
    /// Archives whose `dpkg -x` fails after writing a partial tree.
    pub fail_extract: Vec<String>,
    /// Replace `<cache>/archives` with a plain file after a successful
    /// `dpkg -x`, so cleanup cannot remove it as a directory.
    pub clobber_archives: bool,
    pub codename: String,
    pub log: RefCell<Vec<Cmd>>,
}

impl FakeRunner {
    pub fn with_archives(archives: &[&str]) -> Self {
        let mut runner = Self {
            codename: "bionic".to_string(),
            ..Default::default()
        };
        for archive in archives {
            runner.add_archive(archive, default_payload(archive));
        }
        runner
    }

    pub fn add_archive(&mut self, filename: &str, payload: Vec<String>) {
        self.archives.push(filename.to_string());
        self.payloads.insert(filename.to_string(), payload);
    }

    pub fn programs(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .map(|c| c.program().to_string())
            .collect()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.log.borrow().iter().map(Cmd::command_line).collect()
    }

    /// True if any recorded command ran `program` with `arg`.
    pub fn ran(&self, program: &str, arg: &str) -> bool {
        self.log
            .borrow()
            .iter()
            .any(|c| c.program() == program && c.arguments().iter().any(|a| a == arg))
    }

    fn respond(&self, cmd: &Cmd) -> CommandResult {
        let args = cmd.arguments();
        match cmd.program() {
            "lsb_release" => CommandResult::ok(format!("{}\n", self.codename)),
            "curl" if args.iter().any(|a| a.ends_with("RPM-GPG-KEY-stackdriver")) => {
                if self.fail_key_fetch {
                    CommandResult::failed(22, "curl: (22) The requested URL returned error: 404")
                } else {
                    CommandResult::ok(SIGNING_KEY)
                }
            }
            "apt-get" if args.first().map(String::as_str) == Some("install") => {
                if self.fail_download {
                    return CommandResult::failed(100, "E: Failed to fetch");
                }
                let cache = args
                    .iter()
                    .find_map(|a| a.strip_prefix("-o=dir::cache="))
                    .expect("apt-get install without dir::cache");
                self.populate_cache(Path::new(cache));
                CommandResult::ok("")
            }
            "dpkg" => {
                let archive = Path::new(&args[1]);
                let dest = Path::new(&args[2]);
                let filename = archive.file_name().unwrap().to_string_lossy().into_owned();
                let result = self.unpack(&filename, dest);
                if result.success() && self.clobber_archives {
                    let archives = archive.parent().unwrap();
                    fs::remove_dir_all(archives).unwrap();
                    fs::write(archives, b"not a directory").unwrap();
                }
                result
            }
            _ => CommandResult::ok(""),
        }
    }

    fn populate_cache(&self, cache: &Path) {
        let archives = cache.join("archives");
        fs::create_dir_all(archives.join("partial")).unwrap();
        fs::write(archives.join("lock"), b"").unwrap();
        for archive in &self.archives {
            fs::write(archives.join(archive), b"!<arch>\ndebian-binary\n").unwrap();
        }
        fs::write(cache.join("pkgcache.bin"), b"cache").unwrap();
        fs::write(cache.join("srcpkgcache.bin"), b"cache").unwrap();
    }

    fn unpack(&self, filename: &str, dest: &Path) -> CommandResult {
        let files = self.payloads.get(filename).cloned().unwrap_or_default();
        let failing = self.fail_extract.iter().any(|f| f == filename);
        let files = if failing { &files[..files.len().min(1)] } else { &files[..] };

        for file in files {
            let path = dest.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("{}\n", file)).unwrap();
        }

        if failing {
            CommandResult::failed(2, "dpkg-deb: error: unexpected end of file in archive")
        } else {
            CommandResult::ok("")
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmd: &Cmd) -> Result<CommandResult> {
        self.log.borrow_mut().push(cmd.clone());
        if cmd.program() == "tar" {
            return SystemRunner.run(cmd);
        }
        let result = self.respond(cmd);
        if result.success() {
            Ok(result)
        } else {
            Err(cmd.failure(result.code, &result.stderr))
        }
    }
}

/// Package name of an apt archive filename (`name_version_arch...`).
pub fn package_of(filename: &str) -> &str {
    filename.split('_').next().unwrap_or(filename)
}

/// A payload with an `/opt` tree plus files that must not be repackaged.
pub fn default_payload(filename: &str) -> Vec<String> {
    let pkg = package_of(filename);
    vec![
        format!("opt/{pkg}/bin/{pkg}"),
        format!("opt/{pkg}/etc/{pkg}.conf"),
        format!("usr/share/doc/{pkg}/copyright"),
        format!("etc/default/{pkg}"),
    ]
}

/// Relative paths inside a `.tgz`, without `./` prefixes or the root entry.
pub fn tarball_entries(path: &Path) -> Vec<String> {
    let listing = SystemRunner
        .run(&Cmd::new("tar").arg("tzf").arg_path(path))
        .expect("tar should list the artifact");
    let mut entries: Vec<String> = listing
        .stdout
        .lines()
        .map(|l| l.trim_start_matches("./").trim_end_matches('/').to_string())
        .filter(|l| !l.is_empty() && l != ".")
        .collect();
    entries.sort();
    entries
}

pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "Expected file at {}", path.display());
}

pub fn assert_absent(path: &Path) {
    assert!(!path.exists(), "Expected {} to be removed", path.display());
}
