//! Centralized command execution with consistent error handling.
//!
//! Stages describe the command they need as a [`Cmd`] and hand it to a
//! [`CommandRunner`]. The runner is a trait so tests can substitute a fake
//! that records commands instead of touching the host.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::error::{RepackError, Result};

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    /// Exit code, or -1 if terminated by signal.
    pub code: i32,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandResult {
    /// A successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Description of a single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
    /// Run through `sudo`.
    privileged: bool,
    /// Custom error message prefix.
    error_prefix: Option<String>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            current_dir: None,
            stdin: None,
            privileged: false,
            error_prefix: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Bytes to write to the child's stdin.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Prefix the command with `sudo` when `enabled`.
    pub fn privileged(mut self, enabled: bool) -> Self {
        self.privileged = enabled;
        self
    }

    /// Set a custom error message prefix.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    /// The program as written, ignoring `sudo`.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments as written, ignoring `sudo`.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    pub fn stdin_bytes(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    pub fn current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn error_prefix(&self) -> Option<&str> {
        self.error_prefix.as_deref()
    }

    /// The error a runner reports when this command exits with `code`.
    ///
    /// The error prefix, if set, leads the captured stderr.
    pub fn failure(&self, code: i32, stderr: &str) -> RepackError {
        let stderr = stderr.trim();
        let stderr = match (&self.error_prefix, stderr.is_empty()) {
            (Some(prefix), true) => prefix.clone(),
            (Some(prefix), false) => format!("{}\n{}", prefix, stderr),
            (None, _) => stderr.to_string(),
        };
        RepackError::ExternalCommand {
            command: self.command_line(),
            code,
            stderr,
        }
    }

    /// Program and arguments as they will actually be executed.
    pub fn argv(&self) -> Vec<&str> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        if self.privileged {
            argv.push("sudo");
        }
        argv.push(self.program.as_str());
        argv.extend(self.args.iter().map(String::as_str));
        argv
    }

    /// Render the command as a single line for logs and error messages.
    pub fn command_line(&self) -> String {
        self.argv()
            .iter()
            .map(|a| {
                if a.is_empty() || a.contains(char::is_whitespace) {
                    format!("'{}'", a)
                } else {
                    (*a).to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Executes commands on behalf of the pipeline stages.
///
/// Implementations must return `Err(RepackError::ExternalCommand)` for any
/// non-zero exit; callers never inspect the exit code themselves.
pub trait CommandRunner {
    fn run(&self, cmd: &Cmd) -> Result<CommandResult>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, cmd: &Cmd) -> Result<CommandResult> {
        (**self).run(cmd)
    }
}

/// Runs commands on the host, blocking until each one exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &Cmd) -> Result<CommandResult> {
        let command_line = cmd.command_line();
        tracing::debug!(command = %command_line, "running");

        let argv = cmd.argv();
        let mut command = Command::new(argv[0]);
        command.args(&argv[1..]);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.stdin(if cmd.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        if let Some(ref dir) = cmd.current_dir {
            command.current_dir(dir);
        }

        let not_run = |e: io::Error| {
            cmd.failure(
                -1,
                &format!("failed to execute '{}': {}. Is it installed?", argv[0], e),
            )
        };

        let mut child = command.spawn().map_err(not_run)?;
        let stdin = child.stdin.take();

        // Feed stdin from a second thread while output is drained here, so a
        // child that writes before it finishes reading cannot stall on a full pipe.
        let (output, written) = thread::scope(|scope| {
            let writer = match (cmd.stdin.as_deref(), stdin) {
                (Some(input), Some(mut pipe)) => {
                    Some(scope.spawn(move || pipe.write_all(input)))
                }
                _ => None,
            };
            let output = child.wait_with_output();
            let written = match writer {
                Some(handle) => handle
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked"))),
                None => Ok(()),
            };
            (output, written)
        });
        let output = output.map_err(not_run)?;

        let result = CommandResult {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            tracing::debug!(command = %command_line, code = result.code, "command failed");
            return Err(cmd.failure(result.code, &result.stderr));
        }

        match written {
            // The child exited successfully without needing the rest of its input
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Err(e) => {
                return Err(cmd.failure(-1, &format!("failed to write stdin: {}", e)));
            }
            Ok(()) => {}
        }

        Ok(result)
    }
}
