//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};
use serde::Serialize;

/// A command to execute: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    /// The program to run (e.g., "cmake", "mingw32-make.exe")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Working directory, if different from the current one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Display the command for logs and error messages.
    ///
    /// Arguments containing spaces are wrapped in double quotes so the line
    /// can be pasted into a shell.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| {
            if a.contains(' ') {
                format!("\"{}\"", a)
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }

    /// Convert into a process builder for execution.
    pub fn to_process(&self) -> ProcessBuilder {
        let mut pb = ProcessBuilder::new(&self.program).args(&self.args);
        if let Some(ref cwd) = self.cwd {
            pb = pb.cwd(cwd);
        }
        pb
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command with captured output and wait for completion.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))
    }

    /// Execute with inherited stdio and return the exit code.
    ///
    /// A process killed by a signal reports `-1`.
    pub fn status(&self) -> Result<i32> {
        let mut cmd = self.build_command();
        let status = cmd
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))?;
        Ok(status.code().unwrap_or(-1))
    }
}

/// Result of running a command through a [`CommandRunner`].
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Exit code (0 = success, -1 when terminated by a signal)
    pub code: i32,
    /// Captured stderr, empty when output was streamed
    pub stderr: String,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs external commands.
///
/// The install procedure only talks to subprocesses through this trait so the
/// command sequence can be scripted in tests.
pub trait CommandRunner {
    fn run(&mut self, cmd: &CommandSpec) -> Result<RunOutcome>;
}

/// Runs commands on the host.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    /// Stream child output to the terminal instead of capturing it.
    pub stream: bool,
}

impl SystemRunner {
    pub fn new(stream: bool) -> Self {
        SystemRunner { stream }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, cmd: &CommandSpec) -> Result<RunOutcome> {
        tracing::debug!("running `{}`", cmd.display_command());
        let process = cmd.to_process();

        if self.stream {
            let code = process.status()?;
            return Ok(RunOutcome {
                code,
                stderr: String::new(),
            });
        }

        let output = process.exec()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            tracing::trace!("{}", line);
        }

        Ok(RunOutcome {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find CMake.
pub fn find_cmake() -> Option<PathBuf> {
    find_executable("cmake")
}
