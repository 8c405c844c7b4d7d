//! Install errors with actionable help text.
//!
//! Every failure the install procedure can diagnose on its own is a
//! [`StageError`]. The binary downcasts to it to print the `help:` line.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// A failure of the install procedure.
#[derive(Debug, Error, Diagnostic)]
pub enum StageError {
    #[error("{arch} with {pointer_width}-bit pointers is not supported")]
    #[diagnostic(
        code(libstage::platform::unsupported),
        help("Only 64-bit hosts are supported; install a 64-bit toolchain and interpreter")
    )]
    UnsupportedPlatform { arch: String, pointer_width: u32 },

    #[error("CMake not found")]
    #[diagnostic(
        code(libstage::tool::cmake),
        help("Install CMake and ensure it's in your PATH")
    )]
    CMakeNotFound,

    #[error("build tool `{tool}` not found")]
    #[diagnostic(
        code(libstage::tool::build),
        help("Install `{tool}` or choose another toolchain with --windows-toolchain")
    )]
    BuildToolNotFound { tool: String },

    #[error("{what} is not set")]
    #[diagnostic(
        code(libstage::env::missing),
        help("Pass {flag} or set the {var} environment variable")
    )]
    MissingVariable {
        what: &'static str,
        flag: &'static str,
        var: &'static str,
    },

    #[error("no CMake target configured")]
    #[diagnostic(
        code(libstage::config::target),
        help("Pass --target or set `build.target` in .libstage/config.toml")
    )]
    MissingTarget,

    #[error("copying {} to {} failed", from.display(), to.display())]
    #[diagnostic(code(libstage::stage::cmakelists))]
    StagingFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with exit code {code}")]
    #[diagnostic(
        code(libstage::command::failed),
        help("Re-run with --verbose to stream the tool output")
    )]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("none of the Visual Studio generators could configure the project (tried: {})", tried.join(", "))]
    #[diagnostic(code(libstage::configure::generators))]
    GeneratorsExhausted { tried: Vec<String> },

    #[error("cannot find {file} (searched: {})", display_paths(searched))]
    #[diagnostic(
        code(libstage::artifact::missing),
        help("Check that the build produced the library, or pass --library to match its file name")
    )]
    ArtifactNotFound { file: String, searched: Vec<PathBuf> },
}

impl StageError {
    /// Last lines of captured stderr for a failed command, if any.
    pub fn stderr_tail(&self, lines: usize) -> Option<String> {
        match self {
            StageError::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => {
                let all: Vec<&str> = stderr.lines().collect();
                let start = all.len().saturating_sub(lines);
                Some(all[start..].join("\n"))
            }
            _ => None,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
