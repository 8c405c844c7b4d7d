//! Test utilities for libstage unit tests.
//!
//! [`MockRunner`] stands in for the host when the install procedure runs
//! external tools: it records every command line, answers with scripted exit
//! codes and can drop files on disk to imitate a build producing a library.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut runner = MockRunner::new();
//! runner.fail_on("Visual Studio 17 2022", 1);
//! runner.produce_on_program("make", layout.source_dir.join("lib_demo.so"), "ELF");
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::util::process::{CommandRunner, CommandSpec, RunOutcome};

pub use fixtures::*;

/// Which commands a rule applies to.
#[derive(Debug, Clone)]
enum Matcher {
    /// Displayed command line contains the text
    Line(String),
    /// Program file stem equals the name (`make` never matches `cmake`)
    Program(String),
}

impl Matcher {
    fn matches(&self, cmd: &CommandSpec, line: &str) -> bool {
        match self {
            Matcher::Line(pattern) => line.contains(pattern.as_str()),
            Matcher::Program(name) => program_stem(&cmd.program) == *name,
        }
    }
}

fn program_stem(program: &Path) -> String {
    program
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Exit code rule.
#[derive(Debug, Clone)]
struct FailRule {
    matcher: Matcher,
    code: i32,
    /// Remaining failures (None = unlimited).
    remaining: Option<usize>,
}

/// File written when a matching command succeeds.
#[derive(Debug, Clone)]
struct ProduceRule {
    matcher: Matcher,
    path: PathBuf,
    contents: Vec<u8>,
}

/// Scripted command runner.
///
/// Commands succeed unless a failure rule matches. `*_on` rules match a
/// substring of the displayed command line (see
/// [`CommandSpec::display_command`]); `*_program` rules match the program's
/// file stem.
#[derive(Debug, Default)]
pub struct MockRunner {
    fail_rules: Vec<FailRule>,
    produce_rules: Vec<ProduceRule>,
    calls: Vec<String>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Fail every command containing `pattern` with `code`.
    pub fn fail_on(&mut self, pattern: &str, code: i32) -> &mut Self {
        self.fail_rules.push(FailRule {
            matcher: Matcher::Line(pattern.to_string()),
            code,
            remaining: None,
        });
        self
    }

    /// Fail every run of `program` (compared by file stem) with `code`.
    pub fn fail_program(&mut self, program: &str, code: i32) -> &mut Self {
        self.fail_rules.push(FailRule {
            matcher: Matcher::Program(program.to_string()),
            code,
            remaining: None,
        });
        self
    }

    /// Fail the first `times` commands containing `pattern` with `code`.
    pub fn fail_times(&mut self, pattern: &str, code: i32, times: usize) -> &mut Self {
        self.fail_rules.push(FailRule {
            matcher: Matcher::Line(pattern.to_string()),
            code,
            remaining: Some(times),
        });
        self
    }

    /// Write `contents` to `path` whenever a run of `program` (compared by
    /// file stem) succeeds.
    pub fn produce_on_program(
        &mut self,
        program: &str,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.produce_rules.push(ProduceRule {
            matcher: Matcher::Program(program.to_string()),
            path: path.into(),
            contents: contents.into(),
        });
        self
    }

    /// All command lines run so far, in order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl CommandRunner for MockRunner {
    fn run(&mut self, cmd: &CommandSpec) -> Result<RunOutcome> {
        let line = cmd.display_command();
        self.calls.push(line.clone());

        for rule in &mut self.fail_rules {
            if !rule.matcher.matches(cmd, &line) {
                continue;
            }
            match rule.remaining {
                Some(0) => continue,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            return Ok(RunOutcome {
                code: rule.code,
                stderr: format!("mock failure for `{}`", line),
            });
        }

        for rule in &self.produce_rules {
            if rule.matcher.matches(cmd, &line) {
                if let Some(parent) = rule.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&rule.path, &rule.contents)?;
            }
        }

        Ok(RunOutcome::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_records_and_fails() {
        let mut runner = MockRunner::new();
        runner.fail_times("cmake", 3, 1);

        let cmd = CommandSpec::new("cmake").arg("..");
        assert_eq!(runner.run(&cmd).unwrap().code, 3);
        assert_eq!(runner.run(&cmd).unwrap().code, 0);
        assert_eq!(runner.calls(), ["cmake ..", "cmake .."]);
    }

    #[test]
    fn test_mock_runner_produces_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("out").join("lib.so");

        let mut runner = MockRunner::new();
        runner.produce_on_program("make", &out, "bytes");

        runner.run(&CommandSpec::new("cmake").arg("..")).unwrap();
        assert!(!out.exists());

        runner.run(&CommandSpec::new("make").arg("all")).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "bytes");
    }

    #[test]
    fn test_program_rules_ignore_cmake() {
        let mut runner = MockRunner::new();
        runner.fail_program("make", 2);

        let configure = CommandSpec::new("/usr/bin/cmake").arg("..");
        let build = CommandSpec::new("make").args(["_demo", "-j4"]);
        let mingw = CommandSpec::new("mingw32-make.exe").arg("_demo");

        assert_eq!(runner.run(&configure).unwrap().code, 0);
        assert_eq!(runner.run(&build).unwrap().code, 2);
        assert_eq!(runner.run(&mingw).unwrap().code, 0);
    }
}
