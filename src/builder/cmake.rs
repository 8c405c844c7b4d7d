//! CMake command construction.
//!
//! Every CMake invocation runs inside the build directory and points at the
//! parent source directory with `..`, the classic in-source-parent layout the
//! staged CMakeLists expects.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::builder::toolchain::{MakefileToolchain, VS_CONFIG, VS_PLATFORM};
use crate::util::process::{CommandSpec, ProcessBuilder};

/// Oldest CMake known to configure the staged project.
pub const MIN_CMAKE_VERSION: Version = Version::new(3, 8, 0);

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cmake version (\d+)\.(\d+)(?:\.(\d+))?").expect("static regex is valid")
});

/// CMake driver bound to one build directory.
#[derive(Debug, Clone)]
pub struct CMake {
    program: PathBuf,
    build_dir: PathBuf,
}

impl CMake {
    /// Create a CMake driver for the given executable and build directory.
    pub fn new(program: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        CMake {
            program: program.into(),
            build_dir: build_dir.into(),
        }
    }

    /// `cmake <args> ..`
    pub fn configure(&self, args: &[String]) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(args.iter().cloned())
            .arg("..")
            .cwd(&self.build_dir)
    }

    /// `cmake <args> -G "<generator>" -A x64 ..`
    pub fn configure_visual_studio(&self, args: &[String], generator: &str) -> CommandSpec {
        let mut full = args.to_vec();
        full.extend([
            "-G".to_string(),
            generator.to_string(),
            "-A".to_string(),
            VS_PLATFORM.to_string(),
        ]);
        self.configure(&full)
    }

    /// `cmake <args> -G "<Makefiles generator>" ..`
    pub fn configure_makefiles(&self, args: &[String], toolchain: &MakefileToolchain) -> CommandSpec {
        let mut full = args.to_vec();
        full.extend(["-G".to_string(), toolchain.generator.to_string()]);
        self.configure(&full)
    }

    /// `cmake --build . --target <target> --config Release`
    pub fn build_multi_config(&self, target: &str) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(["--build", ".", "--target", target, "--config", VS_CONFIG])
            .cwd(&self.build_dir)
    }
}

/// `<make> <target> -j<jobs>` inside the build directory.
pub fn make_command(tool: impl Into<PathBuf>, target: &str, jobs: usize, build_dir: &Path) -> CommandSpec {
    CommandSpec::new(tool)
        .arg(target)
        .arg(format!("-j{}", jobs))
        .cwd(build_dir)
}

/// Parse the first line of `cmake --version`.
pub fn parse_cmake_version(output: &str) -> Option<Version> {
    let caps = VERSION_RE.captures(output)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = caps
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(Version::new(major, minor, patch))
}

/// Query the version of a CMake executable.
pub fn cmake_version(cmake: &Path) -> Option<Version> {
    let output = ProcessBuilder::new(cmake).arg("--version").exec().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_cmake_version(&String::from_utf8_lossy(&output.stdout))
}

/// Check if a directory contains a CMake project.
pub fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}
