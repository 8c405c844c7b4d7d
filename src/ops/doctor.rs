//! Environment and toolchain health checks.
//!
//! ```bash
//! libstage doctor           # Quick check
//! libstage -v doctor        # Paths and versions
//! ```
//!
//! Checks the host platform, CMake and the build tool that `install` would
//! use on this host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::builder::cmake::{cmake_version, MIN_CMAKE_VERSION};
use crate::builder::toolchain::{WindowsToolchain, UNIX_MAKE};
use crate::core::HostPlatform;
use crate::util::config::load_for_package;
use crate::util::process::{find_cmake, find_executable, ProcessBuilder};

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,

    /// Whether the check passed
    pub passed: bool,

    /// Human-readable status message
    pub message: String,

    /// Path to the tool (if applicable)
    pub path: Option<PathBuf>,

    /// Version string (if applicable)
    pub version: Option<String>,

    /// How long the check took
    pub duration: Duration,

    /// Whether this check is required or optional
    pub required: bool,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            version: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            passed: false,
            ..CheckResult::pass(name, message)
        }
    }

    /// Mark this check as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
    pub total_duration: Duration,
    pub environment: HashMap<String, String>,
}

impl DoctorReport {
    pub fn new() -> Self {
        DoctorReport::default()
    }

    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    /// Check if all required checks passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    pub fn required_failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .count()
    }
}

/// Options for the doctor command.
#[derive(Debug, Clone, Default)]
pub struct DoctorOptions {
    /// Package whose configuration selects the Windows toolchain
    pub package_source: Option<PathBuf>,

    /// Toolchain override
    pub windows_toolchain: Option<WindowsToolchain>,
}

/// Run the doctor command.
pub fn doctor(options: &DoctorOptions) -> Result<DoctorReport> {
    let toolchain = match (options.windows_toolchain, &options.package_source) {
        (Some(tc), _) => tc,
        (None, Some(src)) => load_for_package(src).windows_toolchain()?.unwrap_or_default(),
        (None, None) => WindowsToolchain::default(),
    };

    Ok(run_checks(&HostPlatform::detect(), toolchain))
}

/// Checks for a given host.
pub fn run_checks(platform: &HostPlatform, toolchain: WindowsToolchain) -> DoctorReport {
    let start = Instant::now();
    let mut report = DoctorReport::new();

    report.environment.insert("os".to_string(), platform.os.to_string());
    report.environment.insert("arch".to_string(), platform.arch.clone());
    report
        .environment
        .insert("pointer_width".to_string(), platform.pointer_width.to_string());

    report.add(check_platform(platform));

    let cmake = check_cmake();
    let cmake_path = cmake.path.clone();
    report.add(cmake);
    if let Some(path) = cmake_path {
        report.add(check_cmake_version(&path));
    }

    for check in check_build_tools(platform, toolchain) {
        report.add(check);
    }

    report.add(check_cxx_compiler(platform, toolchain));

    report.total_duration = start.elapsed();
    report
}

fn check_platform(platform: &HostPlatform) -> CheckResult {
    match platform.ensure_supported() {
        Ok(()) => CheckResult::pass("Platform", format!("{} is supported", platform)),
        Err(e) => CheckResult::fail("Platform", e.to_string()),
    }
}

fn check_cmake() -> CheckResult {
    let start = Instant::now();

    match find_cmake() {
        Some(path) => CheckResult::pass("CMake", "CMake is available")
            .with_path(path)
            .with_duration(start.elapsed()),
        None => CheckResult::fail("CMake", "CMake not found in PATH").with_duration(start.elapsed()),
    }
}

fn check_cmake_version(cmake: &Path) -> CheckResult {
    let start = Instant::now();

    let check = match cmake_version(cmake) {
        Some(v) if v >= MIN_CMAKE_VERSION => {
            CheckResult::pass("CMake version", format!("{} >= {}", v, MIN_CMAKE_VERSION))
                .with_version(v.to_string())
        }
        Some(v) => CheckResult::fail(
            "CMake version",
            format!("{} is older than {}", v, MIN_CMAKE_VERSION),
        )
        .with_version(v.to_string()),
        None => CheckResult::fail("CMake version", "could not parse `cmake --version`"),
    };

    check.with_duration(start.elapsed()).optional()
}

/// Build tools the install would run on this host.
///
/// On Windows with MSVC the make tool is only needed for the fallback, so it
/// is optional there.
fn check_build_tools(platform: &HostPlatform, toolchain: WindowsToolchain) -> Vec<CheckResult> {
    if !platform.os.is_windows() {
        return vec![check_tool("Build Tool", UNIX_MAKE)];
    }

    let makefiles = toolchain.makefiles();
    let name = format!("{} make", makefiles.name);
    match toolchain {
        WindowsToolchain::Msvc => vec![check_tool(&name, makefiles.build_tool).optional()],
        WindowsToolchain::MinGw | WindowsToolchain::Msys2 => {
            vec![check_tool(&name, makefiles.build_tool)]
        }
    }
}

fn check_tool(name: &str, tool: &str) -> CheckResult {
    let start = Instant::now();

    match find_executable(tool) {
        Some(path) => {
            let mut check = CheckResult::pass(name, format!("{} is available", tool)).with_path(path);
            if let Some(version) = first_line_of(tool, "--version") {
                check = check.with_version(version);
            }
            check.with_duration(start.elapsed())
        }
        None => CheckResult::fail(name, format!("{} not found in PATH", tool))
            .with_duration(start.elapsed()),
    }
}

/// Visual Studio generators find `cl` on their own, so it need not be on
/// PATH with the MSVC toolchain.
fn check_cxx_compiler(platform: &HostPlatform, toolchain: WindowsToolchain) -> CheckResult {
    let check = find_cxx_compiler(platform);
    if platform.os.is_windows() && toolchain == WindowsToolchain::Msvc {
        check.optional()
    } else {
        check
    }
}

fn find_cxx_compiler(platform: &HostPlatform) -> CheckResult {
    let start = Instant::now();

    let compilers: &[&str] = if platform.os.is_windows() {
        &["cl", "g++", "clang++", "c++"]
    } else {
        &["c++", "clang++", "g++"]
    };

    for compiler in compilers {
        if let Some(path) = find_executable(compiler) {
            let version = first_line_of(compiler, "--version").unwrap_or_else(|| "unknown version".to_string());
            return CheckResult::pass("C++ Compiler", format!("Found {}", compiler))
                .with_path(path)
                .with_version(version)
                .with_duration(start.elapsed());
        }
    }

    CheckResult::fail(
        "C++ Compiler",
        format!("No C++ compiler found (tried {})", compilers.join(", ")),
    )
    .with_duration(start.elapsed())
}

/// First non-empty output line of `<tool> <flag>`, from stdout or stderr.
fn first_line_of(tool: &str, flag: &str) -> Option<String> {
    let output = ProcessBuilder::new(tool).arg(flag).exec().ok()?;
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        String::from_utf8_lossy(&output.stdout).into_owned()
    };
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Format the doctor report for display.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    let unknown = "unknown".to_string();

    let _ = writeln!(output, "libstage doctor");
    let _ = writeln!(output, "===============\n");

    if verbose {
        let _ = writeln!(output, "Environment:");
        let _ = writeln!(
            output,
            "  OS: {} ({}, {}-bit)",
            report.environment.get("os").unwrap_or(&unknown),
            report.environment.get("arch").unwrap_or(&unknown),
            report.environment.get("pointer_width").unwrap_or(&unknown),
        );
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "Checks:");
    for check in &report.checks {
        let status = if check.passed { "[OK]" } else { "[!!]" };
        let required = if check.required { "" } else { " (optional)" };
        let _ = writeln!(output, "  {} {}{}", status, check.name, required);

        if verbose || !check.passed {
            let _ = writeln!(output, "      {}", check.message);
        }
        if verbose {
            if let Some(path) = &check.path {
                let _ = writeln!(output, "      Path: {}", path.display());
            }
            if let Some(version) = &check.version {
                let _ = writeln!(output, "      Version: {}", version);
            }
        }
    }

    let _ = writeln!(output);

    let passed = report.passed_count();
    let failed = report.failed_count();
    let required_failed = report.required_failed_count();

    let _ = writeln!(output, "Summary: {} passed, {} failed", passed, failed);

    if required_failed > 0 {
        let _ = writeln!(
            output,
            "\n{} required check(s) failed. `libstage install` will not work.",
            required_failed
        );
    } else if failed > 0 {
        let _ = writeln!(
            output,
            "\nAll required checks passed. {} optional check(s) failed.",
            failed
        );
    } else {
        let _ = writeln!(output, "\nAll checks passed.");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HostOs;

    #[test]
    fn test_check_result_optional() {
        let result = CheckResult::pass("test", "passed").optional();
        assert!(result.passed);
        assert!(!result.required);
    }

    #[test]
    fn test_doctor_report_optional_failed() {
        let mut report = DoctorReport::new();
        report.add(CheckResult::pass("required", "ok"));
        report.add(CheckResult::fail("optional", "missing").optional());

        assert!(report.all_required_passed());
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.required_failed_count(), 0);
    }

    #[test]
    fn test_doctor_report_required_failed() {
        let mut report = DoctorReport::new();
        report.add(CheckResult::pass("check1", "ok"));
        report.add(CheckResult::fail("check2", "missing"));

        assert!(!report.all_required_passed());
        assert_eq!(report.required_failed_count(), 1);
    }

    #[test]
    fn test_32_bit_platform_fails_required_check() {
        let report = run_checks(
            &HostPlatform::new(HostOs::Windows, "x86", 32),
            WindowsToolchain::Msvc,
        );

        let platform = &report.checks[0];
        assert_eq!(platform.name, "Platform");
        assert!(!platform.passed);
        assert!(platform.required);
        assert!(!report.all_required_passed());
    }

    #[test]
    fn test_msvc_make_tool_is_optional() {
        let checks = check_build_tools(
            &HostPlatform::new(HostOs::Windows, "x86_64", 64),
            WindowsToolchain::Msvc,
        );
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name, "MinGW make");
        assert!(!checks[0].required);

        let checks = check_build_tools(
            &HostPlatform::new(HostOs::Windows, "x86_64", 64),
            WindowsToolchain::Msys2,
        );
        assert_eq!(checks[0].name, "MSYS2 make");
        assert!(checks[0].required);
    }

    #[test]
    fn test_compiler_optional_only_for_msvc() {
        let windows = HostPlatform::new(HostOs::Windows, "x86_64", 64);
        assert!(!check_cxx_compiler(&windows, WindowsToolchain::Msvc).required);
        assert!(check_cxx_compiler(&windows, WindowsToolchain::MinGw).required);

        let linux = HostPlatform::new(HostOs::Linux, "x86_64", 64);
        assert!(check_cxx_compiler(&linux, WindowsToolchain::Msvc).required);
    }

    #[test]
    fn test_unix_checks_make() {
        let checks = check_build_tools(
            &HostPlatform::new(HostOs::Linux, "x86_64", 64),
            WindowsToolchain::Msvc,
        );
        assert_eq!(checks.len(), 1);
        assert!(checks[0].message.contains("make"));
    }

    #[test]
    fn test_format_report_shows_failures() {
        let mut report = DoctorReport::new();
        report.add(CheckResult::pass("CMake", "CMake is available"));
        report.add(CheckResult::fail("Build Tool", "make not found in PATH"));

        let text = format_report(&report, false);
        assert!(text.contains("[OK] CMake"));
        assert!(text.contains("[!!] Build Tool"));
        assert!(text.contains("make not found in PATH"));
        assert!(text.contains("1 required check(s) failed"));
    }
}
