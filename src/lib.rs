//! libstage - build a CMake shared library at package install time
//!
//! This crate provides the install procedure behind the `libstage` binary:
//! platform checks, CMake generator selection with fallback, the build, and
//! staging of the resulting library into the package's install tree.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for libstage unit tests.
///
/// Only compiled for tests. Provides a scripted command runner and
/// temporary package trees.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildPlan, PlanExecutor};
pub use core::{HostPlatform, PackageLayout};
pub use ops::{install, InstallOptions, InstallPlan, InstallReport};
pub use util::StageError;
