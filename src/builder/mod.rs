//! Native library build: CMake command construction, planning and execution.

pub mod cmake;
pub mod executor;
pub mod plan;
pub mod toolchain;

pub use executor::{run_lenient, run_strict, PlanExecutor};
pub use plan::{BuildPlan, BuildSettings, ConfigureStrategy, Toggles};
pub use toolchain::WindowsToolchain;
