//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use libstage::builder::WindowsToolchain;
use libstage::util::shell::ColorChoice;

/// libstage - build a CMake shared library and stage it into a package's install tree
#[derive(Parser)]
#[command(name = "libstage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (streams tool output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the native library and install it into the package tree
    Install(InstallArgs),

    /// Check the host for the tools an install needs
    Doctor(DoctorArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InstallArgs {
    /// Package source root
    #[arg(long = "source", env = "R_PACKAGE_SOURCE", value_name = "DIR")]
    pub package_source: Option<PathBuf>,

    /// Package install root
    #[arg(long, env = "R_PACKAGE_DIR", value_name = "DIR")]
    pub package_dir: Option<PathBuf>,

    /// Shared-library extension (defaults to the host's)
    #[arg(long, env = "SHLIB_EXT", value_name = "EXT")]
    pub shlib_ext: Option<String>,

    /// Architecture sub-directory appended to `libs`, e.g. `/x64`
    #[arg(long, env = "R_ARCH", value_name = "SUBDIR", default_value = "")]
    pub arch: String,

    /// CMake target to build
    #[arg(long)]
    pub target: Option<String>,

    /// Library file stem (defaults to `lib` + target)
    #[arg(long)]
    pub library: Option<String>,

    /// Build with GPU support
    #[arg(long, overrides_with = "no_gpu")]
    pub gpu: bool,

    /// Build without GPU support, even if configured
    #[arg(long, overrides_with = "gpu")]
    pub no_gpu: bool,

    /// Toolchain on Windows: msvc, mingw, msys2
    #[arg(long, value_name = "TOOLCHAIN")]
    pub windows_toolchain: Option<WindowsToolchain>,

    /// Install a prebuilt library instead of compiling
    #[arg(long)]
    pub precompiled: bool,

    /// Number of parallel jobs for make
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Keep the build directory after a successful install
    #[arg(long)]
    pub keep_build_dir: bool,

    /// Print the install plan as JSON (no build)
    #[arg(long)]
    pub plan: bool,
}

impl InstallArgs {
    /// GPU toggle from the command line; `None` defers to configuration.
    pub fn use_gpu(&self) -> Option<bool> {
        match (self.gpu, self.no_gpu) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args)]
pub struct DoctorArgs {
    /// Package source root whose configuration selects the toolchain
    #[arg(long = "source", env = "R_PACKAGE_SOURCE", value_name = "DIR")]
    pub package_source: Option<PathBuf>,

    /// Toolchain on Windows: msvc, mingw, msys2
    #[arg(long, value_name = "TOOLCHAIN")]
    pub windows_toolchain: Option<WindowsToolchain>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
