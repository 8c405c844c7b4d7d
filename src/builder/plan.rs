//! Build plan construction.
//!
//! The plan is the full, ordered list of external commands for one install,
//! computed up front from the host platform and the user's toggles. Nothing
//! here touches the filesystem or spawns a process, so every toggle
//! combination can be checked in isolation and printed with `--plan`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::cmake::{make_command, CMake};
use crate::builder::toolchain::{MakefileToolchain, WindowsToolchain, UNIX_MAKE};
use crate::core::{HostPlatform, PackageLayout};
use crate::util::process::CommandSpec;

/// User-editable switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Toggles {
    /// Build with GPU support
    pub use_gpu: bool,
    /// Toolchain on Windows hosts
    pub windows_toolchain: WindowsToolchain,
}

/// Resolved build settings.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSettings {
    /// CMake target producing the shared library
    pub target: String,
    pub toggles: Toggles,
    /// Parallel jobs for make-style tools
    pub jobs: usize,
    /// Extra cache entries (`NAME=VALUE`), passed as `-D<entry>`
    pub defines: Vec<String>,
    /// Visual Studio generators, in the order they are tried
    pub vs_generators: Vec<String>,
}

impl BuildSettings {
    /// CMake arguments shared by every configure attempt.
    pub fn base_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.toggles.use_gpu {
            args.push("-DUSE_GPU=ON".to_string());
        }

        for define in &self.defines {
            let define = define.strip_prefix("-D").unwrap_or(define);
            args.push(format!("-D{}", define));
        }

        args
    }
}

/// The build command and the folder the library lands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStep {
    pub command: CommandSpec,
    pub lib_dir: PathBuf,
}

/// Configure with a GNU Makefiles generator, then build with make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MakefilesPlan {
    pub toolchain: MakefileToolchain,
    /// Lenient first pass. Rtools puts `sh.exe` on PATH, which makes CMake's
    /// MinGW generator refuse the first run; the second run succeeds.
    pub warmup: CommandSpec,
    pub configure: CommandSpec,
    pub build: BuildStep,
}

/// One Visual Studio generator attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VsAttempt {
    pub generator: String,
    pub configure: CommandSpec,
}

/// How the configure step runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum ConfigureStrategy {
    /// Strict configure with the platform default generator.
    Direct {
        configure: CommandSpec,
        build: BuildStep,
    },
    /// Windows GNU toolchain.
    Makefiles(MakefilesPlan),
    /// Lenient attempts over Visual Studio generators, first success wins.
    /// When all fail, the Makefiles fallback runs.
    VisualStudio {
        attempts: Vec<VsAttempt>,
        build: BuildStep,
        fallback: MakefilesPlan,
    },
}

/// Ordered commands for configuring and building the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    #[serde(flatten)]
    pub strategy: ConfigureStrategy,
}

impl BuildPlan {
    /// Compute the plan for a host.
    pub fn new(
        settings: &BuildSettings,
        platform: &HostPlatform,
        layout: &PackageLayout,
        cmake_program: &Path,
    ) -> Self {
        let cmake = CMake::new(cmake_program, &layout.build_dir);
        let base = settings.base_args();

        if !platform.os.is_windows() {
            let strategy = ConfigureStrategy::Direct {
                configure: cmake.configure(&base),
                build: BuildStep {
                    command: make_command(UNIX_MAKE, &settings.target, settings.jobs, &layout.build_dir),
                    lib_dir: layout.source_dir.clone(),
                },
            };
            return BuildPlan { strategy };
        }

        let toolchain = settings.toggles.windows_toolchain;
        let makefiles = makefiles_plan(&cmake, &base, toolchain.makefiles(), settings, layout);

        let strategy = match toolchain {
            WindowsToolchain::MinGw | WindowsToolchain::Msys2 => ConfigureStrategy::Makefiles(makefiles),
            WindowsToolchain::Msvc => ConfigureStrategy::VisualStudio {
                attempts: settings
                    .vs_generators
                    .iter()
                    .map(|generator| VsAttempt {
                        generator: generator.clone(),
                        configure: cmake.configure_visual_studio(&base, generator),
                    })
                    .collect(),
                build: BuildStep {
                    command: cmake.build_multi_config(&settings.target),
                    lib_dir: layout.source_dir.join("Release"),
                },
                fallback: makefiles,
            },
        };

        BuildPlan { strategy }
    }

    /// Programs that must exist before the first command runs.
    ///
    /// Tools only needed on a fallback path are not included.
    pub fn required_tools(&self) -> Vec<PathBuf> {
        let mut tools = Vec::new();
        match &self.strategy {
            ConfigureStrategy::Direct { configure, build } => {
                tools.push(configure.program.clone());
                tools.push(build.command.program.clone());
            }
            ConfigureStrategy::Makefiles(mk) => {
                tools.push(mk.configure.program.clone());
                tools.push(mk.build.command.program.clone());
            }
            ConfigureStrategy::VisualStudio { build, .. } => {
                tools.push(build.command.program.clone());
            }
        }
        tools.dedup();
        tools
    }
}

fn makefiles_plan(
    cmake: &CMake,
    base: &[String],
    toolchain: MakefileToolchain,
    settings: &BuildSettings,
    layout: &PackageLayout,
) -> MakefilesPlan {
    let configure = cmake.configure_makefiles(base, &toolchain);
    MakefilesPlan {
        toolchain,
        warmup: configure.clone(),
        configure,
        build: BuildStep {
            command: make_command(toolchain.build_tool, &settings.target, settings.jobs, &layout.build_dir),
            lib_dir: layout.source_dir.clone(),
        },
    }
}
