//! Implementation of `libstage install`.
//!
//! One linear procedure:
//! 1. stage the CMakeLists file into `src/`;
//! 2. create a fresh build directory;
//! 3. configure and build (skipped for precompiled libraries);
//! 4. copy the library and its companion file into the install tree;
//! 5. remove the build directory.
//!
//! Any failure aborts the run where it happens. In particular the build
//! directory is left in place for inspection unless the copy succeeded.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::builder::cmake::{cmake_version, is_cmake_project, MIN_CMAKE_VERSION};
use crate::builder::plan::{BuildPlan, BuildSettings, Toggles};
use crate::builder::toolchain::{WindowsToolchain, DEFAULT_VS_GENERATORS};
use crate::builder::PlanExecutor;
use crate::core::{HostPlatform, PackageLayout};
use crate::util::config::{Config, DEFAULT_JOBS};
use crate::util::fs::{copy_into_dir, ensure_dir, relative_path, remove_dir_all_if_exists};
use crate::util::process::{find_cmake, find_executable, CommandRunner};
use crate::util::shell::{Shell, Status};
use crate::util::StageError;

/// Options for the install command.
///
/// `None` fields fall back to the configuration file, then to defaults.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Package source root
    pub package_source: PathBuf,

    /// Package install root
    pub package_dir: PathBuf,

    /// Architecture sub-directory appended to `libs`
    pub arch: String,

    /// Shared-library extension (platform default when unset)
    pub shlib_ext: Option<String>,

    /// CMake target
    pub target: Option<String>,

    /// Library file stem
    pub library: Option<String>,

    /// Build with GPU support
    pub use_gpu: Option<bool>,

    /// Toolchain on Windows hosts
    pub windows_toolchain: Option<WindowsToolchain>,

    /// Parallel jobs for make-style tools
    pub jobs: Option<usize>,

    /// Use a prebuilt library instead of compiling
    pub precompiled: bool,

    /// Keep the build directory after a successful install
    pub keep_build_dir: bool,

    /// CMake executable (searched in PATH when unset)
    pub cmake: Option<PathBuf>,
}

/// Copy of the CMakeLists file into the native source directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Staging {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Everything an install run will do, resolved up front.
#[derive(Debug, Clone, Serialize)]
pub struct InstallPlan {
    pub platform: HostPlatform,
    pub layout: PackageLayout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging: Option<Staging>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<BuildSettings>,
    /// Configure and build commands; absent for precompiled libraries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildPlan>,
    /// Library file name, e.g. `lib_demo.so`
    pub artifact: String,
    /// Prebuilt library locations, in search order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub precompiled_candidates: Vec<PathBuf>,
    /// Side-car file name copied when present in `src/`
    pub companion: String,
    pub keep_build_dir: bool,
}

/// Result of a successful install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Installed library
    pub artifact: PathBuf,
    /// Installed companion file, if there was one
    pub companion: Option<PathBuf>,
    /// Whether the build directory was removed
    pub build_dir_removed: bool,
}

impl InstallPlan {
    /// Resolve options against configuration and the host platform.
    pub fn resolve(opts: &InstallOptions, config: &Config, platform: HostPlatform) -> Result<Self> {
        platform.ensure_supported()?;

        let target = opts.target.clone().or_else(|| config.build.target.clone());
        let library = opts
            .library
            .clone()
            .or_else(|| config.artifact.library.clone())
            .or_else(|| target.as_ref().map(|t| format!("lib{}", t)));

        let shlib_ext = opts
            .shlib_ext
            .clone()
            .unwrap_or_else(|| platform.default_shlib_ext().to_string());
        let layout = PackageLayout::new(&opts.package_source, &opts.package_dir, &opts.arch, &shlib_ext);

        let companion = config.companion().to_string();

        if opts.precompiled {
            let Some(library) = library else {
                return Err(StageError::MissingTarget.into());
            };
            return Ok(InstallPlan {
                artifact: layout.library_file(&library),
                precompiled_candidates: layout.precompiled_candidates(&library),
                platform,
                layout,
                staging: None,
                settings: None,
                build: None,
                companion,
                keep_build_dir: opts.keep_build_dir,
            });
        }

        let (Some(target), Some(library)) = (target, library) else {
            return Err(StageError::MissingTarget.into());
        };

        let toggles = Toggles {
            use_gpu: opts.use_gpu.or(config.build.use_gpu).unwrap_or(false),
            windows_toolchain: match opts.windows_toolchain {
                Some(tc) => tc,
                None => config.windows_toolchain()?.unwrap_or_default(),
            },
        };

        let vs_generators = if config.build.visual_studio_generators.is_empty() {
            DEFAULT_VS_GENERATORS.iter().map(|s| s.to_string()).collect()
        } else {
            config.build.visual_studio_generators.clone()
        };

        let settings = BuildSettings {
            target,
            toggles,
            jobs: opts.jobs.or(config.build.jobs).unwrap_or(DEFAULT_JOBS).max(1),
            defines: config.build.defines.clone(),
            vs_generators,
        };

        let cmake = opts
            .cmake
            .clone()
            .or_else(find_cmake)
            .unwrap_or_else(|| PathBuf::from("cmake"));
        let build = BuildPlan::new(&settings, &platform, &layout, &cmake);

        let staging = config.artifact.cmakelists.as_ref().map(|rel| Staging {
            from: layout.package_source.join(rel),
            to: layout.staged_cmakelists(),
        });

        Ok(InstallPlan {
            artifact: layout.library_file(&library),
            precompiled_candidates: Vec::new(),
            platform,
            layout,
            staging,
            settings: Some(settings),
            build: Some(build),
            companion,
            keep_build_dir: opts.keep_build_dir,
        })
    }
}

/// Check that the tools the plan starts with are installed.
pub fn preflight(plan: &InstallPlan, shell: &Shell) -> Result<()> {
    let Some(build) = &plan.build else {
        return Ok(());
    };

    for tool in build.required_tools() {
        if find_executable(&tool.to_string_lossy()).is_some() {
            continue;
        }
        let is_cmake = tool
            .file_stem()
            .is_some_and(|s| s.to_string_lossy().eq_ignore_ascii_case("cmake"));
        if is_cmake {
            return Err(StageError::CMakeNotFound.into());
        }
        return Err(StageError::BuildToolNotFound {
            tool: tool.display().to_string(),
        }
        .into());
    }

    if let Some(cmake) = build_cmake_program(build) {
        match cmake_version(&cmake) {
            Some(version) if version < MIN_CMAKE_VERSION => shell.warn(format!(
                "CMake {} is older than {}; configuration may fail",
                version, MIN_CMAKE_VERSION
            )),
            Some(version) => tracing::debug!("using CMake {} at {}", version, cmake.display()),
            None => tracing::debug!("could not determine CMake version"),
        }
    }

    Ok(())
}

fn build_cmake_program(build: &BuildPlan) -> Option<PathBuf> {
    use crate::builder::ConfigureStrategy;

    match &build.strategy {
        ConfigureStrategy::Direct { configure, .. } => Some(configure.program.clone()),
        ConfigureStrategy::Makefiles(mk) => Some(mk.configure.program.clone()),
        ConfigureStrategy::VisualStudio { build, .. } => Some(build.command.program.clone()),
    }
}

/// Run the install procedure.
pub fn install(
    plan: &InstallPlan,
    runner: &mut dyn CommandRunner,
    shell: &Shell,
) -> Result<InstallReport> {
    let layout = &plan.layout;

    let candidates = match &plan.build {
        Some(build) => {
            stage_cmakelists(plan, shell)?;

            // Fresh build tree for every run
            remove_dir_all_if_exists(&layout.build_dir)?;
            ensure_dir(&layout.build_dir)?;

            let lib_dir = PlanExecutor::new(runner, shell, &layout.build_dir).execute(build)?;
            vec![lib_dir.join(&plan.artifact)]
        }
        None => {
            shell.status(Status::Skipped, "build (using precompiled library)");
            plan.precompiled_candidates.clone()
        }
    };

    ensure_dir(&layout.dest_dir)?;

    let Some(src) = candidates.iter().find(|p| p.is_file()) else {
        return Err(StageError::ArtifactNotFound {
            file: plan.artifact.clone(),
            searched: candidates,
        }
        .into());
    };

    tracing::info!(
        "Found library file: {} to move to {}",
        src.display(),
        layout.dest_dir.display()
    );
    let cwd = std::env::current_dir()?;
    let artifact = copy_into_dir(src, &layout.dest_dir)?;
    shell.status(Status::Copied, relative_path(&cwd, &artifact).display());

    let companion_src = layout.source_dir.join(&plan.companion);
    let companion = if companion_src.is_file() {
        let dest = copy_into_dir(&companion_src, &layout.dest_dir)?;
        shell.status(Status::Copied, relative_path(&cwd, &dest).display());
        Some(dest)
    } else {
        tracing::debug!("no companion file at {}", companion_src.display());
        None
    };

    let build_dir_removed = if plan.keep_build_dir {
        shell.note(format!("keeping {}", layout.build_dir.display()));
        false
    } else {
        let removed = remove_dir_all_if_exists(&layout.build_dir)?;
        if removed {
            shell.status(Status::Removed, layout.build_dir.display());
        }
        removed
    };

    Ok(InstallReport {
        artifact,
        companion,
        build_dir_removed,
    })
}

/// Copy the configured CMakeLists file into the native source directory.
fn stage_cmakelists(plan: &InstallPlan, shell: &Shell) -> Result<()> {
    match &plan.staging {
        Some(staging) => {
            shell.status(Status::Staging, staging.to.display());
            std::fs::copy(&staging.from, &staging.to).map_err(|source| StageError::StagingFailed {
                from: staging.from.clone(),
                to: staging.to.clone(),
                source,
            })?;
            Ok(())
        }
        None if is_cmake_project(&plan.layout.source_dir) => Ok(()),
        None => bail!(
            "no CMakeLists.txt in {}\n\
             help: set `artifact.cmakelists` in .libstage/config.toml to stage one",
            plan.layout.source_dir.display()
        ),
    }
}
