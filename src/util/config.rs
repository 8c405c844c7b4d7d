//! Configuration file support for libstage.
//!
//! libstage reads two configuration file locations:
//! - Global: `~/.libstage/config.toml` - User-wide defaults
//! - Project: `<package source>/.libstage/config.toml` - Package-specific settings
//!
//! Project config takes precedence over global config. Command-line flags take
//! precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::toolchain::WindowsToolchain;

/// Default parallel job count passed to make-style build tools.
pub const DEFAULT_JOBS: usize = 4;

/// Default companion file copied next to the library when present.
pub const DEFAULT_COMPANION: &str = "symbols.rds";

/// libstage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Artifact settings
    pub artifact: ArtifactConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// CMake target that produces the shared library
    pub target: Option<String>,

    /// Enable GPU support (`-DUSE_GPU=ON`)
    pub use_gpu: Option<bool>,

    /// Toolchain on Windows hosts (msvc, mingw, msys2)
    pub windows_toolchain: Option<String>,

    /// Parallel jobs for make-style build tools
    pub jobs: Option<usize>,

    /// Extra CMake cache entries, passed as `-D<entry>`
    #[serde(default)]
    pub defines: Vec<String>,

    /// Visual Studio generators to try, in order
    #[serde(default)]
    pub visual_studio_generators: Vec<String>,
}

/// Artifact-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Library file stem without extension (default: "lib" + target)
    pub library: Option<String>,

    /// Side-car file copied alongside the library when it exists
    pub companion: Option<String>,

    /// CMakeLists file to stage into `src/`, relative to the package source
    pub cmakelists: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Build settings
        if other.build.target.is_some() {
            self.build.target = other.build.target;
        }
        if other.build.use_gpu.is_some() {
            self.build.use_gpu = other.build.use_gpu;
        }
        if other.build.windows_toolchain.is_some() {
            self.build.windows_toolchain = other.build.windows_toolchain;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if !other.build.defines.is_empty() {
            self.build.defines = other.build.defines;
        }
        if !other.build.visual_studio_generators.is_empty() {
            self.build.visual_studio_generators = other.build.visual_studio_generators;
        }

        // Artifact settings
        if other.artifact.library.is_some() {
            self.artifact.library = other.artifact.library;
        }
        if other.artifact.companion.is_some() {
            self.artifact.companion = other.artifact.companion;
        }
        if other.artifact.cmakelists.is_some() {
            self.artifact.cmakelists = other.artifact.cmakelists;
        }
    }

    /// Parse the Windows toolchain from the config string.
    pub fn windows_toolchain(&self) -> Result<Option<WindowsToolchain>> {
        self.build
            .windows_toolchain
            .as_deref()
            .map(|s| s.parse::<WindowsToolchain>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid `build.windows_toolchain`: {}", e))
    }

    /// Companion file name, falling back to the default.
    pub fn companion(&self) -> &str {
        self.artifact.companion.as_deref().unwrap_or(DEFAULT_COMPANION)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.libstage/config.toml)
/// 2. Global config (~/.libstage/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global libstage config directory (~/.libstage).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".libstage"))
}

/// Get the global config path (~/.libstage/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<package source>/.libstage/config.toml).
pub fn project_config_path(package_source: &Path) -> PathBuf {
    package_source.join(".libstage").join("config.toml")
}

/// Load the merged configuration for a package source tree.
pub fn load_for_package(package_source: &Path) -> Config {
    let project = project_config_path(package_source);
    match global_config_path() {
        Some(global) => load_config(&global, &project),
        None => load_config(Path::new(""), &project),
    }
}
