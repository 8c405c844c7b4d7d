//! Windows toolchain choices.
//!
//! On Windows the library can be built either with Visual Studio (through a
//! CMake Visual Studio generator and `cmake --build`) or with a GNU toolchain
//! that CMake drives through Makefiles. Other hosts always use `make`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Visual Studio generators tried in order when none are configured.
pub const DEFAULT_VS_GENERATORS: &[&str] = &[
    "Visual Studio 17 2022",
    "Visual Studio 16 2019",
    "Visual Studio 15 2017",
    "Visual Studio 14 2015",
];

/// Platform argument passed with `-A` to Visual Studio generators.
pub const VS_PLATFORM: &str = "x64";

/// Configuration built by multi-config generators.
pub const VS_CONFIG: &str = "Release";

/// Build tool on non-Windows hosts.
pub const UNIX_MAKE: &str = "make";

/// Toolchain used on Windows hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowsToolchain {
    /// Visual Studio, falling back to MinGW when no generator works
    #[default]
    Msvc,
    /// MinGW-w64 as shipped with Rtools
    MinGw,
    /// MSYS2
    Msys2,
}

impl WindowsToolchain {
    /// Makefile generator and build tool for the GNU toolchains.
    ///
    /// `Msvc` has no Makefile flavour of its own; its fallback is MinGW.
    pub fn makefiles(&self) -> MakefileToolchain {
        match self {
            WindowsToolchain::Msvc | WindowsToolchain::MinGw => MakefileToolchain {
                name: "MinGW",
                generator: "MinGW Makefiles",
                build_tool: "mingw32-make.exe",
            },
            WindowsToolchain::Msys2 => MakefileToolchain {
                name: "MSYS2",
                generator: "MSYS Makefiles",
                build_tool: "make.exe",
            },
        }
    }
}

impl FromStr for WindowsToolchain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "msvc" | "visual-studio" | "vs" => Ok(WindowsToolchain::Msvc),
            "mingw" => Ok(WindowsToolchain::MinGw),
            "msys2" | "msys" => Ok(WindowsToolchain::Msys2),
            _ => Err(format!(
                "unknown Windows toolchain '{}'; expected 'msvc', 'mingw', or 'msys2'",
                s
            )),
        }
    }
}

impl fmt::Display for WindowsToolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowsToolchain::Msvc => write!(f, "msvc"),
            WindowsToolchain::MinGw => write!(f, "mingw"),
            WindowsToolchain::Msys2 => write!(f, "msys2"),
        }
    }
}

/// A GNU toolchain that CMake drives through Makefiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MakefileToolchain {
    /// Human-readable name for messages
    pub name: &'static str,
    /// CMake generator (`-G`)
    pub generator: &'static str,
    /// Make executable
    pub build_tool: &'static str,
}
