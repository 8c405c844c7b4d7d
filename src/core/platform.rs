//! Host platform detection.

use std::fmt;

use serde::Serialize;

use crate::util::StageError;

/// Operating system family of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Windows,
    MacOs,
    Linux,
    Other(String),
}

impl HostOs {
    /// Map a `std::env::consts::OS` value.
    pub fn from_os_str(os: &str) -> Self {
        match os {
            "windows" => HostOs::Windows,
            "macos" => HostOs::MacOs,
            "linux" => HostOs::Linux,
            other => HostOs::Other(other.to_string()),
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, HostOs::Windows)
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostOs::Windows => write!(f, "windows"),
            HostOs::MacOs => write!(f, "macos"),
            HostOs::Linux => write!(f, "linux"),
            HostOs::Other(os) => write!(f, "{}", os),
        }
    }
}

/// The platform libstage is running on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostPlatform {
    /// Operating system family
    pub os: HostOs,
    /// CPU architecture (x86_64, aarch64, etc.)
    pub arch: String,
    /// Pointer width in bits
    pub pointer_width: u32,
}

impl HostPlatform {
    /// Create a platform description.
    pub fn new(os: HostOs, arch: &str, pointer_width: u32) -> Self {
        HostPlatform {
            os,
            arch: arch.to_string(),
            pointer_width,
        }
    }

    /// Detect the host platform from the running binary.
    pub fn detect() -> Self {
        let pointer_width = (std::mem::size_of::<usize>() * 8) as u32;
        HostPlatform::new(
            HostOs::from_os_str(std::env::consts::OS),
            std::env::consts::ARCH,
            pointer_width,
        )
    }

    /// Fail unless the host has 64-bit pointers.
    pub fn ensure_supported(&self) -> Result<(), StageError> {
        if self.pointer_width != 64 {
            return Err(StageError::UnsupportedPlatform {
                arch: self.arch.clone(),
                pointer_width: self.pointer_width,
            });
        }
        Ok(())
    }

    /// Conventional shared-library extension, with leading dot.
    pub fn default_shlib_ext(&self) -> &'static str {
        match self.os {
            HostOs::Windows => ".dll",
            HostOs::MacOs => ".dylib",
            HostOs::Linux | HostOs::Other(_) => ".so",
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} ({}-bit)", self.arch, self.os, self.pointer_width)
    }
}
