//! Package tree fixtures.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Minimal CMakeLists used by fixtures.
pub const FIXTURE_CMAKELISTS: &str = r#"cmake_minimum_required(VERSION 3.8)
project(demo LANGUAGES CXX)
add_library(_demo SHARED demo.cpp)
set_target_properties(_demo PROPERTIES OUTPUT_NAME "_demo" PREFIX "lib" LIBRARY_OUTPUT_DIRECTORY "${CMAKE_SOURCE_DIR}")
"#;

/// A package source tree and an install root inside one temporary directory.
///
/// ```text
/// <tmp>/pkg/src/demo.cpp
/// <tmp>/pkg/inst/bin/CMakeLists.txt
/// <tmp>/install/
/// ```
pub struct PackageFixture {
    tmp: TempDir,
}

impl PackageFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let pkg = tmp.path().join("pkg");

        std::fs::create_dir_all(pkg.join("src")).expect("failed to create src dir");
        std::fs::create_dir_all(pkg.join("inst").join("bin")).expect("failed to create inst/bin");
        std::fs::write(pkg.join("src").join("demo.cpp"), "extern \"C\" int demo() { return 0; }\n")
            .expect("failed to write source");
        std::fs::write(
            pkg.join("inst").join("bin").join("CMakeLists.txt"),
            FIXTURE_CMAKELISTS,
        )
        .expect("failed to write CMakeLists.txt");

        PackageFixture { tmp }
    }

    /// Temporary root holding both trees.
    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Package source root.
    pub fn package_source(&self) -> PathBuf {
        self.tmp.path().join("pkg")
    }

    /// Install root.
    pub fn package_dir(&self) -> PathBuf {
        self.tmp.path().join("install")
    }

    /// Write a file relative to the package source root.
    pub fn write(&self, relative: impl AsRef<Path>, contents: &str) -> PathBuf {
        let path = self.package_source().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, contents).expect("failed to write fixture file");
        path
    }
}

impl Default for PackageFixture {
    fn default() -> Self {
        Self::new()
    }
}
