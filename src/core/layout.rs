//! Directory layout of a package being installed.
//!
//! The package-build environment hands us two roots: the unpacked package
//! source and the directory the package is being installed into. Everything
//! else is derived from those.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Resolved paths for one install run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageLayout {
    /// Package source root (`R_PACKAGE_SOURCE`)
    pub package_source: PathBuf,
    /// Native sources, `<package_source>/src`
    pub source_dir: PathBuf,
    /// Temporary CMake build tree, `<source_dir>/build`
    pub build_dir: PathBuf,
    /// Where the library is staged, `<package_dir>/libs<arch>`
    pub dest_dir: PathBuf,
    /// Shared-library extension with leading dot (`SHLIB_EXT`)
    pub shlib_ext: String,
}

impl PackageLayout {
    /// Derive the layout from the environment-provided roots.
    ///
    /// `arch` is the architecture sub-directory (`R_ARCH`, e.g. `/x64`),
    /// appended verbatim to `libs`. An extension without a leading dot gets
    /// one.
    pub fn new(package_source: &Path, package_dir: &Path, arch: &str, shlib_ext: &str) -> Self {
        let source_dir = package_source.join("src");
        let build_dir = source_dir.join("build");

        let libs = format!("libs{}", arch);
        let dest_dir = package_dir.join(libs.trim_end_matches(['/', '\\']));

        let shlib_ext = if shlib_ext.is_empty() || shlib_ext.starts_with('.') {
            shlib_ext.to_string()
        } else {
            format!(".{}", shlib_ext)
        };

        PackageLayout {
            package_source: package_source.to_path_buf(),
            source_dir,
            build_dir,
            dest_dir,
            shlib_ext,
        }
    }

    /// File name of the library with the given stem.
    pub fn library_file(&self, library: &str) -> String {
        format!("{}{}", library, self.shlib_ext)
    }

    /// Where a staged CMakeLists file lands.
    pub fn staged_cmakelists(&self) -> PathBuf {
        self.source_dir.join("CMakeLists.txt")
    }

    /// Stale CMake cache inside the build tree.
    pub fn cmake_cache(&self) -> PathBuf {
        self.build_dir.join("CMakeCache.txt")
    }

    /// Candidate locations for a precompiled library, in search order.
    pub fn precompiled_candidates(&self, library: &str) -> Vec<PathBuf> {
        let file = self.library_file(library);
        let parent = self.package_source.join("..");
        vec![
            parent.join(&file),
            parent.join("Release").join(&file),
            parent.join("windows").join("x64").join("DLL").join(&file),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = PackageLayout::new(Path::new("/src/pkg"), Path::new("/lib/pkg"), "", ".so");

        assert_eq!(layout.source_dir, PathBuf::from("/src/pkg/src"));
        assert_eq!(layout.build_dir, PathBuf::from("/src/pkg/src/build"));
        assert_eq!(layout.dest_dir, PathBuf::from("/lib/pkg/libs"));
        assert_eq!(layout.library_file("lib_demo"), "lib_demo.so");
        assert_eq!(layout.cmake_cache(), PathBuf::from("/src/pkg/src/build/CMakeCache.txt"));
    }

    #[test]
    fn test_layout_with_arch_subdir() {
        let layout = PackageLayout::new(Path::new("/src/pkg"), Path::new("/lib/pkg"), "/x64", ".dll");

        assert_eq!(layout.dest_dir, PathBuf::from("/lib/pkg/libs/x64"));
        assert_eq!(layout.library_file("lib_demo"), "lib_demo.dll");
    }

    #[test]
    fn test_extension_gets_leading_dot() {
        let layout = PackageLayout::new(Path::new("/s"), Path::new("/d"), "", "dylib");
        assert_eq!(layout.shlib_ext, ".dylib");
    }

    #[test]
    fn test_precompiled_candidates_order() {
        let layout = PackageLayout::new(Path::new("/s/pkg"), Path::new("/d"), "", ".dll");
        let candidates = layout.precompiled_candidates("lib_demo");

        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/s/pkg/../lib_demo.dll"),
                PathBuf::from("/s/pkg/../Release/lib_demo.dll"),
                PathBuf::from("/s/pkg/../windows/x64/DLL/lib_demo.dll"),
            ]
        );
    }
}
