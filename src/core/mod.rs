//! Core types: host platform and package layout.

pub mod layout;
pub mod platform;

pub use layout::PackageLayout;
pub use platform::{HostOs, HostPlatform};
