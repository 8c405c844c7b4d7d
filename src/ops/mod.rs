//! High-level operations.
//!
//! This module contains the implementation of libstage commands.

pub mod doctor;
pub mod install;

pub use doctor::{doctor, format_report, DoctorOptions, DoctorReport};
pub use install::{install, preflight, InstallOptions, InstallPlan, InstallReport};
