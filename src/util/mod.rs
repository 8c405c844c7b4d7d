//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod fs;
pub mod process;
pub mod shell;

pub use config::Config;
pub use diagnostic::StageError;
pub use process::{CommandRunner, CommandSpec, RunOutcome, SystemRunner};
pub use shell::Shell;
