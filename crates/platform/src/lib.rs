//! Process and shell abstractions for forge
//!
//! This crate provides the virtual shell used by every build action:
//! - external command execution with dry-run simulation
//! - working-directory and environment stacks
//! - executable lookup on `PATH`

mod error;
mod shell;

pub use error::ShellError;
pub use shell::Shell;
