//! forge-core: build-spec composition and execution engine
//!
//! This crate provides the fundamental types used throughout forge:
//! - `BuildSpec`: the host/compiler/version/target/arch build identifier
//! - `ResolvedConfig`: the merged, variable-substituted configuration
//! - `Project`: a named source unit with upstream/downstream dependencies
//! - `Action`: composable units of build work that may produce further actions
//! - `Env`: the per-invocation context every action runs against

pub mod action;
pub mod actions;
pub mod build;
pub mod config;
pub mod env;
pub mod error;
pub mod jobs;
pub mod plugins;
pub mod project;
pub mod script;
pub mod spec;
pub mod tables;
pub mod toolchain;
pub mod vars;

pub use action::{Action, known_actions, run_action, run_named_action};
pub use build::run_build;
pub use config::{ResolvedConfig, produce_config};
pub use env::{Env, EnvOptions};
pub use error::CoreError;
pub use project::Project;
pub use script::{Script, Step};
pub use spec::BuildSpec;
pub use toolchain::Toolchain;
