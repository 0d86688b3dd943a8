//! Error types for forge-core

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while composing configuration or running builds
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed build spec '{0}': expected host-compiler-version-target-arch")]
    MalformedSpec(String),

    #[error("host '{0}' is not known")]
    UnknownHost(String),

    #[error("target '{0}' is not known")]
    UnknownTarget(String),

    #[error("compiler '{0}' is not known")]
    UnknownCompiler(String),

    #[error("version '{version}' is not valid for compiler '{compiler}'")]
    UnknownCompilerVersion { compiler: String, version: String },

    #[error("compiler '{compiler}' does not support host '{host}'")]
    UnsupportedHost { compiler: String, host: String },

    #[error("compiler '{compiler}' does not support target '{target}'")]
    UnsupportedTarget { compiler: String, target: String },

    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("unknown action '{name}'; available actions:\n\t{}", available.join("\n\t"))]
    UnknownAction { name: String, available: Vec<String> },

    #[error("script '{script}' has an unsupported step: {step}")]
    UnsupportedStep { script: String, step: String },

    #[error("failed to load plugin '{path}': {message}")]
    Plugin { path: PathBuf, message: String },

    #[error("build spec '{0}' is disabled in this configuration")]
    Disabled(String),

    #[error("project '{0}' has not been downloaded; run dependency acquisition first")]
    MissingProject(String),

    #[error("no builder.json found in the source directory and no project name given")]
    NoProject,

    #[error("shell error: {0}")]
    Shell(#[from] forge_platform::ShellError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
