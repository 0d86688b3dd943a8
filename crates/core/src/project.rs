//! Project identity and manifests
//!
//! A project is a named library with optional upstream (dependency) and
//! downstream (consumer) project lists. Projects on disk carry a
//! `builder.json` manifest at their root; the same file doubles as the
//! configuration override file for [`crate::config::produce_config`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::CoreError;

/// GitHub account assumed for projects whose manifest does not name one.
pub const DEFAULT_ACCOUNT: &str = "forgelabs";

/// Manifest file name looked for at a project root.
pub const MANIFEST_NAME: &str = "builder.json";

/// A library participating in a build, resolved or virtual.
///
/// A virtual project has no `path`; it knows only its name and clone URL,
/// which is enough for dependency acquisition to materialize it.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub account: String,
    pub path: Option<PathBuf>,
    /// Names of projects this one depends on.
    pub upstream: Vec<String>,
    /// Names of projects that consume this one.
    pub downstream: Vec<String>,
}

impl Project {
    /// A virtual project: name only, assumed to live under the default
    /// account until a manifest says otherwise.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            account: DEFAULT_ACCOUNT.to_string(),
            path: None,
            upstream: Vec::new(),
            downstream: Vec::new(),
        }
    }

    /// A project known to exist at `path` but carrying no manifest.
    pub fn at_path(name: &str, path: &Path) -> Self {
        let mut project = Self::named(name);
        project.path = Some(path.to_path_buf());
        project
    }

    /// Load a project from the manifest at `dir/builder.json`.
    ///
    /// Returns `Ok(None)` when no manifest exists; a manifest that exists
    /// but cannot be parsed is an error.
    pub fn from_manifest(dir: &Path) -> Result<Option<Self>, CoreError> {
        let manifest_path = dir.join(MANIFEST_NAME);
        if !manifest_path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(&manifest_path).map_err(|source| CoreError::ConfigRead {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|e| CoreError::ConfigParse {
                path: manifest_path.clone(),
                message: e.to_string(),
            })?;

        let name = match manifest.name {
            Some(name) => name,
            None => dir_name(dir).ok_or_else(|| CoreError::ConfigParse {
                path: manifest_path.clone(),
                message: "manifest has no name and directory name is unusable".to_string(),
            })?,
        };

        debug!(project = %name, path = %dir.display(), "loaded project manifest");

        Ok(Some(Self {
            name,
            account: manifest.account.unwrap_or_else(|| DEFAULT_ACCOUNT.to_string()),
            path: Some(dir.to_path_buf()),
            upstream: manifest.upstream.into_iter().map(ProjectRef::into_name).collect(),
            downstream: manifest.downstream.into_iter().map(ProjectRef::into_name).collect(),
        }))
    }

    /// Clone URL for this project.
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.account, self.name)
    }

    /// Path to this project's manifest, when the project is on disk and
    /// actually has one.
    pub fn config_file(&self) -> Option<PathBuf> {
        let path = self.path.as_ref()?.join(MANIFEST_NAME);
        path.exists().then_some(path)
    }

    /// Whether the project's sources are present on disk.
    pub fn is_materialized(&self) -> bool {
        self.path.as_deref().is_some_and(Path::is_dir)
    }
}

fn dir_name(dir: &Path) -> Option<String> {
    dir.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// The manifest fields forge reads from `builder.json`. Any other keys in
/// the file are configuration overrides and are handled by the config
/// composition engine, not here.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    name: Option<String>,
    account: Option<String>,
    #[serde(default)]
    upstream: Vec<ProjectRef>,
    #[serde(default)]
    downstream: Vec<ProjectRef>,
}

/// One entry of an `upstream` or `downstream` list: either a bare project
/// name or a table with a `name` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProjectRef {
    Name(String),
    Table { name: String },
}

impl ProjectRef {
    fn into_name(self) -> String {
        match self {
            ProjectRef::Name(name) => name,
            ProjectRef::Table { name } => name,
        }
    }
}
