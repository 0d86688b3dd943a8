//! The environment a build runs in
//!
//! [`Env`] ties together the shell, the resolved configuration, the project
//! being built, and the directory layout used for dependencies and install
//! artifacts. It also owns the project cache behind [`Env::find_project`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use serde_json::{Map, Value};
use tracing::{debug, info};

use forge_platform::Shell;

use crate::config::{self, ResolvedConfig};
use crate::error::CoreError;
use crate::plugins;
use crate::project::Project;
use crate::spec::{self, BuildSpec};
use crate::toolchain::Toolchain;

/// Settings the caller provides when constructing an [`Env`].
#[derive(Debug, Default)]
pub struct EnvOptions {
    pub dry_run: bool,
    /// Build spec to resolve; probed from the host machine when absent.
    pub spec: Option<BuildSpec>,
    /// Project name to assume when the source directory has no manifest.
    pub project: Option<String>,
    /// Extra variable bindings forwarded to configuration interpolation.
    pub variables: Map<String, Value>,
    /// Skip the tool installation stage.
    pub skip_install: bool,
    /// CMake build configuration; `RelWithDebInfo` when unset.
    pub build_config: Option<String>,
}

/// Everything a build or action needs to run.
#[derive(Debug)]
pub struct Env {
    pub shell: Shell,
    pub spec: BuildSpec,
    pub config: ResolvedConfig,
    pub toolchain: Toolchain,
    pub branch: Option<String>,
    pub project: Project,

    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub deps_dir: PathBuf,
    pub install_dir: PathBuf,

    /// Set while configuring the root project; tells the test stage whether
    /// test binaries were built at all.
    pub build_tests: bool,
    pub skip_install: bool,
    pub build_config: String,

    projects: BTreeMap<String, Project>,
}

impl Env {
    pub fn new(options: EnvOptions) -> Result<Self, CoreError> {
        let shell = Shell::new(options.dry_run)?;

        let source_dir = match std::env::var_os("FORGE_SOURCE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => shell.cwd()?,
        };
        let build_dir = source_dir.join("build");
        let deps_dir = build_dir.join("deps");
        let install_dir = build_dir.join("install");

        let branch = current_branch();
        if let Some(branch) = &branch {
            info!("building on branch {}", branch);
        }

        let project = match Project::from_manifest(&source_dir)? {
            Some(project) => project,
            None => match &options.project {
                Some(name) => Project::at_path(name, &source_dir),
                None => return Err(CoreError::NoProject),
            },
        };
        debug!(project = %project.name, "resolved root project");

        // Project-local plugins may contribute actions; load them before
        // anything can be asked to run by name.
        plugins::load_project_plugins(&source_dir)?;

        let spec = options.spec.unwrap_or_else(|| spec::host_spec(&shell));
        let config = config::produce_config(&spec, project.config_file().as_deref(), &options.variables)?;
        let toolchain = Toolchain::from_spec(&spec);

        let mut projects = BTreeMap::new();
        projects.insert(project.name.clone(), project.clone());

        Ok(Self {
            shell,
            spec,
            config,
            toolchain,
            branch,
            project,
            source_dir,
            build_dir,
            deps_dir,
            install_dir,
            build_tests: false,
            skip_install: options.skip_install,
            build_config: options
                .build_config
                .unwrap_or_else(|| "RelWithDebInfo".to_string()),
            projects,
        })
    }

    /// Find a project by name: the cache first, then the source directory,
    /// then the dependency directory. Unknown projects come back virtual
    /// and uncached, with enough identity to be cloned.
    pub fn find_project(&mut self, name: &str) -> Result<Project, CoreError> {
        if let Some(project) = self.projects.get(name) {
            return Ok(project.clone());
        }

        let candidates = [self.source_dir.clone(), self.deps_dir.join(name)];
        for dir in candidates {
            let matches_name = dir.file_name().is_some_and(|n| n.to_string_lossy() == name);
            if !matches_name || !dir.is_dir() {
                continue;
            }
            let project = match Project::from_manifest(&dir)? {
                Some(project) => project,
                None => Project::at_path(name, &dir),
            };
            self.projects.insert(name.to_string(), project.clone());
            return Ok(project);
        }

        Ok(Project::named(name))
    }

}

/// Determine the branch being built, for matching branch checkouts across
/// dependencies. `FORGE_BRANCH` wins, then the CI ref, then git itself.
fn current_branch() -> Option<String> {
    if let Ok(branch) = std::env::var("FORGE_BRANCH") {
        if !branch.is_empty() {
            return Some(branch);
        }
    }

    if let Ok(github_ref) = std::env::var("GITHUB_REF") {
        if let Some(branch) = github_ref.strip_prefix("refs/heads/") {
            return Some(branch.to_string());
        }
    }

    let output = Command::new("git")
        .args(["branch", "-a", "--contains", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    for line in listing.lines() {
        let branch = line.trim_start_matches('*').trim();
        if branch.is_empty() || branch == "(no branch)" {
            continue;
        }
        let branch = branch.strip_prefix("remotes/origin/").unwrap_or(branch);
        return Some(branch.to_string());
    }
    None
}
