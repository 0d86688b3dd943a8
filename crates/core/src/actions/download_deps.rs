//! Dependency source acquisition
//!
//! Walks the project's upstream (and, for downstream builds, downstream)
//! closure and clones whatever is not already on disk. Cloning and branch
//! checkout run for real even in dry-run mode, because later stages read
//! the fetched manifests to discover transitive dependencies.

use tracing::info;

use crate::action::Action;
use crate::env::Env;
use crate::error::CoreError;

pub struct DownloadDependencies;

impl Action for DownloadDependencies {
    fn name(&self) -> String {
        "download-dependencies".to_string()
    }

    fn run(&self, env: &mut Env) -> Result<Vec<Box<dyn Action>>, CoreError> {
        let mut pending: Vec<String> = env.project.upstream.clone();
        if env.spec.downstream {
            pending.extend(env.project.downstream.iter().cloned());
        }
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let deps_dir = env.deps_dir.clone();
        env.shell.mkdir(&deps_dir)?;
        env.shell.pushd(&deps_dir)?;
        let result = fetch_all(env, pending);
        env.shell.popd();
        result?;
        Ok(Vec::new())
    }
}

fn fetch_all(env: &mut Env, mut pending: Vec<String>) -> Result<(), CoreError> {
    while let Some(name) = pending.pop() {
        let project = env.find_project(&name)?;
        if project.is_materialized() {
            // Already on disk, nothing to fetch
            continue;
        }

        env.shell
            .exec_always(&["git", "clone", project.url().as_str()])?;

        let checkout = env.deps_dir.join(&project.name);
        env.shell.pushd(&checkout)?;
        let result = checkout_and_scan(env, &name, &mut pending);
        env.shell.popd();
        result?;
    }
    Ok(())
}

fn checkout_and_scan(env: &mut Env, name: &str, pending: &mut Vec<String>) -> Result<(), CoreError> {
    if let Some(branch) = env.branch.clone() {
        // Not every project carries the branch under build; fall back to
        // the clone's default branch when the checkout fails.
        if env
            .shell
            .exec_always(&["git", "checkout", branch.as_str()])
            .is_err()
        {
            info!(
                "project {} has no branch named {}, using the default branch",
                name, branch
            );
        }
    }

    // Re-resolve now that the sources exist, to pick up the fetched
    // manifest and walk its own dependency lists.
    let project = env.find_project(name)?;
    pending.extend(project.upstream.iter().cloned());
    if env.spec.downstream {
        pending.extend(project.downstream.iter().cloned());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    use crate::action::run_action;
    use crate::env::EnvOptions;

    fn manifest(dir: &std::path::Path, value: &serde_json::Value) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("builder.json"), value.to_string()).unwrap();
    }

    fn dry_env(dir: &TempDir, spec: &str) -> Env {
        temp_env::with_var("FORGE_SOURCE_DIR", Some(dir.path()), || {
            Env::new(EnvOptions {
                dry_run: true,
                spec: Some(spec.parse().unwrap()),
                ..Default::default()
            })
        })
        .unwrap()
    }

    #[test]
    #[serial]
    fn no_dependencies_means_no_commands() {
        let dir = TempDir::new().unwrap();
        manifest(dir.path(), &json!({ "name": "netio" }));

        let mut env = dry_env(&dir, "linux-gcc-8-linux-x64");
        run_action(&DownloadDependencies, &mut env).unwrap();

        let history = env.shell.history().join("\n");
        assert!(!history.contains("git clone"));
    }

    #[test]
    #[serial]
    fn materialized_diamond_fetches_nothing() {
        // netio -> stringpool -> allocator
        //       -> httpcore   -> allocator
        let dir = TempDir::new().unwrap();
        manifest(
            dir.path(),
            &json!({ "name": "netio", "upstream": ["stringpool", "httpcore"] }),
        );
        let deps = dir.path().join("build/deps");
        manifest(
            &deps.join("stringpool"),
            &json!({ "name": "stringpool", "upstream": ["allocator"] }),
        );
        manifest(
            &deps.join("httpcore"),
            &json!({ "name": "httpcore", "upstream": ["allocator"] }),
        );
        manifest(&deps.join("allocator"), &json!({ "name": "allocator" }));

        let mut env = dry_env(&dir, "linux-gcc-8-linux-x64");
        run_action(&DownloadDependencies, &mut env).unwrap();

        let history = env.shell.history().join("\n");
        assert!(!history.contains("git clone"), "history: {}", history);
    }

    #[test]
    #[serial]
    fn downstream_spec_walks_consumers_too() {
        let dir = TempDir::new().unwrap();
        manifest(
            dir.path(),
            &json!({ "name": "netio", "downstream": ["httpd"] }),
        );
        let deps = dir.path().join("build/deps");
        manifest(&deps.join("httpd"), &json!({ "name": "httpd" }));

        let mut env = dry_env(&dir, "linux-gcc-8-linux-x64-downstream");
        run_action(&DownloadDependencies, &mut env).unwrap();

        // httpd was found on disk; the walk visited it without cloning
        let history = env.shell.history().join("\n");
        assert!(history.contains("pushd"));
        assert!(!history.contains("git clone"));
    }
}
