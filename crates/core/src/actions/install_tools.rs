//! Host package installation

use tracing::info;

use crate::action::Action;
use crate::env::Env;
use crate::error::CoreError;

/// Installs the packages the resolved configuration asks for, through the
/// host's package manager.
pub struct InstallTools;

impl Action for InstallTools {
    fn name(&self) -> String {
        "install-tools".to_string()
    }

    fn run(&self, env: &mut Env) -> Result<Vec<Box<dyn Action>>, CoreError> {
        if env.skip_install {
            info!("tool installation skipped");
            return Ok(Vec::new());
        }

        if env.config.bool_value("use_apt") {
            for key in env.config.list_value("apt_keys") {
                env.shell
                    .exec(&["sudo", "apt-key", "adv", "--fetch-keys", key.as_str()])?;
            }

            for repo in env.config.list_value("apt_repos") {
                env.shell
                    .exec(&["sudo", "apt-add-repository", repo.as_str()])?;
            }

            let packages = env.config.list_value("apt_packages");
            if !packages.is_empty() {
                env.shell.exec(&["sudo", "apt-get", "-qq", "update", "-y"])?;
                let mut install: Vec<String> = ["sudo", "apt-get", "-qq", "install", "-y", "-f"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                install.extend(packages);
                env.shell.exec(&install)?;
            }
        }

        if env.config.bool_value("use_brew") {
            for package in env.config.list_value("brew_packages") {
                env.shell.exec(&["brew", "install", package.as_str()])?;
            }
        }

        Ok(Vec::new())
    }
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

    fn dry_env(dir: &TempDir, skip_install: bool) -> Env {
        fs::write(
            dir.path().join("builder.json"),
            json!({ "name": "netio" }).to_string(),
        )
        .unwrap();
        temp_env::with_var("FORGE_SOURCE_DIR", Some(dir.path()), || {
            Env::new(EnvOptions {
                dry_run: true,
                spec: Some("linux-gcc-8-linux-x64".parse().unwrap()),
                skip_install,
                ..Default::default()
            })
        })
        .unwrap()
    }

    #[test]
    #[serial]
    fn apt_flow_emits_repo_and_install_commands() {
        let dir = TempDir::new().unwrap();
        let mut env = dry_env(&dir, false);

        run_action(&InstallTools, &mut env).unwrap();

        let history = env.shell.history().join("\n");
        assert!(history.contains("sudo apt-add-repository ppa:ubuntu-toolchain-r/test"));
        assert!(history.contains("sudo apt-get -qq update -y"));
        assert!(history.contains("gcc-8"));
    }

    #[test]
    #[serial]
    fn skip_install_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let mut env = dry_env(&dir, true);

        run_action(&InstallTools, &mut env).unwrap();
        assert!(env.shell.history().is_empty());
    }
}
