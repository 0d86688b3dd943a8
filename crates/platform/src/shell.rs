//! Virtual shell with dry-run support
//!
//! Every external command a build runs goes through [`Shell`]. In dry-run
//! mode commands are logged and their filesystem effects simulated against an
//! in-memory working directory, so a dry run prints exactly the command
//! sequence a real run would execute. Cloning and checkout during dependency
//! acquisition use [`Shell::exec_always`] because later steps read the
//! fetched files even in a dry run.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::error::ShellError;

/// Dry-run-aware shell that tracks and logs every command it is asked to run.
#[derive(Debug)]
pub struct Shell {
    dry_run: bool,
    /// Simulated working directory, authoritative only in dry-run mode.
    sim_cwd: PathBuf,
    dir_stack: Vec<PathBuf>,
    env_stack: Vec<HashMap<String, String>>,
    history: Vec<String>,
}

impl Shell {
    pub fn new(dry_run: bool) -> Result<Self, ShellError> {
        Ok(Self {
            dry_run,
            sim_cwd: env::current_dir()?,
            dir_stack: Vec::new(),
            env_stack: Vec::new(),
            history: Vec::new(),
        })
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Every command line ever logged, in order. Dry runs record the full
    /// sequence here without executing anything.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn log_command<S: AsRef<str>>(&mut self, parts: &[S]) -> String {
        let line = parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        info!("> {}", line);
        self.history.push(line.clone());
        line
    }

    /// Run an external command, or just log it in dry-run mode.
    pub fn exec<S: AsRef<str>>(&mut self, command: &[S]) -> Result<(), ShellError> {
        let line = self.log_command(command);
        if self.dry_run {
            return Ok(());
        }
        self.run_command(command, line)
    }

    /// Run an external command even in dry-run mode.
    ///
    /// Used for commands whose outputs later steps must be able to read,
    /// e.g. fetching dependency sources.
    pub fn exec_always<S: AsRef<str>>(&mut self, command: &[S]) -> Result<(), ShellError> {
        let line = self.log_command(command);
        self.run_command(command, line)
    }

    fn run_command<S: AsRef<str>>(&mut self, command: &[S], line: String) -> Result<(), ShellError> {
        let program = command
            .first()
            .map(|p| p.as_ref().to_string())
            .ok_or_else(|| ShellError::Spawn {
                cmd: line.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            })?;

        let status = Command::new(&program)
            .args(command[1..].iter().map(|a| a.as_ref()))
            .status()
            .map_err(|source| ShellError::Spawn {
                cmd: line.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ShellError::CommandFailed {
                cmd: line,
                code: status.code(),
            });
        }
        Ok(())
    }

    fn change_dir(&mut self, dir: &Path) -> Result<(), ShellError> {
        if self.dry_run {
            if dir.is_absolute() {
                self.sim_cwd = dir.to_path_buf();
            } else {
                self.sim_cwd = self.sim_cwd.join(dir);
            }
            Ok(())
        } else {
            env::set_current_dir(dir)?;
            Ok(())
        }
    }

    /// Change the working directory, honoring dry-run simulation.
    pub fn cd(&mut self, dir: &Path) -> Result<(), ShellError> {
        self.log_command(&["cd", &dir.display().to_string()]);
        self.change_dir(dir)
    }

    /// Equivalent to bash/zsh `pushd`.
    pub fn pushd(&mut self, dir: &Path) -> Result<(), ShellError> {
        self.log_command(&["pushd", &dir.display().to_string()]);
        let prev = self.cwd()?;
        self.change_dir(dir)?;
        self.dir_stack.push(prev);
        Ok(())
    }

    /// Equivalent to bash/zsh `popd`. A no-op on an empty stack.
    pub fn popd(&mut self) {
        if let Some(prev) = self.dir_stack.pop() {
            self.log_command(&["popd", &prev.display().to_string()]);
            if let Err(e) = self.change_dir(&prev) {
                warn!("failed to restore directory {}: {}", prev.display(), e);
            }
        }
    }

    /// Run `f` with the working directory changed to `dir`, restoring the
    /// previous directory on every exit path.
    pub fn with_dir<T, E>(
        &mut self,
        dir: &Path,
        f: impl FnOnce(&mut Shell) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<ShellError>,
    {
        self.pushd(dir)?;
        let result = f(self);
        self.popd();
        result
    }

    /// Equivalent to `mkdir -p`.
    pub fn mkdir(&mut self, dir: &Path) -> Result<(), ShellError> {
        self.log_command(&["mkdir", "-p", &dir.display().to_string()]);
        if !self.dry_run {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Current working directory, accounting for dry-run simulation.
    pub fn cwd(&self) -> Result<PathBuf, ShellError> {
        if self.dry_run {
            Ok(self.sim_cwd.clone())
        } else {
            Ok(env::current_dir()?)
        }
    }

    /// Set an environment variable for subsequent commands.
    pub fn setenv(&mut self, var: &str, value: &str) {
        self.log_command(&["export", &format!("{}={}", var, value)]);
        if !self.dry_run {
            // Single-threaded tool; no concurrent access to the process env.
            unsafe { env::set_var(var, value) };
        }
    }

    pub fn getenv(&self, var: &str) -> Result<String, ShellError> {
        env::var(var).map_err(|_| ShellError::MissingEnv(var.to_string()))
    }

    /// Snapshot the current environment for later restoration.
    pub fn pushenv(&mut self) {
        self.log_command(&["pushenv"]);
        self.env_stack.push(env::vars().collect());
    }

    /// Restore the environment to the most recent snapshot.
    pub fn popenv(&mut self) {
        self.log_command(&["popenv"]);
        let Some(saved) = self.env_stack.pop() else {
            return;
        };
        if self.dry_run {
            return;
        }
        // Clear variables introduced since the snapshot, then write it back.
        for (name, _) in env::vars() {
            if !saved.contains_key(&name) {
                unsafe { env::remove_var(&name) };
            }
        }
        for (name, value) in saved {
            unsafe { env::set_var(name, value) };
        }
    }

    /// Platform-agnostic `which`: locate an executable on `PATH`.
    pub fn which(&self, exe: &str) -> Option<PathBuf> {
        let path = env::var_os("PATH")?;
        let candidates = candidate_names(exe);
        for dir in env::split_paths(&path) {
            for name in &candidates {
                let full = dir.join(name);
                if is_executable(&full) {
                    return Some(full);
                }
            }
        }
        None
    }
}

#[cfg(unix)]
fn candidate_names(exe: &str) -> Vec<String> {
    vec![exe.to_string()]
}

#[cfg(windows)]
fn candidate_names(exe: &str) -> Vec<String> {
    if Path::new(exe).extension().is_some() {
        return vec![exe.to_string()];
    }
    let pathext = env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.BAT;.CMD".to_string());
    pathext
        .split(';')
        .map(|ext| format!("{}{}", exe, ext.to_lowercase()))
        .collect()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && path
            .metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(windows)]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
