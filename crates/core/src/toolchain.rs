//! Compiler toolchain resolution

use std::path::PathBuf;

use forge_platform::Shell;

use crate::spec::BuildSpec;

/// The compiler toolchain a spec selects, resolvable to an executable on
/// the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub compiler: String,
    pub compiler_version: String,
}

impl Toolchain {
    pub fn from_spec(spec: &BuildSpec) -> Self {
        Self {
            compiler: spec.compiler.clone(),
            compiler_version: spec.compiler_version.clone(),
        }
    }

    /// Locate the compiler driver on the host, if it is installed.
    pub fn compiler_path(&self, shell: &Shell) -> Option<PathBuf> {
        let version = match self.compiler_version.as_str() {
            "default" => None,
            v => Some(v),
        };
        match self.compiler.as_str() {
            "default" => {
                let cc = shell.getenv("CC").unwrap_or_else(|_| "cc".to_string());
                shell.which(&cc)
            }
            "clang" => find_llvm_tool(shell, "clang", version).map(|(path, _)| path),
            "gcc" => find_gcc_tool(shell, "gcc", version).map(|(path, _)| path),
            "msvc" => shell.which("cl.exe"),
            _ => None,
        }
    }
}

/// Find a gcc family tool (gcc, g++, gcc-ranlib) at a specific version, or
/// the newest version installed.
pub fn find_gcc_tool(shell: &Shell, name: &str, version: Option<&str>) -> Option<(PathBuf, String)> {
    match version {
        Some(v) => find_versioned_tool(shell, name, &[v]),
        None => find_versioned_tool(shell, name, &["8", "7", "6"]),
    }
}

/// Find an llvm family tool (clang, clang-tidy, lld) at a specific version,
/// or the newest version installed.
pub fn find_llvm_tool(shell: &Shell, name: &str, version: Option<&str>) -> Option<(PathBuf, String)> {
    match version {
        Some(v) => find_versioned_tool(shell, name, &[v]),
        None => find_versioned_tool(shell, name, &["10", "9", "8", "7"]),
    }
}

/// Probe `name-version` and `name-version.0` for each candidate version.
fn find_versioned_tool(shell: &Shell, name: &str, versions: &[&str]) -> Option<(PathBuf, String)> {
    for version in versions {
        for exe in [format!("{}-{}", name, version), format!("{}-{}.0", name, version)] {
            if let Some(path) = shell.which(&exe) {
                return Some((path, version.to_string()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use serial_test::serial;
    use tempfile::TempDir;

    fn fake_tool(dir: &std::path::Path, name: &str) {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn with_path<T>(dir: &TempDir, f: impl FnOnce() -> T) -> T {
        temp_env::with_var("PATH", Some(dir.path()), f)
    }

    #[test]
    #[serial]
    fn probes_newest_version_first() {
        let dir = TempDir::new().unwrap();
        fake_tool(dir.path(), "gcc-6");
        fake_tool(dir.path(), "gcc-8");

        let shell = Shell::new(true).unwrap();
        let (path, version) = with_path(&dir, || find_gcc_tool(&shell, "gcc", None)).unwrap();
        assert_eq!(version, "8");
        assert_eq!(path, dir.path().join("gcc-8"));
    }

    #[test]
    #[serial]
    fn falls_back_to_dotted_suffix() {
        let dir = TempDir::new().unwrap();
        fake_tool(dir.path(), "clang-6.0");

        let shell = Shell::new(true).unwrap();
        let (path, version) = with_path(&dir, || find_llvm_tool(&shell, "clang", Some("6"))).unwrap();
        assert_eq!(version, "6");
        assert_eq!(path, dir.path().join("clang-6.0"));
    }

    #[test]
    #[serial]
    fn missing_tool_is_none() {
        let dir = TempDir::new().unwrap();
        let shell = Shell::new(true).unwrap();
        assert_eq!(with_path(&dir, || find_gcc_tool(&shell, "gcc", Some("4.8"))), None);
    }

    #[test]
    #[serial]
    fn default_compiler_honors_cc() {
        let dir = TempDir::new().unwrap();
        fake_tool(dir.path(), "mycc");

        let spec: BuildSpec = "linux-default-default-linux-x64".parse().unwrap();
        let toolchain = Toolchain::from_spec(&spec);
        let shell = Shell::new(true).unwrap();
        let path = temp_env::with_vars(
            [
                ("PATH", Some(dir.path().as_os_str().to_os_string())),
                ("CC", Some(std::ffi::OsString::from("mycc"))),
            ],
            || toolchain.compiler_path(&shell),
        );
        assert_eq!(path, Some(dir.path().join("mycc")));
    }

    #[test]
    #[serial]
    fn toolchain_resolves_its_own_compiler() {
        let dir = TempDir::new().unwrap();
        fake_tool(dir.path(), "gcc-7");

        let spec: BuildSpec = "linux-gcc-7-linux-x64".parse().unwrap();
        let toolchain = Toolchain::from_spec(&spec);
        let shell = Shell::new(true).unwrap();
        let path = with_path(&dir, || toolchain.compiler_path(&shell));
        assert_eq!(path, Some(dir.path().join("gcc-7")));
    }
}
