//! The build-spec identifier

use std::fmt;
use std::str::FromStr;

use forge_platform::Shell;

use crate::error::CoreError;
use crate::toolchain;

/// Refers to a specific build permutation, e.g. `linux-gcc-8-linux-x64`.
///
/// Immutable after construction; [`crate::config::validate_spec`] checks the
/// fields against the configuration tables before any work starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub host: String,
    pub compiler: String,
    pub compiler_version: String,
    pub target: String,
    pub arch: String,
    /// When set, consumer (downstream) projects are fetched and built too.
    pub downstream: bool,
}

impl BuildSpec {
    pub fn new(host: &str, compiler: &str, compiler_version: &str, target: &str, arch: &str) -> Self {
        Self {
            host: host.to_string(),
            compiler: compiler.to_string(),
            compiler_version: compiler_version.to_string(),
            target: target.to_string(),
            arch: arch.to_string(),
            downstream: false,
        }
    }

    /// Canonical name: fields joined by `-`, with a `-downstream` suffix
    /// when the downstream flag is set.
    pub fn name(&self) -> String {
        let mut name = [
            self.host.as_str(),
            self.compiler.as_str(),
            self.compiler_version.as_str(),
            self.target.as_str(),
            self.arch.as_str(),
        ]
        .join("-");
        if self.downstream {
            name.push_str("-downstream");
        }
        name
    }
}

impl fmt::Display for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for BuildSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() < 5 || parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::MalformedSpec(s.to_string()));
        }
        let mut spec = BuildSpec::new(parts[0], parts[1], parts[2], parts[3], parts[4]);
        spec.downstream = parts[5..].contains(&"downstream");
        Ok(spec)
    }
}

/// Build a default spec for the machine forge is running on.
///
/// Probes for clang first, then gcc, and falls back to the `default`
/// compiler entry when neither is found.
pub fn host_spec(shell: &Shell) -> BuildSpec {
    let arch = host_arch();

    #[cfg(target_os = "linux")]
    {
        if let Some((_, version)) = toolchain::find_llvm_tool(shell, "clang", None) {
            return BuildSpec::new("linux", "clang", &version, "linux", arch);
        }
        if let Some((_, version)) = toolchain::find_gcc_tool(shell, "gcc", None) {
            return BuildSpec::new("linux", "gcc", &version, "linux", arch);
        }
        BuildSpec::new("linux", "default", "default", "linux", arch)
    }

    #[cfg(target_os = "macos")]
    {
        let _ = shell;
        BuildSpec::new("macos", "clang", "default", "macos", arch)
    }

    #[cfg(target_os = "windows")]
    {
        let _ = shell;
        BuildSpec::new("windows", "msvc", "default", "windows", arch)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        let _ = shell;
        BuildSpec::new("default", "default", "default", "default", arch)
    }
}

fn host_arch() -> &'static str {
    #[cfg(target_arch = "x86_64")]
    {
        "x64"
    }
    #[cfg(target_arch = "x86")]
    {
        "x86"
    }
    #[cfg(target_arch = "aarch64")]
    {
        "armv8"
    }
    #[cfg(target_arch = "arm")]
    {
        "armv7"
    }
    #[cfg(not(any(
        target_arch = "x86_64",
        target_arch = "x86",
        target_arch = "aarch64",
        target_arch = "arm"
    )))]
    {
        "x64"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_spec() {
        let spec: BuildSpec = "linux-clang-9-linux-x64".parse().unwrap();
        assert_eq!(spec.host, "linux");
        assert_eq!(spec.compiler, "clang");
        assert_eq!(spec.compiler_version, "9");
        assert_eq!(spec.target, "linux");
        assert_eq!(spec.arch, "x64");
        assert!(!spec.downstream);
    }

    #[test]
    fn parse_downstream_suffix() {
        let spec: BuildSpec = "linux-clang-6-linux-x64-downstream".parse().unwrap();
        assert!(spec.downstream);
        assert_eq!(spec.name(), "linux-clang-6-linux-x64-downstream");
    }

    #[test]
    fn name_round_trips() {
        let text = "windows-msvc-2017-windows-x64";
        let spec: BuildSpec = text.parse().unwrap();
        assert_eq!(spec.to_string(), text);
    }

    #[test]
    fn dotted_compiler_version() {
        let spec: BuildSpec = "linux-gcc-4.8-linux-x86".parse().unwrap();
        assert_eq!(spec.compiler_version, "4.8");
    }

    #[test]
    fn too_few_fields_is_an_error() {
        assert!("linux-gcc-8".parse::<BuildSpec>().is_err());
        assert!("".parse::<BuildSpec>().is_err());
        assert!("linux--8-linux-x64".parse::<BuildSpec>().is_err());
    }
}
