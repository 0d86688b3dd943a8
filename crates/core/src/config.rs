//! Config composition engine
//!
//! Resolves a [`BuildSpec`] plus an optional project override file into one
//! merged, variable-substituted configuration. Composition is a pure
//! function of its inputs: the applicable fragments are selected in a fixed
//! order and merged key-by-key against the closed key set in
//! [`crate::tables::KEYS`].
//!
//! Merge semantics per key:
//! - a `!key` override form in a fragment replaces the accumulated value
//!   wholesale, discarding everything earlier fragments contributed
//! - list values are prepended, so later (more specific) fragments sort first
//! - map values merge recursively, key by key
//! - scalar values replace the accumulated value

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CoreError;
use crate::spec::BuildSpec;
use crate::tables::{COMPILERS, HOSTS, KEYS, TARGETS};
use crate::vars;

/// The single configuration produced by merging every fragment applicable
/// to a build spec, after variable interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub spec: BuildSpec,
    values: Map<String, Value>,
    variables: Map<String, Value>,
}

impl ResolvedConfig {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn bool_value(&self, key: &str) -> bool {
        self.values.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// String entries of a list-valued key.
    pub fn list_value(&self, key: &str) -> Vec<String> {
        self.values
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn map_value(&self, key: &str) -> Map<String, Value> {
        self.values
            .get(key)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Raw step list for a command-sequence key (`build`, `test`,
    /// `pre_build_steps`, `post_build_steps`); entries may be strings or
    /// argument lists.
    pub fn steps(&self, key: &str) -> Vec<Value> {
        self.values
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    pub fn enabled(&self) -> bool {
        self.bool_value("enabled")
    }

    pub fn run_tests(&self) -> bool {
        self.bool_value("run_tests")
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// The full configuration as a JSON value, for `--dump-config`.
    pub fn to_value(&self) -> Value {
        let mut out = self.values.clone();
        out.insert("spec".to_string(), Value::String(self.spec.name()));
        out.insert("variables".to_string(), Value::Object(self.variables.clone()));
        Value::Object(out)
    }
}

/// Ensure the combination of spec fields is valid together.
pub fn validate_spec(spec: &BuildSpec) -> Result<(), CoreError> {
    if !HOSTS.contains_key(&spec.host) {
        return Err(CoreError::UnknownHost(spec.host.clone()));
    }
    if !TARGETS.contains_key(&spec.target) {
        return Err(CoreError::UnknownTarget(spec.target.clone()));
    }
    let compiler = COMPILERS
        .get(&spec.compiler)
        .ok_or_else(|| CoreError::UnknownCompiler(spec.compiler.clone()))?;

    let versions = compiler.get("versions").and_then(Value::as_object);
    if !versions.is_some_and(|v| v.contains_key(&spec.compiler_version)) {
        return Err(CoreError::UnknownCompilerVersion {
            compiler: spec.compiler.clone(),
            version: spec.compiler_version.clone(),
        });
    }

    if !string_list_contains(compiler.get("hosts"), &spec.host) {
        return Err(CoreError::UnsupportedHost {
            compiler: spec.compiler.clone(),
            host: spec.host.clone(),
        });
    }
    if !string_list_contains(compiler.get("targets"), &spec.target) {
        return Err(CoreError::UnsupportedTarget {
            compiler: spec.compiler.clone(),
            target: spec.target.clone(),
        });
    }
    Ok(())
}

fn string_list_contains(list: Option<&Value>, needle: &str) -> bool {
    list.and_then(Value::as_array)
        .is_some_and(|items| items.iter().any(|v| v.as_str() == Some(needle)))
}

/// Produce the resolved configuration for a build spec.
///
/// `override_file`, when given, must be a readable JSON object; its
/// `hosts`/`targets`/`compilers` sub-objects follow the built-in table
/// shapes and compose after every built-in fragment, and the file's own
/// top-level keys form the final fragment.
pub fn produce_config(
    spec: &BuildSpec,
    override_file: Option<&Path>,
    extra_variables: &Map<String, Value>,
) -> Result<ResolvedConfig, CoreError> {
    validate_spec(spec)?;

    let mut fragments: Vec<Value> = Vec::new();
    let defaults = builtin_tables();
    collect_fragments(&defaults, spec, &mut fragments);

    if let Some(path) = override_file {
        let text = fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Value = serde_json::from_str(&text).map_err(|e| CoreError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let project_config = parsed.as_object().ok_or_else(|| CoreError::ConfigParse {
            path: path.to_path_buf(),
            message: "top level must be an object".to_string(),
        })?;

        collect_fragments(project_config, spec, &mut fragments);

        // The override file itself is the final fragment, unless fragment
        // selection already picked it up verbatim.
        let raw = Value::Object(project_config.clone());
        if !fragments.contains(&raw) {
            fragments.push(raw);
        }
    }

    debug!(spec = %spec, fragments = fragments.len(), "composing configuration");

    // Merge each key of the closed key set across all fragments in order
    let mut values = Map::new();
    for (key, default) in KEYS.iter() {
        let override_key = format!("!{}", key);
        let mut acc = default.clone();
        for fragment in &fragments {
            let Some(fragment) = fragment.as_object() else {
                continue;
            };
            if let Some(replacement) = fragment.get(&override_key) {
                acc = replacement.clone();
            } else if let Some(value) = fragment.get(key) {
                apply_value(&mut acc, value);
            }
        }
        values.insert(key.clone(), acc);
    }

    // Base bindings from the spec itself, then caller extras, then fragment
    // variable blocks (later fragments win).
    let mut variables = Map::new();
    variables.insert("host".to_string(), Value::String(spec.host.clone()));
    variables.insert("compiler".to_string(), Value::String(spec.compiler.clone()));
    variables.insert("version".to_string(), Value::String(spec.compiler_version.clone()));
    variables.insert("target".to_string(), Value::String(spec.target.clone()));
    variables.insert("arch".to_string(), Value::String(spec.arch.clone()));
    let cwd = std::env::current_dir().unwrap_or_default();
    variables.insert("cwd".to_string(), Value::String(cwd.display().to_string()));
    for (k, v) in extra_variables {
        variables.insert(k.clone(), v.clone());
    }
    for fragment in &fragments {
        if let Some(block) = fragment.get("variables").and_then(Value::as_object) {
            for (k, v) in block {
                variables.insert(k.clone(), v.clone());
            }
        }
    }

    let values = match vars::interpolate(&Value::Object(values), &variables) {
        Value::Object(map) => map,
        _ => unreachable!("interpolation preserves the value shape"),
    };

    Ok(ResolvedConfig {
        spec: spec.clone(),
        values,
        variables,
    })
}

fn builtin_tables() -> Map<String, Value> {
    let mut defaults = Map::new();
    defaults.insert("hosts".to_string(), Value::Object(HOSTS.clone()));
    defaults.insert("targets".to_string(), Value::Object(TARGETS.clone()));
    defaults.insert("compilers".to_string(), Value::Object(COMPILERS.clone()));
    defaults
}

/// Select the fragments applicable to `spec` from one table set, in
/// composition order: host, host-arch, target, target-arch, compiler,
/// compiler-arch, version, version-arch.
fn collect_fragments(config: &Map<String, Value>, spec: &BuildSpec, out: &mut Vec<Value>) {
    select_element(config.get("hosts"), &spec.host, &spec.arch, out);
    select_element(config.get("targets"), &spec.target, &spec.arch, out);

    let compiler = select_element(config.get("compilers"), &spec.compiler, &spec.arch, out);
    if let Some(compiler) = compiler {
        select_element(compiler.get("versions"), &spec.compiler_version, &spec.arch, out);
    }
}

/// Push the named fragment and its architecture overlay, if either exists.
fn select_element<'a>(
    table: Option<&'a Value>,
    name: &str,
    arch: &str,
    out: &mut Vec<Value>,
) -> Option<&'a Value> {
    let fragment = table?.get(name)?;
    out.push(fragment.clone());

    if let Some(overlay) = fragment.get("architectures").and_then(|a| a.get(arch)) {
        out.push(overlay.clone());
    }

    Some(fragment)
}

/// Merge one fragment value into the accumulated value for a key.
fn apply_value(acc: &mut Value, new: &Value) {
    match new {
        Value::Array(items) => {
            // The fragment's entries take priority, before the accumulation
            if let Value::Array(existing) = acc {
                let mut merged = items.clone();
                merged.extend(existing.iter().cloned());
                *acc = Value::Array(merged);
            } else {
                *acc = new.clone();
            }
        }
        Value::Object(map) => {
            if let Value::Object(existing) = acc {
                for (k, v) in map {
                    match existing.get_mut(k) {
                        Some(slot) => apply_value(slot, v),
                        None => {
                            existing.insert(k.clone(), v.clone());
                        }
                    }
                }
            } else {
                *acc = new.clone();
            }
        }
        _ => *acc = new.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    fn spec(text: &str) -> BuildSpec {
        text.parse().unwrap()
    }

    fn no_extras() -> Map<String, Value> {
        Map::new()
    }

    fn write_config(dir: &TempDir, content: &Value) -> std::path::PathBuf {
        let path = dir.path().join("builder.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn validate_rejects_unknown_axes() {
        assert!(matches!(
            validate_spec(&spec("plan9-gcc-8-linux-x64")),
            Err(CoreError::UnknownHost(_))
        ));
        assert!(matches!(
            validate_spec(&spec("linux-gcc-8-beos-x64")),
            Err(CoreError::UnknownTarget(_))
        ));
        assert!(matches!(
            validate_spec(&spec("linux-tcc-8-linux-x64")),
            Err(CoreError::UnknownCompiler(_))
        ));
        assert!(matches!(
            validate_spec(&spec("linux-gcc-99-linux-x64")),
            Err(CoreError::UnknownCompilerVersion { .. })
        ));
    }

    #[test]
    fn validate_rejects_unsupported_combinations() {
        // gcc only supports linux hosts/targets
        assert!(matches!(
            validate_spec(&spec("macos-gcc-8-linux-x64")),
            Err(CoreError::UnsupportedHost { .. })
        ));
        assert!(matches!(
            validate_spec(&spec("linux-ndk-19-linux-x64")),
            Err(CoreError::UnsupportedTarget { .. })
        ));
    }

    #[test]
    fn composition_is_deterministic() {
        let spec = spec("linux-gcc-8-linux-x64");
        let a = produce_config(&spec, None, &no_extras()).unwrap();
        let b = produce_config(&spec, None, &no_extras()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn gcc8_resolves_compiler_binaries_and_packages() {
        let config = produce_config(&spec("linux-gcc-8-linux-x64"), None, &no_extras()).unwrap();

        assert_eq!(config.str_value("c"), Some("gcc-8"));
        assert_eq!(config.str_value("cxx"), Some("g++-8"));
        let packages = config.list_value("apt_packages");
        assert!(packages.contains(&"gcc-8".to_string()));
        assert!(packages.contains(&"g++-8".to_string()));
        assert!(config.bool_value("use_apt"));
        assert!(!config.list_value("apt_repos").is_empty());
        assert!(config.enabled());
        assert!(config.run_tests());
    }

    #[test]
    fn arch_overlay_applies_for_x86() {
        let config = produce_config(&spec("linux-gcc-7-linux-x86"), None, &no_extras()).unwrap();

        let packages = config.list_value("apt_packages");
        assert!(packages.contains(&"gcc-7-multilib".to_string()));
        // -m32 flags come from the linux target's x86 overlay
        let cmake_args = config.list_value("cmake_args");
        assert!(cmake_args.contains(&"-DCMAKE_C_FLAGS=-m32".to_string()));
    }

    #[test]
    fn lists_accumulate_most_specific_first() {
        // clang-9 adds an apt repo on top of the linux host's ppa entry;
        // the version fragment composes later so its entries sort first.
        let config = produce_config(&spec("linux-clang-9-linux-x64"), None, &no_extras()).unwrap();

        let repos = config.list_value("apt_repos");
        let ppa = repos.iter().position(|r| r.starts_with("ppa:")).unwrap();
        let llvm = repos.iter().position(|r| r.contains("llvm-toolchain-xenial-9")).unwrap();
        assert!(llvm < ppa, "later fragment entries should come first: {:?}", repos);
    }

    #[test]
    fn override_key_discards_prior_accumulation() {
        // clang-3 declares !apt_repos and !cmake_args
        let config = produce_config(&spec("linux-clang-3-linux-x64"), None, &no_extras()).unwrap();

        assert!(config.list_value("apt_repos").is_empty());
        assert!(config.list_value("cmake_args").is_empty());
        assert_eq!(config.str_value("c"), Some("clang-3.9"));
    }

    #[test]
    fn cross_compile_target_disables_tests() {
        let config = produce_config(&spec("linux-ndk-19-android-arm64v8a"), None, &no_extras()).unwrap();

        assert!(!config.run_tests());
        let cmake_args = config.list_value("cmake_args");
        assert!(cmake_args.contains(&"-DANDROID_ABI=arm64-v8a".to_string()));
        assert!(cmake_args.contains(&"-DANDROID_NATIVE_API_LEVEL=19".to_string()));
    }

    #[test]
    fn msvc_generator_uses_layered_variables() {
        let config = produce_config(&spec("windows-msvc-2017-windows-x64"), None, &no_extras()).unwrap();

        let cmake_args = config.list_value("cmake_args");
        assert!(
            cmake_args.contains(&"Visual Studio 15 2017 Win64".to_string()),
            "generator should combine version and arch postfix variables: {:?}",
            cmake_args
        );
    }

    #[test]
    fn override_file_composes_last() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            &json!({
                "cmake_args": ["-DPROJECT_SPECIFIC=ON"],
                "hosts": {
                    "linux": {
                        "apt_packages": ["libcustom-dev"],
                    },
                },
                "!pre_build_steps": ["scripted-step"],
            }),
        );

        let config = produce_config(&spec("linux-gcc-8-linux-x64"), Some(&path), &no_extras()).unwrap();

        let cmake_args = config.list_value("cmake_args");
        assert_eq!(cmake_args.first().map(String::as_str), Some("-DPROJECT_SPECIFIC=ON"));
        assert!(config.list_value("apt_packages").contains(&"libcustom-dev".to_string()));
        assert_eq!(config.steps("pre_build_steps"), vec![json!("scripted-step")]);
    }

    #[test]
    fn missing_override_file_is_an_error() {
        let result = produce_config(
            &spec("linux-gcc-8-linux-x64"),
            Some(Path::new("/nonexistent/builder.json")),
            &no_extras(),
        );
        assert!(matches!(result, Err(CoreError::ConfigRead { .. })));
    }

    #[test]
    fn malformed_override_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("builder.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = produce_config(&spec("linux-gcc-8-linux-x64"), Some(&path), &no_extras());
        assert!(matches!(result, Err(CoreError::ConfigParse { .. })));
    }

    #[test]
    fn extra_variables_reach_interpolation() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, &json!({ "test": ["run-{suite}"] }));

        let mut extras = Map::new();
        extras.insert("suite".to_string(), json!("integration"));

        let config = produce_config(&spec("linux-gcc-8-linux-x64"), Some(&path), &extras).unwrap();
        assert_eq!(config.steps("test"), vec![json!("run-integration")]);
    }

    #[test]
    fn spec_fields_are_bound_as_variables() {
        let config = produce_config(&spec("linux-gcc-8-linux-x64"), None, &no_extras()).unwrap();
        assert_eq!(config.variables().get("host"), Some(&json!("linux")));
        assert_eq!(config.variables().get("version"), Some(&json!("8")));
    }
}
