//! CI job rendering
//!
//! Every canonical build spec forge supports in CI maps to a job
//! definition, rendered from a template by the same variable interpolation
//! the configuration engine uses. Specs may carry legacy alias names kept
//! so existing job names keep resolving.

use once_cell::sync::Lazy;
use serde_json::{Map, Value, json};

use crate::config::ResolvedConfig;
use crate::vars;

/// Canonical CI specs and the legacy job names they were once known by.
pub static CANONICAL_SPECS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        ("linux-clang-3-linux-x64", vec!["linux-clang3-x64"]),
        ("linux-clang-6-linux-x64", vec!["linux-clang6-x64"]),
        ("linux-clang-8-linux-x64", vec!["linux-clang8-x64"]),
        ("linux-clang-6-linux-x64-downstream", vec!["downstream"]),
        ("linux-gcc-4.8-linux-x86", vec!["linux-gcc-4x-x86", "linux-gcc-4-linux-x86"]),
        ("linux-gcc-4.8-linux-x64", vec!["linux-gcc-4x-x64", "linux-gcc-4-linux-x64"]),
        ("linux-gcc-5-linux-x64", vec!["linux-gcc-5x-x64"]),
        ("linux-gcc-6-linux-x64", vec!["linux-gcc-6x-x64"]),
        ("linux-gcc-7-linux-x64", vec!["linux-gcc-7x-x64"]),
        ("linux-gcc-8-linux-x64", vec![]),
        ("linux-ndk-19-android-arm64v8a", vec!["android-arm64-v8a"]),
        ("al2012-default-default-linux-x64", vec!["ancient-al2012-x64"]),
        ("manylinux-default-default-linux-x86", vec!["ancient-linux-x86"]),
        ("manylinux-default-default-linux-x64", vec!["ancient-linux-x64"]),
        ("windows-msvc-2015-windows-x86", vec!["windows-msvc-2015-x86"]),
        ("windows-msvc-2015-windows-x64", vec!["windows-msvc-2015"]),
        ("windows-msvc-2017-windows-x64", vec!["windows-msvc-2017"]),
    ]
});

/// Render one job definition for a resolved configuration.
///
/// `inplace` selects running the forge binary already checked in with the
/// project sources over downloading a released one first.
pub fn render_job(config: &ResolvedConfig, project: &str, account: &str, inplace: bool) -> Value {
    let mut variables = Map::new();
    variables.insert("project".to_string(), json!(project));
    variables.insert("account".to_string(), json!(account));
    variables.insert("spec".to_string(), json!(config.spec.name()));

    let run_commands: Vec<&str> = if inplace {
        vec!["./tools/forge build {spec}"]
    } else {
        vec![
            "curl -sSL -o forge https://github.com/forgelabs/forge/releases/latest/download/forge",
            "chmod +x forge",
            "./forge build {spec}",
        ]
    };

    let template = json!({
        "name": "{project}-{spec}",
        "source": {
            "type": "GITHUB",
            "location": "https://github.com/{account}/{project}.git",
            "gitCloneDepth": 1,
            "reportBuildStatus": true,
        },
        "commands": run_commands,
        "environment": {
            "type": config.str_value("image_type").unwrap_or_default(),
            "image": config.str_value("image").unwrap_or_default(),
            "computeType": config.str_value("compute_type").unwrap_or_default(),
            "privilegedMode": config.bool_value("requires_privilege"),
        },
    });

    vars::interpolate(&template, &variables)
}
