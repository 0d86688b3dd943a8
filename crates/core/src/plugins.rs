//! Project-local action plugins
//!
//! A project can contribute new actions without touching the engine: Lua
//! files under `.builder/` at the project root run once at startup with a
//! `register_action(name, steps)` global in scope. Registered actions are
//! backed by a [`Script`] and resolve by name exactly like the built-ins:
//!
//! ```lua
//! register_action("package", {
//!     "echo packaging {spec}",
//!     { "tar", "-czf", "{project}.tar.gz", "build/install" },
//! })
//! ```

use std::path::Path;

use mlua::{Lua, LuaSerdeExt, Table, Value as LuaValue};
use serde_json::Value;
use tracing::{debug, info};

use crate::action;
use crate::Action;
use crate::error::CoreError;
use crate::script::{Script, Step};

/// Directory under the project root scanned for `.lua` plugin files.
pub const PLUGIN_DIR: &str = ".builder";

/// The step forms a plugin may register. Owned and clonable so a fresh
/// [`Script`] can be minted on every lookup.
#[derive(Clone)]
enum PluginStep {
    Shell(String),
    Args(Vec<String>),
}

/// Execute every plugin file under `source_dir/.builder`, in path order.
/// Returns the number of files loaded; a missing directory is not an error.
pub fn load_project_plugins(source_dir: &Path) -> Result<usize, CoreError> {
    let dir = source_dir.join(PLUGIN_DIR);
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut paths: Vec<_> = std::fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "lua"))
        .collect();
    paths.sort();

    for path in &paths {
        load_plugin(path)?;
        debug!("loaded plugin {}", path.display());
    }
    if !paths.is_empty() {
        info!("registered actions from {} plugin file(s)", paths.len());
    }
    Ok(paths.len())
}

fn load_plugin(path: &Path) -> Result<(), CoreError> {
    let source = std::fs::read_to_string(path).map_err(|e| plugin_error(path, e))?;

    let lua = Lua::new();
    let register = lua
        .create_function(|lua, (name, steps): (String, Table)| {
            let steps: Vec<Value> = lua
                .from_value(LuaValue::Table(steps))
                .map_err(|e| mlua::Error::runtime(format!("steps for '{}': {}", name, e)))?;
            let steps = parse_steps(&name, &steps).map_err(|e| mlua::Error::runtime(e.to_string()))?;
            register_script_action(&name, steps);
            Ok(())
        })
        .map_err(|e| plugin_error(path, e))?;
    lua.globals()
        .set("register_action", register)
        .map_err(|e| plugin_error(path, e))?;

    lua.load(&source)
        .set_name(path.to_string_lossy())
        .exec()
        .map_err(|e| plugin_error(path, e))
}

fn plugin_error(path: &Path, e: impl std::fmt::Display) -> CoreError {
    CoreError::Plugin {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Same step grammar as configuration step lists: a command string, or an
/// argv array of strings.
fn parse_steps(name: &str, steps: &[Value]) -> Result<Vec<PluginStep>, CoreError> {
    steps
        .iter()
        .map(|step| match step {
            Value::String(s) => Ok(PluginStep::Shell(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| unsupported(name, item))
                })
                .collect::<Result<Vec<String>, CoreError>>()
                .map(PluginStep::Args),
            other => Err(unsupported(name, other)),
        })
        .collect()
}

fn unsupported(script: &str, step: &Value) -> CoreError {
    CoreError::UnsupportedStep {
        script: script.to_string(),
        step: step.to_string(),
    }
}

fn register_script_action(name: &str, steps: Vec<PluginStep>) {
    let display = name.to_string();
    action::register_action(name, move || {
        let steps = steps
            .iter()
            .map(|step| match step {
                PluginStep::Shell(cmd) => Step::Shell(cmd.clone()),
                PluginStep::Args(args) => Step::Args(args.clone()),
            })
            .collect();
        Box::new(Script::new(&display, steps)) as Box<dyn Action>
    });
}
