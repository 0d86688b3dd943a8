//! Scripted sequences of build steps
//!
//! A [`Script`] is an action whose work is a list of [`Step`]s: shell
//! command strings, argument vectors, nested actions, or native functions.
//! Variable references in command steps are expanded against the resolved
//! configuration's bindings at run time, not when the script is built.

use serde_json::Value;

use crate::action::{self, Action};
use crate::env::Env;
use crate::error::CoreError;
use crate::vars;

/// A native step; its returned actions replace the remainder of the script.
pub type StepFn = fn(&mut Env) -> Result<Vec<Box<dyn Action>>, CoreError>;

/// One step of a script.
pub enum Step {
    /// A command line as a single string, split on whitespace after
    /// variable expansion.
    Shell(String),
    /// A command as explicit arguments. An argument that expands to a list
    /// is spliced into the command.
    Args(Vec<String>),
    /// A nested action, run with the usual depth-first recursion.
    Action(Box<dyn Action>),
    /// A native function. Unlike other steps it short-circuits: its result
    /// becomes the script's children and later steps do not run.
    Func(StepFn),
}

pub struct Script {
    name: String,
    steps: Vec<Step>,
}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Script {
    pub fn new(name: &str, steps: Vec<Step>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }

    /// Build a script from a configuration step list, where each entry is
    /// either a command string or an argument array. Anything else is a
    /// configuration fault and aborts the run.
    pub fn from_config_steps(name: &str, steps: &[Value]) -> Result<Self, CoreError> {
        let steps = steps
            .iter()
            .map(|step| match step {
                Value::String(s) => Ok(Step::Shell(s.clone())),
                Value::Array(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| unsupported_step(name, item))
                    })
                    .collect::<Result<Vec<String>, CoreError>>()
                    .map(Step::Args),
                other => Err(unsupported_step(name, other)),
            })
            .collect::<Result<Vec<Step>, CoreError>>()?;
        Ok(Self::new(name, steps))
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn unsupported_step(script: &str, step: &Value) -> CoreError {
    CoreError::UnsupportedStep {
        script: script.to_string(),
        step: step.to_string(),
    }
}

impl Action for Script {
    fn name(&self) -> String {
        format!("script:{}", self.name)
    }

    fn run(&self, env: &mut Env) -> Result<Vec<Box<dyn Action>>, CoreError> {
        for step in &self.steps {
            match step {
                Step::Shell(text) => {
                    let rendered = vars::render_template(text, env.config.variables());
                    let parts: Vec<String> =
                        rendered.split_whitespace().map(str::to_string).collect();
                    env.shell.exec(&parts)?;
                }
                Step::Args(args) => {
                    let mut expanded = Vec::with_capacity(args.len());
                    for arg in args {
                        let value = vars::interpolate(&Value::String(arg.clone()), env.config.variables());
                        match value {
                            Value::Array(items) => {
                                expanded.extend(items.iter().map(vars::value_to_string));
                            }
                            other => expanded.push(vars::value_to_string(&other)),
                        }
                    }
                    env.shell.exec(&expanded)?;
                }
                Step::Action(nested) => {
                    action::run_action(nested.as_ref(), env)?;
                }
                Step::Func(f) => {
                    return f(env);
                }
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

    use crate::env::EnvOptions;

    fn dry_env(dir: &TempDir, manifest: &Value) -> Env {
        fs::write(dir.path().join("builder.json"), manifest.to_string()).unwrap();
        temp_env::with_var("FORGE_SOURCE_DIR", Some(dir.path()), || {
            Env::new(EnvOptions {
                dry_run: true,
                spec: Some("linux-gcc-8-linux-x64".parse().unwrap()),
                ..Default::default()
            })
        })
        .unwrap()
    }

    #[test]
    #[serial]
    fn command_steps_expand_variables() {
        let dir = TempDir::new().unwrap();
        let mut env = dry_env(&dir, &json!({ "name": "netio" }));

        let script = Script::new(
            "steps",
            vec![
                Step::Shell("echo building for {target}-{arch}".to_string()),
                Step::Args(vec!["touch".to_string(), "out-{version}".to_string()]),
            ],
        );
        action::run_action(&script, &mut env).unwrap();

        let history = env.shell.history();
        assert!(history.contains(&"echo building for linux-x64".to_string()));
        assert!(history.contains(&"touch out-8".to_string()));
    }

    #[test]
    #[serial]
    fn config_steps_accept_strings_and_arrays() {
        let dir = TempDir::new().unwrap();
        let mut env = dry_env(
            &dir,
            &json!({
                "name": "netio",
                "pre_build_steps": [
                    "echo hello",
                    ["git", "describe"],
                ],
            }),
        );

        let steps = env.config.steps("pre_build_steps");
        let script = Script::from_config_steps("pre_build_steps", &steps).unwrap();
        action::run_action(&script, &mut env).unwrap();

        let history = env.shell.history();
        assert!(history.contains(&"echo hello".to_string()));
        assert!(history.contains(&"git describe".to_string()));
    }

    #[test]
    fn non_command_step_is_rejected() {
        let err = Script::from_config_steps("build", &[json!(42)]).unwrap_err();
        match err {
            CoreError::UnsupportedStep { script, step } => {
                assert_eq!(script, "build");
                assert_eq!(step, "42");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn non_string_argv_element_is_rejected() {
        let steps = [json!(["make", 8])];
        assert!(matches!(
            Script::from_config_steps("build", &steps),
            Err(CoreError::UnsupportedStep { .. })
        ));
    }

    #[test]
    #[serial]
    fn func_step_short_circuits() {
        let dir = TempDir::new().unwrap();
        let mut env = dry_env(&dir, &json!({ "name": "netio" }));

        fn stop_early(_env: &mut Env) -> Result<Vec<Box<dyn Action>>, CoreError> {
            Ok(vec![Box::new(Script::new(
                "after",
                vec![Step::Shell("echo from-child".to_string())],
            ))])
        }

        let script = Script::new(
            "short-circuit",
            vec![
                Step::Shell("echo before".to_string()),
                Step::Func(stop_early),
                Step::Shell("echo never".to_string()),
            ],
        );
        action::run_action(&script, &mut env).unwrap();

        let history = env.shell.history();
        assert!(history.contains(&"echo before".to_string()));
        assert!(history.contains(&"echo from-child".to_string()));
        assert!(!history.contains(&"echo never".to_string()));
    }

    #[test]
    #[serial]
    fn nested_actions_run_in_place() {
        let dir = TempDir::new().unwrap();
        let mut env = dry_env(&dir, &json!({ "name": "netio" }));

        let inner = Script::new("inner", vec![Step::Shell("echo inner".to_string())]);
        let outer = Script::new(
            "outer",
            vec![
                Step::Shell("echo first".to_string()),
                Step::Action(Box::new(inner)),
                Step::Shell("echo last".to_string()),
            ],
        );
        action::run_action(&outer, &mut env).unwrap();

        let commands: Vec<&String> = env
            .shell
            .history()
            .iter()
            .filter(|line| line.starts_with("echo"))
            .collect();
        assert_eq!(commands, ["echo first", "echo inner", "echo last"]);
    }
}
