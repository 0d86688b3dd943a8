//! The top-level build sequence
//!
//! A build is six stages run as one script: install tools, download
//! dependencies, pre-build steps, the build itself, post-build steps, and
//! the test run. The configuration's `build` and `test` step lists, when
//! non-empty, replace the default CMake and ctest stages wholesale.

use crate::action::{self, Action};
use crate::actions::{CMakeBuild, CTestRun, DownloadDependencies, InstallTools};
use crate::env::Env;
use crate::error::CoreError;
use crate::script::{Script, Step};
use crate::vars;

/// Run the full build sequence for the environment's project.
pub fn run_build(env: &mut Env) -> Result<(), CoreError> {
    let build_action: Box<dyn Action> = {
        let steps = env.config.steps("build");
        if steps.is_empty() {
            Box::new(CMakeBuild)
        } else {
            Box::new(Script::from_config_steps("build", &steps)?)
        }
    };
    let test_action: Box<dyn Action> = {
        let steps = env.config.steps("test");
        if steps.is_empty() {
            Box::new(CTestRun)
        } else {
            Box::new(Script::from_config_steps("test", &steps)?)
        }
    };
    let pre_build =
        Script::from_config_steps("pre_build_steps", &env.config.steps("pre_build_steps"))?;
    let post_build =
        Script::from_config_steps("post_build_steps", &env.config.steps("post_build_steps"))?;

    // The configured build environment applies to every stage and is
    // restored once the run finishes.
    env.shell.pushenv();
    for (name, value) in env.config.map_value("build_env") {
        env.shell.setenv(&name, &vars::value_to_string(&value));
    }

    let stages = Script::new(
        "run_build",
        vec![
            Step::Action(Box::new(InstallTools)),
            Step::Action(Box::new(DownloadDependencies)),
            Step::Action(Box::new(pre_build)),
            Step::Action(build_action),
            Step::Action(Box::new(post_build)),
            Step::Action(test_action),
        ],
    );
    let result = action::run_action(&stages, env);
    env.shell.popenv();
    result
}
