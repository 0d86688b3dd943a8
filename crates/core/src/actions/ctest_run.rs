//! Test execution through ctest

use tracing::info;

use crate::action::Action;
use crate::env::Env;
use crate::error::CoreError;

/// Runs the project's test suite, when the build stage produced one.
pub struct CTestRun;

impl Action for CTestRun {
    fn name(&self) -> String {
        "ctest-run".to_string()
    }

    fn run(&self, env: &mut Env) -> Result<Vec<Box<dyn Action>>, CoreError> {
        if !env.build_tests {
            info!("no tests were built, skipping test run");
            return Ok(Vec::new());
        }

        let build_dir = env.shell.cwd()?.join("build");
        env.shell
            .with_dir(&build_dir, |sh| sh.exec(&["ctest", "--output-on-failure"]))?;
        Ok(Vec::new())
    }
}
