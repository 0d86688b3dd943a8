//! CMake configure, build and install
//!
//! Builds the project's upstream dependencies first, in post-order, each
//! into its own `build/` subdirectory against the shared install prefix,
//! then the project itself. For downstream specs the project's consumers
//! are built afterwards the same way.

use std::path::{Path, PathBuf};

use crate::action::Action;
use crate::env::Env;
use crate::error::CoreError;
use crate::project::Project;

pub struct CMakeBuild;

impl Action for CMakeBuild {
    fn name(&self) -> String {
        "cmake-build".to_string()
    }

    fn run(&self, env: &mut Env) -> Result<Vec<Box<dyn Action>>, CoreError> {
        let mut build_config = env.build_config.clone();
        // These hosts cannot complete a RelWithDebInfo build
        if matches!(env.spec.host.as_str(), "al2012" | "manylinux") {
            build_config = "Debug".to_string();
        }

        for dir in [env.build_dir.clone(), env.deps_dir.clone(), env.install_dir.clone()] {
            env.shell.mkdir(&dir)?;
        }

        env.build_tests = env.config.run_tests();

        let source_dir = env.source_dir.clone();
        env.shell.pushd(&source_dir)?;
        let result = build_tree(env, &build_config);
        env.shell.popd();
        result?;
        Ok(Vec::new())
    }
}

fn build_tree(env: &mut Env, build_config: &str) -> Result<(), CoreError> {
    let upstream = env.project.upstream.clone();
    build_named_projects(env, &upstream, build_config)?;

    let root = env.project.clone();
    build_project(env, &root, env.build_tests, build_config)?;

    if env.spec.downstream {
        let downstream = env.project.downstream.clone();
        build_named_projects(env, &downstream, build_config)?;
    }
    Ok(())
}

fn build_named_projects(env: &mut Env, names: &[String], build_config: &str) -> Result<(), CoreError> {
    for name in names {
        let project = env.find_project(name)?;
        let path = materialized_path(&project)?;
        env.shell.pushd(&path)?;
        let result = build_project(env, &project, false, build_config);
        env.shell.popd();
        result?;
    }
    Ok(())
}

/// Build one project, recursing into its upstream dependencies first so
/// they install before anything that links against them.
fn build_project(
    env: &mut Env,
    project: &Project,
    build_tests: bool,
    build_config: &str,
) -> Result<(), CoreError> {
    for dep_name in &project.upstream {
        let dep = env.find_project(dep_name)?;
        let path = materialized_path(&dep)?;
        env.shell.pushd(&path)?;
        let result = build_project(env, &dep, false, build_config);
        env.shell.popd();
        result?;
    }

    let source_dir = materialized_path(project)?;
    let build_dir = source_dir.join("build");
    env.shell.mkdir(&build_dir)?;
    env.shell.pushd(&build_dir)?;
    let result = configure_build_install(env, &source_dir, build_tests, build_config);
    env.shell.popd();
    result
}

fn configure_build_install(
    env: &mut Env,
    source_dir: &Path,
    build_tests: bool,
    build_config: &str,
) -> Result<(), CoreError> {
    let mut compiler_flags: Vec<String> = Vec::new();
    if env.toolchain.compiler != "default" {
        if let Some(path) = env.toolchain.compiler_path(&env.shell) {
            compiler_flags.push(format!("-DCMAKE_C_COMPILER={}", path.display()));
            compiler_flags.push(format!("-DCMAKE_CXX_COMPILER={}", path.display()));
        }
        let c = env.config.str_value("c").map(str::to_string);
        let cxx = env.config.str_value("cxx").map(str::to_string);
        if let Some(c) = c {
            env.shell.setenv("CC", &c);
        }
        if let Some(cxx) = cxx {
            env.shell.setenv("CXX", &cxx);
        }
    }

    let mut cmake_args: Vec<String> = vec![
        "-Werror=dev".to_string(),
        "-Werror=deprecated".to_string(),
        format!("-DCMAKE_INSTALL_PREFIX={}", env.install_dir.display()),
        format!("-DCMAKE_PREFIX_PATH={}", env.install_dir.display()),
        "-DCMAKE_EXPORT_COMPILE_COMMANDS=ON".to_string(),
        format!("-DCMAKE_BUILD_TYPE={}", build_config),
        format!("-DBUILD_TESTING={}", if build_tests { "ON" } else { "OFF" }),
    ];
    cmake_args.extend(compiler_flags);
    cmake_args.extend(env.config.list_value("cmake_args"));

    let mut configure = vec!["cmake".to_string()];
    configure.extend(cmake_args);
    configure.push(source_dir.display().to_string());
    env.shell.exec(&configure)?;

    env.shell
        .exec(&["cmake", "--build", ".", "--config", build_config])?;
    env.shell
        .exec(&["cmake", "--build", ".", "--config", build_config, "--target", "install"])?;
    Ok(())
}

fn materialized_path(project: &Project) -> Result<PathBuf, CoreError> {
    project
        .path
        .clone()
        .ok_or_else(|| CoreError::MissingProject(project.name.clone()))
}
