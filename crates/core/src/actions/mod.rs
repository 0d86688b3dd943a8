//! The built-in actions a build is composed of.

mod cmake_build;
mod ctest_run;
mod download_deps;
mod install_tools;

pub use cmake_build::CMakeBuild;
pub use ctest_run::CTestRun;
pub use download_deps::DownloadDependencies;
pub use install_tools::InstallTools;
