//! Action execution model
//!
//! An [`Action`] is one unit of build work. Running an action may produce
//! child actions, which run depth-first before any sibling that follows.
//! Actions invocable by name from the command line live in a process-wide
//! registry keyed by a canonical form of the name, so `cmake-build`,
//! `CMakeBuild` and `cmakebuild` all resolve to the same entry.

use std::collections::BTreeMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::info;

use crate::env::Env;
use crate::error::CoreError;

/// One unit of build work.
pub trait Action {
    /// Display name, used in progress output.
    fn name(&self) -> String;

    /// Perform the work. Returned actions run immediately afterwards,
    /// depth-first.
    fn run(&self, env: &mut Env) -> Result<Vec<Box<dyn Action>>, CoreError>;
}

type ActionFactory = Box<dyn Fn() -> Box<dyn Action> + Send>;

struct RegistryEntry {
    display: String,
    factory: ActionFactory,
}

static REGISTRY: Lazy<Mutex<BTreeMap<String, RegistryEntry>>> = Lazy::new(|| {
    let mut entries = BTreeMap::new();
    builtin(&mut entries, "install-tools", || {
        Box::new(crate::actions::InstallTools)
    });
    builtin(&mut entries, "download-dependencies", || {
        Box::new(crate::actions::DownloadDependencies)
    });
    builtin(&mut entries, "cmake-build", || {
        Box::new(crate::actions::CMakeBuild)
    });
    builtin(&mut entries, "ctest-run", || Box::new(crate::actions::CTestRun));
    Mutex::new(entries)
});

fn builtin(
    entries: &mut BTreeMap<String, RegistryEntry>,
    name: &str,
    factory: impl Fn() -> Box<dyn Action> + Send + 'static,
) {
    entries.insert(
        canonical_name(name),
        RegistryEntry {
            display: name.to_string(),
            factory: Box::new(factory),
        },
    );
}

fn canonical_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Register an action under `name`. Registration is idempotent: a name
/// already present keeps its original entry.
pub fn register_action(name: &str, factory: impl Fn() -> Box<dyn Action> + Send + 'static) {
    let mut registry = REGISTRY.lock().unwrap();
    registry
        .entry(canonical_name(name))
        .or_insert_with(|| RegistryEntry {
            display: name.to_string(),
            factory: Box::new(factory),
        });
}

/// Display names of every registered action.
pub fn known_actions() -> Vec<String> {
    let registry = REGISTRY.lock().unwrap();
    registry.values().map(|e| e.display.clone()).collect()
}

/// Run an action and every child it spawns, depth-first.
pub fn run_action(action: &dyn Action, env: &mut Env) -> Result<(), CoreError> {
    info!("running: {}", action.name());
    let children = action.run(env)?;
    for child in children {
        run_action(child.as_ref(), env)?;
    }
    info!("finished: {}", action.name());
    Ok(())
}

/// Look up an action by name and run it.
pub fn run_named_action(name: &str, env: &mut Env) -> Result<(), CoreError> {
    let action = {
        let registry = REGISTRY.lock().unwrap();
        match registry.get(&canonical_name(name)) {
            Some(entry) => (entry.factory)(),
            None => {
                return Err(CoreError::UnknownAction {
                    name: name.to_string(),
                    available: registry.values().map(|e| e.display.clone()).collect(),
                });
            }
        }
    };
    run_action(action.as_ref(), env)
}
