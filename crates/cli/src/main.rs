use anyhow::Result;
use clap::{Parser, Subcommand};
use console::{Term, style};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use forge_core::{BuildSpec, CoreError, Env, EnvOptions, jobs, produce_config, run_named_action};

/// forge - C/C++ project build orchestrator
#[derive(Parser)]
#[command(name = "forge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log commands without executing them
    #[arg(short, long, global = true)]
    dry_run: bool,

    /// Project name to use when the source tree has no builder.json
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Build spec (host-compiler-version-target-arch); probed from this
    /// machine when omitted
    #[arg(long, global = true)]
    spec: Option<String>,

    /// Print the resolved configuration instead of building
    #[arg(long, global = true)]
    dump_config: bool,

    /// Native build configuration
    #[arg(long, default_value = "RelWithDebInfo", global = true)]
    build_config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full build sequence for a spec
    Build {
        /// Build spec; overrides --spec
        spec: Option<String>,

        /// Skip the tool installation stage
        #[arg(long)]
        skip_install: bool,
    },

    /// Run a single action by name
    Run {
        /// Action name, e.g. cmake-build or download-dependencies
        action: String,

        /// Extra arguments exposed to script steps as {args}
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },

    /// Render CI job definitions for every canonical spec
    Jobs {
        /// Project the jobs build
        project: String,

        /// GitHub account hosting the project
        #[arg(long, default_value = forge_core::project::DEFAULT_ACCOUNT)]
        github_account: String,

        /// Project configuration file layered over the built-in tables
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run the forge binary checked in with the project instead of
        /// downloading a release
        #[arg(long)]
        inplace: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Build { spec, skip_install } => {
            cmd_build(&cli, spec.clone(), *skip_install)
        }
        Commands::Run { action, args } => cmd_run(&cli, action, args.clone()),
        Commands::Jobs {
            project,
            github_account,
            config,
            inplace,
        } => cmd_jobs(project, github_account, config.as_deref(), *inplace),
    }
}

fn parse_spec(text: Option<&str>) -> Result<Option<BuildSpec>> {
    match text {
        Some("default") | None => Ok(None),
        Some(text) => Ok(Some(text.parse::<BuildSpec>()?)),
    }
}

fn make_env(cli: &Cli, spec: Option<String>, skip_install: bool, variables: Map<String, Value>) -> Result<Env> {
    let spec = parse_spec(spec.as_deref().or(cli.spec.as_deref()))?;
    let env = Env::new(EnvOptions {
        dry_run: cli.dry_run,
        spec,
        project: cli.project.clone(),
        variables,
        skip_install,
        build_config: Some(cli.build_config.clone()),
    })?;
    Ok(env)
}

fn cmd_build(cli: &Cli, spec: Option<String>, skip_install: bool) -> Result<()> {
    let term = Term::stderr();

    let mut env = make_env(cli, spec, skip_install, Map::new())?;

    if !env.config.enabled() {
        return Err(CoreError::Disabled(env.spec.name()).into());
    }

    if cli.dump_config {
        println!("{}", serde_json::to_string_pretty(&env.config.to_value())?);
        return Ok(());
    }

    term.write_line(&format!(
        "{} Building {} as {}",
        style("::").cyan().bold(),
        env.project.name,
        env.spec
    ))?;

    forge_core::run_build(&mut env)?;

    term.write_line(&format!("{} Done!", style("::").green().bold()))?;
    Ok(())
}

fn cmd_run(cli: &Cli, action: &str, args: Vec<String>) -> Result<()> {
    let term = Term::stderr();

    let mut variables = Map::new();
    variables.insert("args".to_string(), json!(args));

    let mut env = make_env(cli, None, false, variables)?;

    if !env.config.enabled() {
        return Err(CoreError::Disabled(env.spec.name()).into());
    }

    if cli.dump_config {
        println!("{}", serde_json::to_string_pretty(&env.config.to_value())?);
        return Ok(());
    }

    match run_named_action(action, &mut env) {
        Ok(()) => {
            term.write_line(&format!("{} Done!", style("::").green().bold()))?;
            Ok(())
        }
        Err(e @ CoreError::UnknownAction { .. }) => {
            term.write_line(&format!("{} {}", style("error:").red().bold(), e))?;
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_jobs(
    project: &str,
    github_account: &str,
    config_file: Option<&std::path::Path>,
    inplace: bool,
) -> Result<()> {
    let term = Term::stderr();
    let mut rendered = Vec::new();

    for (spec_name, aliases) in jobs::CANONICAL_SPECS.iter() {
        let spec: BuildSpec = spec_name.parse()?;
        let config = produce_config(&spec, config_file, &Map::new())?;

        if !config.enabled() {
            term.write_line(&format!(
                "{} {} is disabled, skipping",
                style("::").yellow().bold(),
                spec_name
            ))?;
            continue;
        }

        let mut job = jobs::render_job(&config, project, github_account, inplace);
        if let Value::Object(map) = &mut job {
            map.insert("aliases".to_string(), json!(aliases));
        }
        rendered.push(job);
    }

    term.write_line(&format!(
        "{} Rendered {} job(s) for {}",
        style("::").cyan().bold(),
        rendered.len(),
        project
    ))?;
    println!("{}", serde_json::to_string_pretty(&Value::Array(rendered))?);
    Ok(())
}
