//! Shroud CLI - Command line interface
//!
//! Loads units from the native file system. Project settings come from an
//! optional `shroud.json`; flags override it.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod config;
mod logging;
mod platform;

use crate::config::{LogConfig, ProjectFile};
use crate::logging::LogFormat;
use crate::platform::print_error;
use shroud_api::{Environment, LoaderConfig, ShroudError, Value};

const CLI_TARGET: &str = "shroud::cli";

#[derive(Parser, Debug)]
#[command(
    name = "shroud",
    about = "Shroud unit loader - resolve, load and compile units",
    version
)]
struct Cli {
    /// Project directory (default: current directory)
    #[arg(short = 'C', long = "dir", value_name = "DIR", global = true)]
    dir: Option<PathBuf>,

    /// Project file, relative to the project directory
    #[arg(long, value_name = "FILE", default_value = "shroud.json", global = true)]
    config: PathBuf,

    /// Extra search path entries, ahead of the project's
    #[arg(short = 'I', long = "search-path", value_name = "DIR", global = true)]
    search_path: Vec<String>,

    /// Neither read nor write compiled artifacts
    #[arg(long, global = true)]
    no_artifacts: bool,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log level: silent, error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    log_format: LogFormat,

    /// Also append logs to this file
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Load a unit and print its exports (default: the project entry)
    Run { request: Option<String> },
    /// Show which file a request resolves to, without loading it
    Resolve { request: String },
    /// Load a unit and print the dependency graph
    Graph { request: Option<String> },
    /// Compile units and write their artifacts without executing them
    Compile {
        #[arg(required = true)]
        requests: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e, json);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<(), ShroudError> {
    let cwd = std::env::current_dir()
        .map_err(|e| ShroudError::Host(format!("cannot read current directory: {}", e)))?;
    let project_dir = match &cli.dir {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };
    let project = ProjectFile::load(&project_dir.join(&cli.config)).map_err(ShroudError::Host)?;

    let log_config =
        LogConfig::from_project(&project, cli.log_level.as_deref()).map_err(ShroudError::Host)?;
    logging::init_with_file(&log_config, cli.log_format, cli.log_file.as_deref())
        .map_err(ShroudError::Host)?;

    let loader = build_loader_config(&cli, &project, &project_dir);
    tracing::debug!(target: CLI_TARGET, ?loader, "loader configuration");
    let env = shroud_api::native_environment(loader)?;

    let command = cli.command.clone().unwrap_or(Command::Run { request: None });
    match command {
        Command::Run { request } => {
            let request = entry_request(request, &project)?;
            let output = shroud_api::run(&env, request)?;
            if cli.json {
                print_json(&output)?;
            } else if output.exports != Value::Null {
                print_json(&output.exports)?;
            }
        }
        Command::Resolve { request } => {
            let resolved = env.resolve(request)?;
            if cli.json {
                print_json(&resolved)?;
            } else if resolved.compiled {
                println!("{} (compiled)", resolved.file);
            } else {
                println!("{}", resolved.file);
            }
        }
        Command::Graph { request } => {
            if let Some(request) = request.or_else(|| project.entry.clone()) {
                shroud_api::run(&env, request)?;
            }
            let graph = shroud_api::graph(&env);
            if cli.json {
                print_json(&graph)?;
            } else {
                print!("{}", graph);
            }
        }
        Command::Compile { requests } => compile_all(&env, &requests, cli.json)?,
    }
    Ok(())
}

/// Merge project settings and flags into one loader configuration
fn build_loader_config(cli: &Cli, project: &ProjectFile, project_dir: &Path) -> LoaderConfig {
    let mut loader = project.loader.clone();
    loader.working_dir = Some(match &loader.working_dir {
        Some(dir) => project_dir.join(dir).to_string_lossy().into_owned(),
        None => project_dir.to_string_lossy().into_owned(),
    });
    if !cli.search_path.is_empty() {
        let mut search_path = cli.search_path.clone();
        search_path.append(&mut loader.search_path);
        loader.search_path = search_path;
    }
    if cli.no_artifacts {
        loader.use_artifacts = false;
        loader.write_artifacts = false;
    }
    loader
}

fn entry_request(request: Option<String>, project: &ProjectFile) -> Result<String, ShroudError> {
    request.or_else(|| project.entry.clone()).ok_or_else(|| {
        ShroudError::Host(String::from(
            "no unit to run: pass a request or set 'entry' in shroud.json",
        ))
    })
}

fn compile_all(env: &Environment, requests: &[String], json: bool) -> Result<(), ShroudError> {
    let mut artifacts = Vec::with_capacity(requests.len());
    for request in requests {
        let artifact = shroud_api::compile(env, request)?;
        tracing::info!(target: CLI_TARGET, %artifact, "compiled");
        artifacts.push(artifact);
    }
    if json {
        print_json(&artifacts)?;
    } else {
        for artifact in &artifacts {
            println!("{}", artifact);
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ShroudError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ShroudError::Host(format!("cannot serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
