//! # mcp-jenkins
//!
//! MCP (Model Context Protocol) server that exposes Jenkins as a set of
//! tools: job search, parameter discovery, triggering and stopping builds,
//! build status and logs, and creating pipeline jobs from a Jenkinsfile.
//! Runs as a stdio JSON-RPC server, launched by an AI agent host.
//!
//! ## Architecture
//!
//! ```text
//! main.rs       entry point, CLI, logging, config loading, launch
//! config.rs     layered YAML / env-var configuration, config file edits
//! registry.rs   server name -> connection details
//! scenarios.rs  scenario name / index / fragment -> (server, job path)
//! transport.rs  HTTP seam (reqwest transport, test mock)
//! client.rs     Jenkins REST client with build-start and stop polling
//! retry.rs      bounded fixed-delay polling policy
//! tools.rs      tool façade and registry
//! prompts.rs    prompt templates
//! mcp.rs        MCP JSON-RPC protocol handler (stdio)
//! ```
//!
//! ## Subcommands
//!
//! With no subcommand (or `serve`) the MCP server runs on stdio.
//! `server add|remove` and `scenario add|remove` edit the config file named
//! by `--config` or `JENKINS_MCP_CONFIG_FILE` and exit.

mod client;
mod config;
mod error;
mod mcp;
mod prompts;
mod registry;
mod retry;
mod scenarios;
mod tools;
mod transport;
mod types;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::{Cli, Command, ConfigError, ConfigSources, ScenarioCommand, ServerCommand};
use tools::{JenkinsTools, ToolRegistry};
use transport::HttpConnector;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let sources = ConfigSources::from_process(&cli);

    let code = match cli.command {
        None | Some(Command::Serve) => serve(&sources).await,
        Some(Command::Server(cmd)) => edit(&sources, |path| run_server_command(path, cmd)),
        Some(Command::Scenario(cmd)) => edit(&sources, |path| run_scenario_command(path, cmd)),
    };
    std::process::exit(code);
}

fn stderr_subscriber(default_level: &str) -> impl tracing::Subscriber + Send + Sync {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish()
}

async fn serve(sources: &ConfigSources) -> i32 {
    // Loading logs through a temporary subscriber; the real one needs the
    // configured level.
    let loaded = tracing::subscriber::with_default(stderr_subscriber("info"), || sources.load());
    let config = match loaded {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-jenkins: configuration error: {}", e);
            return 1;
        }
    };

    if let Err(e) = tracing::subscriber::set_global_default(stderr_subscriber(&config.logging.level)) {
        eprintln!("mcp-jenkins: failed to initialise logging: {}", e);
    }

    tracing::info!(
        "{} server(s), {} scenario(s) configured",
        config.servers.len(),
        config.scenarios.len()
    );

    let connector = HttpConnector {
        timeout: Duration::from_secs(config.timeout_secs),
    };
    let tools = JenkinsTools::new(&config, connector);
    let report = tools.validate_jenkins_config();
    for problem in &report.errors {
        tracing::warn!("config: {}", problem);
    }

    let info = mcp::ServerInfo {
        name: config.server.name.clone(),
        version: config.server.version.clone(),
    };
    mcp::run_stdio(info, ToolRegistry::new(tools)).await;
    0
}

fn edit(sources: &ConfigSources, f: impl FnOnce(&Path) -> Result<String, ConfigError>) -> i32 {
    let _guard = tracing::subscriber::set_default(stderr_subscriber("warn"));
    let Some(path) = sources.writable_config_path() else {
        eprintln!(
            "mcp-jenkins: no config file given; pass --config or set {}",
            config::CONFIG_FILE_ENV
        );
        return 1;
    };
    match f(&path) {
        Ok(message) => {
            println!("{} ({})", message, path.display());
            println!("Restart any running mcp-jenkins server to pick up the change.");
            0
        }
        Err(e) => {
            eprintln!("mcp-jenkins: {}", e);
            1
        }
    }
}

fn run_server_command(path: &Path, cmd: ServerCommand) -> Result<String, ConfigError> {
    match cmd {
        ServerCommand::Add(args) => {
            let entry = config::ServerEntry {
                name: Some(args.name.clone()),
                uri: Some(args.uri),
                user: Some(args.user),
                token: args.token,
                token_env: args.token_env,
            };
            config::add_server(path, &entry)?;
            Ok(format!("Added server '{}'", args.name))
        }
        ServerCommand::Remove { name } => {
            config::remove_server(path, &name)?;
            Ok(format!("Removed server '{}'", name))
        }
    }
}

fn run_scenario_command(path: &Path, cmd: ScenarioCommand) -> Result<String, ConfigError> {
    match cmd {
        ScenarioCommand::Add(args) => {
            let scenario = config::ScenarioConfig {
                description: args.description,
                server: args.server,
                job_path: args.job_path,
                prompt_template: args.prompt_template,
            };
            config::add_scenario(path, &args.name, &scenario)?;
            Ok(format!("Added scenario '{}'", args.name))
        }
        ScenarioCommand::Remove { name } => {
            config::remove_scenario(path, &name)?;
            Ok(format!("Removed scenario '{}'", name))
        }
    }
}
