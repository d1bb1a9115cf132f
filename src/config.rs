//! Configuration loading for mcp-jenkins.
//!
//! Configuration is layered; later layers win:
//!
//! 1. **Built-in defaults**: including the merged scenario table
//! 2. **YAML file** via `--config <path>`
//! 3. **YAML file** via `JENKINS_MCP_CONFIG_FILE` (when it differs from 2)
//! 4. **Environment variables**: `MCP_<KEY>` with `__` as the nesting
//!    separator, e.g. `MCP_LOGGING__LEVEL=debug`
//!
//! Maps are deep-merged, everything else is replaced.
//!
//! ## Scenarios
//!
//! Built-in scenarios (`scenarios.default.yaml`) are merged with a user
//! scenario file found via `JENKINS_MCP_SCENARIOS_FILE`, `--scenarios`, or
//! `./scenarios.yaml` / `./scenarios.yml`. A user entry replaces the
//! same-named default as a whole.
//!
//! ```yaml
//! servers:
//!   - name: prod
//!     uri: https://jenkins.example.com
//!     user: alice@example.com
//!     tokenEnv: JENKINS_PROD_TOKEN
//! scenarios:
//!   deploy-prod:
//!     description: Deploy to production
//!     server: prod
//!     job_path: deploy/app-prod
//!     prompt_template: "Use {job_path} on {server}."
//! logging:
//!   level: info
//! timeout_secs: 30
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

const DEFAULT_SCENARIOS: &str = include_str!("../scenarios.default.yaml");

/// Environment variable naming an extra config file.
pub const CONFIG_FILE_ENV: &str = "JENKINS_MCP_CONFIG_FILE";
/// Environment variable naming the user scenario file.
pub const SCENARIOS_FILE_ENV: &str = "JENKINS_MCP_SCENARIOS_FILE";
const ENV_PREFIX: &str = "MCP_";
const ENV_EXCLUDED: &str = "MCP_CONFIG_FILE";

/// CLI arguments parsed by `clap`.
#[derive(Parser)]
#[command(name = "mcp-jenkins", version, about = "MCP server for Jenkins")]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Path to a scenarios YAML file (merged over the built-in scenarios)
    #[arg(long, short = 's', global = true)]
    pub scenarios: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Add or remove Jenkins servers in the config file
    #[command(subcommand)]
    Server(ServerCommand),
    /// Add or remove scenarios in the config file
    #[command(subcommand)]
    Scenario(ScenarioCommand),
}

#[derive(Subcommand)]
pub enum ServerCommand {
    /// Append a server entry
    Add(ServerArgs),
    /// Remove every server entry with this name
    Remove { name: String },
}

#[derive(Args)]
pub struct ServerArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub uri: String,
    #[arg(long)]
    pub user: String,
    #[arg(long, conflicts_with = "token_env")]
    pub token: Option<String>,
    /// Environment variable that holds the API token
    #[arg(long)]
    pub token_env: Option<String>,
}

#[derive(Subcommand)]
pub enum ScenarioCommand {
    /// Add or replace a scenario
    Add(ScenarioArgs),
    /// Remove a scenario
    Remove { name: String },
}

#[derive(Args)]
pub struct ScenarioArgs {
    pub name: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub server: String,
    #[arg(long)]
    pub job_path: String,
    #[arg(long, default_value = "")]
    pub prompt_template: String,
}

/// Errors raised while reading or rewriting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A server entry exactly as written in the config file.
///
/// Every field is optional so that `validate_jenkins_config` can report
/// what is missing instead of failing the whole load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        rename = "tokenEnv",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub token_env: Option<String>,
}

/// A named shortcut to one job on one server. Empty strings mean "missing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub job_path: String,
    #[serde(default)]
    pub prompt_template: String,
}

/// Server identity reported over MCP.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMeta {
    pub name: String,
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter (default `info`). Overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Fully merged configuration snapshot. Read-only after startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerMeta,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    #[serde(default)]
    pub scenarios: IndexMap<String, ScenarioConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Where configuration comes from. [`ConfigSources::from_process`] reads the
/// real environment; tests build one by hand.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub config_path: Option<PathBuf>,
    pub scenarios_path: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
}

impl ConfigSources {
    pub fn from_process(cli: &Cli) -> Self {
        Self {
            config_path: cli.config.as_deref().map(expand_tilde),
            scenarios_path: cli.scenarios.as_deref().map(expand_tilde),
            env: std::env::vars().collect(),
            cwd: std::env::current_dir().unwrap_or_default(),
        }
    }

    fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The file add/remove commands should rewrite.
    pub fn writable_config_path(&self) -> Option<PathBuf> {
        self.config_path
            .clone()
            .or_else(|| self.env_var(CONFIG_FILE_ENV).map(|p| expand_tilde(Path::new(p))))
    }

    /// Load and merge every layer into a [`Config`].
    pub fn load(&self) -> Result<Config, ConfigError> {
        let scenarios = merge_scenarios(default_scenarios(), self.user_scenarios());

        let mut config = json!({
            "server": {
                "name": "jenkins",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "servers": [],
            "scenarios": serde_json::to_value(&scenarios)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
            "logging": { "level": default_log_level() },
            "timeout_secs": default_timeout_secs(),
        });

        if let Some(path) = &self.config_path {
            if path.exists() {
                merge_optional_file(&mut config, path);
            }
        }

        if let Some(env_path) = self.env_var(CONFIG_FILE_ENV) {
            let env_path = expand_tilde(Path::new(env_path));
            if self.config_path.as_ref() != Some(&env_path) {
                merge_optional_file(&mut config, &env_path);
            }
        }

        deep_merge(&mut config, env_overrides(&self.env));

        serde_json::from_value(config).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    fn user_scenarios(&self) -> IndexMap<String, ScenarioConfig> {
        let from_env = self
            .env_var(SCENARIOS_FILE_ENV)
            .map(|p| expand_tilde(Path::new(p)))
            .filter(|p| p.exists());

        let path = from_env.or_else(|| self.scenarios_path.clone()).or_else(|| {
            ["scenarios.yaml", "scenarios.yml"]
                .iter()
                .map(|f| self.cwd.join(f))
                .find(|p| p.exists())
        });

        let Some(path) = path.filter(|p| p.exists()) else {
            return IndexMap::new();
        };

        match read_yaml(&path).map(|v| scenarios_from(&v)) {
            Ok(Ok(scenarios)) => {
                tracing::info!(
                    "Loaded {} user scenarios from {}",
                    scenarios.len(),
                    path.display()
                );
                scenarios
            }
            Ok(Err(e)) => {
                tracing::warn!("Invalid scenarios in {}: {}", path.display(), e);
                IndexMap::new()
            }
            Err(e) => {
                tracing::warn!("Failed to load user scenarios: {}", e);
                IndexMap::new()
            }
        }
    }
}

/// Scenarios embedded in the binary.
pub fn default_scenarios() -> IndexMap<String, ScenarioConfig> {
    serde_yaml::from_str::<Value>(DEFAULT_SCENARIOS)
        .map_err(|e| e.to_string())
        .and_then(|v| scenarios_from(&v))
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load default scenarios: {}", e);
            IndexMap::new()
        })
}

/// User entries replace same-named defaults whole; new names append.
pub fn merge_scenarios(
    defaults: IndexMap<String, ScenarioConfig>,
    user: IndexMap<String, ScenarioConfig>,
) -> IndexMap<String, ScenarioConfig> {
    let mut merged = defaults;
    merged.extend(user);
    merged
}

fn scenarios_from(doc: &Value) -> Result<IndexMap<String, ScenarioConfig>, String> {
    match doc.get("scenarios") {
        None | Some(Value::Null) => Ok(IndexMap::new()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| e.to_string()),
    }
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_optional_file(config: &mut Value, path: &Path) {
    match read_yaml(path) {
        Ok(Value::Null) => {}
        Ok(layer) => deep_merge(config, layer),
        Err(e) => tracing::warn!("{}", e),
    }
}

/// Recursively merge `source` into `target`. Objects merge key by key,
/// anything else overwrites.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(t), Value::Object(s)) => {
            for (key, value) in s {
                match t.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value)
                    }
                    _ => {
                        t.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Turn `MCP_A__B=v` variables into `{"a": {"b": v}}`.
pub fn env_overrides(vars: &[(String, String)]) -> Value {
    let mut root = Value::Object(Map::new());
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        if key == ENV_EXCLUDED || rest.is_empty() {
            continue;
        }
        let lowered = rest.to_lowercase();
        // Innermost key first; a scalar already at a parent is replaced.
        let nested = lowered.rsplit("__").fold(convert_value(value), |inner, part| {
            let mut map = Map::new();
            map.insert(part.to_string(), inner);
            Value::Object(map)
        });
        deep_merge(&mut root, nested);
    }
    root
}

/// Coerce an environment string to bool, null, integer, float or string.
pub fn convert_value(value: &str) -> Value {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => return Value::Bool(true),
        "false" | "no" | "0" => return Value::Bool(false),
        "null" | "none" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = value.parse::<i64>() {
        return json!(i);
    }
    if let Some(n) = value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(n);
    }
    Value::String(value.to_string())
}

/// Expand a leading `~` to `$HOME`.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

// --- File mutation ---
//
// These rewrite the YAML file in place. A running server keeps its loaded
// snapshot; changes show up on the next start.

fn read_document(path: &Path) -> Result<serde_yaml::Mapping, ConfigError> {
    if !path.exists() {
        return Ok(serde_yaml::Mapping::new());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Option<serde_yaml::Value> =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    match doc {
        None | Some(serde_yaml::Value::Null) => Ok(serde_yaml::Mapping::new()),
        Some(serde_yaml::Value::Mapping(m)) => Ok(m),
        Some(_) => Err(ConfigError::Invalid(format!(
            "{} is not a YAML mapping",
            path.display()
        ))),
    }
}

fn write_document(path: &Path, doc: &serde_yaml::Mapping) -> Result<(), ConfigError> {
    let text = serde_yaml::to_string(doc).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn to_yaml<T: Serialize>(value: &T) -> Result<serde_yaml::Value, ConfigError> {
    serde_yaml::to_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// Append a server entry to the `servers` list.
pub fn add_server(path: &Path, entry: &ServerEntry) -> Result<(), ConfigError> {
    let mut doc = read_document(path)?;
    let key = serde_yaml::Value::from("servers");
    let mut servers = match doc.remove(&key) {
        Some(serde_yaml::Value::Sequence(seq)) => seq,
        _ => Vec::new(),
    };
    servers.push(to_yaml(entry)?);
    doc.insert(key, serde_yaml::Value::Sequence(servers));
    write_document(path, &doc)
}

/// Drop every server entry named `name`. A missing file is left alone.
pub fn remove_server(path: &Path, name: &str) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let mut doc = read_document(path)?;
    let key = serde_yaml::Value::from("servers");
    let servers = match doc.get(&key) {
        Some(serde_yaml::Value::Sequence(seq)) => seq
            .iter()
            .filter(|s| s.get("name").and_then(serde_yaml::Value::as_str) != Some(name))
            .cloned()
            .collect(),
        _ => Vec::new(),
    };
    doc.insert(key, serde_yaml::Value::Sequence(servers));
    write_document(path, &doc)
}

/// Insert or replace a scenario under `scenarios`.
pub fn add_scenario(path: &Path, name: &str, scenario: &ScenarioConfig) -> Result<(), ConfigError> {
    let mut doc = read_document(path)?;
    let key = serde_yaml::Value::from("scenarios");
    let mut scenarios = match doc.remove(&key) {
        Some(serde_yaml::Value::Mapping(m)) => m,
        _ => serde_yaml::Mapping::new(),
    };
    scenarios.insert(serde_yaml::Value::from(name), to_yaml(scenario)?);
    doc.insert(key, serde_yaml::Value::Mapping(scenarios));
    write_document(path, &doc)
}

/// Remove a scenario. A missing file or unknown name is left alone.
pub fn remove_scenario(path: &Path, name: &str) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let mut doc = read_document(path)?;
    let key = serde_yaml::Value::from("scenarios");
    let mut scenarios = match doc.remove(&key) {
        Some(serde_yaml::Value::Mapping(m)) => m,
        _ => serde_yaml::Mapping::new(),
    };
    scenarios.remove(name);
    doc.insert(key, serde_yaml::Value::Mapping(scenarios));
    write_document(path, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(desc: &str, server: &str, job: &str) -> ScenarioConfig {
        ScenarioConfig {
            description: desc.into(),
            server: server.into(),
            job_path: job.into(),
            prompt_template: String::new(),
        }
    }

    fn sources(dir: &Path) -> ConfigSources {
        ConfigSources {
            cwd: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn user_scenario_replaces_default_whole() {
        let mut defaults = IndexMap::new();
        defaults.insert(
            "A".to_string(),
            ScenarioConfig {
                prompt_template: "default template".into(),
                ..scenario("default", "s1", "x/y")
            },
        );
        defaults.insert("B".to_string(), scenario("b", "s1", "b"));
        let mut user = IndexMap::new();
        user.insert("A".to_string(), scenario("user", "s2", "z"));

        let merged = merge_scenarios(defaults, user);
        assert_eq!(merged["A"], scenario("user", "s2", "z"));
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn convert_value_coercions() {
        assert_eq!(convert_value("yes"), json!(true));
        assert_eq!(convert_value("0"), json!(false));
        assert_eq!(convert_value("None"), Value::Null);
        assert_eq!(convert_value("42"), json!(42));
        assert_eq!(convert_value("2.5"), json!(2.5));
        assert_eq!(convert_value("debug"), json!("debug"));
    }

    #[test]
    fn env_overrides_nest_on_double_underscore() {
        let vars = vec![
            ("MCP_LOGGING__LEVEL".to_string(), "debug".to_string()),
            ("MCP_TIMEOUT_SECS".to_string(), "45".to_string()),
            ("MCP_CONFIG_FILE".to_string(), "/ignored".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];
        assert_eq!(
            env_overrides(&vars),
            json!({ "logging": { "level": "debug" }, "timeout_secs": 45 })
        );
    }

    #[test]
    fn nested_override_replaces_scalar_parent() {
        let vars = vec![
            ("MCP_LOGGING".to_string(), "quiet".to_string()),
            ("MCP_LOGGING__LEVEL".to_string(), "debug".to_string()),
        ];
        assert_eq!(env_overrides(&vars), json!({ "logging": { "level": "debug" } }));
    }

    #[test]
    fn deep_merge_merges_objects_and_replaces_rest() {
        let mut target = json!({ "a": { "x": 1, "y": 2 }, "list": [1, 2] });
        deep_merge(&mut target, json!({ "a": { "y": 3 }, "list": [9] }));
        assert_eq!(target, json!({ "a": { "x": 1, "y": 3 }, "list": [9] }));
    }

    #[test]
    fn load_layers_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "servers:\n  - name: prod\n    uri: http://ci\n    user: bob\n    token: t\nlogging:\n  level: warn\n",
        )
        .unwrap();

        let mut src = sources(dir.path());
        src.config_path = Some(path);
        src.env = vec![("MCP_LOGGING__LEVEL".into(), "debug".into())];

        let config = src.load().unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].name.as_deref(), Some("prod"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.server.name, "jenkins");
    }

    #[test]
    fn load_picks_up_cwd_scenarios_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("scenarios.yaml"),
            "scenarios:\n  zeta:\n    description: z\n    server: s\n    job_path: a/z\n  alpha:\n    description: a\n    server: s\n    job_path: a/a\n",
        )
        .unwrap();

        let config = sources(dir.path()).load().unwrap();
        assert_eq!(
            config.scenarios.keys().collect::<Vec<_>>(),
            vec!["zeta", "alpha"]
        );
    }

    #[test]
    fn unreadable_config_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "servers: [unterminated").unwrap();
        let mut src = sources(dir.path());
        src.config_path = Some(path);
        assert!(src.load().unwrap().servers.is_empty());
    }

    #[test]
    fn add_and_remove_server_rewrite_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "logging:\n  level: info\n").unwrap();

        let entry = ServerEntry {
            name: Some("prod".into()),
            uri: Some("http://ci".into()),
            user: Some("bob".into()),
            token: None,
            token_env: Some("PROD_TOKEN".into()),
        };
        add_server(&path, &entry).unwrap();
        add_server(&path, &ServerEntry { name: Some("qa".into()), ..entry.clone() }).unwrap();

        let mut src = sources(dir.path());
        src.config_path = Some(path.clone());
        let config = src.load().unwrap();
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0], entry);
        assert_eq!(config.logging.level, "info");

        remove_server(&path, "prod").unwrap();
        let config = src.load().unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].name.as_deref(), Some("qa"));
    }

    #[test]
    fn add_and_remove_scenario_rewrite_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        add_scenario(&path, "deploy", &scenario("d", "prod", "a/b")).unwrap();
        let mut src = sources(dir.path());
        src.config_path = Some(path.clone());
        assert_eq!(
            src.load().unwrap().scenarios["deploy"],
            scenario("d", "prod", "a/b")
        );

        remove_scenario(&path, "deploy").unwrap();
        assert!(!src.load().unwrap().scenarios.contains_key("deploy"));
    }

    #[test]
    fn remove_on_missing_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        remove_server(&path, "x").unwrap();
        remove_scenario(&path, "x").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn writable_path_prefers_cli_then_env() {
        let mut src = ConfigSources {
            env: vec![(CONFIG_FILE_ENV.into(), "/etc/jenkins.yaml".into())],
            ..Default::default()
        };
        assert_eq!(
            src.writable_config_path(),
            Some(PathBuf::from("/etc/jenkins.yaml"))
        );
        src.config_path = Some(PathBuf::from("/tmp/cli.yaml"));
        assert_eq!(src.writable_config_path(), Some(PathBuf::from("/tmp/cli.yaml")));
    }
}
