//! MCP tool definitions and handlers.
//!
//! [`JenkinsTools`] is the façade: one method per tool, each resolving its
//! server or scenario, opening a [`JenkinsClient`] and delegating.
//! [`ToolRegistry`] pairs every tool's JSON schema with a typed handler and
//! is what the MCP loop dispatches into.
//!
//! ## Tools
//!
//! - **Discovery**: `get_server_names`, `get_scenario_list`,
//!   `search_jobs_by_scenario`, `search_jobs`, `get_job_parameters`
//! - **Builds**: `trigger_build`, `get_build_status`, `stop_build`,
//!   `get_build_log`
//! - **Administration**: `validate_jenkins_config`,
//!   `create_or_update_job_from_jenkinsfile`

use futures_util::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::client::{pipeline_config, JenkinsClient};
use crate::config::Config;
use crate::error::JenkinsError;
use crate::registry::{ServerConfig, ServerRegistry};
use crate::retry::RetryPolicy;
use crate::scenarios::ScenarioCatalog;
use crate::transport::Connector;
use crate::types::{
    BuildInfo, JobChange, JobInfo, JobParameter, ScenarioInfo, ScenarioJob, StopResult,
    StopStatus, TriggerResult, ValidationReport,
};

/// Root folder for jobs created from a Jenkinsfile.
const MCP_FOLDER: &str = "MCPS";

/// Tool façade over the loaded configuration snapshot.
pub struct JenkinsTools<C> {
    servers: ServerRegistry,
    scenarios: ScenarioCatalog,
    connector: C,
    poll: RetryPolicy,
}

impl<C: Connector> JenkinsTools<C> {
    pub fn new(config: &Config, connector: C) -> Self {
        Self {
            servers: ServerRegistry::new(config.servers.clone()),
            scenarios: ScenarioCatalog::new(config.scenarios.clone()),
            connector,
            poll: RetryPolicy::default(),
        }
    }

    /// Replace the polling policy handed to every client.
    #[cfg(test)]
    pub fn with_poll_policy(mut self, poll: RetryPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn scenarios(&self) -> &ScenarioCatalog {
        &self.scenarios
    }

    fn connect(&self, server: &ServerConfig) -> Result<JenkinsClient<C::Transport>, JenkinsError> {
        let transport = self.connector.connect(server)?;
        Ok(JenkinsClient::new(server, transport).with_poll_policy(self.poll))
    }

    fn client(&self, server_name: &str) -> Result<JenkinsClient<C::Transport>, JenkinsError> {
        self.connect(&self.servers.resolve(server_name)?)
    }

    pub fn get_server_names(&self) -> Vec<String> {
        self.servers.names()
    }

    pub fn get_scenario_list(&self) -> Vec<ScenarioInfo> {
        let list = self.scenarios.list();
        tracing::info!("Found {} deployment scenarios", list.len());
        list
    }

    pub async fn search_jobs_by_scenario(
        &self,
        scenario: &str,
    ) -> Result<Vec<ScenarioJob>, JenkinsError> {
        let (name, config) = self.scenarios.lookup(scenario)?;
        let job_path = config.job_path.trim_matches('/');
        tracing::info!(
            "Searching jobs for scenario '{}' on server '{}'",
            name,
            config.server
        );

        let client = self.client(&config.server)?;
        match client.get_job_info(job_path).await {
            Ok(job) => Ok(vec![ScenarioJob {
                job,
                scenario: name.to_string(),
                scenario_match: true,
            }]),
            Err(JenkinsError::JobNotFound { .. }) => Err(JenkinsError::Configuration(format!(
                "Job path '{job_path}' for scenario '{name}' not found on server '{}'",
                config.server
            ))),
            Err(e) => {
                tracing::error!("Failed to get job for scenario '{}': {}", name, e);
                Err(JenkinsError::Failed(format!(
                    "Failed to get job for scenario '{name}': {e}"
                )))
            }
        }
    }

    pub async fn search_jobs(
        &self,
        server_name: &str,
        keyword: &str,
    ) -> Result<Vec<JobInfo>, JenkinsError> {
        self.client(server_name)?.search_jobs(keyword).await
    }

    pub async fn get_job_parameters(
        &self,
        server_name: &str,
        job_full_name: &str,
    ) -> Result<Vec<JobParameter>, JenkinsError> {
        self.client(server_name)?
            .get_job_parameters(job_full_name)
            .await
    }

    /// Check required parameters, then submit. A missing parameter fails
    /// before anything is posted.
    pub async fn trigger_build(
        &self,
        server_name: &str,
        job_full_name: &str,
        params: Option<&Value>,
    ) -> Result<TriggerResult, JenkinsError> {
        let client = self.client(server_name)?;
        let params = match params {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                tracing::warn!("Invalid params type: {}, ignoring parameters", json_kind(other));
                Map::new()
            }
        };

        let definitions = client.get_job_parameters(job_full_name).await?;
        let missing: Vec<&JobParameter> = definitions
            .iter()
            .filter(|p| p.is_required() && !params.contains_key(&p.name))
            .collect();
        if !missing.is_empty() {
            let details: Vec<String> = missing.iter().map(|p| p.describe()).collect();
            let err = JenkinsError::Parameter {
                message: format!(
                    "This job requires required parameters, please provide them before execution. Missing parameters: {}",
                    details.join(", ")
                ),
                missing: missing.iter().map(|p| p.name.clone()).collect(),
            };
            tracing::warn!(
                "Refusing to trigger {}: missing {:?}",
                job_full_name,
                err.missing_params()
            );
            return Err(err);
        }

        tracing::info!("Triggering build for {} on {}", job_full_name, server_name);
        if !params.is_empty() {
            let rendered = serde_json::Value::Object(params.clone());
            tracing::debug!("Build parameters: {}", rendered);
        }
        client.trigger_build(job_full_name, &params).await
    }

    pub async fn get_build_status(
        &self,
        server_name: &str,
        job_full_name: &str,
        build_number: u64,
    ) -> Result<BuildInfo, JenkinsError> {
        self.client(server_name)?
            .get_build_status(job_full_name, build_number)
            .await
    }

    pub async fn stop_build(
        &self,
        server_name: &str,
        job_full_name: &str,
        build_number: u64,
    ) -> Result<StopResult, JenkinsError> {
        let client = self.client(server_name)?;
        tracing::info!(
            "Stopping build #{} for {} on {}",
            build_number,
            job_full_name,
            client.server_name()
        );
        match client.stop_build(job_full_name, build_number).await {
            Ok(result) => {
                match result.status {
                    StopStatus::AlreadyTerminated => tracing::info!("Build was already terminated"),
                    StopStatus::StopRequested => tracing::info!("Stop request sent successfully"),
                    StopStatus::NotFound => tracing::warn!("Build not found"),
                }
                Ok(result)
            }
            Err(e) => {
                tracing::error!("Failed to stop build: {}", e);
                Err(e)
            }
        }
    }

    pub async fn get_build_log(
        &self,
        server_name: &str,
        job_full_name: &str,
        build_number: u64,
    ) -> Result<String, JenkinsError> {
        self.client(server_name)?
            .get_build_log(job_full_name, build_number)
            .await
    }

    pub fn validate_jenkins_config(&self) -> ValidationReport {
        let mut errors = self.servers.validate();

        if self.scenarios.is_empty() {
            errors.push("No scenarios configured".to_string());
            return ValidationReport::from_errors(errors);
        }

        for (name, scenario) in self.scenarios.iter() {
            let fields = [
                ("description", &scenario.description),
                ("server", &scenario.server),
                ("job_path", &scenario.job_path),
            ];
            for (field, value) in fields {
                if value.is_empty() {
                    errors.push(format!("Scenario '{name}' missing required field: {field}"));
                }
            }
            if !scenario.server.is_empty() {
                if let Err(e) = self.servers.resolve(&scenario.server) {
                    errors.push(format!(
                        "Scenario '{name}' references invalid server '{}': {e}",
                        scenario.server
                    ));
                }
            }
        }
        ValidationReport::from_errors(errors)
    }

    /// Upsert a sandboxed pipeline job under `MCPS/<user>/`, where `<user>`
    /// is the local part of the server's configured username.
    pub async fn create_or_update_job_from_jenkinsfile(
        &self,
        server_name: &str,
        job_name: &str,
        jenkinsfile_content: &str,
        description: &str,
    ) -> Result<JobChange, JenkinsError> {
        let server = self.servers.resolve(server_name)?;
        let client = self.connect(&server)?;

        let user = match server.user_local_part() {
            "" => "unknown",
            local => local,
        };
        let folder_path = format!("{MCP_FOLDER}/{user}");
        let job_full_name = format!("{folder_path}/{job_name}");
        let job_config = pipeline_config(description, jenkinsfile_content);

        match client.get_job_info(&job_full_name).await {
            Ok(_) => {
                tracing::info!("Updating existing job '{}' on {}", job_name, server_name);
                client.update_job(job_name, &job_config, &folder_path).await
            }
            Err(JenkinsError::JobNotFound { .. }) => {
                tracing::info!("Creating new job '{}' on {}", job_name, server_name);
                client.create_job(job_name, &job_config, &folder_path).await
            }
            Err(e) => Err(e),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// --- Registry ---

/// Result of an MCP tool call, ready to be serialized into a JSON-RPC response.
#[derive(Debug)]
pub struct ToolResult {
    /// MCP content blocks (a single `{"type":"text","text":"..."}` entry).
    pub content: Vec<Value>,
    /// Maps to `isError` in the MCP response.
    pub is_error: bool,
}

impl ToolResult {
    fn success(value: Value) -> Self {
        let text = serde_json::to_string_pretty(&value).unwrap_or_default();
        Self::text(text)
    }

    fn text(text: String) -> Self {
        Self {
            content: vec![json!({ "type": "text", "text": text })],
            is_error: false,
        }
    }

    fn error(message: String) -> Self {
        Self {
            content: vec![json!({ "type": "text", "text": message })],
            is_error: true,
        }
    }
}

type Handler<C> = for<'a> fn(&'a JenkinsTools<C>, Value) -> LocalBoxFuture<'a, ToolResult>;

/// One callable tool: its schema plus the handler that runs it.
pub struct ToolSpec<C> {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    handler: Handler<C>,
}

/// Ordered tool table, built once at startup.
pub struct ToolRegistry<C> {
    tools: JenkinsTools<C>,
    specs: Vec<ToolSpec<C>>,
}

impl<C: Connector> ToolRegistry<C> {
    pub fn new(tools: JenkinsTools<C>) -> Self {
        Self {
            tools,
            specs: tool_specs(),
        }
    }

    pub fn tools(&self) -> &JenkinsTools<C> {
        &self.tools
    }

    /// Definitions for `tools/list`.
    pub fn definitions(&self) -> Vec<Value> {
        self.specs
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "inputSchema": spec.input_schema,
                })
            })
            .collect()
    }

    pub async fn call(&self, name: &str, args: Value) -> ToolResult {
        match self.specs.iter().find(|spec| spec.name == name) {
            Some(spec) => (spec.handler)(&self.tools, args).await,
            None => ToolResult::error(format!("Unknown tool: {}", name)),
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolResult> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| ToolResult::error(format!("Invalid arguments: {e}")))
}

fn respond<T: Serialize>(result: Result<T, JenkinsError>) -> ToolResult {
    match result.map(serde_json::to_value) {
        Ok(Ok(value)) => ToolResult::success(value),
        Ok(Err(e)) => ToolResult::error(format!("Failed to serialize result: {e}")),
        Err(e) => ToolResult::error(e.to_string()),
    }
}

/// Build numbers arrive as JSON numbers or numeric strings.
fn build_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid build number '{s}'"))),
    }
}

#[derive(Deserialize)]
struct ScenarioArgs {
    scenario: String,
}

#[derive(Deserialize)]
struct SearchArgs {
    server_name: String,
    keyword: String,
}

#[derive(Deserialize)]
struct JobArgs {
    server_name: String,
    job_full_name: String,
}

#[derive(Deserialize)]
struct TriggerArgs {
    server_name: String,
    job_full_name: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Deserialize)]
struct BuildArgs {
    server_name: String,
    job_full_name: String,
    #[serde(deserialize_with = "build_number")]
    build_number: u64,
}

#[derive(Deserialize)]
struct JenkinsfileArgs {
    server_name: String,
    job_name: String,
    jenkinsfile_content: String,
    #[serde(default)]
    description: String,
}

fn call_get_server_names<C: Connector>(t: &JenkinsTools<C>, _: Value) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move { ToolResult::success(json!(t.get_server_names())) })
}

fn call_get_scenario_list<C: Connector>(t: &JenkinsTools<C>, _: Value) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move { respond(Ok(t.get_scenario_list())) })
}

fn call_search_jobs_by_scenario<C: Connector>(
    t: &JenkinsTools<C>,
    args: Value,
) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let args: ScenarioArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };
        respond(t.search_jobs_by_scenario(&args.scenario).await)
    })
}

fn call_search_jobs<C: Connector>(t: &JenkinsTools<C>, args: Value) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let args: SearchArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };
        respond(t.search_jobs(&args.server_name, &args.keyword).await)
    })
}

fn call_get_job_parameters<C: Connector>(
    t: &JenkinsTools<C>,
    args: Value,
) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let args: JobArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };
        respond(t.get_job_parameters(&args.server_name, &args.job_full_name).await)
    })
}

fn call_trigger_build<C: Connector>(t: &JenkinsTools<C>, args: Value) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let args: TriggerArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };
        respond(
            t.trigger_build(&args.server_name, &args.job_full_name, args.params.as_ref())
                .await,
        )
    })
}

fn call_get_build_status<C: Connector>(
    t: &JenkinsTools<C>,
    args: Value,
) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let args: BuildArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };
        respond(
            t.get_build_status(&args.server_name, &args.job_full_name, args.build_number)
                .await,
        )
    })
}

fn call_stop_build<C: Connector>(t: &JenkinsTools<C>, args: Value) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let args: BuildArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };
        respond(
            t.stop_build(&args.server_name, &args.job_full_name, args.build_number)
                .await,
        )
    })
}

fn call_get_build_log<C: Connector>(t: &JenkinsTools<C>, args: Value) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let args: BuildArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };
        match t
            .get_build_log(&args.server_name, &args.job_full_name, args.build_number)
            .await
        {
            Ok(log) => ToolResult::text(log),
            Err(e) => ToolResult::error(e.to_string()),
        }
    })
}

fn call_validate_jenkins_config<C: Connector>(
    t: &JenkinsTools<C>,
    _: Value,
) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move { respond(Ok(t.validate_jenkins_config())) })
}

fn call_create_or_update_job<C: Connector>(
    t: &JenkinsTools<C>,
    args: Value,
) -> LocalBoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let args: JenkinsfileArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };
        respond(
            t.create_or_update_job_from_jenkinsfile(
                &args.server_name,
                &args.job_name,
                &args.jenkinsfile_content,
                &args.description,
            )
            .await,
        )
    })
}

fn no_args() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn build_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "server_name": string_prop("Jenkins server name"),
            "job_full_name": string_prop("Full job name, folders separated by '/'"),
            "build_number": { "type": "integer", "minimum": 1, "description": "Build number" }
        },
        "required": ["server_name", "job_full_name", "build_number"],
        "additionalProperties": false
    })
}

fn tool_specs<C: Connector>() -> Vec<ToolSpec<C>> {
    vec![
        ToolSpec {
            name: "get_server_names",
            description: "Get the list of all available Jenkins server names.",
            input_schema: no_args(),
            handler: call_get_server_names::<C>,
        },
        ToolSpec {
            name: "get_scenario_list",
            description: "Get all available application scenarios. The preferred entry point for deployment tasks: call this first, let the user pick a scenario, then use search_jobs_by_scenario and trigger_build. Each scenario has an index, name, description, server and job_path.",
            input_schema: no_args(),
            handler: call_get_scenario_list::<C>,
        },
        ToolSpec {
            name: "search_jobs_by_scenario",
            description: "Get the Jenkins job configured for a scenario. Accepts the scenario name, its 1-based index, or part of its name.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "scenario": string_prop("Scenario name or index")
                },
                "required": ["scenario"],
                "additionalProperties": false
            }),
            handler: call_search_jobs_by_scenario::<C>,
        },
        ToolSpec {
            name: "search_jobs",
            description: "Search Jenkins jobs on a server by keyword (case-insensitive, matches name or full name). For deployment tasks prefer get_scenario_list and search_jobs_by_scenario.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": string_prop("Jenkins server name"),
                    "keyword": string_prop("Search keyword")
                },
                "required": ["server_name", "keyword"],
                "additionalProperties": false
            }),
            handler: call_search_jobs::<C>,
        },
        ToolSpec {
            name: "get_job_parameters",
            description: "Get the parameter definitions of a Jenkins job: name, type, default value, and choices for choice parameters.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": string_prop("Jenkins server name"),
                    "job_full_name": string_prop("Full job name, folders separated by '/'")
                },
                "required": ["server_name", "job_full_name"],
                "additionalProperties": false
            }),
            handler: call_get_job_parameters::<C>,
        },
        ToolSpec {
            name: "trigger_build",
            description: "Trigger a Jenkins build. Fails listing every missing parameter if the job has required parameters that were not supplied. Waits up to 10 seconds for a build number, otherwise returns the queue id.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": string_prop("Jenkins server name"),
                    "job_full_name": string_prop("Full job name, folders separated by '/'"),
                    "params": {
                        "type": "object",
                        "description": "Build parameters as name/value pairs",
                        "additionalProperties": true
                    }
                },
                "required": ["server_name", "job_full_name"],
                "additionalProperties": false
            }),
            handler: call_trigger_build::<C>,
        },
        ToolSpec {
            name: "get_build_status",
            description: "Get the status of a Jenkins build: result, whether it is still building, timestamp and duration.",
            input_schema: build_schema(),
            handler: call_get_build_status::<C>,
        },
        ToolSpec {
            name: "stop_build",
            description: "Stop a Jenkins build. If the stop is denied, checks whether the build already finished before reporting a permission error.",
            input_schema: build_schema(),
            handler: call_stop_build::<C>,
        },
        ToolSpec {
            name: "get_build_log",
            description: "Get the console log of a Jenkins build as plain text.",
            input_schema: build_schema(),
            handler: call_get_build_log::<C>,
        },
        ToolSpec {
            name: "validate_jenkins_config",
            description: "Validate the loaded Jenkins server and scenario configuration. Returns valid, errors and error_count.",
            input_schema: no_args(),
            handler: call_validate_jenkins_config::<C>,
        },
        ToolSpec {
            name: "create_or_update_job_from_jenkinsfile",
            description: "Create or update a pipeline job from a Jenkinsfile. Jobs are placed under MCPS/<username>/ on the server, where <username> is the configured user without any email domain.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": string_prop("Jenkins server name"),
                    "job_name": string_prop("Job name; created if absent, updated otherwise"),
                    "jenkinsfile_content": string_prop("Pipeline script"),
                    "description": string_prop("Optional job description")
                },
                "required": ["server_name", "job_name", "jenkinsfile_content"],
                "additionalProperties": false
            }),
            handler: call_create_or_update_job::<C>,
        },
    ]
}
