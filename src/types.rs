//! Result records returned by the client and the tools.
//!
//! These are transient projections of remote Jenkins state, rebuilt on every
//! call and serialized straight into MCP tool results. Field names match
//! what agents already see from the Jenkins JSON API (`fullName`, etc.).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter type string Jenkins uses for choice parameters.
pub const CHOICE_PARAMETER: &str = "ChoiceParameterDefinition";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub name: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub url: String,
    pub description: Option<String>,
    pub buildable: bool,
    pub color: String,
    pub is_parameterized: bool,
    pub last_build_number: Option<u64>,
    pub last_build_url: Option<String>,
}

/// A job found through a scenario lookup.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioJob {
    #[serde(flatten)]
    pub job: JobInfo,
    pub scenario: String,
    pub scenario_match: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub default: Option<Value>,
    /// Only set for `ChoiceParameterDefinition`.
    pub choices: Option<Vec<Value>>,
}

impl JobParameter {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// `NAME (type: T, default: D[, choices: [..]])`, as listed in
    /// missing-parameter errors.
    pub fn describe(&self) -> String {
        let default = match &self.default {
            Some(v) => render_value(v),
            None => "None".to_string(),
        };
        let mut detail = format!(
            "{} (type: {}, default: {}",
            self.name, self.param_type, default
        );
        if let Some(choices) = self.choices.as_ref().filter(|c| !c.is_empty()) {
            let items: Vec<String> = choices.iter().map(render_value).collect();
            detail.push_str(&format!(", choices: [{}]", items.join(", ")));
        }
        detail.push(')');
        detail
    }
}

fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Queued,
    BuildStarted,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub queue_id: u64,
    pub blocked: bool,
    pub buildable: bool,
    pub stuck: bool,
    pub why: Option<String>,
    pub build_number: Option<u64>,
    pub build_url: Option<String>,
    pub status: QueueStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub number: u64,
    pub result: Option<String>,
    pub building: bool,
    pub url: String,
    pub timestamp: i64,
    pub duration: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerStatus {
    BuildStarted,
    Queued,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResult {
    pub status: TriggerStatus,
    pub build_number: Option<u64>,
    pub build_url: Option<String>,
    pub queue_id: Option<u64>,
    pub queue_url: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopStatus {
    StopRequested,
    AlreadyTerminated,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopResult {
    pub status: StopStatus,
    pub url: Option<String>,
}

impl StopResult {
    pub fn with_status(status: StopStatus) -> Self {
        Self { status, url: None }
    }
}

/// One row of `get_scenario_list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioInfo {
    /// 1-based position, as a string.
    pub index: String,
    pub name: String,
    pub description: String,
    pub server: String,
    pub job_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobChangeStatus {
    Created,
    Updated,
}

/// Outcome of creating or updating a job from a config payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobChange {
    pub status: JobChangeStatus,
    pub job_name: String,
    pub job_url: String,
    pub folder_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub error_count: usize,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            error_count: errors.len(),
            errors,
        }
    }
}
