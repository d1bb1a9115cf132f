//! MCP prompt templates.
//!
//! Prompts are static text with a few arguments spliced in. The scenario
//! prompts read the loaded [`ScenarioCatalog`]; the rest only format their
//! arguments. MCP passes every prompt argument as a string.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::scenarios::ScenarioCatalog;

#[derive(Debug, Error, PartialEq)]
pub enum PromptError {
    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),
    #[error("Missing required argument '{argument}' for prompt '{prompt}'")]
    MissingArgument { prompt: String, argument: String },
    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument { argument: String, reason: String },
}

pub struct PromptArg {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

pub struct PromptDef {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: &'static [PromptArg],
}

const fn arg(name: &'static str, description: &'static str) -> PromptArg {
    PromptArg {
        name,
        description,
        required: true,
    }
}

const SCENARIO: PromptArg = arg("scenario", "Scenario name or 1-based index");
const SERVER_NAME: PromptArg = arg("server_name", "Jenkins server name");
const JOB_NAME: PromptArg = arg("job_name", "Full job name");
const BUILD_NUMBER: PromptArg = arg("build_number", "Build number");

pub const PROMPTS: &[PromptDef] = &[
    PromptDef {
        name: "scenario_selection_prompt",
        description: "Ask the user to choose one of the configured application scenarios.",
        arguments: &[],
    },
    PromptDef {
        name: "scenario_guidance_prompt",
        description: "Guidance for the selected scenario, from its prompt template.",
        arguments: &[SCENARIO],
    },
    PromptDef {
        name: "scenario_config_prompt",
        description: "The complete configuration of the selected scenario.",
        arguments: &[SCENARIO],
    },
    PromptDef {
        name: "job_description_prompt",
        description: "Ask for a brief description of a Jenkins job.",
        arguments: &[SERVER_NAME, JOB_NAME],
    },
    PromptDef {
        name: "build_result_summary_prompt",
        description: "Ask for a plain-language interpretation of a build result.",
        arguments: &[
            SERVER_NAME,
            JOB_NAME,
            BUILD_NUMBER,
            arg("result", "Build result, e.g. SUCCESS or FAILURE"),
        ],
    },
    PromptDef {
        name: "build_log_analysis_prompt",
        description: "Ask for errors and exceptions in a build log excerpt.",
        arguments: &[
            SERVER_NAME,
            JOB_NAME,
            BUILD_NUMBER,
            arg("log_excerpt", "Excerpt of the console log"),
        ],
    },
    PromptDef {
        name: "trigger_job_prompt",
        description: "Prepare the user for triggering a job, listing its parameters if it has any.",
        arguments: &[
            SERVER_NAME,
            JOB_NAME,
            arg("is_parameterized", "\"true\" if the job takes parameters"),
            PromptArg {
                name: "parameters",
                description: "JSON array of parameter definitions from get_job_parameters",
                required: false,
            },
        ],
    },
];

/// Definitions for `prompts/list`.
pub fn definitions() -> Vec<Value> {
    PROMPTS
        .iter()
        .map(|p| {
            let arguments: Vec<Value> = p
                .arguments
                .iter()
                .map(|a| {
                    json!({
                        "name": a.name,
                        "description": a.description,
                        "required": a.required,
                    })
                })
                .collect();
            json!({
                "name": p.name,
                "description": p.description,
                "arguments": arguments,
            })
        })
        .collect()
}

/// Render prompt `name`. Returns its description and text.
pub fn render(
    name: &str,
    args: &Map<String, Value>,
    scenarios: &ScenarioCatalog,
) -> Result<(&'static str, String), PromptError> {
    let def = PROMPTS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| PromptError::UnknownPrompt(name.to_string()))?;

    let mut values = Map::new();
    for a in def.arguments {
        match args.get(a.name).filter(|v| !v.is_null()) {
            Some(v) => {
                values.insert(a.name.to_string(), Value::String(as_text(v)));
            }
            None if a.required => {
                return Err(PromptError::MissingArgument {
                    prompt: name.to_string(),
                    argument: a.name.to_string(),
                })
            }
            None => {}
        }
    }

    let text = match name {
        "scenario_selection_prompt" => scenario_selection(scenarios),
        "scenario_guidance_prompt" => scenario_guidance(scenarios, text_arg(&values, "scenario")),
        "scenario_config_prompt" => scenario_config(scenarios, text_arg(&values, "scenario")),
        "job_description_prompt" => format!(
            "Please briefly introduce the purpose, main process, and trigger method of job `{}` on Jenkins server `{}`.",
            text_arg(&values, "job_name"),
            text_arg(&values, "server_name")
        ),
        "build_result_summary_prompt" => format!(
            "Please interpret the result of build #{} for job `{}` on Jenkins server `{}` in plain language: {}. \
             If failed, please analyze possible reasons; if successful, briefly describe the key steps.",
            text_arg(&values, "build_number"),
            text_arg(&values, "job_name"),
            text_arg(&values, "server_name"),
            text_arg(&values, "result")
        ),
        "build_log_analysis_prompt" => format!(
            "Please analyze the following log excerpt from build #{} for job `{}` on Jenkins server `{}` and identify any errors or exceptions:\nLog excerpt:\n{}",
            text_arg(&values, "build_number"),
            text_arg(&values, "job_name"),
            text_arg(&values, "server_name"),
            text_arg(&values, "log_excerpt")
        ),
        "trigger_job_prompt" => trigger_job(
            text_arg(&values, "server_name"),
            text_arg(&values, "job_name"),
            parse_flag(text_arg(&values, "is_parameterized")),
            values.get("parameters").and_then(Value::as_str),
        )?,
        _ => return Err(PromptError::UnknownPrompt(name.to_string())),
    };
    Ok((def.description, text))
}

fn text_arg<'a>(values: &'a Map<String, Value>, key: &str) -> &'a str {
    values.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

fn scenario_selection(scenarios: &ScenarioCatalog) -> String {
    let list: Vec<String> = scenarios
        .iter()
        .enumerate()
        .map(|(i, (name, cfg))| format!("- {}. {}: {}", i + 1, name, cfg.description))
        .collect();
    format!(
        "Please select your application scenario:\n{}\n\n\
         Please reply with the scenario name or number, and I will provide you with the corresponding Jenkins configuration and operation guidance.",
        list.join("\n")
    )
}

/// Exact name or in-range index. Anything else is reported back as text.
fn select<'a>(scenarios: &'a ScenarioCatalog, token: &str) -> Result<&'a str, String> {
    if let Some((name, _)) = scenarios.iter().find(|(name, _)| name.as_str() == token) {
        return Ok(name);
    }
    match token.trim().parse::<i64>() {
        Ok(i) => usize::try_from(i)
            .ok()
            .filter(|i| (1..=scenarios.len()).contains(i))
            .and_then(|i| scenarios.iter().nth(i - 1))
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| format!("Invalid scenario selection: {token}")),
        Err(_) => Err(format!("Unrecognized scenario: {token}")),
    }
}

fn scenario_guidance(scenarios: &ScenarioCatalog, token: &str) -> String {
    match select(scenarios, token) {
        Ok(name) => scenarios
            .get(name)
            .map(|cfg| {
                cfg.prompt_template
                    .replace("{job_path}", &cfg.job_path)
                    .replace("{server}", &cfg.server)
            })
            .unwrap_or_default(),
        Err(msg) if msg.starts_with("Invalid") => {
            format!("{msg}. Please use the scenario name or a valid number.")
        }
        Err(msg) => format!("{msg}. Please use the scenario name or number."),
    }
}

fn scenario_config(scenarios: &ScenarioCatalog, token: &str) -> String {
    let value = match select(scenarios, token) {
        Ok(name) => scenarios
            .get(name)
            .and_then(|cfg| serde_json::to_value(cfg).ok())
            .unwrap_or(Value::Null),
        Err(msg) => json!({ "error": msg }),
    };
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

fn trigger_job(
    server_name: &str,
    job_name: &str,
    is_parameterized: bool,
    parameters: Option<&str>,
) -> Result<String, PromptError> {
    if !is_parameterized {
        return Ok(format!(
            "You are trying to trigger job `{job_name}` on Jenkins server `{server_name}`. This job does not require parameters and can be executed directly."
        ));
    }

    let params: Vec<Value> = match parameters.map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => serde_json::from_str(raw).map_err(|e| PromptError::InvalidArgument {
            argument: "parameters".to_string(),
            reason: e.to_string(),
        })?,
        None => Vec::new(),
    };
    let lines: Vec<String> = params
        .iter()
        .map(|p| {
            let default = match p.get("default") {
                None | Some(Value::Null) => "None".to_string(),
                Some(v) => as_text(v),
            };
            format!(
                "- {} (type: {}, default: {})",
                p.get("name").map(as_text).unwrap_or_default(),
                p.get("type").map(as_text).unwrap_or_default(),
                default
            )
        })
        .collect();
    Ok(format!(
        "You are trying to trigger a parameterized job `{job_name}` on Jenkins server `{server_name}`.\n\
         This job requires the following parameters, please provide them before execution:\n{}",
        lines.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::config::ScenarioConfig;

    fn catalog() -> ScenarioCatalog {
        let mut map = IndexMap::new();
        map.insert(
            "deploy-prod".to_string(),
            ScenarioConfig {
                description: "Deploy to production".into(),
                server: "prod".into(),
                job_path: "deploy/app".into(),
                prompt_template: "Run {job_path} on {server}.".into(),
            },
        );
        map.insert(
            "qa".to_string(),
            ScenarioConfig {
                description: "QA run".into(),
                server: "qa".into(),
                job_path: "qa/app".into(),
                prompt_template: String::new(),
            },
        );
        ScenarioCatalog::new(map)
    }

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn selection_lists_scenarios_in_order() {
        let (_, text) = render("scenario_selection_prompt", &Map::new(), &catalog()).unwrap();
        assert!(text.contains("- 1. deploy-prod: Deploy to production\n- 2. qa: QA run"));
    }

    #[test]
    fn guidance_substitutes_template() {
        let c = catalog();
        for token in ["deploy-prod", "1"] {
            let (_, text) =
                render("scenario_guidance_prompt", &args(&[("scenario", json!(token))]), &c).unwrap();
            assert_eq!(text, "Run deploy/app on prod.");
        }
    }

    #[test]
    fn guidance_reports_bad_selection_as_text() {
        let c = catalog();
        let (_, text) =
            render("scenario_guidance_prompt", &args(&[("scenario", json!("7"))]), &c).unwrap();
        assert_eq!(
            text,
            "Invalid scenario selection: 7. Please use the scenario name or a valid number."
        );
        let (_, text) =
            render("scenario_guidance_prompt", &args(&[("scenario", json!("dep"))]), &c).unwrap();
        assert_eq!(text, "Unrecognized scenario: dep. Please use the scenario name or number.");
    }

    #[test]
    fn config_prompt_is_json() {
        let (_, text) =
            render("scenario_config_prompt", &args(&[("scenario", json!("2"))]), &catalog()).unwrap();
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["job_path"], "qa/app");
    }

    #[test]
    fn missing_argument_is_an_error() {
        let err = render("job_description_prompt", &args(&[("server_name", json!("prod"))]), &catalog())
            .unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingArgument {
                prompt: "job_description_prompt".into(),
                argument: "job_name".into()
            }
        );
        assert!(matches!(
            render("nope", &Map::new(), &catalog()),
            Err(PromptError::UnknownPrompt(_))
        ));
    }

    #[test]
    fn trigger_prompt_lists_parameters() {
        let (_, text) = render(
            "trigger_job_prompt",
            &args(&[
                ("server_name", json!("prod")),
                ("job_name", json!("app")),
                ("is_parameterized", json!("true")),
                (
                    "parameters",
                    json!(r#"[{"name":"BRANCH","type":"StringParameterDefinition","default":null}]"#),
                ),
            ]),
            &catalog(),
        )
        .unwrap();
        assert!(text.ends_with("- BRANCH (type: StringParameterDefinition, default: None)"));

        let (_, text) = render(
            "trigger_job_prompt",
            &args(&[
                ("server_name", json!("prod")),
                ("job_name", json!("app")),
                ("is_parameterized", json!(false)),
            ]),
            &catalog(),
        )
        .unwrap();
        assert!(text.contains("does not require parameters"));
    }

    #[test]
    fn build_prompts_accept_numeric_arguments() {
        let (_, text) = render(
            "build_result_summary_prompt",
            &args(&[
                ("server_name", json!("prod")),
                ("job_name", json!("app")),
                ("build_number", json!(42)),
                ("result", json!("FAILURE")),
            ]),
            &catalog(),
        )
        .unwrap();
        assert!(text.starts_with("Please interpret the result of build #42 for job `app`"));
        assert_eq!(definitions().len(), PROMPTS.len());
    }
}
