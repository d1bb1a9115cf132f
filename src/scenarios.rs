//! Scenario resolver.
//!
//! A scenario is a named shortcut to one job on one server. Agents pick one
//! by exact name, by 1-based position in the configured order, or by a
//! case-insensitive fragment of its name.

use indexmap::IndexMap;

use crate::config::ScenarioConfig;
use crate::error::JenkinsError;
use crate::types::ScenarioInfo;

/// Ordered scenario table, read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: IndexMap<String, ScenarioConfig>,
}

impl ScenarioCatalog {
    pub fn new(scenarios: IndexMap<String, ScenarioConfig>) -> Self {
        Self { scenarios }
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioConfig> {
        self.scenarios.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ScenarioConfig)> {
        self.scenarios.iter()
    }

    /// Resolve `token` to a scenario name.
    ///
    /// Exact name first. Anything that parses as an integer is then treated
    /// as an index and must be in range; no fuzzy fallback for numbers.
    /// Otherwise the first name containing `token` (case-insensitive) wins.
    pub fn resolve(&self, token: &str) -> Result<&str, JenkinsError> {
        if let Some((name, _)) = self.scenarios.get_key_value(token) {
            return Ok(name);
        }

        if let Ok(index) = token.trim().parse::<i64>() {
            let count = self.scenarios.len();
            return usize::try_from(index)
                .ok()
                .filter(|i| (1..=count).contains(i))
                .and_then(|i| self.scenarios.get_index(i - 1))
                .map(|(name, _)| {
                    tracing::debug!("Resolved scenario #{} to '{}'", token, name);
                    name.as_str()
                })
                .ok_or_else(|| {
                    JenkinsError::Configuration(format!(
                        "Invalid scenario index: {token}. Valid range: 1-{count}"
                    ))
                });
        }

        let needle = token.to_lowercase();
        self.scenarios
            .keys()
            .find(|name| name.to_lowercase().contains(&needle))
            .map(|name| {
                tracing::debug!("Fuzzy matched scenario '{}' to '{}'", token, name);
                name.as_str()
            })
            .ok_or_else(|| {
                JenkinsError::Configuration(format!("Unable to resolve scenario: {token}"))
            })
    }

    /// Resolve and return the scenario's name with its config.
    pub fn lookup(&self, token: &str) -> Result<(&str, &ScenarioConfig), JenkinsError> {
        let name = self.resolve(token)?;
        self.scenarios
            .get_key_value(name)
            .map(|(n, c)| (n.as_str(), c))
            .ok_or_else(|| {
                let available: Vec<&str> = self.scenarios.keys().map(String::as_str).collect();
                JenkinsError::Configuration(format!(
                    "Unknown scenario '{token}'. Available scenarios: {}",
                    available.join(", ")
                ))
            })
    }

    pub fn list(&self) -> Vec<ScenarioInfo> {
        self.scenarios
            .iter()
            .enumerate()
            .map(|(i, (name, cfg))| ScenarioInfo {
                index: (i + 1).to_string(),
                name: name.clone(),
                description: cfg.description.clone(),
                server: cfg.server.clone(),
                job_path: cfg.job_path.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[&str]) -> ScenarioCatalog {
        ScenarioCatalog::new(
            names
                .iter()
                .map(|n| {
                    (
                        n.to_string(),
                        ScenarioConfig {
                            description: format!("{n} description"),
                            server: "prod".into(),
                            job_path: format!("team/{n}"),
                            prompt_template: String::new(),
                        },
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn index_resolves_in_order() {
        let c = catalog(&["A", "B", "C"]);
        assert_eq!(c.resolve("2").unwrap(), "B");
        assert_eq!(c.resolve("1").unwrap(), "A");
    }

    #[test]
    fn out_of_range_index_fails() {
        let c = catalog(&["A", "B", "C"]);
        for bad in ["0", "4", "-1"] {
            match c.resolve(bad) {
                Err(JenkinsError::Configuration(msg)) => {
                    assert_eq!(msg, format!("Invalid scenario index: {bad}. Valid range: 1-3"))
                }
                other => panic!("unexpected for {bad}: {other:?}"),
            }
        }
    }

    #[test]
    fn fuzzy_match_is_case_insensitive() {
        let c = catalog(&["build-qa", "deploy-prod"]);
        assert_eq!(c.resolve("dep").unwrap(), "deploy-prod");
        assert_eq!(c.resolve("PROD").unwrap(), "deploy-prod");
    }

    #[test]
    fn first_fuzzy_match_wins() {
        let c = catalog(&["deploy-qa", "deploy-prod"]);
        assert_eq!(c.resolve("deploy").unwrap(), "deploy-qa");
    }

    #[test]
    fn exact_name_beats_index() {
        let c = catalog(&["A", "2"]);
        assert_eq!(c.resolve("2").unwrap(), "2");
    }

    #[test]
    fn unresolvable_name_fails() {
        let c = catalog(&["A"]);
        assert!(matches!(
            c.resolve("zzz"),
            Err(JenkinsError::Configuration(m)) if m == "Unable to resolve scenario: zzz"
        ));
    }

    #[test]
    fn list_is_one_based() {
        let list = catalog(&["x", "y"]).list();
        assert_eq!(list[0].index, "1");
        assert_eq!(list[1].index, "2");
        assert_eq!(list[1].job_path, "team/y");
    }
}
