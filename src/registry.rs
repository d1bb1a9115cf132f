//! Server registry.
//!
//! [`ServerRegistry`] maps Jenkins server names to connection details. It is
//! built once from the loaded configuration and never mutated afterwards;
//! `mcp-jenkins server add/remove` rewrite the config file only, so a running
//! instance keeps its snapshot until restarted.
//!
//! ## Token resolution
//!
//! An entry may name an environment variable (`tokenEnv`) holding its API
//! token. The variable is read on every [`ServerRegistry::resolve`]; when it
//! is unset or empty the literal `token` from the file is used instead.

use crate::config::ServerEntry;
use crate::error::JenkinsError;

/// Connection details for one Jenkins server, token already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub name: String,
    /// Base URL without trailing slash.
    pub uri: String,
    pub user: String,
    pub token: Option<String>,
}

impl ServerConfig {
    /// Local part of the username when it looks like an email address.
    pub fn user_local_part(&self) -> &str {
        self.user.split('@').next().unwrap_or(&self.user)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    entries: Vec<ServerEntry>,
}

impl ServerRegistry {
    pub fn new(entries: Vec<ServerEntry>) -> Self {
        Self { entries }
    }

    /// Look up a server by name and resolve its token.
    pub fn resolve(&self, name: &str) -> Result<ServerConfig, JenkinsError> {
        self.entries
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
            .map(resolve_entry)
            .ok_or_else(|| JenkinsError::ServerNotFound(name.to_string()))
    }

    /// All servers in configuration order.
    pub fn list(&self) -> Vec<ServerConfig> {
        self.entries.iter().map(resolve_entry).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().filter_map(|e| e.name.clone()).collect()
    }

    /// One message per empty or missing field. A token counts as present
    /// when its `tokenEnv` variable resolves.
    pub fn validate(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec!["No Jenkins servers configured".to_string()];
        }
        let mut errors = Vec::new();
        for (entry, resolved) in self.entries.iter().zip(self.list()) {
            let label = entry.name.as_deref().unwrap_or("unknown");
            let fields = [
                ("name", resolved.name.as_str()),
                ("uri", resolved.uri.as_str()),
                ("user", resolved.user.as_str()),
                ("token", resolved.token.as_deref().unwrap_or_default()),
            ];
            for (field, value) in fields {
                if value.is_empty() {
                    errors.push(format!("Server '{label}' missing field: {field}"));
                }
            }
        }
        errors
    }
}

fn resolve_entry(entry: &ServerEntry) -> ServerConfig {
    let env_token = entry
        .token_env
        .as_deref()
        .and_then(|var| std::env::var(var).ok())
        .filter(|v| !v.is_empty());
    ServerConfig {
        name: entry.name.clone().unwrap_or_default(),
        uri: entry
            .uri
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
        user: entry.user.clone().unwrap_or_default(),
        token: env_token.or_else(|| entry.token.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, token: Option<&str>, token_env: Option<&str>) -> ServerEntry {
        ServerEntry {
            name: Some(name.into()),
            uri: Some("http://ci.example.com/".into()),
            user: Some("alice@example.com".into()),
            token: token.map(String::from),
            token_env: token_env.map(String::from),
        }
    }

    #[test]
    fn resolve_known_server() {
        let reg = ServerRegistry::new(vec![entry("prod", Some("t0k"), None)]);
        let s = reg.resolve("prod").unwrap();
        assert_eq!(s.uri, "http://ci.example.com");
        assert_eq!(s.token.as_deref(), Some("t0k"));
        assert_eq!(s.user_local_part(), "alice");
    }

    #[test]
    fn unknown_server_is_not_found() {
        let reg = ServerRegistry::new(vec![entry("prod", None, None)]);
        match reg.resolve("staging") {
            Err(JenkinsError::ServerNotFound(name)) => assert_eq!(name, "staging"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn token_env_overrides_literal_token() {
        std::env::set_var("MCP_JENKINS_TEST_TOKEN_SET", "from-env");
        let reg = ServerRegistry::new(vec![entry(
            "prod",
            Some("literal"),
            Some("MCP_JENKINS_TEST_TOKEN_SET"),
        )]);
        assert_eq!(reg.resolve("prod").unwrap().token.as_deref(), Some("from-env"));
    }

    #[test]
    fn unset_token_env_falls_back_to_literal() {
        let reg = ServerRegistry::new(vec![
            entry("a", Some("literal"), Some("MCP_JENKINS_TEST_TOKEN_UNSET")),
            entry("b", None, Some("MCP_JENKINS_TEST_TOKEN_UNSET")),
        ]);
        assert_eq!(reg.resolve("a").unwrap().token.as_deref(), Some("literal"));
        assert_eq!(reg.resolve("b").unwrap().token, None);
    }

    #[test]
    fn validate_reports_missing_fields() {
        let reg = ServerRegistry::new(vec![
            entry("ok", Some("t"), None),
            ServerEntry {
                uri: None,
                token: None,
                ..entry("bad", None, Some("MCP_JENKINS_TEST_TOKEN_UNSET"))
            },
            ServerEntry::default(),
        ]);
        assert_eq!(
            reg.validate(),
            vec![
                "Server 'bad' missing field: uri",
                "Server 'bad' missing field: token",
                "Server 'unknown' missing field: name",
                "Server 'unknown' missing field: uri",
                "Server 'unknown' missing field: user",
                "Server 'unknown' missing field: token",
            ]
        );
        assert_eq!(
            ServerRegistry::default().validate(),
            vec!["No Jenkins servers configured"]
        );
    }

    #[test]
    fn names_in_config_order() {
        let reg = ServerRegistry::new(vec![entry("b", None, None), entry("a", None, None)]);
        assert_eq!(reg.names(), vec!["b", "a"]);
        assert_eq!(reg.list().len(), 2);
    }
}
