//! Error taxonomy shared by the registry, resolver, client and tools.
//!
//! Every variant renders a message with enough context (server, job, build
//! number, scenario) to act on without reading the logs. Tool handlers turn
//! these into MCP results with `isError: true`.

use thiserror::Error;

/// Errors raised while talking to a Jenkins server or resolving config.
#[derive(Debug, Error)]
pub enum JenkinsError {
    /// Requested server name is not in the loaded registry.
    #[error("Jenkins server '{0}' not found")]
    ServerNotFound(String),

    /// 404 on a job-detail lookup.
    #[error("Jenkins job '{job}' not found on server '{server}'")]
    JobNotFound { job: String, server: String },

    /// 404 on a build-detail or console-log lookup.
    #[error("Jenkins build #{number} for job '{job}' not found on server '{server}'")]
    BuildNotFound {
        number: u64,
        job: String,
        server: String,
    },

    /// Operation denied. For stop, raised only once reconciliation gives up.
    #[error("Permission denied for {operation} on {resource}")]
    Permission { operation: String, resource: String },

    /// Malformed or missing scenario/server configuration.
    #[error("Jenkins configuration error: {0}")]
    Configuration(String),

    /// Required build parameters were not supplied.
    #[error("{message}")]
    Parameter {
        message: String,
        missing: Vec<String>,
    },

    /// Reserved; no code path raises this yet.
    #[allow(dead_code)]
    #[error("Operation '{operation}' timed out after {seconds} seconds")]
    Timeout { operation: String, seconds: u64 },

    /// Transport failure (connection refused, timeout, DNS, TLS).
    #[error("Jenkins API request failed: {0}")]
    Request(String),

    /// The server answered with an unexpected status code.
    #[error("Jenkins API returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// The response body was not the JSON we expected.
    #[error("Invalid response from Jenkins: {0}")]
    Protocol(String),

    /// An operation failed for a reason the server reported indirectly.
    #[error("{0}")]
    Failed(String),
}

impl JenkinsError {
    /// Names of the missing parameters, empty for every other variant.
    pub fn missing_params(&self) -> &[String] {
        match self {
            JenkinsError::Parameter { missing, .. } => missing,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for JenkinsError {
    fn from(e: reqwest::Error) -> Self {
        JenkinsError::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = JenkinsError::BuildNotFound {
            number: 42,
            job: "folder/app".into(),
            server: "prod".into(),
        };
        assert_eq!(
            e.to_string(),
            "Jenkins build #42 for job 'folder/app' not found on server 'prod'"
        );

        let e = JenkinsError::Permission {
            operation: "stop build".into(),
            resource: "app#7".into(),
        };
        assert_eq!(e.to_string(), "Permission denied for stop build on app#7");
    }

    #[test]
    fn configuration_prefix() {
        let e = JenkinsError::Configuration("unable to resolve scenario: x".into());
        assert_eq!(
            e.to_string(),
            "Jenkins configuration error: unable to resolve scenario: x"
        );
    }

    #[test]
    fn missing_params_only_for_parameter_errors() {
        let e = JenkinsError::Parameter {
            message: "missing".into(),
            missing: vec!["BRANCH".into()],
        };
        assert_eq!(e.missing_params(), ["BRANCH".to_string()]);
        assert!(JenkinsError::ServerNotFound("x".into())
            .missing_params()
            .is_empty());
    }

    #[test]
    fn timeout_message() {
        let e = JenkinsError::Timeout {
            operation: "trigger build".into(),
            seconds: 10,
        };
        assert_eq!(
            e.to_string(),
            "Operation 'trigger build' timed out after 10 seconds"
        );
    }
}
