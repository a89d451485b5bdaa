//! CLI error types with miette diagnostics.
//!
//! Maps `jss_api::Error` and `jss_config::ConfigError` into user-facing
//! errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use jss_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(jss::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             If it uses a self-signed certificate, try --insecure (-k)."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: jss_api::Error,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(jss::auth_failed),
        help(
            "Verify the username and password for this profile.\n\
             Run: jss config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(jss::no_credentials),
        help(
            "Set username in the profile (or pass --user), then either\n\
             set JSS_PASSWORD, run `jss config set-password`, or run interactively."
        )
    )]
    NoCredentials { profile: String },

    // ── Server answers ───────────────────────────────────────────────
    #[error("Not found: {url}")]
    #[diagnostic(code(jss::not_found))]
    NotFound { url: String },

    #[error("The server rejected the request: {message}")]
    #[diagnostic(code(jss::conflict))]
    Conflict { message: String },

    #[error(transparent)]
    #[diagnostic(code(jss::api))]
    Api(jss_api::Error),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(jss::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(jss::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Or pass --url to connect without a profile."
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(jss::no_config),
        help(
            "Pass --url (or set JSS_URL), or add a profile to\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(jss::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(jss::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── Library errors → CliError ────────────────────────────────────────

impl From<jss_api::Error> for CliError {
    fn from(err: jss_api::Error) -> Self {
        let unreachable = match &err {
            jss_api::Error::Transport(e) if e.is_connect() || e.is_timeout() => {
                Some(e.url().map(ToString::to_string).unwrap_or_default())
            }
            _ => None,
        };
        if let Some(url) = unreachable {
            return Self::ConnectionFailed { url, source: err };
        }

        let status = err.status();
        match err {
            jss_api::Error::Authentication { message } => Self::AuthFailed {
                profile: "current".into(),
                message,
            },
            other if status == Some(401) => Self::AuthFailed {
                profile: "current".into(),
                message: other.to_string(),
            },
            jss_api::Error::Get { url, .. } | jss_api::Error::Delete { url, .. }
                if status == Some(404) =>
            {
                Self::NotFound { url }
            }
            other if status == Some(409) => Self::Conflict {
                message: other.to_string(),
            },
            other => Self::Api(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => Self::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_usage_and_auth() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "prod".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);

        let err = CliError::from(ConfigError::Validation {
            field: "url".into(),
            reason: "bad".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn login_rejection_is_an_auth_failure() {
        let err = CliError::from(jss_api::Error::Authentication {
            message: "nope".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
