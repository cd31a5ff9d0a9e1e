//! Error types for runx
//!
//! All modules use `RunxResult<T>` as their return type. Every fatal error
//! bubbles to the single boundary in `main.rs`; only the advisory version
//! checker swallows its own failures.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for runx operations
pub type RunxResult<T> = Result<T, RunxError>;

/// All errors that can occur in runx
#[derive(Error, Debug)]
pub enum RunxError {
    // User input errors
    #[error("The specified path {0} does not exist")]
    ScriptNotFound(PathBuf),

    #[error("Invalid requirement '{line}': {reason}")]
    InvalidRequirement { line: String, reason: String },

    #[error(
        "runx only executes scripts from the internet directly if they end \
         with '.py'. To run an app from a remote package source, try: \
         runx run --spec {0} APP"
    )]
    RemoteScriptSuffix(String),

    #[error("'--local' flag was passed, but '{0}' was not found. Install into __pypackages__ first, or omit the flag.")]
    LocalPackagesMissing(PathBuf),

    // App resolution errors
    #[error(
        "'{app}' executable script not found in package '{package}'.\n\
         Available executable scripts:\n    {app_lines}"
    )]
    AppNotFound {
        app: String,
        package: String,
        app_lines: String,
    },

    // Network errors
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    // Provisioning errors
    #[error("Failed to create environment at {path}: {reason}")]
    EnvCreate { path: PathBuf, reason: String },

    #[error("Failed to install {what}: {reason}")]
    Install { what: String, reason: String },

    #[error("No package metadata found in environment {0}")]
    MetadataMissing(PathBuf),

    // Launch errors
    #[error("Failed to launch {command}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Cache errors
    #[error("Failed to claim cache entry {fingerprint}: {reason}")]
    CacheClaim { fingerprint: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RunxError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create an app-not-found error listing every declared app with an
    /// example invocation for each.
    pub fn app_not_found(app: &str, package: &str, spec: &str, available: &[String]) -> Self {
        let app_lines = available
            .iter()
            .map(|a| format!("{a} - usage: 'runx run --spec {spec} {a} [arguments?]'"))
            .collect::<Vec<_>>()
            .join("\n    ");
        Self::AppNotFound {
            app: app.to_string(),
            package: package.to_string(),
            app_lines,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ScriptNotFound(_) => {
                Some("Pass a path to an existing script, or drop --path to treat the target as a package")
            }
            Self::RemoteScriptSuffix(_) => Some("Remote scripts must have a '.py' suffix"),
            Self::LocalPackagesMissing(_) => Some("Omit --local to fall back to a cached environment"),
            Self::EnvCreate { .. } => Some("Check that the requested interpreter is installed and on PATH"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RunxError::ScriptNotFound(PathBuf::from("/tmp/nope.py"));
        assert!(err.to_string().contains("/tmp/nope.py"));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn error_hint() {
        let err = RunxError::RemoteScriptSuffix("https://x.test/app".to_string());
        assert_eq!(err.hint(), Some("Remote scripts must have a '.py' suffix"));
    }

    #[test]
    fn app_not_found_lists_alternatives() {
        let err = RunxError::app_not_found("foo", "foo", "foo", &["a".to_string(), "b".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains("'foo' executable script not found"));
        assert!(msg.contains("a - usage: 'runx run --spec foo a [arguments?]'"));
        assert!(msg.contains("b - usage: 'runx run --spec foo b [arguments?]'"));
    }
}
