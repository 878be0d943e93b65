//! Error types for virtual host lifecycle operations.
//!
//! Every error maps to an [`ErrorKind`] so command surfaces can report it
//! consistently (exit codes, HTTP status, advice text). Failures raised while
//! executing a plan are wrapped with the [`Step`] that produced them.

use crate::step::Step;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Classification of lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty or malformed host name
    InvalidInput,
    /// A host with this name is already registered
    AlreadyExists,
    /// A file or directory the operation expected was missing
    NotFound,
    /// The config template could not be found
    TemplateMissing,
    /// The config template lacks a required placeholder
    TemplateMalformed,
    /// Filesystem failure
    Io,
    /// Service command exited non-zero or timed out
    ServiceCommand,
    /// The name-resolution store could not be read, edited or persisted
    ResolutionStore,
    /// The service reload failed after the host was changed
    Fatal,
}

impl ErrorKind {
    /// Whether the system may be left inconsistent with the running service.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Short description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "Invalid host name",
            Self::AlreadyExists => "Host already exists",
            Self::NotFound => "Resource not found",
            Self::TemplateMissing => "Template missing",
            Self::TemplateMalformed => "Template malformed",
            Self::Io => "Filesystem error",
            Self::ServiceCommand => "Service command failed",
            Self::ResolutionStore => "Hosts file error",
            Self::Fatal => "Service reload failed",
        }
    }

    /// Actionable advice for resolving this error kind.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::InvalidInput => "Use a hostname such as 'example.test' (letters, digits, '-' and '.')",
            Self::AlreadyExists => "Destroy the existing host first or pick another name",
            Self::NotFound => "Check the host name; the host may be partially destroyed already",
            Self::TemplateMissing => "Run 'vhostctl init' or point paths.template at a template file",
            Self::TemplateMalformed => "The template must contain {{servername}} and {{serverpath}}",
            Self::Io => "Check permissions on the sites and web root directories",
            Self::ServiceCommand => "Inspect the command output above and the service logs",
            Self::ResolutionStore => "Check that the hosts file exists and is writable",
            Self::Fatal => {
                "The running service may not match the files on disk; fix the service config and reload it manually"
            }
        }
    }

    /// Stable machine-readable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::TemplateMissing => "template_missing",
            Self::TemplateMalformed => "template_malformed",
            Self::Io => "io",
            Self::ServiceCommand => "service_command",
            Self::ResolutionStore => "resolution_store",
            Self::Fatal => "fatal",
        }
    }
}

/// Errors that can occur while managing virtual hosts.
#[derive(Debug, Error)]
pub enum Error {
    /// Host name failed validation
    #[error("invalid host name '{name}': {reason}")]
    InvalidName {
        /// The rejected input
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Host is already registered
    #[error("host already exists: {name}")]
    AlreadyExists {
        /// Name of the existing host
        name: String,
    },

    /// Template file is absent
    #[error("template not found: {}", path.display())]
    TemplateMissing {
        /// Where the template was expected
        path: PathBuf,
    },

    /// Template does not contain a required placeholder
    #[error("template {} is missing placeholder {placeholder}", path.display())]
    TemplateMalformed {
        /// Template location
        path: PathBuf,
        /// The absent placeholder
        placeholder: &'static str,
    },

    /// Filesystem operation failed
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        /// What was being attempted ("write", "remove", ...)
        action: &'static str,
        /// Path the operation targeted
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Service command exited with a non-zero status
    #[error("`{command}` failed ({}): {}", status_label(*status), output.trim())]
    ServiceCommand {
        /// Command line that was run
        command: String,
        /// Exit code, `None` when killed by a signal
        status: Option<i32>,
        /// Combined stdout and stderr
        output: String,
    },

    /// Service command did not finish in time and was killed
    #[error("`{command}` timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Command line that was run
        command: String,
        /// Configured limit
        timeout: Duration,
    },

    /// Resolution store could not be loaded, edited or flushed
    #[error("hosts file {}: {message}", path.display())]
    ResolutionStore {
        /// Hosts file location
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// A plan step failed; the host may be partially changed
    #[error("{step} failed: {source}")]
    Step {
        /// Step that failed
        step: Step,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A step failed and undoing the completed steps also failed
    #[error("{source} (rollback incomplete: {})", failures.join("; "))]
    RollbackIncomplete {
        /// The step failure that triggered the rollback
        #[source]
        source: Box<Error>,
        /// One entry per compensation that failed
        failures: Vec<String>,
    },

    /// The terminal reload step failed after the host was changed
    #[error("{step} failed, service state is inconsistent: {source}")]
    Fatal {
        /// Step that failed (always the reload)
        step: Step,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },
}

fn status_label(status: Option<i32>) -> String {
    status.map_or_else(|| "killed by signal".to_string(), |code| format!("exit {code}"))
}

impl Error {
    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidName { .. } => ErrorKind::InvalidInput,
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::TemplateMissing { .. } => ErrorKind::TemplateMissing,
            Error::TemplateMalformed { .. } => ErrorKind::TemplateMalformed,
            Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            Error::Io { .. } => ErrorKind::Io,
            Error::ServiceCommand { .. } | Error::Timeout { .. } => ErrorKind::ServiceCommand,
            Error::ResolutionStore { .. } => ErrorKind::ResolutionStore,
            Error::Step { source, .. } | Error::RollbackIncomplete { source, .. } => {
                source.kind()
            }
            Error::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    /// Whether this error means the service may be running a stale config.
    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }

    /// The plan step that failed, if the error came from executing a plan.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::Step { step, .. } | Error::Fatal { step, .. } => Some(*step),
            Error::RollbackIncomplete { source, .. } => source.step(),
            _ => None,
        }
    }

    /// Captured command output, if the failure came from a service command.
    pub fn command_output(&self) -> Option<&str> {
        match self {
            Error::ServiceCommand { output, .. } => Some(output),
            Error::Step { source, .. }
            | Error::Fatal { source, .. }
            | Error::RollbackIncomplete { source, .. } => source.command_output(),
            _ => None,
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn at(self, step: Step) -> Self {
        if step.is_terminal() {
            Error::Fatal {
                step,
                source: Box::new(self),
            }
        } else {
            Error::Step {
                step,
                source: Box::new(self),
            }
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let err = Error::io(
            "remove",
            "/etc/apache2/sites-available/a.conf",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = Error::io(
            "write",
            "/etc/apache2/sites-available/a.conf",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_step_wrapping_keeps_kind() {
        let err = Error::AlreadyExists { name: "a".into() }.at(Step::WriteConfig);
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.step(), Some(Step::WriteConfig));
        assert!(err.to_string().starts_with("write config failed"));
    }

    #[test]
    fn test_reload_failure_is_fatal() {
        let err = Error::ServiceCommand {
            command: "/etc/init.d/apache2 restart".into(),
            status: Some(1),
            output: "AH00526: Syntax error".into(),
        }
        .at(Step::Reload);

        assert!(err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(err.command_output(), Some("AH00526: Syntax error"));
    }

    #[test]
    fn test_timeout_is_service_command() {
        let err = Error::Timeout {
            command: "a2ensite a".into(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.kind(), ErrorKind::ServiceCommand);
        assert_eq!(err.to_string(), "`a2ensite a` timed out after 5s");
    }

    #[test]
    fn test_signal_status_label() {
        let err = Error::ServiceCommand {
            command: "a2dissite a".into(),
            status: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("killed by signal"));
    }
}
