//! Domain-specific error types for rsmachine.
//!
//! This module defines `RsmachineError`, a `thiserror`-based enum that
//! provides typed error variants for common failure modes. Public API
//! functions return `Result<T, RsmachineError>` for programmatic error
//! handling, while trait boundaries (executors, command channels,
//! provisioners, configurers) continue to use `anyhow::Result`.
//!
//! `RsmachineError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at trait boundaries that return `anyhow::Result`.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent, user-friendly messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)"). For unrecognized
/// error kinds, falls back to including the OS-level error message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for rsmachine.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RsmachineError {
    /// A validation constraint was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// A local command could not be found in PATH.
    #[error("command not found in PATH: {command}")]
    CommandNotFound {
        /// The command that was looked up.
        command: String,
    },

    /// A command execution failed (non-zero exit, spawn failure, transport failure, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Human-readable reason for the failure: exit code, signal information,
        /// or a description of the internal error.
        status: String,
    },

    /// The OS identification probe could not be executed on the remote host.
    #[error("OS detection probe failed: {0}")]
    Probe(String),

    /// No registered provisioner accepted the detected OS.
    #[error("no compatible provisioner found for OS id '{id}'")]
    NoCompatibleProvisioner {
        /// The `ID` field reported by the remote os-release file.
        id: String,
    },

    /// A bounded wait ran out of attempts or hit its deadline.
    #[error("maximum number of retries ({attempts}) exceeded")]
    Timeout {
        /// Number of probe attempts performed before giving up.
        attempts: usize,
    },

    /// The daemon configuration template could not be rendered.
    #[error("template render error: {0}")]
    Render(String),

    /// A configuration file could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred (usually a path).
        context: String,
        /// Human-readable description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error, preserved for programmatic inspection.
        #[source]
        source: std::io::Error,
    },
}

impl RsmachineError {
    /// Creates an `Io` variant with the `message` field automatically derived
    /// from the `source` via [`io_error_kind_message`].
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }
}

impl From<tera::Error> for RsmachineError {
    fn from(err: tera::Error) -> Self {
        // tera keeps the useful detail in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        Self::Render(message)
    }
}
