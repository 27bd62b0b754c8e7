//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. Errors that
//! originate in the Python runtime keep the original exception so it can be
//! re-raised unchanged at the callback boundary.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the tracepoint bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// A compiled unit is missing an attribute or it has the wrong shape.
    #[error("malformed compiled unit: `{attribute}` {reason}")]
    Metadata {
        attribute: &'static str,
        reason: String,
    },

    /// A payload value could not produce its printable form.
    #[error("repr unavailable: {0}")]
    Repr(String),

    /// The monitoring facility rejected a registration step.
    #[error("monitoring rejected {operation}: {reason}")]
    Monitoring {
        operation: &'static str,
        reason: String,
    },

    /// Registration was attempted a second time in this process.
    #[error("monitoring already registered under tool id {0}")]
    AlreadyRegistered(u8),

    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Exception raised by the Python runtime, kept intact for re-raising.
    #[cfg(feature = "python")]
    #[error("python error: {0}")]
    Python(#[from] pyo3::PyErr),
}

// Convenience constructors
impl Error {
    pub fn metadata(attribute: &'static str, reason: impl Into<String>) -> Self {
        Self::Metadata {
            attribute,
            reason: reason.into(),
        }
    }

    pub fn repr(msg: impl Into<String>) -> Self {
        Self::Repr(msg.into())
    }

    pub fn monitoring(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Monitoring {
            operation,
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(feature = "python")]
impl Error {
    /// Convert to a Python exception.
    ///
    /// A wrapped runtime exception is handed back as-is so the interpreter
    /// sees the error it originally raised.
    pub fn into_py_err(self) -> pyo3::PyErr {
        match self {
            Error::Python(err) => err,
            other => pyo3::exceptions::PyRuntimeError::new_err(other.to_string()),
        }
    }
}

// Implement From<Error> for PyErr to enable ? operator in pyfunctions
#[cfg(feature = "python")]
impl From<Error> for pyo3::PyErr {
    fn from(err: Error) -> Self {
        err.into_py_err()
    }
}
