//! Error types for the dialect adapter.

use thiserror::Error;

/// One structured sub-error reported by the server inside a driver error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    /// Server error number (e.g. 208 for missing object).
    pub number: i32,
    /// Server message text.
    pub message: String,
}

impl ServerMessage {
    pub fn new(number: i32, message: impl Into<String>) -> Self {
        Self {
            number,
            message: message.into(),
        }
    }
}

/// An error raised by the backend driver, carrying the server's structured
/// sub-errors when the driver exposes them.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct NativeError {
    /// Driver-level message text.
    pub message: String,
    /// Structured sub-errors, in the order the server reported them.
    pub errors: Vec<ServerMessage>,
}

impl NativeError {
    /// Create a native error with no structured sub-errors.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Create a native error with structured sub-errors.
    pub fn with_errors(message: impl Into<String>, errors: Vec<ServerMessage>) -> Self {
        Self {
            message: message.into(),
            errors,
        }
    }

    /// The numeric code of the first sub-error, if any.
    ///
    /// Classification looks only at the first sub-error; later entries in a
    /// multi-error payload are ignored.
    pub fn first_error_number(&self) -> Option<i32> {
        self.errors.first().map(|e| e.number)
    }
}

/// Main error type for adapter operations.
#[derive(Error, Debug)]
pub enum AseError {
    /// Driver binding error (no driver registered, marker missing, etc.)
    #[error("Driver binding error: {0}")]
    Binding(String),

    /// Connection string is malformed
    #[error("Connection string error: {0}")]
    ConnectionString(String),

    /// The server-side schema disagrees with the expected shape
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        message: String,
        #[source]
        source: NativeError,
    },

    /// A uniqueness or referential constraint rejected the statement
    #[error("Constraint violation executing: {statement}\n  Parameters: {parameters}")]
    ConstraintViolation {
        statement: String,
        parameters: String,
        #[source]
        source: NativeError,
    },

    /// Operation disallowed inside a multi-statement transaction
    #[error("Command is not allowed within a multi-statement transaction.")]
    UnsupportedInTransaction {
        #[source]
        source: NativeError,
    },

    /// The connection is no longer usable and has been closed
    #[error("Connection is broken: {source}")]
    ConnectionBroken {
        #[source]
        source: NativeError,
    },

    /// Opening the database failed and auto-create could not recover
    #[error("Unable to open database \"{connection_string}\"")]
    UnableToOpenDatabase {
        connection_string: String,
        #[source]
        source: NativeError,
    },

    /// The catalog reports a multi-column key; only single-column keys are supported
    #[error("Multi-column keys are not supported: {0}")]
    MultiColumnUnsupported(String),

    /// A constant or expression cannot be rendered as SQL text
    #[error("Cannot format: {0}")]
    Format(String),

    /// A portable column type has no native declaration in this dialect
    #[error("Cannot map column type: {0}")]
    TypeMapping(String),

    /// A catalog query returned a row the adapter cannot interpret
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Unclassified driver error, passed through unchanged
    #[error(transparent)]
    Native(#[from] NativeError),
}

impl AseError {
    /// Create a Binding error
    pub fn binding(message: impl Into<String>) -> Self {
        AseError::Binding(message.into())
    }

    /// Create a Catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        AseError::Catalog(message.into())
    }

    /// Whether this error means the connection must not be reused
    pub fn is_connection_broken(&self) -> bool {
        matches!(self, AseError::ConnectionBroken { .. })
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Classify a driver error by the numeric code of its first sub-error.
///
/// `statement` and `parameters` describe the statement that failed; they are
/// folded into constraint violations so the log line shows what was rejected.
/// Codes outside the dialect's table pass through as [`AseError::Native`].
///
/// Code 30046 additionally means the connection object must be closed; the
/// caller checks [`AseError::is_connection_broken`] and closes it.
pub fn classify_native(error: NativeError, statement: &str, parameters: &str) -> AseError {
    match error.first_error_number() {
        Some(208) | Some(207) => AseError::SchemaMismatch {
            message: error.message.clone(),
            source: error,
        },
        Some(2601) | Some(547) => AseError::ConstraintViolation {
            statement: statement.to_string(),
            parameters: parameters.to_string(),
            source: error,
        },
        Some(226) => AseError::UnsupportedInTransaction { source: error },
        Some(30046) => AseError::ConnectionBroken { source: error },
        _ => AseError::Native(error),
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AseError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn native(code: i32) -> NativeError {
        NativeError::with_errors(
            "server raised an error",
            vec![ServerMessage::new(code, "detail")],
        )
    }

    #[test]
    fn test_classify_missing_object_codes() {
        for code in [207, 208] {
            let err = classify_native(native(code), "select 1", "");
            assert!(matches!(err, AseError::SchemaMismatch { .. }), "code {code}");
        }
    }

    #[test]
    fn test_classify_constraint_codes_keep_statement() {
        for code in [2601, 547] {
            let err = classify_native(
                native(code),
                "insert into [T]([A])values(@p0)",
                "@p0 = 1",
            );
            match err {
                AseError::ConstraintViolation {
                    statement,
                    parameters,
                    ..
                } => {
                    assert_eq!(statement, "insert into [T]([A])values(@p0)");
                    assert_eq!(parameters, "@p0 = 1");
                }
                other => panic!("expected constraint violation for {code}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_classify_transaction_code_has_fixed_message() {
        let err = classify_native(native(226), "create table t (a int)", "");
        assert!(matches!(err, AseError::UnsupportedInTransaction { .. }));
        assert_eq!(
            err.to_string(),
            "Command is not allowed within a multi-statement transaction."
        );
    }

    #[test]
    fn test_classify_broken_connection_code() {
        let err = classify_native(native(30046), "select 1", "");
        assert!(err.is_connection_broken());
    }

    #[test]
    fn test_classify_unknown_code_passes_through() {
        let err = classify_native(native(515), "select 1", "");
        match err {
            AseError::Native(inner) => assert_eq!(inner.first_error_number(), Some(515)),
            other => panic!("expected passthrough, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_inspects_only_first_sub_error() {
        let error = NativeError::with_errors(
            "two problems",
            vec![
                ServerMessage::new(515, "first"),
                ServerMessage::new(2601, "second"),
            ],
        );
        let err = classify_native(error, "select 1", "");
        assert!(matches!(err, AseError::Native(_)));
    }

    #[test]
    fn test_classify_without_sub_errors_passes_through() {
        let err = classify_native(NativeError::new("socket reset"), "select 1", "");
        assert!(matches!(err, AseError::Native(_)));
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let err = classify_native(native(2601), "insert into [T] ...", "@p0 = 1");
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Constraint violation"));
        assert!(detailed.contains("@p0 = 1"));
        assert!(detailed.contains("Caused by:"));
        assert!(detailed.contains("server raised an error"));
    }
}
