//! Error types for encoding and decoding.
//!
//! Errors are split in two layers:
//!
//! - [`NestingError`] covers contract violations of the writer/reader
//!   protocol (unbalanced start/end calls, missing field names, exiting past
//!   the root). These are programming bugs; the encode pass that raised one
//!   must be discarded, never resumed.
//! - [`CodecError`] is the error returned by every public operation. It wraps
//!   nesting errors and adds configuration, data-range and lookup failures.
//!   Use [`CodecError::kind`] to decide how to react.

use thiserror::Error;

use crate::types::BsonType;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A violation of the write/read nesting protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NestingError {
    /// The operation is not legal in the current state.
    #[error("cannot {operation} while in the {state} state")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// Name of the current state.
        state: &'static str,
    },

    /// A value was written inside a document without a field name.
    #[error("a field name is required before writing a value inside a document")]
    MissingName,

    /// A field name was set while another one was still pending.
    #[error("field name '{pending}' is still pending; cannot set '{name}'")]
    NameAlreadyPending {
        /// The name that is still waiting for its value.
        pending: String,
        /// The rejected name.
        name: String,
    },

    /// A document was closed while a field name was still waiting for a value.
    #[error("field name '{0}' has no value")]
    DanglingName(String),

    /// Attempted to pop past the root state.
    #[error("already at root")]
    AlreadyAtRoot,

    /// The root already holds a finished value.
    #[error("the root already holds a finished value")]
    RootAlreadyComplete,

    /// Scalars cannot be written directly at the root.
    #[error("scalar values cannot be written at the root")]
    ScalarAtRoot,

    /// The writer was finalized while levels were still open.
    #[error("{depth} level(s) are still open")]
    Incomplete {
        /// Number of open levels above the root.
        depth: usize,
    },

    /// A reader container was closed with elements left unread.
    #[error("cannot end the {container} while elements remain unread")]
    UnreadElements {
        /// The container being closed.
        container: &'static str,
    },

    /// The reader ran out of input.
    #[error("no value is available to read")]
    EndOfInput,
}

/// Broad classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller broke the writer/reader protocol.
    ContractViolation,
    /// The mapping was configured incorrectly.
    Configuration,
    /// A wire value does not fit the target type.
    Data,
    /// No codec is available for a type.
    Lookup,
    /// Internal consistency failure.
    Internal,
}

/// Errors raised while encoding or decoding values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Nesting protocol violation.
    #[error("nesting violation: {0}")]
    Nesting(#[from] NestingError),

    /// A codec was asked for a representation it cannot produce.
    #[error("{representation} is not a supported representation for {type_name}")]
    UnsupportedRepresentation {
        /// The logical type.
        type_name: &'static str,
        /// The rejected representation.
        representation: BsonType,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A value cannot be represented in the target type.
    #[error("{value} cannot be represented as {target}")]
    OutOfRange {
        /// The offending value, rendered for display.
        value: String,
        /// The target type.
        target: &'static str,
    },

    /// The reader found an unexpected element type.
    #[error("expected {expected} but found {found}")]
    UnexpectedType {
        /// What the decoder expected.
        expected: &'static str,
        /// What was on the wire.
        found: BsonType,
    },

    /// The wire value has the right type but unusable content.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// No codec is registered or provided for a type.
    #[error("no codec found for {type_name}")]
    CodecNotFound {
        /// The type that could not be resolved.
        type_name: &'static str,
    },

    /// Serde bridge error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CodecError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an out-of-range error.
    pub fn out_of_range(value: impl ToString, target: &'static str) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            target,
        }
    }

    /// Create an unexpected-type error.
    pub fn unexpected(expected: &'static str, found: BsonType) -> Self {
        Self::UnexpectedType { expected, found }
    }

    /// Create an invalid-value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Nesting(_) => ErrorKind::ContractViolation,
            Self::UnsupportedRepresentation { .. } | Self::Configuration(_) => {
                ErrorKind::Configuration
            }
            Self::OutOfRange { .. }
            | Self::UnexpectedType { .. }
            | Self::InvalidValue(_)
            | Self::Serialization(_) => ErrorKind::Data,
            Self::CodecNotFound { .. } => ErrorKind::Lookup,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is a protocol violation.
    pub fn is_contract_violation(&self) -> bool {
        self.kind() == ErrorKind::ContractViolation
    }

    /// Check if this is a configuration error.
    pub fn is_configuration_error(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Check if this is a data error.
    pub fn is_data_error(&self) -> bool {
        self.kind() == ErrorKind::Data
    }

    /// Check if this is a missing-codec error.
    pub fn is_lookup_error(&self) -> bool {
        self.kind() == ErrorKind::Lookup
    }
}

impl From<bson::ser::Error> for CodecError {
    fn from(err: bson::ser::Error) -> Self {
        CodecError::Serialization(err.to_string())
    }
}

impl From<bson::de::Error> for CodecError {
    fn from(err: bson::de::Error) -> Self {
        CodecError::Serialization(err.to_string())
    }
}

impl From<bson::oid::Error> for CodecError {
    fn from(err: bson::oid::Error) -> Self {
        CodecError::InvalidValue(format!("invalid object id: {}", err))
    }
}
