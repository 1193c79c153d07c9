//! Error types for building aggregation stages.

use bsonkit_codec::CodecError;
use thiserror::Error;

/// Result type for stage builders.
pub type AggregationResult<T> = Result<T, AggregationError>;

/// Errors raised while a stage is being configured.
///
/// These are caller bugs detected before anything is encoded. Converting one
/// into a [`CodecError`] yields a configuration error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    /// A projection mixed inclusions with exclusions other than `_id`.
    #[error("projection cannot exclude '{field}' while including other fields")]
    MixedProjection {
        /// The field whose addition made the projection invalid.
        field: String,
    },

    /// A replacement stage mixed a whole-document expression with fields.
    #[error("{stage} cannot mix a replacement expression with individual fields")]
    MixedModes {
        /// The stage operator.
        stage: &'static str,
    },

    /// A stage argument is out of its legal domain.
    #[error("invalid {stage} stage: {message}")]
    InvalidStage {
        /// The stage operator.
        stage: &'static str,
        /// What is wrong.
        message: String,
    },

    /// Codec error.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl AggregationError {
    /// Create an invalid-stage error.
    pub fn invalid_stage(stage: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidStage {
            stage,
            message: message.into(),
        }
    }

    /// Check if this is a projection conflict.
    pub fn is_mixed_projection(&self) -> bool {
        matches!(self, Self::MixedProjection { .. })
    }

    /// Check if this is a replacement-mode conflict.
    pub fn is_mixed_modes(&self) -> bool {
        matches!(self, Self::MixedModes { .. })
    }
}

impl From<AggregationError> for CodecError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::Codec(e) => e,
            other => CodecError::config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let err = AggregationError::MixedProjection {
            field: "b".to_string(),
        };
        assert!(err.is_mixed_projection());
        assert_eq!(
            err.to_string(),
            "projection cannot exclude 'b' while including other fields"
        );

        let err = AggregationError::invalid_stage("$limit", "must be positive");
        assert_eq!(err.to_string(), "invalid $limit stage: must be positive");
    }

    #[test]
    fn test_into_codec_error() {
        let err: CodecError = AggregationError::MixedModes {
            stage: "$replaceRoot",
        }
        .into();
        assert!(err.is_configuration_error());

        let inner = CodecError::CodecNotFound { type_name: "Foo" };
        let err: CodecError = AggregationError::from(inner.clone()).into();
        assert_eq!(err, inner);
    }
}
