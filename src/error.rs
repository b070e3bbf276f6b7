//! Error type shared by every stage of the recommendation pipeline.

use thiserror::Error;

/// Failures surfaced by matrix construction, training and lookups.
///
/// Every variant is terminal for the call that produced it: there are no
/// fallback recommendations and nothing is retried.
#[derive(Debug, Error)]
pub enum RecError {
    /// Normalization was requested but no threshold was supplied.
    #[error("normalization requested without a threshold")]
    MissingThreshold,

    /// A user id is not a row label of the interaction matrix.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// An item id is absent from the item dictionary or similarity matrix.
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// A trained model does not match the shape of the matrix it is bound to.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// A training or lookup parameter is outside its valid range.
    #[error("invalid hyperparameter {param}={value}: {constraint}")]
    InvalidHyperparameter {
        param: String,
        value: String,
        constraint: String,
    },

    /// A named column is missing from a tabular input.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// A field of a tabular input could not be parsed.
    #[error("cannot parse {value:?} in column {column}")]
    Parse { column: String, value: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl RecError {
    pub(crate) fn unknown_user(id: &impl std::fmt::Debug) -> Self {
        RecError::UnknownUser(format!("{id:?}"))
    }

    pub(crate) fn unknown_item(id: &impl std::fmt::Debug) -> Self {
        RecError::UnknownItem(format!("{id:?}"))
    }

    pub(crate) fn invalid(param: &str, value: impl ToString, constraint: &str) -> Self {
        RecError::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecError>;
