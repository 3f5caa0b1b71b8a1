use thiserror::Error;

/// Main error type for the Hypertune system
#[derive(Error, Debug)]
pub enum HtError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Result error: {0}")]
    Result(#[from] ResultError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Objective error: {0}")]
    Objective(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trial record validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Trial document is missing required field: {field}")]
    MissingField { field: String },

    #[error("Trial document expKey mismatch: store has {expected:?}, document has {actual:?}")]
    ExpKeyMismatch {
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("Length mismatch building trial documents: {ids} ids, {results} results, {args} args")]
    LengthMismatch {
        ids: usize,
        results: usize,
        args: usize,
    },

    #[error("Trial document is not a JSON object")]
    NotAnObject,

    #[error("Trial id {id} is already in the store")]
    DuplicateId { id: u64 },
}

/// Objective return-value contract errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResultError {
    #[error("Objective returned no usable result: {found}")]
    InvalidReturn { found: String },

    #[error("Invalid result status: {status}")]
    InvalidStatus { status: String },

    #[error("Result with status ok carries neither loss nor accuracy")]
    IncompleteResult,
}

/// Sampling capability errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("Capability {capability} is missing parameter: {param}")]
    MissingParam { capability: String, param: String },

    #[error("Capability {capability} parameter {param} is invalid: {message}")]
    InvalidParam {
        capability: String,
        param: String,
        message: String,
    },

    #[error("Capability {capability} failed: {message}")]
    Failed { capability: String, message: String },
}

/// Result type alias for Hypertune operations
pub type HtResult<T> = Result<T, HtError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::HtError::Config(format!($($arg)*))
    };
}
