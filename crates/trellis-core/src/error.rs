use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid plan: {0}")]
    Plan(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}

/// Runtime failure of a single step.
///
/// This is the payload carried through columns inside an [`ErrorCell`]
/// (`crate::value::ErrorCell`): it is data, not a control-flow error, and the
/// executor never propagates it as `Err`. Engine-level faults use [`Error`]
/// (core) or the exec crate's own error enum instead.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("execution error: {0}")]
    Exec(String),

    #[error("bad input: {0}")]
    Input(String),
}

impl StepError {
    pub fn exec(msg: impl Into<String>) -> Self {
        StepError::Exec(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        StepError::Input(msg.into())
    }
}
