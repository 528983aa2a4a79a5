//! Error types for the thyrosim crate.
//!
//! Each module has its own error enum; [`ThyrosimError`] aggregates them for
//! callers that want a single error type at the API boundary. Errors are
//! never recovered silently inside the model or the integration driver.

use thiserror::Error;

/// Top-level error type aggregating all module errors.
#[derive(Error, Debug)]
pub enum ThyrosimError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A derivative component evaluated to NaN or infinity.
///
/// The only error a derivative evaluation can raise; keeping it a distinct
/// type lets the integration driver match on it exhaustively.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("derivative component {index} is not finite at t = {time}")]
pub struct NonFiniteDerivative {
    pub index: usize,
    pub time: f64,
}

/// Errors raised by parameter construction or a derivative evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error(transparent)]
    NonFiniteDerivative(#[from] NonFiniteDerivative),

    /// A kinetic constant, dial, or infusion rate is NaN or infinite.
    #[error("parameter `{name}` is not finite")]
    NonFiniteParameter { name: &'static str },
}

/// Errors raised by the integration driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    /// The adaptive step size fell below the configured minimum without
    /// satisfying the error tolerance.
    #[error("step size fell below the configured minimum at t = {time}")]
    StepSizeUnderflow { time: f64 },

    /// A derivative evaluation produced a non-finite component, so the
    /// state can no longer be advanced.
    #[error("state became non-finite at t = {time} (derivative component {index})")]
    NonFiniteState { time: f64, index: usize },

    /// The stepper exhausted its step budget before reaching the end of
    /// the requested time window.
    #[error("step limit reached at t = {time} after {steps} steps")]
    StepLimitReached { time: f64, steps: u32 },

    /// The stepper's stiffness heuristic triggered.
    #[error("problem appears stiff at t = {time}")]
    StiffnessDetected { time: f64 },
}

/// Errors raised while ingesting a parameter file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The parameter file does not exist.
    #[error("parameter file not found: {path}")]
    FileNotFound { path: String },

    /// A required parameter key is absent from the file.
    #[error("missing parameter key `{key}`")]
    MissingKey { key: String },

    /// The file exists but could not be parsed.
    #[error("malformed parameter file: {0}")]
    Parse(#[from] config::ConfigError),

    /// A JSON parameter blob could not be deserialized.
    #[error("malformed parameter JSON: {0}")]
    Json(#[from] serde_json::Error),
}
