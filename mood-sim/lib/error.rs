//! Error types for the simulation pipeline.

use thiserror::Error;

/// Errors produced while validating inputs or integrating the master
/// equation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// A scalar input lies outside its documented domain.
    #[error("{field} = {value} is out of range: {reason}")]
    InputOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Human-readable description of the admissible domain.
        reason: &'static str,
    },

    /// More triggers than a single run accepts.
    #[error("at most 5 triggers are supported, got {0}")]
    TooManyTriggers(usize),

    /// The integrator could not advance the state.
    #[error("integration failed at t = {t}: {reason}")]
    IntegrationFailure {
        /// Time reached when the failure occurred.
        t: f64,
        /// What went wrong.
        reason: String,
    },

    /// The integrator exceeded its wall-clock budget.
    #[error("integration timed out at t = {t} after {elapsed:?}")]
    Timeout {
        /// Time reached when the budget ran out.
        t: f64,
        /// Wall-clock time spent.
        elapsed: std::time::Duration,
    },

    /// A run file could not be read.
    #[error("could not read run file: {0}")]
    Io(#[from] std::io::Error),

    /// A run file could not be parsed.
    #[error("invalid run file: {0}")]
    Config(#[from] toml::de::Error),
}

impl SimError {
    pub(crate) fn out_of_range(
        field: &'static str,
        value: f64,
        reason: &'static str,
    ) -> Self
    {
        Self::InputOutOfRange { field, value, reason }
    }
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
