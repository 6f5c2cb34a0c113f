//! Error handling module for phase-timers.

use thiserror::Error;

use crate::alarm::MAX_PERIOD;

/// Custom error type for timer operations.
#[derive(Error, Debug)]
pub enum TimerError {
    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A timer was constructed outside of a tokio runtime.
    #[error("Timers must be created from within a tokio runtime.")]
    NoRuntime,

    /// Callback execution failed.
    #[error("Callback execution failed: {0}")]
    CallbackError(String),
}

pub(crate) fn ensure_period(period: std::time::Duration) -> Result<(), TimerError> {
    if period.is_zero() {
        return Err(TimerError::InvalidParameter(
            "Interval must be greater than zero.".into(),
        ));
    }
    if period > MAX_PERIOD {
        return Err(TimerError::InvalidParameter(format!(
            "Interval must not exceed {MAX_PERIOD:?}."
        )));
    }
    Ok(())
}
