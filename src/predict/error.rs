use thiserror::Error;

#[derive(Debug, Error)]
pub enum TleError {
    #[error("line {0} is too short")]
    ShortLine(u8),
    #[error("line {line} does not start with \"{line} \"")]
    BadMarker { line: u8 },
    #[error("invalid catalog number: {0:?}")]
    CatalogNumber(String),
    #[error("invalid mean motion: {0:?}")]
    MeanMotion(String),
}

/// Failure to turn an element set into a position. Callers treat the satellite as
/// unavailable for the instant, never as fatal for the whole catalog.
#[derive(Debug, Clone, Error)]
pub enum PropagationError {
    #[error("invalid elements: {0}")]
    Elements(String),
    #[error("epoch out of range: {0}")]
    Epoch(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("non-finite state vector")]
    NonFinite,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("horizon must be a finite, non-negative number of hours (got {0})")]
    InvalidHorizon(f64),
    #[error("horizon of {hours} hours exceeds the limit of {max} hours")]
    HorizonTooLong { hours: f64, max: f64 },
    #[error("step must be positive")]
    InvalidStep,
    #[error("prediction aborted")]
    Aborted,
    #[error("propagation error: {0}")]
    Propagation(#[from] PropagationError),
}
