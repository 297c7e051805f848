use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecideError {
    #[error("a trip is already in progress on card {0}")]
    TripInProgress(String),

    #[error("no trip in progress on card {0}")]
    NoTripInProgress(String),
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("domain rejected: {0}")]
    Domain(#[from] DecideError),
}
