use crate::seat::SeatPosition;

/// Every way a reservation or query can fail.
///
/// `Validation`, `NotFound` and `AlreadyReserved` are caller faults and
/// should not be retried unchanged. `TransientFailure` is safe to retry with
/// the identical request.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("{0}")]
    Validation(String),

    #[error("seat {0} does not exist")]
    NotFound(SeatPosition),

    #[error("seat {0} is already reserved")]
    AlreadyReserved(SeatPosition),

    #[error("reservation failed transiently, please retry")]
    TransientFailure,

    #[error("seat store unavailable: {0:#}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for ReservationError {
    fn from(err: anyhow::Error) -> Self {
        ReservationError::Store(err)
    }
}

impl ReservationError {
    pub fn validation(message: impl Into<String>) -> Self {
        ReservationError::Validation(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReservationError::Validation(_) => "validation_error",
            ReservationError::NotFound(_) => "not_found",
            ReservationError::AlreadyReserved(_) => "already_reserved",
            ReservationError::TransientFailure => "transient_failure",
            ReservationError::Store(_) => "store_unavailable",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::TransientFailure)
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
