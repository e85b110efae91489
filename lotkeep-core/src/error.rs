use thiserror::Error;

use crate::types::{ReservationId, VehicleId};

pub type Result<T> = std::result::Result<T, ReservationError>;

/// Infrastructure failure inside a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Recoverable outcomes of reservation and checkout operations.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("vehicle {0} not found")]
    VehicleNotFound(VehicleId),
    #[error("vehicle {0} is not available")]
    VehicleUnavailable(VehicleId),
    #[error("reservation '{0}' not found")]
    ReservationNotFound(ReservationId),
    #[error("reservation '{0}' expired")]
    ReservationExpired(ReservationId),
    #[error("client '{client_id}' already holds vehicle {vehicle_id}")]
    AlreadyReservedByClient {
        client_id: String,
        vehicle_id: VehicleId,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A compare-and-set lost to a concurrent transition on the same vehicle.
///
/// Internal only. Callers translate it into the `ReservationError` that fits
/// their context, or drop it when losing the race is the expected outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("vehicle {vehicle_id} was concurrently moved out of the expected state")]
pub struct TransitionLost {
    pub vehicle_id: VehicleId,
}

impl TransitionLost {
    pub fn into_unavailable(self) -> ReservationError {
        ReservationError::VehicleUnavailable(self.vehicle_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("reservation ttl must be greater than 0")]
    ZeroTtl,
    #[error("sweep interval must be greater than 0")]
    ZeroSweepInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweeperError {
    #[error("the sweeper must be started from within a tokio runtime")]
    NoRuntime,
}
