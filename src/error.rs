use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(StoreError),
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing { id } => DispatchError::NotFound(format!("record {id} not found")),
            StoreError::VersionConflict { id } => {
                DispatchError::Conflict(format!("record {id} changed under the caller"))
            }
            other => DispatchError::StoreUnavailable(other),
        }
    }
}
