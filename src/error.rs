//! Error types for land-registry

use thiserror::Error;

use crate::models::ParcelStatus;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Parcel not found: {0}")]
    NotFound(u64),

    #[error("Parcel {id} is not owned by the given wallet")]
    NotOwner { id: u64 },

    #[error("Parcel {id} is {status}, cannot {action}")]
    InvalidState {
        id: u64,
        status: ParcelStatus,
        action: &'static str,
    },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: ParcelStatus, to: ParcelStatus },

    #[error("Parcel id space exhausted")]
    IdSpaceExhausted,

    #[error("Unknown council member: {0}")]
    UnknownCouncilMember(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain error: {0}")]
    Chain(String),
}

impl RegistryError {
    /// True for the not-found case, which callers commonly treat as a no-op
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}
