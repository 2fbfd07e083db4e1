//! Error types for VoxPool

use crate::backend::EventId;
use crate::binding::BindingId;
use thiserror::Error;

/// Failures reported by an [`AudioBackend`](crate::backend::AudioBackend).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Unknown event: {0}")]
    UnknownEvent(EventId),

    #[error("Invalid instance handle: {0}")]
    InvalidHandle(u64),

    #[error("Instance limit reached for event {0}")]
    InstanceLimit(EventId),

    #[error("Backend failure: {0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum VoxPoolError {
    /// The engine refused to create an instance while materializing a pool.
    /// Instances created earlier in the same call have already been released.
    #[error("Failed to allocate voice {index} for event {event_id}: {source}")]
    BackendAllocation {
        event_id: EventId,
        index: usize,
        #[source]
        source: BackendError,
    },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Play or stop on a binding that has already been released.
    #[error("{0} was used after it was released")]
    UseAfterRelease(BindingId),

    #[error("{0} is not registered with this manager")]
    UnknownBinding(BindingId),
}

pub type Result<T> = std::result::Result<T, VoxPoolError>;
