use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::managed::BoxError;

/// Errors surfaced by the registry and by the managed resources it hands out.
///
/// None of the variants describe normal control flow: each one is a genuine
/// failure the caller has to act on.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The factory of a managed type failed. Only the caller that ran the
    /// factory sees this; the slot stays retryable.
    #[error("Construction of {type_name} failed: {source}")]
    ConstructionFailure {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },

    /// A backing resource (the audit file) could not be opened or written.
    #[error("Resource unavailable at {}: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The resource was used after its explicit shutdown.
    #[error("Resource at {} has been shut down", path.display())]
    ResourceClosed { path: PathBuf },

    /// A `SequenceGenerator` cannot advance past `i64::MAX`.
    #[error("Sequence exhausted at {current}")]
    SequenceExhausted { current: i64 },

    /// An eager registration was given a factory that needs caller arguments.
    #[error("Eager registration of {type_name} requires a no-argument factory")]
    InvalidEagerUsage { type_name: &'static str },

    #[error("Type already registered: {type_name}")]
    AlreadyRegistered { type_name: &'static str },

    #[error("Type not registered: {type_name}")]
    TypeNotRegistered { type_name: &'static str },

    /// `get` was called for a lazy type nobody has constructed yet.
    #[error("Type not constructed yet: {type_name}")]
    NotConstructed { type_name: &'static str },

    #[error("Type mismatch in registry for type: {type_name}")]
    TypeMismatch { type_name: &'static str },
}

impl RegistryError {
    /// Wraps a factory error, passing a boxed `RegistryError` through unchanged.
    pub(crate) fn from_factory(type_name: &'static str, source: BoxError) -> Self {
        match source.downcast::<RegistryError>() {
            Ok(inner) => *inner,
            Err(source) => RegistryError::ConstructionFailure { type_name, source },
        }
    }
}
