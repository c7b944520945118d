//! Managed resources built on the registry.
//!
//! Both types guard their own state with a private lock and never call back
//! into a registry, so an instance lock is never held while waiting on a
//! construction lock.

mod audit;
mod sequence;

pub use audit::{AuditConfig, AuditLogger};
pub use sequence::{SequenceConfig, SequenceGenerator, SequenceMode};
