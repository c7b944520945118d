//! # Instance Registry
//!
//! Singleton instantiation control: a registry guarantees that at most one
//! instance of each *managed type* is ever successfully constructed, under one
//! of two creation policies.
//!
//! - [`CreationPolicy::Lazy`]: built by the first [`get_instance`](InstanceRegistry::get_instance)
//!   call, from that caller's arguments. Concurrent first callers block until the
//!   winner finishes; later arguments are dropped. A failed construction is
//!   handed back to its caller and retried by the next one.
//! - [`CreationPolicy::Eager`]: built during registration from a no-argument
//!   factory. Arguments passed to `get_instance` are dropped.
//!
//! ## Quick Start
//!
//! ```rust
//! use instance_registry::{global, SequenceConfig, SequenceGenerator};
//!
//! global::register(
//!     instance_registry::CreationPolicy::Lazy,
//!     SequenceGenerator::factory(),
//! )
//! .unwrap();
//!
//! let seq = global::get_instance::<SequenceGenerator>(SequenceConfig::starting_at(10)).unwrap();
//! assert_eq!(seq.get_next_number().unwrap(), 10);
//!
//! // Same instance; the new start value is ignored.
//! let again = global::get_instance::<SequenceGenerator>(SequenceConfig::starting_at(99)).unwrap();
//! assert_eq!(again.get_next_number().unwrap(), 11);
//! ```
//!
//! ## Global state
//!
//! [`global`] is the process-wide registry. It is created on first use and
//! lives until the process exits; there is no teardown API. Eager types are
//! registered by an explicit bootstrap step at startup, before any lookup.
//! Further isolated registries can be created with [`define_registry!`] or as
//! plain [`InstanceRegistry`] values.

#[macro_use]
mod macros;
mod managed;
mod policy;
mod registry;
mod registry_error;
mod registry_event;
mod registry_trait;
pub mod resources;
mod slot;

pub use managed::{BoxError, Factory, FactoryResult, Managed};
pub use policy::CreationPolicy;
pub use registry::{InstanceRegistry, TraceCallback};
pub use registry_error::RegistryError;
pub use registry_event::RegistryEvent;
pub use registry_trait::RegistryApi;
pub use resources::{
    AuditConfig, AuditLogger, SequenceConfig, SequenceGenerator, SequenceMode,
};
pub use slot::SlotState;

define_registry!(global);
