//! Core trait giving a `'static` registry its calling surface.
//!
//! Implementors only provide [`RegistryApi::registry`]; every operation is a
//! default method delegating to the [`InstanceRegistry`] it returns. This is
//! the seam the `define_registry!` macro builds on, and what hand-written
//! registries implement directly.

use std::sync::Arc;

use crate::{
    CreationPolicy, Factory, FactoryResult, InstanceRegistry, Managed, RegistryError,
    RegistryEvent, SlotState,
};

/// Core trait defining registry behavior.
pub trait RegistryApi {
    /// Access the registry static.
    ///
    /// The registry must live for the whole process: instances it hands out are
    /// never torn down before exit.
    fn registry() -> &'static InstanceRegistry;

    // -------------------------------------------------------------------------------------------------
    // Tracing
    // -------------------------------------------------------------------------------------------------

    /// Set a tracing callback for registry operations.
    fn set_trace_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        Self::registry().set_trace_callback(callback);
    }

    /// Clear the tracing callback.
    fn clear_trace_callback(&self) {
        Self::registry().clear_trace_callback();
    }

    // -------------------------------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------------------------------

    /// Register `T` under `policy`. See [`InstanceRegistry::register`].
    fn register<T: Managed>(
        &self,
        policy: CreationPolicy,
        factory: Factory<T>,
    ) -> Result<(), RegistryError> {
        Self::registry().register(policy, factory)
    }

    /// Register `T` lazily.
    fn register_lazy<T: Managed>(
        &self,
        factory: impl Fn(T::Args) -> FactoryResult<T> + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        Self::registry().register_lazy(factory)
    }

    /// Register `T` eagerly, constructing it now.
    fn register_eager<T: Managed>(
        &self,
        factory: impl Fn() -> FactoryResult<T> + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        Self::registry().register_eager(factory)
    }

    /// Get the single instance of `T`, constructing it from `args` on first use.
    fn get_instance<T: Managed>(&self, args: T::Args) -> Result<Arc<T>, RegistryError> {
        Self::registry().get_instance(args)
    }

    /// Get the instance of `T` if it was already constructed.
    fn get<T: Managed>(&self) -> Result<Arc<T>, RegistryError> {
        Self::registry().get()
    }

    /// Check if a type is registered.
    fn contains<T: Managed>(&self) -> bool {
        Self::registry().contains::<T>()
    }

    fn policy<T: Managed>(&self) -> Option<CreationPolicy> {
        Self::registry().policy::<T>()
    }

    fn state<T: Managed>(&self) -> Option<SlotState> {
        Self::registry().state::<T>()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
