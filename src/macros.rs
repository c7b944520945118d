//! Macros for creating singleton registries.
//!
//! This module provides a simple macro-based approach to create a named,
//! process-wide registry with free functions delegating to it.

/// Creates a complete process-wide registry with a single macro invocation.
///
/// The macro generates a module containing:
/// - The registry static (hidden), created on first use
/// - An `Api` struct that implements `RegistryApi`
/// - Free functions for every registry operation
///
/// The registry lives until process exit; there is no teardown.
///
/// # Examples
///
/// ```rust
/// use instance_registry::{define_registry, Managed};
/// use std::sync::Arc;
///
/// struct Greeting(String);
///
/// impl Managed for Greeting {
///     type Args = String;
/// }
///
/// define_registry!(app);
///
/// app::register_lazy::<Greeting>(|s| Ok(Greeting(s))).unwrap();
///
/// let first: Arc<Greeting> = app::get_instance("hello".to_string()).unwrap();
/// let second: Arc<Greeting> = app::get_instance("bye".to_string()).unwrap();
/// assert_eq!(second.0, "hello");
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
///
/// # Multiple Registries
///
/// Each invocation creates an isolated registry:
///
/// ```rust
/// use instance_registry::{define_registry, Managed};
///
/// struct Pool(u32);
///
/// impl Managed for Pool {
///     type Args = u32;
/// }
///
/// define_registry!(database);
/// define_registry!(cache);
///
/// database::register_lazy::<Pool>(|n| Ok(Pool(n))).unwrap();
///
/// assert!(database::contains::<Pool>());
/// assert!(!cache::contains::<Pool>());
/// ```
#[macro_export]
macro_rules! define_registry {
    ($name:ident) => {
        pub mod $name {
            use std::sync::{Arc, LazyLock};

            use $crate::{
                CreationPolicy, Factory, FactoryResult, InstanceRegistry, Managed, RegistryError,
                RegistryEvent, SlotState,
            };

            static REGISTRY: LazyLock<InstanceRegistry> = LazyLock::new(InstanceRegistry::new);

            /// Zero-sized type that implements the registry API.
            pub struct Api;

            impl $crate::RegistryApi for Api {
                fn registry() -> &'static InstanceRegistry {
                    &REGISTRY
                }
            }

            /// Convenient constant for accessing the registry API.
            pub const API: Api = Api;

            /// Register `T` under `policy`.
            pub fn register<T: Managed>(
                policy: CreationPolicy,
                factory: Factory<T>,
            ) -> Result<(), RegistryError> {
                REGISTRY.register(policy, factory)
            }

            /// Register `T` lazily.
            pub fn register_lazy<T: Managed>(
                factory: impl Fn(T::Args) -> FactoryResult<T> + Send + Sync + 'static,
            ) -> Result<(), RegistryError> {
                REGISTRY.register_lazy(factory)
            }

            /// Register `T` eagerly, constructing it now.
            pub fn register_eager<T: Managed>(
                factory: impl Fn() -> FactoryResult<T> + Send + Sync + 'static,
            ) -> Result<(), RegistryError> {
                REGISTRY.register_eager(factory)
            }

            /// Get the single instance of `T`, constructing it from `args` on first use.
            pub fn get_instance<T: Managed>(args: T::Args) -> Result<Arc<T>, RegistryError> {
                REGISTRY.get_instance(args)
            }

            /// Get the instance of `T` if it was already constructed.
            pub fn get<T: Managed>() -> Result<Arc<T>, RegistryError> {
                REGISTRY.get()
            }

            /// Check if a type is registered.
            pub fn contains<T: Managed>() -> bool {
                REGISTRY.contains::<T>()
            }

            pub fn policy<T: Managed>() -> Option<CreationPolicy> {
                REGISTRY.policy::<T>()
            }

            pub fn state<T: Managed>() -> Option<SlotState> {
                REGISTRY.state::<T>()
            }

            /// Set a tracing callback for registry operations.
            pub fn set_trace_callback(
                callback: impl Fn(&RegistryEvent) + Send + Sync + 'static,
            ) {
                REGISTRY.set_trace_callback(callback)
            }

            /// Clear the tracing callback.
            pub fn clear_trace_callback() {
                REGISTRY.clear_trace_callback()
            }
        }
    };
}
