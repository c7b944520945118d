//! Registry of managed types and their single instances.
//!
//! Each registered type owns a slot. The map lock is only held to
//! find or insert a slot and is never held while a factory runs, so a slow
//! construction of one type does not delay callers of another.
//!
//! # Examples
//!
//! ```
//! use instance_registry::{CreationPolicy, Factory, InstanceRegistry, Managed};
//! use std::sync::Arc;
//!
//! struct Greeting(String);
//!
//! impl Managed for Greeting {
//!     type Args = String;
//! }
//!
//! let registry = InstanceRegistry::new();
//! registry
//!     .register::<Greeting>(CreationPolicy::Lazy, Factory::with_args(|s| Ok(Greeting(s))))
//!     .unwrap();
//!
//! let first: Arc<Greeting> = registry.get_instance("hello".to_string()).unwrap();
//! let second: Arc<Greeting> = registry.get_instance("ignored".to_string()).unwrap();
//!
//! assert!(Arc::ptr_eq(&first, &second));
//! assert_eq!(second.0, "hello");
//! ```

use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use crate::managed::{Factory, Managed};
use crate::slot::{Instance, InstanceSlot, SlotState};
use crate::{CreationPolicy, RegistryError, RegistryEvent};

/// Type alias for the user-supplied tracing callback.
///
/// The callback receives a reference to a `RegistryEvent` every time the registry is
/// interacted with. It must be thread-safe because the registry itself is shared.
pub type TraceCallback = dyn Fn(&RegistryEvent) + Send + Sync + 'static;

/// Maps managed types to their single instance.
///
/// For every registered type at most one construction ever succeeds, no matter
/// how many threads ask for it or with which arguments.
#[derive(Default)]
pub struct InstanceRegistry {
    slots: RwLock<HashMap<TypeId, Arc<InstanceSlot>>>,
    /// Types whose registration is in progress. Locked after `slots` when both are held.
    reserved: Mutex<HashSet<TypeId>>,
    trace: Mutex<Option<Arc<TraceCallback>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------------------------------
    // Tracing
    // ---------------------------------------------------------------------------------------------

    /// Sets a tracing callback invoked on every registry interaction.
    ///
    /// The callback runs without any registry lock held, so it may call back
    /// into this registry.
    pub fn set_trace_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(Arc::new(callback));
    }

    /// Clears the tracing callback.
    pub fn clear_trace_callback(&self) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    fn emit_event(&self, event: &RegistryEvent) {
        let callback = self
            .trace
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------------------------------

    /// Registers `T` under `policy`.
    ///
    /// An eager registration runs the factory before returning and requires a
    /// [`Factory::Default`]; a factory that needs arguments is rejected with
    /// [`RegistryError::InvalidEagerUsage`]. The eager instance is built with no
    /// registry lock held and the type only becomes visible once it is `Ready`.
    /// If an eager factory fails the type is left unregistered.
    ///
    /// # Errors
    ///
    /// - `AlreadyRegistered` if `T` already has a slot or is being registered
    /// - `InvalidEagerUsage` for an eager registration with a `WithArgs` factory
    /// - the eager factory's error
    pub fn register<T: Managed>(
        &self,
        policy: CreationPolicy,
        factory: Factory<T>,
    ) -> Result<(), RegistryError> {
        let type_name = type_name::<T>();

        if policy == CreationPolicy::Eager && factory.requires_args() {
            return Err(RegistryError::InvalidEagerUsage { type_name });
        }

        let reservation = self.reserve(TypeId::of::<T>(), type_name)?;

        let slot = match policy {
            CreationPolicy::Lazy => InstanceSlot::lazy(Box::new(factory)),
            CreationPolicy::Eager => {
                let instance = self.construct_eager(&factory)?;
                InstanceSlot::ready(policy, Box::new(factory), instance)
            }
        };

        self.slots
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(reservation.key, Arc::new(slot));
        drop(reservation);

        tracing::debug!(type_name, %policy, "registered managed type");
        self.emit_event(&RegistryEvent::Register { type_name, policy });
        if policy == CreationPolicy::Eager {
            self.emit_event(&RegistryEvent::Construct { type_name });
        }

        Ok(())
    }

    /// Registers `T` lazily with a factory that consumes the first caller's arguments.
    pub fn register_lazy<T: Managed>(
        &self,
        factory: impl Fn(T::Args) -> crate::FactoryResult<T> + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        self.register(CreationPolicy::Lazy, Factory::with_args(factory))
    }

    /// Registers `T` eagerly, constructing it now with `factory`.
    pub fn register_eager<T: Managed>(
        &self,
        factory: impl Fn() -> crate::FactoryResult<T> + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        self.register(CreationPolicy::Eager, Factory::no_args(factory))
    }

    // ---------------------------------------------------------------------------------------------
    // Retrieval
    // ---------------------------------------------------------------------------------------------

    /// Returns the single instance of `T`, constructing it from `args` if this
    /// is the first successful request for a lazy type.
    ///
    /// `args` are dropped whenever the instance already exists, and always for
    /// eager types.
    ///
    /// # Errors
    ///
    /// - `TypeNotRegistered` if `T` was never registered
    /// - the factory's error, for this caller only; the next call retries
    pub fn get_instance<T: Managed>(&self, args: T::Args) -> Result<Arc<T>, RegistryError> {
        let type_name = type_name::<T>();

        let result = match self.slot::<T>() {
            None => Err(RegistryError::TypeNotRegistered { type_name }),
            Some(slot) => match slot.published() {
                Some(instance) => {
                    tracing::trace!(type_name, "instance already constructed");
                    Ok(instance)
                }
                // Eager slots are inserted `Ready`; never build one from caller args.
                None if slot.policy() == CreationPolicy::Eager => {
                    Err(RegistryError::NotConstructed { type_name })
                }
                None => self.construct::<T>(&slot, Some(args)),
            },
        };

        let result = result.and_then(downcast::<T>);

        self.emit_event(&RegistryEvent::Get {
            type_name,
            found: result.is_ok(),
        });

        result
    }

    /// Returns the instance of `T` only if it has already been constructed.
    ///
    /// # Errors
    ///
    /// - `TypeNotRegistered` if `T` was never registered
    /// - `NotConstructed` if `T` is lazy and nobody has requested it yet
    pub fn get<T: Managed>(&self) -> Result<Arc<T>, RegistryError> {
        let type_name = type_name::<T>();

        let result = match self.slot::<T>() {
            None => Err(RegistryError::TypeNotRegistered { type_name }),
            Some(slot) => slot
                .published()
                .ok_or(RegistryError::NotConstructed { type_name })
                .and_then(downcast::<T>),
        };

        self.emit_event(&RegistryEvent::Get {
            type_name,
            found: result.is_ok(),
        });

        result
    }

    /// Checks whether `T` is registered.
    pub fn contains<T: Managed>(&self) -> bool {
        let found = self.slot::<T>().is_some();

        self.emit_event(&RegistryEvent::Contains {
            type_name: type_name::<T>(),
            found,
        });

        found
    }

    /// Returns the policy `T` was registered with.
    pub fn policy<T: Managed>(&self) -> Option<CreationPolicy> {
        self.slot::<T>().map(|slot| slot.policy())
    }

    /// Returns the construction state of `T`.
    pub fn state<T: Managed>(&self) -> Option<SlotState> {
        self.slot::<T>().map(|slot| slot.state())
    }

    // ---------------------------------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------------------------------

    fn slot<T: Managed>(&self) -> Option<Arc<InstanceSlot>> {
        self.slots
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&TypeId::of::<T>())
            .cloned()
    }

    /// Claims `key` for a registration in progress.
    ///
    /// Fails if `key` already has a slot or another registration holds it, so
    /// two racing eager registrations never both run their factory.
    fn reserve(
        &self,
        key: TypeId,
        type_name: &'static str,
    ) -> Result<Reservation<'_>, RegistryError> {
        let slots = self.slots.write().unwrap_or_else(|p| p.into_inner());
        let mut reserved = self.reserved.lock().unwrap_or_else(|p| p.into_inner());
        if slots.contains_key(&key) || !reserved.insert(key) {
            return Err(RegistryError::AlreadyRegistered { type_name });
        }
        Ok(Reservation {
            reserved: &self.reserved,
            key,
        })
    }

    /// Builds an eager instance before its slot exists.
    fn construct_eager<T: Managed>(
        &self,
        factory: &Factory<T>,
    ) -> Result<Instance, RegistryError> {
        let type_name = type_name::<T>();

        match factory.build(None) {
            Ok(instance) => {
                tracing::debug!(type_name, policy = "eager", "constructed instance");
                Ok(Arc::new(instance) as Instance)
            }
            Err(source) => {
                let err = RegistryError::from_factory(type_name, source);
                tracing::warn!(type_name, error = %err, "construction failed");
                self.emit_event(&RegistryEvent::ConstructFailed { type_name });
                Err(err)
            }
        }
    }

    /// Runs a lazy slot's factory unless another caller already has.
    fn construct<T: Managed>(
        &self,
        slot: &InstanceSlot,
        args: Option<T::Args>,
    ) -> Result<Instance, RegistryError> {
        let type_name = type_name::<T>();
        let mut constructed = false;

        let result = slot.get_or_try_init(|| {
            let factory = slot
                .factory()
                .downcast_ref::<Factory<T>>()
                .ok_or(RegistryError::TypeMismatch { type_name })?;
            let instance = factory
                .build(args)
                .map_err(|source| RegistryError::from_factory(type_name, source))?;
            constructed = true;
            Ok(Arc::new(instance) as Instance)
        });

        match &result {
            Ok(_) if constructed => {
                tracing::debug!(type_name, policy = %slot.policy(), "constructed instance");
                self.emit_event(&RegistryEvent::Construct { type_name });
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(type_name, error = %err, "construction failed");
                self.emit_event(&RegistryEvent::ConstructFailed { type_name });
            }
        }

        result
    }
}

/// Releases a registration claim on drop, including on error or panic.
struct Reservation<'a> {
    reserved: &'a Mutex<HashSet<TypeId>>,
    key: TypeId,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.reserved
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
    }
}

fn downcast<T: Managed>(instance: Instance) -> Result<Arc<T>, RegistryError> {
    instance
        .downcast::<T>()
        .map_err(|_| RegistryError::TypeMismatch {
            type_name: type_name::<T>(),
        })
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
