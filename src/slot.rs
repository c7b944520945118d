//! Per-type storage cell implementing the construction state machine.
//!
//! A slot moves `Uninitialized -> Constructing -> Ready`. `Ready` is terminal.
//! A failed or panicking construction moves it back to `Uninitialized` so the
//! next caller retries.
//!
//! Readers take the lock-free path once the slot is `Ready`: the state is
//! loaded with `Acquire`, pairing with the `Release` store made after the
//! value was published, so a reader that sees `Ready` also sees the fully
//! built value. Only the race window goes through the construction mutex,
//! and every slot has its own mutex.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::CreationPolicy;

/// Type-erased singleton instance as stored by the registry.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

/// Type-erased `Factory<T>`.
pub(crate) type ErasedFactory = Box<dyn Any + Send + Sync>;

const UNINITIALIZED: u8 = 0;
const CONSTRUCTING: u8 = 1;
const READY: u8 = 2;

/// Observable construction state of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninitialized,
    Constructing,
    Ready,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Uninitialized => write!(f, "uninitialized"),
            SlotState::Constructing => write!(f, "constructing"),
            SlotState::Ready => write!(f, "ready"),
        }
    }
}

pub(crate) struct InstanceSlot {
    policy: CreationPolicy,
    factory: ErasedFactory,
    construct: Mutex<()>,
    state: AtomicU8,
    value: OnceLock<Instance>,
}

impl InstanceSlot {
    /// A slot that constructs on first request.
    pub(crate) fn lazy(factory: ErasedFactory) -> Self {
        Self {
            policy: CreationPolicy::Lazy,
            factory,
            construct: Mutex::new(()),
            state: AtomicU8::new(UNINITIALIZED),
            value: OnceLock::new(),
        }
    }

    /// A slot holding an instance built before the slot was published.
    pub(crate) fn ready(
        policy: CreationPolicy,
        factory: ErasedFactory,
        instance: Instance,
    ) -> Self {
        Self {
            policy,
            factory,
            construct: Mutex::new(()),
            state: AtomicU8::new(READY),
            value: OnceLock::from(instance),
        }
    }

    pub(crate) fn policy(&self) -> CreationPolicy {
        self.policy
    }

    pub(crate) fn factory(&self) -> &(dyn Any + Send + Sync) {
        self.factory.as_ref()
    }

    pub(crate) fn state(&self) -> SlotState {
        match self.state.load(Ordering::Acquire) {
            READY => SlotState::Ready,
            CONSTRUCTING => SlotState::Constructing,
            _ => SlotState::Uninitialized,
        }
    }

    /// Returns the instance if construction has completed. Never blocks.
    pub(crate) fn published(&self) -> Option<Instance> {
        if self.state.load(Ordering::Acquire) == READY {
            self.value.get().cloned()
        } else {
            None
        }
    }

    /// Returns the instance, running `init` if nobody has built it yet.
    ///
    /// At most one `init` runs at a time per slot; callers that lose the race
    /// block on the construction mutex and then observe the published value.
    /// An `init` error is handed to this caller only and leaves the slot
    /// retryable.
    pub(crate) fn get_or_try_init<E>(
        &self,
        init: impl FnOnce() -> Result<Instance, E>,
    ) -> Result<Instance, E> {
        if let Some(value) = self.published() {
            return Ok(value);
        }

        // A panicking factory poisons the mutex; the guard below has already
        // rolled the state back by then, so the poison carries no meaning.
        let _lock = self.construct.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(value) = self.published() {
            return Ok(value);
        }

        self.state.store(CONSTRUCTING, Ordering::Release);
        let rollback = Rollback {
            state: &self.state,
            armed: true,
        };

        let built = init()?;
        let value = self.value.get_or_init(|| built).clone();
        self.state.store(READY, Ordering::Release);
        rollback.disarm();

        Ok(value)
    }
}

/// Resets a slot to `Uninitialized` unless construction completed.
struct Rollback<'a> {
    state: &'a AtomicU8,
    armed: bool,
}

impl Rollback<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.store(UNINITIALIZED, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn empty_slot() -> InstanceSlot {
        InstanceSlot::lazy(Box::new(()))
    }

    fn instance(n: u32) -> Instance {
        Arc::new(n)
    }

    #[test]
    fn test_lazy_slot_starts_uninitialized() {
        let slot = empty_slot();
        assert_eq!(slot.state(), SlotState::Uninitialized);
        assert!(slot.published().is_none());
        assert_eq!(slot.policy(), CreationPolicy::Lazy);
    }

    #[test]
    fn test_ready_slot() {
        let slot = InstanceSlot::ready(CreationPolicy::Eager, Box::new(()), instance(3));
        assert_eq!(slot.policy(), CreationPolicy::Eager);
        assert_eq!(slot.state(), SlotState::Ready);

        let value = slot.get_or_try_init(|| Ok::<_, ()>(instance(4))).unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 3);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SlotState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(SlotState::Constructing.to_string(), "constructing");
        assert_eq!(SlotState::Ready.to_string(), "ready");
    }

    #[test]
    fn test_init_runs_once() {
        let slot = empty_slot();
        let first = slot.get_or_try_init(|| Ok::<_, ()>(instance(1))).unwrap();
        let second = slot.get_or_try_init(|| Ok::<_, ()>(instance(2))).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second.downcast::<u32>().unwrap(), 1);
        assert_eq!(slot.state(), SlotState::Ready);
    }

    #[test]
    fn test_failed_init_is_retried() {
        let slot = empty_slot();
        let err = slot.get_or_try_init(|| Err::<Instance, _>("nope"));
        assert_eq!(err.unwrap_err(), "nope");
        assert_eq!(slot.state(), SlotState::Uninitialized);

        let value = slot.get_or_try_init(|| Ok::<_, &str>(instance(5))).unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 5);
    }

    #[test]
    fn test_panicking_init_is_retried() {
        let slot = empty_slot();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = slot.get_or_try_init::<()>(|| panic!("factory blew up"));
        }));
        assert!(result.is_err());
        assert_eq!(slot.state(), SlotState::Uninitialized);

        let value = slot.get_or_try_init(|| Ok::<_, ()>(instance(8))).unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 8);
    }

    #[test]
    fn test_concurrent_init_runs_once() {
        const THREADS: usize = 16;

        let slot = Arc::new(empty_slot());
        let barrier = Arc::new(Barrier::new(THREADS));
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let slot = slot.clone();
                let barrier = barrier.clone();
                let runs = runs.clone();
                thread::spawn(move || {
                    barrier.wait();
                    slot.get_or_try_init(|| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        Ok::<_, ()>(instance(i as u32))
                    })
                    .unwrap()
                })
            })
            .collect();

        let values: Vec<Instance> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[test]
    fn test_state_is_constructing_during_init() {
        let slot = empty_slot();
        let value = slot
            .get_or_try_init(|| {
                assert_eq!(slot.state(), SlotState::Constructing);
                Ok::<_, ()>(instance(0))
            })
            .unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 0);
    }
}
