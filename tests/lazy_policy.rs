//! Integration tests for lazily constructed singletons.
//!
//! Every test builds its own `InstanceRegistry`, so they can run in parallel.

use instance_registry::{
    CreationPolicy, Factory, InstanceRegistry, Managed, RegistryError, RegistryEvent, SlotState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct Connection {
    url: String,
}

impl Managed for Connection {
    type Args = String;
}

#[derive(Debug)]
struct Slow;

impl Managed for Slow {
    type Args = ();
}

#[derive(Debug)]
struct Fast;

impl Managed for Fast {
    type Args = ();
}

#[test]
fn test_singleton_uniqueness_under_contention() {
    const THREADS: usize = 32;

    let registry = Arc::new(InstanceRegistry::new());
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = constructions.clone();

    registry
        .register_lazy::<Connection>(move |url| {
            counter.fetch_add(1, Ordering::SeqCst);
            // Widen the race window.
            thread::sleep(Duration::from_millis(50));
            Ok(Connection { url })
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                registry
                    .get_instance::<Connection>(format!("db://{i}"))
                    .unwrap()
            })
        })
        .collect();

    let instances: Vec<Arc<Connection>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|c| Arc::ptr_eq(c, &instances[0])));
    // Every waiter observed the fully built value.
    assert!(instances[0].url.starts_with("db://"));
}

#[test]
fn test_first_arguments_are_authoritative() {
    let registry = InstanceRegistry::new();
    registry
        .register::<Connection>(
            CreationPolicy::Lazy,
            Factory::with_args(|url| Ok(Connection { url })),
        )
        .unwrap();

    let a = registry.get_instance::<Connection>("db://a".into()).unwrap();
    let b = registry.get_instance::<Connection>("db://b".into()).unwrap();

    assert_eq!(a.url, "db://a");
    assert_eq!(b.url, "db://a");
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_failed_construction_is_retryable() {
    let registry = InstanceRegistry::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();

    registry
        .register_lazy::<Connection>(move |url| {
            if attempts_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(format!("cannot reach {url}").into())
            } else {
                Ok(Connection { url })
            }
        })
        .unwrap();

    let err = registry
        .get_instance::<Connection>("db://down".into())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Construction of {} failed: cannot reach db://down",
            std::any::type_name::<Connection>()
        )
    );
    assert!(matches!(registry.get::<Connection>(), Err(RegistryError::NotConstructed { .. })));

    // The failed caller's arguments are not remembered either.
    let conn = registry.get_instance::<Connection>("db://up".into()).unwrap();
    assert_eq!(conn.url, "db://up");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_panicking_factory_does_not_poison_registry() {
    let registry = Arc::new(InstanceRegistry::new());
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();

    registry
        .register_lazy::<Connection>(move |url| {
            if attempts_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("factory panicked");
            }
            Ok(Connection { url })
        })
        .unwrap();

    let registry_clone = registry.clone();
    let joined = thread::spawn(move || {
        let _ = registry_clone.get_instance::<Connection>("db://boom".into());
    })
    .join();
    assert!(joined.is_err());
    assert_eq!(registry.state::<Connection>(), Some(SlotState::Uninitialized));

    let conn = registry.get_instance::<Connection>("db://ok".into()).unwrap();
    assert_eq!(conn.url, "db://ok");
}

#[test]
fn test_slow_construction_does_not_block_other_types() {
    let registry = Arc::new(InstanceRegistry::new());
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let started_tx = Mutex::new(started_tx);

    registry
        .register_lazy::<Slow>(move |()| {
            started_tx.lock().unwrap().send(()).unwrap();
            release_rx
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(10))
                .map_err(|_| "never released")?;
            Ok(Slow)
        })
        .unwrap();
    registry.register_lazy::<Fast>(|()| Ok(Fast)).unwrap();

    let slow_registry = registry.clone();
    let slow = thread::spawn(move || slow_registry.get_instance::<Slow>(()));

    started_rx.recv().unwrap();
    assert_eq!(registry.state::<Slow>(), Some(SlotState::Constructing));

    // Slow is mid-construction; Fast must still be reachable.
    registry.get_instance::<Fast>(()).unwrap();
    assert_eq!(registry.state::<Fast>(), Some(SlotState::Ready));

    release_tx.send(()).unwrap();
    slow.join().unwrap().unwrap();
    assert_eq!(registry.state::<Slow>(), Some(SlotState::Ready));
}

#[test]
fn test_factory_may_resolve_other_types() {
    let registry = Arc::new(InstanceRegistry::new());
    registry
        .register_lazy::<Connection>(|url| Ok(Connection { url }))
        .unwrap();

    let inner = Arc::downgrade(&registry);
    registry
        .register_lazy::<Fast>(move |()| {
            let registry = inner.upgrade().ok_or("registry dropped")?;
            registry.get_instance::<Connection>("db://dep".into())?;
            Ok(Fast)
        })
        .unwrap();

    registry.get_instance::<Fast>(()).unwrap();
    assert_eq!(registry.get::<Connection>().unwrap().url, "db://dep");
}

#[test]
fn test_construction_events() {
    let registry = InstanceRegistry::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    registry.set_trace_callback(move |e| events_clone.lock().unwrap().push(e.clone()));

    let attempts = AtomicUsize::new(0);
    registry
        .register_lazy::<Fast>(move |()| {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("not yet".into())
            } else {
                Ok(Fast)
            }
        })
        .unwrap();

    assert!(registry.get_instance::<Fast>(()).is_err());
    registry.get_instance::<Fast>(()).unwrap();

    let events = events.lock().unwrap();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            RegistryEvent::Register { .. } => "register",
            RegistryEvent::Construct { .. } => "construct",
            RegistryEvent::ConstructFailed { .. } => "construct_failed",
            RegistryEvent::Get { found: true, .. } => "get",
            RegistryEvent::Get { found: false, .. } => "miss",
            RegistryEvent::Contains { .. } => "contains",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["register", "construct_failed", "miss", "construct", "get"]
    );
}
