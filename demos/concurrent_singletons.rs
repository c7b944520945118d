//! Lazy and eager singletons shared across threads.
//!
//! Demonstrates:
//! - Lazy construction from the first caller's arguments
//! - Eager construction at startup, ignoring caller arguments
//! - Several threads auditing through one logger per registry
//! - Explicit one-shot shutdown of the audit files
//!
//! Run with: `cargo run --example concurrent_singletons`

use instance_registry::{
    define_registry, AuditConfig, AuditLogger, CreationPolicy, RegistryError, SequenceConfig,
    SequenceGenerator,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

define_registry!(lazy);
define_registry!(eager);

const THREADS_PER_LOGGER: usize = 4;

fn bootstrap() -> Result<(), RegistryError> {
    lazy::register(CreationPolicy::Lazy, SequenceGenerator::factory())?;
    lazy::register(CreationPolicy::Lazy, AuditLogger::factory())?;

    eager::register(CreationPolicy::Eager, SequenceGenerator::default_factory())?;
    eager::register(
        CreationPolicy::Eager,
        AuditLogger::default_factory("audit_eager.log"),
    )?;
    Ok(())
}

fn audit_in_thread(logger: Arc<AuditLogger>, label: &'static str, idx: usize) {
    for i in 0..5 {
        let message = format!("Thread index: {idx}, Auditor: {label}, Message: {i}");
        if let Err(err) = logger.audit(&message) {
            eprintln!("   audit failed: {err}");
            return;
        }
        thread::sleep(Duration::from_millis(200));
    }
}

fn main() -> Result<(), RegistryError> {
    println!("=== instance-registry: lazy vs eager singletons ===\n");

    bootstrap()?;

    // -------------------------------------------------------------------------
    // 1. Sequence generators
    // -------------------------------------------------------------------------
    println!("1. Sequence generators");

    let seq = lazy::get_instance::<SequenceGenerator>(SequenceConfig::starting_at(10))?;
    println!("   lazy: {}", seq.get_next_number()?); // 10
    println!("   lazy: {}", seq.get_next_number()?); // 11

    let seq2 = lazy::get_instance::<SequenceGenerator>(SequenceConfig::default())?;
    println!("   same instance: {}", Arc::ptr_eq(&seq, &seq2));
    println!("   lazy: {}", seq2.get_next_number()?); // 12

    let seq_eager = eager::get_instance::<SequenceGenerator>(SequenceConfig::starting_at(20))?;
    println!("   eager: {}", seq_eager.get_next_number()?); // 0, start ignored
    println!("   eager: {}", seq_eager.get_next_number()?); // 1

    // -------------------------------------------------------------------------
    // 2. Audit loggers from several threads
    // -------------------------------------------------------------------------
    println!("\n2. Auditing from {} threads", THREADS_PER_LOGGER * 2);

    let lazy_logger = lazy::get_instance::<AuditLogger>(AuditConfig::new("audit_lazy.log"))?;
    let eager_logger = eager::get_instance::<AuditLogger>(AuditConfig::default())?;

    let mut handles = Vec::new();
    for i in 0..THREADS_PER_LOGGER {
        let logger = lazy_logger.clone();
        handles.push(thread::spawn(move || audit_in_thread(logger, "lazy", i)));
    }
    for i in 0..THREADS_PER_LOGGER {
        let logger = eager_logger.clone();
        handles.push(thread::spawn(move || {
            audit_in_thread(logger, "eager", THREADS_PER_LOGGER + i)
        }));
    }
    for handle in handles {
        if handle.join().is_err() {
            eprintln!("   an audit thread panicked");
        }
    }

    println!(
        "   {}: {} lines",
        lazy_logger.path().display(),
        lazy_logger.counter()
    );
    println!(
        "   {}: {} lines",
        eager_logger.path().display(),
        eager_logger.counter()
    );

    // -------------------------------------------------------------------------
    // 3. Shutdown
    // -------------------------------------------------------------------------
    println!("\n3. Shutting down audit files");
    println!("   lazy closed: {}", lazy_logger.shutdown());
    println!("   eager closed: {}", eager_logger.shutdown());
    println!("   second shutdown is a no-op: {}", !lazy_logger.shutdown());

    println!("\n=== Done ===");
    Ok(())
}
