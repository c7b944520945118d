use crate::CreationPolicy;

/// Events emitted by the registry during operations.
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
/// The callback runs after the registry has released its locks.
///
/// # Examples
///
/// ```rust
/// use instance_registry::{CreationPolicy, RegistryEvent};
///
/// let event = RegistryEvent::Register {
///     type_name: "i32",
///     policy: CreationPolicy::Lazy,
/// };
/// assert_eq!(event.to_string(), "register { type_name: i32, policy: lazy }");
/// ```
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A type was registered.
    Register {
        type_name: &'static str,
        policy: CreationPolicy,
    },

    /// A factory ran to completion and its instance was published.
    Construct { type_name: &'static str },

    /// A factory failed; the type stays retryable.
    ConstructFailed { type_name: &'static str },

    /// An instance was requested.
    Get {
        type_name: &'static str,
        /// Whether an instance was returned
        found: bool,
    },

    /// A type existence check was performed.
    Contains {
        type_name: &'static str,
        found: bool,
    },
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Register { type_name, policy } => {
                write!(f, "register {{ type_name: {type_name}, policy: {policy} }}")
            }
            RegistryEvent::Construct { type_name } => {
                write!(f, "construct {{ type_name: {type_name} }}")
            }
            RegistryEvent::ConstructFailed { type_name } => {
                write!(f, "construct_failed {{ type_name: {type_name} }}")
            }
            RegistryEvent::Get { type_name, found } => {
                write!(f, "get {{ type_name: {type_name}, found: {found} }}")
            }
            RegistryEvent::Contains { type_name, found } => {
                write!(f, "contains {{ type_name: {type_name}, found: {found} }}")
            }
        }
    }
}
