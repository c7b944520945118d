//! The contract a type has to satisfy to be handed out by a registry.

use std::error::Error;
use std::fmt;

/// Error type returned by factories.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Result type returned by factories.
pub type FactoryResult<T> = Result<T, BoxError>;

/// A type whose construction is governed by a registry instead of by call sites.
///
/// `Args` is what callers pass to [`get_instance`](crate::InstanceRegistry::get_instance).
/// Only the first successful lazy construction ever sees them.
pub trait Managed: Send + Sync + 'static {
    type Args: Send + 'static;
}

/// How a managed type gets built.
pub enum Factory<T: Managed> {
    /// Builds from nothing. The only shape an eager registration accepts.
    Default(Box<dyn Fn() -> FactoryResult<T> + Send + Sync>),
    /// Builds from the arguments of the first caller.
    WithArgs(Box<dyn Fn(T::Args) -> FactoryResult<T> + Send + Sync>),
}

impl<T: Managed> Factory<T> {
    pub fn no_args(f: impl Fn() -> FactoryResult<T> + Send + Sync + 'static) -> Self {
        Factory::Default(Box::new(f))
    }

    pub fn with_args(f: impl Fn(T::Args) -> FactoryResult<T> + Send + Sync + 'static) -> Self {
        Factory::WithArgs(Box::new(f))
    }

    pub fn requires_args(&self) -> bool {
        matches!(self, Factory::WithArgs(_))
    }

    /// Runs the factory. A `Default` factory drops `args`.
    pub(crate) fn build(&self, args: Option<T::Args>) -> FactoryResult<T> {
        match (self, args) {
            (Factory::Default(f), _) => f(),
            (Factory::WithArgs(f), Some(args)) => f(args),
            (Factory::WithArgs(_), None) => Err(format!(
                "factory for {} needs arguments",
                std::any::type_name::<T>()
            )
            .into()),
        }
    }
}

impl<T: Managed> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Factory::Default(_) => "Default",
            Factory::WithArgs(_) => "WithArgs",
        };
        write!(f, "Factory::{kind}<{}>", std::any::type_name::<T>())
    }
}
