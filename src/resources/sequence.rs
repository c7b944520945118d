use std::sync::Mutex;

use crate::{Factory, Managed, RegistryError};

/// Whether `get_next_number` hands out the value before or after bumping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceMode {
    /// `start, start + 1, ...`
    #[default]
    ReturnThenIncrement,
    /// `start + 1, start + 2, ...`
    IncrementThenReturn,
}

/// Constructor arguments of a [`SequenceGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceConfig {
    pub start: i64,
    pub mode: SequenceMode,
}

impl SequenceConfig {
    pub fn starting_at(start: i64) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: SequenceMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Thread-safe monotonic counter.
///
/// The mode is fixed at construction, so one instance never mixes the two
/// semantics.
#[derive(Debug)]
pub struct SequenceGenerator {
    current: Mutex<i64>,
    mode: SequenceMode,
}

impl Managed for SequenceGenerator {
    type Args = SequenceConfig;
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new(SequenceConfig::default())
    }
}

impl SequenceGenerator {
    pub fn new(config: SequenceConfig) -> Self {
        Self {
            current: Mutex::new(config.start),
            mode: config.mode,
        }
    }

    /// Lazy factory building from the first caller's [`SequenceConfig`].
    pub fn factory() -> Factory<Self> {
        Factory::with_args(|config| Ok(Self::new(config)))
    }

    /// Eager factory starting at 0 in the default mode.
    pub fn default_factory() -> Factory<Self> {
        Factory::no_args(|| Ok(Self::default()))
    }

    pub fn mode(&self) -> SequenceMode {
        self.mode
    }

    /// Returns the next number in the sequence.
    ///
    /// The counter never moves past `i64::MAX`. In return-then-increment mode
    /// that makes `i64::MAX - 1` the last value handed out.
    ///
    /// # Errors
    ///
    /// `SequenceExhausted` once the counter cannot advance; it stays exhausted.
    pub fn get_next_number(&self) -> Result<i64, RegistryError> {
        // The counter stays valid even if a holder panicked.
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        let next = current
            .checked_add(1)
            .ok_or(RegistryError::SequenceExhausted { current: *current })?;
        let value = match self.mode {
            SequenceMode::ReturnThenIncrement => *current,
            SequenceMode::IncrementThenReturn => next,
        };
        *current = next;
        Ok(value)
    }

    /// The value the counter holds right now, without advancing it.
    pub fn current(&self) -> i64 {
        *self.current.lock().unwrap_or_else(|p| p.into_inner())
    }
}
