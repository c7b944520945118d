use std::fmt;

/// When the single construction of a managed type happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreationPolicy {
    /// Constructed by the first `get_instance` call, with that caller's arguments.
    Lazy,
    /// Constructed during registration from a no-argument factory.
    /// Arguments passed to `get_instance` later are dropped.
    Eager,
}

impl fmt::Display for CreationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationPolicy::Lazy => write!(f, "lazy"),
            CreationPolicy::Eager => write!(f, "eager"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CreationPolicy::Lazy.to_string(), "lazy");
        assert_eq!(CreationPolicy::Eager.to_string(), "eager");
    }
}
