//! Configuration of vtable construction
//!
//! The defaults describe the behaviour a consumer rewriting call sites wants: interface
//! slots are re-routed until nothing changes and anomalies in the input are tolerated with a
//! warning. [`VTableConfig::strict`] turns tolerated anomalies into errors,
//! [`VTableConfig::legacy`] reproduces tables built with a single re-routing pass.

/// Configuration for building vtables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VTableConfig {
    /// Repeat re-routing of unresolved interface slots until no interface group changes.
    /// When disabled, a single pass is made
    pub fixpoint_interface_resolution: bool,

    /// Maximum nesting of recursive table requests (base types and interfaces, default: 256)
    pub max_depth: usize,

    /// Reject overriding a `final` slot with [`crate::Error::InvariantViolation`] instead of
    /// logging a warning
    pub strict_final_overrides: bool,
}

impl Default for VTableConfig {
    fn default() -> Self {
        Self {
            fixpoint_interface_resolution: true,
            max_depth: 256,
            strict_final_overrides: false,
        }
    }
}

impl VTableConfig {
    /// Creates a configuration that rejects overriding `final` slots
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict_final_overrides: true,
            ..Self::default()
        }
    }

    /// Creates a configuration with a single interface re-routing pass
    ///
    /// Tables built this way can leave interface slots pointing at the interface
    /// declaration even though an implementation is visible on the type.
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            fixpoint_interface_resolution: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let default = VTableConfig::default();
        assert!(default.fixpoint_interface_resolution);
        assert!(!default.strict_final_overrides);
        assert_eq!(default.max_depth, 256);

        let strict = VTableConfig::strict();
        assert!(strict.strict_final_overrides);
        assert!(strict.fixpoint_interface_resolution);

        let legacy = VTableConfig::legacy();
        assert!(!legacy.fixpoint_interface_resolution);
        assert_eq!(legacy.max_depth, default.max_depth);
    }
}
