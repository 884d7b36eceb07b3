// crates/agentarena-registry/src/lib.rs
// ============================================================================
// Crate: agentarena-registry
// Description: Environment-class reference string to capability factory registry.
// Purpose: Let the dispatcher resolve an environment record's `env_class`
//          string to a constructible capability without depending on any
//          one environment's crate.
// Dependencies: agentarena-core
// ============================================================================

//! ## Overview
//! A [`CapabilityRegistry`] is a `BTreeMap<String, Arc<dyn
//! EnvironmentCapabilityFactory>>` behind a fluent builder, keyed by
//! environment-class reference string. Plugin hot-reload and zip-based
//! upload are out of scope: the registry is populated once at construction
//! time by whoever embeds this crate, and mutated only by an explicit
//! `register` call standing in for the admin plugin-upload path.

use std::collections::BTreeMap;
use std::sync::Arc;

use agentarena_core::capability::CapabilityError;
use agentarena_core::capability::EnvironmentCapability;
use agentarena_core::capability::EnvironmentCapabilityFactory;
use serde_json::Value;

/// Builder for a [`CapabilityRegistry`].
///
/// # Invariants
/// - Registrations are keyed by environment-class reference string; later
///   registrations for the same key overwrite earlier ones.
#[derive(Default)]
pub struct CapabilityRegistryBuilder {
    /// Registered factories, keyed by environment-class reference string.
    factories: BTreeMap<String, Arc<dyn EnvironmentCapabilityFactory>>,
}

impl CapabilityRegistryBuilder {
    /// Registers a capability factory under `env_class`.
    #[must_use]
    pub fn factory(mut self, env_class: impl Into<String>, factory: impl EnvironmentCapabilityFactory + 'static) -> Self {
        self.factories.insert(env_class.into(), Arc::new(factory));
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> CapabilityRegistry {
        CapabilityRegistry { factories: self.factories }
    }
}

/// Resolves an environment-class reference string to a capability factory.
///
/// # Invariants
/// - Reference strings are unique within the registry.
#[derive(Default)]
pub struct CapabilityRegistry {
    /// Registered factories, keyed by environment-class reference string.
    factories: BTreeMap<String, Arc<dyn EnvironmentCapabilityFactory>>,
}

impl CapabilityRegistry {
    /// Returns a builder for the registry.
    #[must_use]
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::default()
    }

    /// Registers (or replaces) a single factory, standing in for the admin
    /// plugin-upload path this crate does not implement.
    pub fn register(&mut self, env_class: impl Into<String>, factory: impl EnvironmentCapabilityFactory + 'static) {
        self.factories.insert(env_class.into(), Arc::new(factory));
    }

    /// Constructs a capability instance for `env_class`, bound to `config`.
    ///
    /// # Errors
    /// Returns [`CapabilityError::UnknownClass`] if no factory is registered
    /// for `env_class`, or the factory's own validation error.
    pub fn build(&self, env_class: &str, config: &Value) -> Result<Box<dyn EnvironmentCapability>, CapabilityError> {
        let factory = self
            .factories
            .get(env_class)
            .ok_or_else(|| CapabilityError::UnknownClass(env_class.to_owned()))?;
        factory.build(config)
    }

    /// Returns the set of registered environment-class reference strings.
    #[must_use]
    pub fn registered_classes(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test assertions are permitted to unwrap and panic directly."
)]
mod tests {
    use super::*;
    use agentarena_core::model::ActionResult;
    use agentarena_core::model::EnvSettings;
    use agentarena_core::model::Percept;
    use agentarena_core::model::RunData;
    use serde_json::json;

    struct StubCapability;

    impl EnvironmentCapability for StubCapability {
        fn settings(&self) -> EnvSettings {
            EnvSettings::default()
        }

        fn new_run(&self) -> Value {
            json!(0)
        }

        fn act(&self, _action: &Value, _run_data: &RunData) -> ActionResult {
            ActionResult { new_state: Some(json!(0)), message: None, action_extra_info: None, outcome: None }
        }

        fn get_action_request(&self, _run_data: &RunData) -> Percept {
            Percept { content: json!(0) }
        }
    }

    struct StubFactory;

    impl EnvironmentCapabilityFactory for StubFactory {
        fn build(&self, _config: &Value) -> Result<Box<dyn EnvironmentCapability>, CapabilityError> {
            Ok(Box::new(StubCapability))
        }
    }

    #[test]
    fn unknown_class_fails_closed() {
        let registry = CapabilityRegistry::builder().build();
        let err = match registry.build("nim", &json!({})) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, CapabilityError::UnknownClass(c) if c == "nim"));
    }

    #[test]
    fn registered_class_resolves() {
        let registry = CapabilityRegistry::builder().factory("nim", StubFactory).build();
        assert!(registry.build("nim", &json!({})).is_ok());
        assert_eq!(registry.registered_classes(), vec!["nim"]);
    }

    #[test]
    fn late_registration_overwrites() {
        let mut registry = CapabilityRegistry::builder().factory("nim", StubFactory).build();
        registry.register("nim", StubFactory);
        assert_eq!(registry.registered_classes().len(), 1);
    }
}
