//! Generator registry.
//!
//! The registry is built once at startup and passed by reference to
//! [`RecordGenerator::compile`](crate::RecordGenerator::compile). It knows
//! the built-in generator types, any externally registered generators and
//! transforms, and the optional [`FakeProvider`] backing the `faker` type.

use crate::error::GeneratorError;
use crate::generators::faker::FakeProvider;
use crate::generators::BUILTIN_TYPES;
use crate::transform::{TransformFn, BUILTIN_TRANSFORMS};
use serde_yaml::Mapping;
use sim_core::{StateStore, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Type name of the faker generator.
pub const FAKER_TYPE: &str = "faker";

/// Type name of dependent fields; resolved by the record generator itself.
pub const DEPENDENT_TYPE: &str = "dependent";

/// An externally registered generator function.
///
/// Invoked with the field's parameters (every key except `type`), the
/// stream's state and the current tick count. Any error makes the field null
/// for that tick.
pub trait GeneratorFn: Send + Sync {
    fn generate(
        &self,
        params: &Mapping,
        state: &mut StateStore,
        tick: u64,
    ) -> Result<Value, GeneratorError>;
}

impl<F> GeneratorFn for F
where
    F: Fn(&Mapping, &mut StateStore, u64) -> Result<Value, GeneratorError> + Send + Sync,
{
    fn generate(
        &self,
        params: &Mapping,
        state: &mut StateStore,
        tick: u64,
    ) -> Result<Value, GeneratorError> {
        self(params, state, tick)
    }
}

/// How a generator type name resolves.
#[derive(Clone)]
pub enum Resolved {
    /// Externally registered function
    External(Arc<dyn GeneratorFn>),
    /// One of the built-in types
    Builtin,
    /// The faker type, backed by the registered provider
    Faker(Arc<dyn FakeProvider>),
    /// The faker type with no provider registered
    FakerUnavailable,
    /// Not known to this registry
    Unknown,
}

/// Registry of generator types and transforms.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    builtins: bool,
    generators: BTreeMap<String, Arc<dyn GeneratorFn>>,
    transforms: BTreeMap<String, Arc<dyn TransformFn>>,
    fake_provider: Option<Arc<dyn FakeProvider>>,
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("builtins", &self.builtins)
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .field("fake_provider", &self.fake_provider.is_some())
            .finish()
    }
}

impl GeneratorRegistry {
    /// An empty registry: no built-ins, nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in generator types enabled.
    pub fn with_builtins() -> Self {
        let registry = Self {
            builtins: true,
            ..Self::default()
        };
        debug!(
            "Initialized generator registry with {} built-in generators",
            BUILTIN_TYPES.len()
        );
        registry
    }

    /// Register an external generator under `name`.
    ///
    /// A registered name shadows a built-in type of the same name.
    pub fn register(&mut self, name: impl Into<String>, generator: impl GeneratorFn + 'static) {
        let name = name.into();
        if self.generators.contains_key(&name) || self.is_builtin(&name) {
            warn!("Overriding existing generator: {name}");
        }
        debug!("Registered generator: {name}");
        self.generators.insert(name, Arc::new(generator));
    }

    /// Register a transform usable by dependent fields.
    pub fn register_transform(
        &mut self,
        name: impl Into<String>,
        transform: impl TransformFn + 'static,
    ) {
        let name = name.into();
        if self.transforms.contains_key(&name) || BUILTIN_TRANSFORMS.contains(&name.as_str()) {
            warn!("Overriding existing transform: {name}");
        }
        debug!("Registered transform: {name}");
        self.transforms.insert(name, Arc::new(transform));
    }

    /// Install the provider backing the `faker` generator type.
    pub fn set_fake_provider(&mut self, provider: Arc<dyn FakeProvider>) {
        if self.fake_provider.is_some() {
            warn!("Replacing existing fake provider");
        }
        self.fake_provider = Some(provider);
    }

    /// Whether a fake provider is installed.
    pub fn has_fake_provider(&self) -> bool {
        self.fake_provider.is_some()
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.builtins && BUILTIN_TYPES.contains(&name)
    }

    /// Resolve a generator type name.
    pub fn resolve(&self, name: &str) -> Resolved {
        if let Some(generator) = self.generators.get(name) {
            return Resolved::External(Arc::clone(generator));
        }
        if name == FAKER_TYPE {
            return match &self.fake_provider {
                Some(provider) => Resolved::Faker(Arc::clone(provider)),
                None => Resolved::FakerUnavailable,
            };
        }
        if self.is_builtin(name) {
            Resolved::Builtin
        } else {
            Resolved::Unknown
        }
    }

    /// Look up a registered transform.
    pub fn transform(&self, name: &str) -> Option<Arc<dyn TransformFn>> {
        self.transforms.get(name).cloned()
    }

    /// All generator type names usable in a schema.
    pub fn generator_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        if self.builtins {
            names.extend(BUILTIN_TYPES.iter().map(|s| s.to_string()));
        }
        if self.fake_provider.is_some() {
            names.push(FAKER_TYPE.to_string());
        }
        names.push(DEPENDENT_TYPE.to_string());
        for name in self.generators.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// All transform names usable by dependent fields.
    pub fn transform_names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_TRANSFORMS.iter().map(|s| s.to_string()).collect();
        for name in self.transforms.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}
