//! The service container
//!
//! Owns the binding map and the singleton cache, and orchestrates the
//! resolver. All state lives behind concurrent maps, so resolution never
//! holds a lock across recursive forging (a factory may call back into the
//! container it is being forged by).

use crate::descriptor::{Concrete, ServiceDescriptor};
use crate::error::{ContainerError, Result};
use crate::key::Key;
use crate::provider::Provider;
use crate::reflect::{Callable, TypeIntrospector, TypeRegistry};
use crate::resolver::Resolver;
use crate::storage::BindingStore;
use crate::value::{Object, Parameters, Value};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Name-keyed inversion-of-control container.
///
/// Interfaces are registered under normalized names and resolved on demand by
/// forging their dependency graphs through the injected type introspector.
///
/// Cloning shares the underlying maps: a clone *is* the same container, which
/// is how factory callables get an owned handle to call back into the
/// container resolving them. Independent copies come from
/// [`split`](Self::split) and [`expel`](Self::expel).
///
/// # Examples
///
/// ```rust
/// use kiln::{Container, Parameters, TypeSpec};
///
/// struct Mailer;
///
/// let container = Container::new();
/// container.types().unwrap().insert(
///     TypeSpec::concrete("app::mailer").constructor(|_| Ok(Mailer)),
/// );
///
/// container.bind("app::mailer").unwrap().singleton();
///
/// let mailer = container.make("app::mailer", Parameters::new(), &[]).unwrap();
/// assert!(mailer.as_object().unwrap().downcast_ref::<Mailer>().is_some());
/// ```
#[derive(Clone)]
pub struct Container {
    store: Arc<BindingStore>,
    registry: Option<Arc<TypeRegistry>>,
    introspector: Arc<dyn TypeIntrospector>,
}

impl Container {
    /// Create an empty container with its own [`TypeRegistry`].
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "kiln", "Creating new service container");

        let registry = Arc::new(TypeRegistry::new());
        Self {
            store: Arc::new(BindingStore::new()),
            introspector: Arc::clone(&registry) as Arc<dyn TypeIntrospector>,
            registry: Some(registry),
        }
    }

    /// Create an empty container around a custom introspection capability.
    ///
    /// [`types`](Self::types) returns `None` on such a container; metadata
    /// lives wherever the injected introspector keeps it.
    pub fn with_introspector(introspector: Arc<dyn TypeIntrospector>) -> Self {
        Self {
            store: Arc::new(BindingStore::new()),
            registry: None,
            introspector,
        }
    }

    /// The introspection capability resolution goes through.
    #[inline]
    pub fn introspector(&self) -> &Arc<dyn TypeIntrospector> {
        &self.introspector
    }

    /// The default type registry, when this container owns one.
    #[inline]
    pub fn types(&self) -> Option<&TypeRegistry> {
        self.registry.as_deref()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Bind `interface` to itself: `make` will forge the interface's own
    /// name as a concrete type.
    ///
    /// Replaces any prior binding for the key and drops its cached singleton.
    pub fn bind(&self, interface: &str) -> Result<Binding<'_>> {
        let key = self.marshal(interface)?;
        self.install(ServiceDescriptor::binding(key.clone(), key.clone()));
        Ok(Binding { container: self, key })
    }

    /// Bind `interface` to a concrete: `Null` binds the interface to itself,
    /// a `Str` names the type to forge, an `Object` is served as-is. Any
    /// other value shape is an invalid binding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kiln::{Container, Value};
    ///
    /// let container = Container::new();
    /// container.bind_to("app::cache", Value::from("app::memory_cache")).unwrap();
    /// assert!(container.contains("app::cache"));
    ///
    /// // An int is not a bindable concrete
    /// assert!(container.bind_to("app::broken", Value::from(3)).is_err());
    /// ```
    pub fn bind_to(&self, interface: &str, concrete: Value) -> Result<Binding<'_>> {
        let key = self.marshal(interface)?;

        let descriptor = match concrete {
            Value::Null => ServiceDescriptor::binding(key.clone(), key.clone()),
            Value::Str(name) => ServiceDescriptor::binding(key.clone(), Key::new(&name)),
            Value::Object(object) => {
                self.check_instance_compatible(&key, &object)?;
                ServiceDescriptor::instance(key.clone(), object)
            }
            other => {
                return Err(ContainerError::invalid_binding(
                    key.as_str(),
                    format!("unsupported concrete of kind {}", other.kind()),
                ));
            }
        };

        self.install(descriptor);
        Ok(Binding { container: self, key })
    }

    /// Bind `interface` to a factory callable.
    ///
    /// The callable must declare a return type; a declared type the
    /// introspector can already describe is validated against the interface
    /// here, otherwise validation falls to the runtime check in `make`.
    pub fn factory(&self, interface: &str, callback: Callable) -> Result<Binding<'_>> {
        let key = self.marshal(interface)?;

        let Some(declared) = callback.return_type() else {
            return Err(ContainerError::invalid_binding(
                key.as_str(),
                "factory callback must declare a return type",
            ));
        };

        if declared != &key
            && self.introspector.describe(declared).is_some()
            && !self.introspector.is_a(declared, &key)
        {
            return Err(ContainerError::invalid_binding(
                key.as_str(),
                format!("factory return type {declared} does not satisfy the interface"),
            ));
        }

        self.install(ServiceDescriptor::factory(key.clone(), callback));
        Ok(Binding { container: self, key })
    }

    /// Register each provider's bindings, in call order. The first failing
    /// provider's error propagates unmodified.
    pub fn register<'p, I>(&self, providers: I) -> Result<()>
    where
        I: IntoIterator<Item = &'p dyn Provider>,
    {
        for provider in providers {
            provider.configure(self)?;
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `interface` has a current binding.
    #[inline]
    pub fn contains(&self, interface: &str) -> bool {
        self.store.contains(&Key::new(interface))
    }

    /// True only if *every* listed interface has a current binding. An empty
    /// list is vacuously true.
    pub fn has<I, S>(&self, interfaces: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        interfaces
            .into_iter()
            .all(|interface| self.contains(interface.as_ref()))
    }

    /// Snapshot of the descriptor bound to `interface`.
    pub fn get(&self, interface: &str) -> Result<ServiceDescriptor> {
        let key = Key::new(interface);
        self.store
            .descriptor(&key)
            .ok_or_else(|| ContainerError::not_found(key.as_str()))
    }

    /// Number of bound interfaces.
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no interfaces are bound.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// All currently bound interface keys.
    pub fn bound_interfaces(&self) -> Vec<Key> {
        self.store.keys()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Forge an instance for `interface`.
    ///
    /// Caller-supplied `parameters` take precedence per key over the
    /// descriptor's pre-bound parameters; `enforced` is united with the
    /// descriptor's enforced set. An unbound interface is forged directly as
    /// a concrete type, so any describable type resolves opportunistically.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kiln::{params, Container, ParamSpec, TypeSpec};
    ///
    /// struct Greeter {
    ///     greeting: String,
    /// }
    ///
    /// let container = Container::new();
    /// container.types().unwrap().insert(
    ///     TypeSpec::concrete("greeter")
    ///         .param(ParamSpec::optional("greeting", "hello"))
    ///         .constructor(|args| {
    ///             Ok(Greeter {
    ///                 greeting: args[0].as_str().unwrap_or_default().to_string(),
    ///             })
    ///         }),
    /// );
    ///
    /// // Never bound, forged opportunistically
    /// let greeter = container.make("greeter", params! { 0 => "hi" }, &[]).unwrap();
    /// let greeter = greeter.as_object().unwrap();
    /// assert_eq!(greeter.downcast_ref::<Greeter>().unwrap().greeting, "hi");
    /// ```
    pub fn make(
        &self,
        interface: &str,
        parameters: Parameters,
        enforced: &[&str],
    ) -> Result<Value> {
        let key = Key::new(interface);
        let resolver = Resolver::new(self);

        let Some(descriptor) = self.store.descriptor(&key) else {
            let enforced = owned(enforced);
            return resolver
                .forge_type(&key, &parameters, &enforced)
                .map(Value::Object);
        };

        let mut parameters = parameters;
        parameters.merge_defaults(descriptor.parameters());

        if descriptor.is_singleton() {
            if let Some(cached) = self.store.cached(descriptor.interface()) {
                #[cfg(feature = "logging")]
                trace!(
                    target: "kiln",
                    interface = key.as_str(),
                    "Returning cached singleton"
                );
                return Ok(Value::Object(cached));
            }
        }

        let mut effective: Vec<String> = descriptor.enforced_parameters().to_vec();
        for entry in enforced {
            if !effective.iter().any(|existing| existing == entry) {
                effective.push((*entry).to_string());
            }
        }

        let instance = match descriptor.concrete() {
            Concrete::Instance(object) => return Ok(Value::Object(object.clone())),
            Concrete::Type(type_name) => {
                resolver.forge_type(type_name, &parameters, &effective)?
            }
            Concrete::Factory(callable) => {
                let produced = resolver.forge_callable(callable, &parameters, &effective)?;
                match produced {
                    Value::Object(object) => object,
                    other => {
                        return Err(ContainerError::forge(
                            descriptor.interface().as_str(),
                            format!("factory produced a non-object {} value", other.kind()),
                        ));
                    }
                }
            }
        };

        if !self.introspector.is_a(instance.type_name(), &key) {
            return Err(ContainerError::forge(
                key.as_str(),
                format!(
                    "forged instance of {} does not satisfy the requested interface",
                    instance.type_name()
                ),
            ));
        }

        if descriptor.is_singleton() {
            let cached = self.store.cache(descriptor.interface().clone(), instance);
            return Ok(Value::Object(cached));
        }

        Ok(Value::Object(instance))
    }

    /// [`make`](Self::make) with no parameter overrides and no enforced
    /// names.
    #[inline]
    pub fn forge(&self, interface: &str) -> Result<Value> {
        self.make(interface, Parameters::new(), &[])
    }

    /// Forge a callable's arguments and invoke it. No interface or type
    /// check applies; the callable's value is returned as-is.
    pub fn call(
        &self,
        callback: &Callable,
        parameters: Parameters,
        enforced: &[&str],
    ) -> Result<Value> {
        let enforced = owned(enforced);
        Resolver::new(self).forge_callable(callback, &parameters, &enforced)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Copy this container. Without arguments the copy carries every binding
    /// and cached singleton; with arguments only the listed, currently-bound
    /// interfaces are carried (unbound names are silently skipped).
    ///
    /// Descriptors are copied independently; cached singleton instances stay
    /// shared by reference.
    pub fn split(&self, interfaces: &[&str]) -> Container {
        #[cfg(feature = "logging")]
        debug!(
            target: "kiln",
            listed = interfaces.len(),
            "Splitting container"
        );

        self.copy_with(interfaces, |listed, key| listed.contains(key))
    }

    /// Inverse of [`split`](Self::split): without arguments a full copy, with
    /// arguments a copy of everything *except* the listed interfaces.
    pub fn expel(&self, interfaces: &[&str]) -> Container {
        #[cfg(feature = "logging")]
        debug!(
            target: "kiln",
            listed = interfaces.len(),
            "Expelling interfaces into container copy"
        );

        self.copy_with(interfaces, |listed, key| !listed.contains(key))
    }

    fn copy_with(
        &self,
        interfaces: &[&str],
        keep: impl Fn(&[Key], &Key) -> bool,
    ) -> Container {
        let store = if interfaces.is_empty() {
            self.store.copy_filtered(|_| true)
        } else {
            let listed: Vec<Key> = interfaces.iter().map(Key::new).collect();
            self.store.copy_filtered(|key| keep(&listed, key))
        };

        Container {
            store: Arc::new(store),
            registry: self.registry.clone(),
            introspector: Arc::clone(&self.introspector),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn marshal(&self, interface: &str) -> Result<Key> {
        let key = Key::new(interface);
        if key.is_empty() {
            return Err(ContainerError::invalid_binding(
                interface,
                "interface name is empty",
            ));
        }
        Ok(key)
    }

    fn install(&self, descriptor: ServiceDescriptor) {
        #[cfg(feature = "logging")]
        debug!(
            target: "kiln",
            binding = %descriptor,
            singleton = descriptor.is_singleton(),
            "Registering binding"
        );

        self.store.insert(descriptor);
    }

    /// Best-effort bind-time validation of a pre-built instance: reject only
    /// when the introspector positively knows the types are unrelated.
    fn check_instance_compatible(&self, interface: &Key, object: &Object) -> Result<()> {
        if object.type_name() == interface {
            return Ok(());
        }
        if self.introspector.describe(object.type_name()).is_some()
            && !self.introspector.is_a(object.type_name(), interface)
        {
            return Err(ContainerError::invalid_binding(
                interface.as_str(),
                format!(
                    "instance of {} does not satisfy the interface",
                    object.type_name()
                ),
            ));
        }
        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

fn owned(enforced: &[&str]) -> Vec<String> {
    enforced.iter().map(|entry| (*entry).to_string()).collect()
}

// =============================================================================
// Fluent binding handle
// =============================================================================

/// Write-through handle over a freshly registered descriptor.
///
/// Edits apply to the descriptor stored in the container; if the interface
/// has been re-bound in the meantime, edits quietly miss (the handle never
/// resurrects a replaced binding).
///
/// # Examples
///
/// ```rust
/// use kiln::{params, Container};
///
/// let container = Container::new();
/// container
///     .bind("app::report")
///     .unwrap()
///     .singleton()
///     .with_parameters(params! { "title" => "weekly" })
///     .enforce_parameters(["renderer"]);
///
/// let descriptor = container.get("app::report").unwrap();
/// assert!(descriptor.is_singleton());
/// assert_eq!(descriptor.enforced_parameters(), ["renderer"]);
/// ```
pub struct Binding<'a> {
    container: &'a Container,
    key: Key,
}

impl<'a> Binding<'a> {
    /// The normalized key this handle configures.
    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Mark the binding as a singleton: the first forged instance is cached
    /// and reused.
    pub fn singleton(self) -> Self {
        self.edit(|descriptor| descriptor.set_singleton(true))
    }

    /// Set or clear the singleton flag explicitly.
    pub fn singleton_flag(self, flag: bool) -> Self {
        self.edit(|descriptor| descriptor.set_singleton(flag))
    }

    /// Merge parameter assignments into the descriptor; incoming keys
    /// overwrite previously assigned ones.
    pub fn with_parameters(self, parameters: Parameters) -> Self {
        self.edit(|descriptor| descriptor.merge_parameters(&parameters))
    }

    /// Add enforced names (parameter or type names) to the descriptor's
    /// ordered set.
    pub fn enforce_parameters<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.edit(|descriptor| {
            for name in names {
                descriptor.enforce(name.as_ref());
            }
        })
    }

    fn edit(self, f: impl FnOnce(&mut ServiceDescriptor)) -> Self {
        self.container.store.with_descriptor_mut(&self.key, f);
        self
    }
}
