//! Service descriptors — the metadata record behind every binding

use crate::key::Key;
use crate::reflect::Callable;
use crate::value::{Object, Parameters};
use std::fmt;

/// The concrete side of a binding: what `make` actually produces from.
#[derive(Clone, Debug)]
pub enum Concrete {
    /// A type name to forge through the introspector
    Type(Key),
    /// A pre-built instance served as-is, bypassing forging
    Instance(Object),
    /// A callable producing the instance
    Factory(Callable),
}

/// Metadata record for one registered interface.
///
/// The interface name and concrete are fixed at construction; only the
/// singleton flag, the pre-bound parameter map and the enforced-parameter
/// set mutate afterwards, through the fluent [`Binding`](crate::Binding)
/// handle returned by the container's registration methods.
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
    interface: Key,
    concrete: Concrete,
    singleton: bool,
    parameters: Parameters,
    enforced: Vec<String>,
}

impl ServiceDescriptor {
    fn new(interface: Key, concrete: Concrete) -> Self {
        Self {
            interface,
            concrete,
            singleton: false,
            parameters: Parameters::new(),
            enforced: Vec::new(),
        }
    }

    /// A binding descriptor: `interface` resolves by forging `concrete`.
    pub(crate) fn binding(interface: Key, concrete: Key) -> Self {
        Self::new(interface, Concrete::Type(concrete))
    }

    /// An instance descriptor: `interface` resolves to the instance itself.
    pub(crate) fn instance(interface: Key, object: Object) -> Self {
        Self::new(interface, Concrete::Instance(object))
    }

    /// A factory descriptor: `interface` resolves by invoking the callable.
    pub(crate) fn factory(interface: Key, callable: Callable) -> Self {
        Self::new(interface, Concrete::Factory(callable))
    }

    /// The interface this descriptor is registered under.
    #[inline]
    pub fn interface(&self) -> &Key {
        &self.interface
    }

    /// The concrete to produce instances from.
    #[inline]
    pub fn concrete(&self) -> &Concrete {
        &self.concrete
    }

    /// Whether the first forged instance is cached and reused.
    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Pre-bound arguments merged under every `make` call's parameters.
    #[inline]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Names (parameter or type names) of optional class-typed parameters the
    /// resolver may auto-instantiate, in enforcement order.
    #[inline]
    pub fn enforced_parameters(&self) -> &[String] {
        &self.enforced
    }

    pub(crate) fn set_singleton(&mut self, flag: bool) {
        self.singleton = flag;
    }

    /// Merge parameter assignments in; incoming keys overwrite existing ones.
    pub(crate) fn merge_parameters(&mut self, parameters: &Parameters) {
        self.parameters.extend_from(parameters);
    }

    /// Add an enforced name, keeping the set ordered and duplicate-free.
    pub(crate) fn enforce(&mut self, name: &str) {
        if !self.enforced.iter().any(|entry| entry == name) {
            self.enforced.push(name.to_string());
        }
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let concrete = match &self.concrete {
            Concrete::Type(name) => name.as_str(),
            Concrete::Instance(object) => object.type_name().as_str(),
            Concrete::Factory(callable) => callable.label(),
        };
        write!(f, "{} => {}", self.interface, concrete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_defaults() {
        let descriptor = ServiceDescriptor::binding(Key::new("a"), Key::new("b"));
        assert!(!descriptor.is_singleton());
        assert!(descriptor.parameters().is_empty());
        assert!(descriptor.enforced_parameters().is_empty());
        assert!(matches!(descriptor.concrete(), Concrete::Type(key) if key.as_str() == "b"));
    }

    #[test]
    fn test_merge_parameters_overwrites() {
        let mut descriptor = ServiceDescriptor::binding(Key::new("a"), Key::new("a"));
        descriptor.merge_parameters(&params! { "level" => "info" });
        descriptor.merge_parameters(&params! { "level" => "debug", 0 => 1 });

        assert_eq!(
            descriptor.parameters().by_name("level").unwrap().as_str(),
            Some("debug")
        );
        assert_eq!(descriptor.parameters().by_position(0).unwrap().as_int(), Some(1));
    }

    #[test]
    fn test_enforce_deduplicates_preserving_order() {
        let mut descriptor = ServiceDescriptor::binding(Key::new("a"), Key::new("a"));
        descriptor.enforce("log");
        descriptor.enforce("cache");
        descriptor.enforce("log");

        assert_eq!(descriptor.enforced_parameters(), ["log", "cache"]);
    }

    #[test]
    fn test_display() {
        let descriptor = ServiceDescriptor::binding(Key::new("App::Api"), Key::new("App::HttpApi"));
        assert_eq!(descriptor.to_string(), "app::api => app::httpapi");
    }
}
