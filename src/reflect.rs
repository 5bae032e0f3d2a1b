//! Type metadata — the injected introspection capability
//!
//! The resolver needs to know, for any forgeable type or callable, its
//! parameter list in declaration order. Rust has no runtime constructor
//! reflection, so that knowledge is registered explicitly: a [`TypeSpec`] per
//! describable type, held in a [`TypeRegistry`] (or any other
//! [`TypeIntrospector`] implementation injected into the container).

use crate::error::Result;
use crate::key::Key;
use crate::value::{Object, Value};
use ahash::RandomState;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Parameter metadata
// =============================================================================

/// One constructor or callable parameter, in declaration order.
///
/// Position is implicit: it is the parameter's index in the owning list.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    name: String,
    ty: Option<Key>,
    optional: bool,
    default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter with no default.
    #[inline]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            optional: false,
            default: None,
        }
    }

    /// An optional parameter falling back to `default`.
    #[inline]
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            optional: true,
            default: Some(default.into()),
        }
    }

    /// Declare the parameter's class/interface type.
    #[inline]
    pub fn of_type(mut self, ty: impl Into<Key>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    /// The parameter name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type, if the parameter has one.
    #[inline]
    pub fn ty(&self) -> Option<&Key> {
        self.ty.as_ref()
    }

    /// Whether the parameter may be left to its default.
    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The default value, if one is available.
    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

// =============================================================================
// Type metadata
// =============================================================================

/// What a described type is, as far as instantiation goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Instantiable through its registered constructor
    Concrete,
    /// Describable but not instantiable
    Abstract,
    /// A pure contract; never instantiable
    Interface,
}

/// Constructor closure producing a tagged instance from forged arguments.
pub type ConstructFn = Arc<dyn Fn(&[Value]) -> Result<Object> + Send + Sync>;

/// Metadata describing one forgeable type.
///
/// # Examples
///
/// ```rust
/// use kiln::{ParamSpec, TypeSpec};
///
/// struct Logger {
///     level: String,
/// }
///
/// let spec = TypeSpec::concrete("app::logger")
///     .implements("app::log_sink")
///     .param(ParamSpec::optional("level", "info"))
///     .constructor(|args| {
///         Ok(Logger {
///             level: args[0].as_str().unwrap_or("info").to_string(),
///         })
///     });
///
/// assert!(spec.is_instantiable());
/// assert_eq!(spec.params().len(), 1);
/// ```
#[derive(Clone)]
pub struct TypeSpec {
    name: Key,
    kind: TypeKind,
    implements: Vec<Key>,
    params: Vec<ParamSpec>,
    construct: Option<ConstructFn>,
}

impl TypeSpec {
    fn new(name: impl Into<Key>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            implements: Vec::new(),
            params: Vec::new(),
            construct: None,
        }
    }

    /// Describe an instantiable type. Attach a [`constructor`](Self::constructor)
    /// before registering it, or forging will fail.
    #[inline]
    pub fn concrete(name: impl Into<Key>) -> Self {
        Self::new(name, TypeKind::Concrete)
    }

    /// Describe an abstract type: it participates in `implements` relations
    /// but cannot be forged.
    #[inline]
    pub fn abstract_type(name: impl Into<Key>) -> Self {
        Self::new(name, TypeKind::Abstract)
    }

    /// Describe an interface: a pure contract.
    #[inline]
    pub fn interface(name: impl Into<Key>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Declare an interface (or parent type) this type satisfies.
    #[inline]
    pub fn implements(mut self, interface: impl Into<Key>) -> Self {
        self.implements.push(interface.into());
        self
    }

    /// Append a constructor parameter; call order defines positions.
    #[inline]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Attach the construction closure.
    ///
    /// The closure receives the forged argument list, one `Value` per
    /// declared parameter, and the produced instance is tagged with this
    /// spec's own type name.
    pub fn constructor<T, F>(mut self, construct: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&[Value]) -> Result<T> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.construct = Some(Arc::new(move |args| {
            construct(args).map(|payload| Object::new(name.clone(), payload))
        }));
        self
    }

    /// The normalized type name.
    #[inline]
    pub fn name(&self) -> &Key {
        &self.name
    }

    /// The type's kind.
    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Interfaces and parent types this type satisfies directly.
    #[inline]
    pub fn implemented(&self) -> &[Key] {
        &self.implements
    }

    /// Constructor parameters in declaration order.
    #[inline]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// The construction closure, when one was attached.
    #[inline]
    pub fn construct(&self) -> Option<&ConstructFn> {
        self.construct.as_ref()
    }

    /// Whether forging this type can succeed at all.
    #[inline]
    pub fn is_instantiable(&self) -> bool {
        self.kind == TypeKind::Concrete && self.construct.is_some()
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("implements", &self.implements)
            .field("params", &self.params.len())
            .finish()
    }
}

// =============================================================================
// Introspection capability
// =============================================================================

/// Capability to describe types by name.
///
/// The container never reflects on its own; it asks this collaborator. The
/// default implementation is [`TypeRegistry`]; hosts with their own metadata
/// source can inject something else.
pub trait TypeIntrospector: Send + Sync {
    /// Describe a type by its normalized name, if it is known.
    fn describe(&self, name: &Key) -> Option<Arc<TypeSpec>>;

    /// Whether `concrete` satisfies `interface` through the `implements`
    /// relation, transitively. Equal keys are trivially compatible; unknown
    /// types satisfy nothing but themselves.
    fn is_a(&self, concrete: &Key, interface: &Key) -> bool {
        if concrete == interface {
            return true;
        }

        let mut pending = vec![concrete.clone()];
        let mut visited: Vec<Key> = Vec::new();

        while let Some(current) = pending.pop() {
            if visited.contains(&current) {
                continue;
            }
            if let Some(spec) = self.describe(&current) {
                for parent in spec.implemented() {
                    if parent == interface {
                        return true;
                    }
                    pending.push(parent.clone());
                }
            }
            visited.push(current);
        }

        false
    }
}

/// The default [`TypeIntrospector`]: an explicit, registration-based store of
/// type metadata.
///
/// Registration may interleave freely with resolution; describing a type that
/// was registered after the container was created is fine.
pub struct TypeRegistry {
    specs: DashMap<Key, Arc<TypeSpec>, RandomState>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            specs: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Register a type description, replacing any prior one for the name.
    pub fn insert(&self, spec: TypeSpec) {
        self.specs.insert(spec.name().clone(), Arc::new(spec));
    }

    /// Whether a type of this name is described.
    #[inline]
    pub fn contains(&self, name: &Key) -> bool {
        self.specs.contains_key(name)
    }

    /// Number of described types.
    #[inline]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether no types are described.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl TypeIntrospector for TypeRegistry {
    #[inline]
    fn describe(&self, name: &Key) -> Option<Arc<TypeSpec>> {
        self.specs.get(name).map(|spec| Arc::clone(spec.value()))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .finish()
    }
}

// =============================================================================
// Callables
// =============================================================================

/// Closure invoked with forged arguments.
pub type CallableFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A forgeable function value: parameter metadata plus the closure itself.
///
/// Used as the concrete of factory bindings and as the target of
/// [`Container::call`](crate::Container::call).
///
/// # Examples
///
/// ```rust
/// use kiln::{Callable, ParamSpec, Value};
///
/// let add = Callable::new(|args| {
///     let a = args[0].as_int().unwrap_or(0);
///     let b = args[1].as_int().unwrap_or(0);
///     Ok(Value::Int(a + b))
/// })
/// .labeled("add")
/// .param(ParamSpec::required("a"))
/// .param(ParamSpec::optional("b", 10));
///
/// assert_eq!(add.label(), "add");
/// assert_eq!(add.params().len(), 2);
/// ```
#[derive(Clone)]
pub struct Callable {
    label: Option<String>,
    params: Vec<ParamSpec>,
    returns: Option<Key>,
    func: CallableFn,
}

impl Callable {
    /// Wrap a closure. Metadata is attached fluently afterwards.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            label: None,
            params: Vec::new(),
            returns: None,
            func: Arc::new(func),
        }
    }

    /// Attach a display name used in diagnostics.
    #[inline]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a parameter; call order defines positions.
    #[inline]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Declare the return type. Factory bindings require this.
    #[inline]
    pub fn returns(mut self, ty: impl Into<Key>) -> Self {
        self.returns = Some(ty.into());
        self
    }

    /// The display name, or `~callback~` when unnamed.
    #[inline]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("~callback~")
    }

    /// Parameters in declaration order.
    #[inline]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// The declared return type, if any.
    #[inline]
    pub fn return_type(&self) -> Option<&Key> {
        self.returns.as_ref()
    }

    /// Invoke the closure with an already-forged argument list.
    #[inline]
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("label", &self.label())
            .field("params", &self.params.len())
            .field("returns", &self.returns)
            .finish()
    }
}
