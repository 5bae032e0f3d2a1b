//! Dynamic values, type-tagged instances and parameter bags
//!
//! The container moves arguments and forged instances around as [`Value`]s: a
//! small dynamic union covering scalars, collections and reference-counted
//! service instances ([`Object`]). Parameter overrides travel in a
//! [`Parameters`] bag keyed by position or by name.

use crate::key::Key;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Object
// =============================================================================

/// A forged service instance: a type name paired with a shared payload.
///
/// Cloning an `Object` shares the payload by reference, which is what makes
/// singleton caching and `split`/`expel` copies hand out the same underlying
/// instance.
///
/// # Examples
///
/// ```rust
/// use kiln::Object;
///
/// struct Clock { ticks: u64 }
///
/// let object = Object::new("app::clock", Clock { ticks: 7 });
/// assert_eq!(object.type_name().as_str(), "app::clock");
/// assert_eq!(object.downcast_ref::<Clock>().unwrap().ticks, 7);
/// ```
#[derive(Clone)]
pub struct Object {
    type_name: Key,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Object {
    /// Wrap a value under its concrete type name.
    #[inline]
    pub fn new<T: Send + Sync + 'static>(type_name: impl Into<Key>, payload: T) -> Self {
        Self {
            type_name: type_name.into(),
            payload: Arc::new(payload),
        }
    }

    /// Wrap an already-shared value under its concrete type name.
    #[inline]
    pub fn from_arc<T: Send + Sync + 'static>(type_name: impl Into<Key>, payload: Arc<T>) -> Self {
        Self {
            type_name: type_name.into(),
            payload,
        }
    }

    /// The normalized concrete type name this instance was forged as.
    #[inline]
    pub fn type_name(&self) -> &Key {
        &self.type_name
    }

    /// Borrow the payload as `T`, if that is what it holds.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    /// Share the payload as `Arc<T>`, if that is what it holds.
    #[inline]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.payload).downcast::<T>().ok()
    }

    /// Whether two objects share the same payload allocation.
    ///
    /// This is the identity test for singleton semantics.
    #[inline]
    pub fn shares_payload(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Value
// =============================================================================

/// Dynamic value passed through parameter maps and returned by forging.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent / nil
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Str(String),
    /// Ordered list
    List(Vec<Value>),
    /// String-keyed map
    Map(BTreeMap<String, Value>),
    /// A forged or pre-built service instance
    Object(Object),
}

impl Value {
    /// Wrap a value as an [`Object`] under its concrete type name.
    #[inline]
    pub fn object<T: Send + Sync + 'static>(type_name: impl Into<Key>, payload: T) -> Self {
        Value::Object(Object::new(type_name, payload))
    }

    /// Short name of the value's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    /// Whether this is `Value::Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    #[inline]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Consume the value, keeping only an object.
    #[inline]
    pub fn into_object(self) -> Option<Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Share the wrapped instance as `Arc<T>`, if this is an object of `T`.
    ///
    /// Convenient inside constructor closures:
    ///
    /// ```rust
    /// use kiln::Value;
    /// use std::sync::Arc;
    ///
    /// struct Engine;
    ///
    /// let value = Value::object("engine", Engine);
    /// let engine: Arc<Engine> = value.instance_of::<Engine>().unwrap();
    /// # let _ = engine;
    /// ```
    #[inline]
    pub fn instance_of<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.as_object().and_then(|object| object.downcast::<T>())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// Keys a parameter override either by position or by name.
pub trait ParamKey {
    /// Store `value` under this key in `bag`.
    fn store(self, bag: &mut Parameters, value: Value);
}

impl ParamKey for usize {
    fn store(self, bag: &mut Parameters, value: Value) {
        bag.by_position.insert(self, value);
    }
}

impl ParamKey for &str {
    fn store(self, bag: &mut Parameters, value: Value) {
        bag.by_name.insert(self.to_string(), value);
    }
}

impl ParamKey for String {
    fn store(self, bag: &mut Parameters, value: Value) {
        bag.by_name.insert(self, value);
    }
}

/// Position-or-name keyed argument values.
///
/// Descriptor-level parameters are merged *under* caller-supplied parameters,
/// so the caller wins per key; see [`Parameters::merge_defaults`].
///
/// # Examples
///
/// ```rust
/// use kiln::{params, Parameters};
///
/// let bag = params! { 0 => "dsn", "retries" => 3 };
/// assert_eq!(bag.by_position(0).unwrap().as_str(), Some("dsn"));
/// assert_eq!(bag.by_name("retries").unwrap().as_int(), Some(3));
/// assert!(Parameters::new().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Parameters {
    by_position: BTreeMap<usize, Value>,
    by_name: BTreeMap<String, Value>,
}

impl Parameters {
    /// Create an empty bag.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under a position (`usize`) or a name (`&str`).
    #[inline]
    pub fn insert(&mut self, key: impl ParamKey, value: impl Into<Value>) -> &mut Self {
        key.store(self, value.into());
        self
    }

    /// Builder-style [`insert`](Self::insert).
    #[inline]
    pub fn with(mut self, key: impl ParamKey, value: impl Into<Value>) -> Self {
        key.store(&mut self, value.into());
        self
    }

    /// Value stored for a position, if any.
    #[inline]
    pub fn by_position(&self, position: usize) -> Option<&Value> {
        self.by_position.get(&position)
    }

    /// Value stored for a name, if any.
    #[inline]
    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.by_name.get(name)
    }

    /// Fill in keys from `defaults` that this bag does not set itself.
    ///
    /// Existing keys are never overwritten; the receiving bag's values win.
    pub fn merge_defaults(&mut self, defaults: &Parameters) {
        for (position, value) in &defaults.by_position {
            self.by_position.entry(*position).or_insert_with(|| value.clone());
        }
        for (name, value) in &defaults.by_name {
            self.by_name.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }

    /// Copy all keys from `overrides` into this bag, overwriting on conflict.
    pub fn extend_from(&mut self, overrides: &Parameters) {
        for (position, value) in &overrides.by_position {
            self.by_position.insert(*position, value.clone());
        }
        for (name, value) in &overrides.by_name {
            self.by_name.insert(name.clone(), value.clone());
        }
    }

    /// Number of stored overrides across both key spaces.
    #[inline]
    pub fn len(&self) -> usize {
        self.by_position.len() + self.by_name.len()
    }

    /// Whether no overrides are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty() && self.by_name.is_empty()
    }
}

/// Build a [`Parameters`] bag from `key => value` entries.
///
/// Integer keys address positions, string keys address parameter names:
///
/// ```rust
/// use kiln::params;
///
/// let bag = params! { 0 => "first", "level" => "debug", 2 => 42 };
/// assert_eq!(bag.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Parameters::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut bag = $crate::Parameters::new();
        $( bag.insert($key, $value); )+
        bag
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_round_trip() {
        struct Session {
            id: u32,
        }

        let object = Object::new("Session", Session { id: 9 });
        assert_eq!(object.type_name().as_str(), "session");
        assert_eq!(object.downcast_ref::<Session>().unwrap().id, 9);
        assert!(object.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_object_clone_shares_payload() {
        let object = Object::new("a", 1u8);
        let clone = object.clone();
        assert!(object.shares_payload(&clone));

        let other = Object::new("a", 1u8);
        assert!(!object.shares_payload(&other));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from(3).as_int(), Some(3));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
        assert!(Value::from(3).as_str().is_none());
        assert_eq!(Value::from(2.5).kind(), "float");
    }

    #[test]
    fn test_params_macro_key_spaces() {
        let bag = params! { 0 => "zero", "name" => "named", 1 => 10 };
        assert_eq!(bag.by_position(0).unwrap().as_str(), Some("zero"));
        assert_eq!(bag.by_position(1).unwrap().as_int(), Some(10));
        assert_eq!(bag.by_name("name").unwrap().as_str(), Some("named"));
        assert!(bag.by_name("zero").is_none());
    }

    #[test]
    fn test_merge_defaults_keeps_own_keys() {
        let mut bag = params! { 0 => "mine", "shared" => "mine" };
        let defaults = params! { 0 => "theirs", "shared" => "theirs", "extra" => true };

        bag.merge_defaults(&defaults);

        assert_eq!(bag.by_position(0).unwrap().as_str(), Some("mine"));
        assert_eq!(bag.by_name("shared").unwrap().as_str(), Some("mine"));
        assert_eq!(bag.by_name("extra").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_extend_from_overwrites() {
        let mut bag = params! { "level" => "info" };
        bag.extend_from(&params! { "level" => "debug", 0 => 1 });

        assert_eq!(bag.by_name("level").unwrap().as_str(), Some("debug"));
        assert_eq!(bag.by_position(0).unwrap().as_int(), Some(1));
    }
}
