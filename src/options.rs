//! Dotted-path lookups over nested option maps
//!
//! Providers often carry a nested bag of configuration. `Options` addresses
//! values inside it with `.`-separated paths, resolved by plain recursive
//! descent over [`Value::Map`] levels.

use crate::value::Value;
use std::collections::BTreeMap;

/// Nested key-value option bag addressed by dotted paths.
///
/// Missing segments are simply absent, never an error.
///
/// # Examples
///
/// ```rust
/// use kiln::Options;
///
/// let mut options = Options::new();
/// options.set("database.pool.size", 8);
/// options.set("database.dsn", "postgres://localhost");
///
/// assert_eq!(options.get("database.pool.size").unwrap().as_int(), Some(8));
/// assert!(options.get("database.pool.timeout").is_none());
/// assert!(options.get("mail").is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Options {
    root: BTreeMap<String, Value>,
}

impl Options {
    /// An empty bag.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing nested map.
    #[inline]
    pub fn from_map(root: BTreeMap<String, Value>) -> Self {
        Self { root }
    }

    /// Look up the value at `path`, descending one map level per segment.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = segments(path);
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            current = current.as_map()?.get(part)?;
        }
        Some(current)
    }

    /// Whether a value exists at `path`.
    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Assign `value` at `path`, creating intermediate maps as needed.
    /// A non-map value sitting on the path is replaced by a map.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let parts: Vec<&str> = segments(path).collect();
        if !parts.is_empty() {
            set_in(&mut self.root, &parts, value.into());
        }
    }

    /// The underlying nested map.
    #[inline]
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.root
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

fn set_in(map: &mut BTreeMap<String, Value>, parts: &[&str], value: Value) {
    match parts {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let slot = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if let Value::Map(inner) = slot {
                set_in(inner, rest, value);
            } else {
                let mut inner = BTreeMap::new();
                set_in(&mut inner, rest, value);
                *slot = Value::Map(inner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set_round_trip() {
        let mut options = Options::new();
        options.set("kernel.debug", true);
        options.set("kernel.middleware.timeout", 30);

        assert_eq!(options.get("kernel.debug").unwrap().as_bool(), Some(true));
        assert_eq!(
            options.get("kernel.middleware.timeout").unwrap().as_int(),
            Some(30)
        );
        assert!(options.get("kernel.middleware").unwrap().as_map().is_some());
    }

    #[test]
    fn test_missing_paths_are_none() {
        let mut options = Options::new();
        options.set("a.b", 1);

        assert!(options.get("a.c").is_none());
        assert!(options.get("a.b.c").is_none());
        assert!(options.get("x").is_none());
        assert!(options.get("").is_none());
        assert!(!options.contains("a.c"));
    }

    #[test]
    fn test_set_replaces_scalar_on_path_with_map() {
        let mut options = Options::new();
        options.set("cache", "memory");
        options.set("cache.size", 64);

        assert!(options.get("cache").unwrap().as_map().is_some());
        assert_eq!(options.get("cache.size").unwrap().as_int(), Some(64));
    }

    #[test]
    fn test_set_overwrites_leaf() {
        let mut options = Options::new();
        options.set("level", "info");
        options.set("level", "debug");

        assert_eq!(options.get("level").unwrap().as_str(), Some("debug"));
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let mut options = Options::new();
        options.set("a..b", 1);

        assert_eq!(options.get("a.b").unwrap().as_int(), Some(1));
        assert_eq!(options.get("a..b").unwrap().as_int(), Some(1));
    }
}
