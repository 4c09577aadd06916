//! Variable bindings for CEL evaluation.
//!
//! An `Activation` resolves variable names to values during evaluation.
//! Activations layer: a [`HierarchicalActivation`] checks its child before its
//! parent, and a [`PartialActivation`] additionally declares attribute patterns
//! whose values are unknown.

use std::collections::HashMap;
use std::sync::Arc;

use super::Value;
use crate::interpreter::AttributePattern;

/// Resolves variable bindings during evaluation.
pub trait Activation: Send + Sync {
    /// Resolve a variable name to its value, or `None` when unbound.
    fn resolve(&self, name: &str) -> Option<Value>;

    fn has(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Patterns declaring attributes rooted at variable `name` unknown.
    fn unknown_patterns(&self, _name: &str) -> Vec<&AttributePattern> {
        Vec::new()
    }
}

/// A simple activation backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapActivation {
    bindings: HashMap<String, Value>,
}

impl MapActivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapActivation {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Activation for MapActivation {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// Two layered activations: `child` shadows `parent`.
///
/// Comprehensions layer their loop scope over the enclosing activation this
/// way, and programs layer per-call input over their global bindings.
#[derive(Clone, Copy)]
pub struct HierarchicalActivation<'a> {
    parent: &'a dyn Activation,
    child: &'a dyn Activation,
}

impl<'a> HierarchicalActivation<'a> {
    pub fn new(parent: &'a dyn Activation, child: &'a dyn Activation) -> Self {
        Self { parent, child }
    }

    pub fn parent(&self) -> &'a dyn Activation {
        self.parent
    }
}

impl Activation for HierarchicalActivation<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.child
            .resolve(name)
            .or_else(|| self.parent.resolve(name))
    }

    fn has(&self, name: &str) -> bool {
        self.child.has(name) || self.parent.has(name)
    }

    /// The child's patterns, followed by the parent's unless the child
    /// binds `name` and so shadows them.
    fn unknown_patterns(&self, name: &str) -> Vec<&AttributePattern> {
        let mut patterns = self.child.unknown_patterns(name);
        if !self.child.has(name) {
            patterns.extend(self.parent.unknown_patterns(name));
        }
        patterns
    }
}

/// Wraps an activation with a set of unknown attribute patterns.
///
/// Attributes matching a pattern evaluate to unknown without consulting the
/// wrapped bindings.
#[derive(Debug, Clone)]
pub struct PartialActivation<A> {
    inner: A,
    patterns: Vec<AttributePattern>,
}

impl<A: Activation> PartialActivation<A> {
    pub fn new(inner: A, patterns: impl IntoIterator<Item = AttributePattern>) -> Self {
        Self {
            inner,
            patterns: patterns.into_iter().collect(),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: Activation> Activation for PartialActivation<A> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.inner.resolve(name)
    }

    fn has(&self, name: &str) -> bool {
        self.inner.has(name)
    }

    fn unknown_patterns(&self, name: &str) -> Vec<&AttributePattern> {
        self.patterns
            .iter()
            .filter(|p| p.matches_variable(name))
            .collect()
    }
}

/// An empty activation with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl EmptyActivation {
    pub fn new() -> Self {
        Self
    }
}

impl Activation for EmptyActivation {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }

    fn has(&self, _name: &str) -> bool {
        false
    }
}

impl<T: Activation + ?Sized> Activation for Arc<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }

    fn unknown_patterns(&self, name: &str) -> Vec<&AttributePattern> {
        (**self).unknown_patterns(name)
    }
}

impl<T: Activation + ?Sized> Activation for Box<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }

    fn unknown_patterns(&self, name: &str) -> Vec<&AttributePattern> {
        (**self).unknown_patterns(name)
    }
}

impl<T: Activation + ?Sized> Activation for &T {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }

    fn unknown_patterns(&self, name: &str) -> Vec<&AttributePattern> {
        (**self).unknown_patterns(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_activation() {
        let mut activation = MapActivation::new();
        activation.insert("x", 42i64);
        activation.insert("name", "hello");

        assert_eq!(activation.resolve("x"), Some(Value::Int(42)));
        assert_eq!(activation.resolve("name"), Some(Value::from("hello")));
        assert_eq!(activation.resolve("unknown"), None);
        assert!(activation.has("x"));
        assert!(!activation.has("unknown"));
    }

    #[test]
    fn test_hierarchical_activation() {
        let parent: MapActivation = [("x", 1), ("y", 2)].into_iter().collect();
        let child = MapActivation::new().with("x", 10);
        let layered = HierarchicalActivation::new(&parent, &child);

        assert_eq!(layered.resolve("x"), Some(Value::Int(10)));
        assert_eq!(layered.resolve("y"), Some(Value::Int(2)));
        assert_eq!(layered.resolve("z"), None);
    }

    #[test]
    fn test_patterns_visible_through_layers() {
        let partial = PartialActivation::new(
            MapActivation::new().with("a", 1),
            [AttributePattern::new("b")],
        );
        let scope = MapActivation::new().with("i", 0);
        let layered = HierarchicalActivation::new(&partial, &scope);

        assert_eq!(layered.unknown_patterns("b").len(), 1);
        assert!(layered.unknown_patterns("a").is_empty());
        assert_eq!(layered.resolve("a"), Some(Value::Int(1)));
        assert!(EmptyActivation::new().unknown_patterns("b").is_empty());
    }

    #[test]
    fn test_child_binding_shadows_parent_patterns() {
        let partial = PartialActivation::new(MapActivation::new(), [AttributePattern::new("i")]);
        let scope = MapActivation::new().with("i", 0);
        let layered = HierarchicalActivation::new(&partial, &scope);

        assert!(layered.unknown_patterns("i").is_empty());
        assert_eq!(layered.resolve("i"), Some(Value::Int(0)));
    }

    #[test]
    fn test_patterns_merge_across_partial_layers() {
        let globals = PartialActivation::new(MapActivation::new(), [AttributePattern::new("g")]);
        let input = PartialActivation::new(MapActivation::new(), [AttributePattern::new("x")]);
        let layered = HierarchicalActivation::new(&globals, &input);

        assert_eq!(layered.unknown_patterns("g").len(), 1);
        assert_eq!(layered.unknown_patterns("x").len(), 1);
    }

    #[test]
    fn test_insert_converts_host_numbers() {
        let mut activation = MapActivation::new();
        activation.insert("count", 42);
        activation.insert("small", 5i8);
        activation.insert("len", vec![1u8, 2, 3].len());

        assert_eq!(activation.resolve("count"), Some(Value::Int(42)));
        assert_eq!(activation.resolve("small"), Some(Value::Int(5)));
        assert_eq!(activation.resolve("len"), Some(Value::UInt(3)));
    }
}
