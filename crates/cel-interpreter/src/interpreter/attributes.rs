//! Attributes: variable references plus chains of field and index qualifiers.
//!
//! `a.b[c].d` plans into one attribute rooted at `a` with three qualifiers,
//! resolved in a single step at evaluation time. Three shapes exist:
//!
//! - **Absolute**: a root name with its container candidates, tried in order
//!   against the activation and then the type provider.
//! - **Maybe**: the reading of a dotted chain that is not yet known to be a
//!   qualified variable name. `a.b.c` may be the variable `a.b.c`, the
//!   variable `a.b` with field `c`, or `a` with fields `b` and `c`; the most
//!   specific reading that resolves wins.
//! - **Relative**: qualifiers applied to the result of an arbitrary
//!   expression, as in `[x, y][0]` or `f(x).field`.

use std::fmt;
use std::sync::Arc;

use cel_ast::ExprId;

use super::{Cost, Interpretable};
use crate::container::Container;
use crate::eval::{Activation, EvalError, TypeProvider, Value};

/// How a qualifier picks the next value.
#[derive(Clone)]
pub enum QualifierKind {
    /// `.field`
    Field(Arc<str>),
    /// `[constant]`
    Index(Value),
    /// `[expression]`, evaluated per run.
    Computed(Arc<dyn Interpretable>),
}

impl fmt::Debug for QualifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualifierKind::Field(name) => write!(f, "Field({})", name),
            QualifierKind::Index(key) => write!(f, "Index({})", key),
            QualifierKind::Computed(node) => write!(f, "Computed(#{})", node.id()),
        }
    }
}

/// One step of an attribute's qualifier chain.
#[derive(Debug, Clone)]
pub struct Qualifier {
    /// Id of the select or index expression this step came from.
    pub id: ExprId,
    pub kind: QualifierKind,
    /// `has(x.f)`: report presence instead of reading the field.
    pub presence_test: bool,
}

impl Qualifier {
    pub fn field(id: ExprId, name: &str) -> Self {
        Self::new(id, QualifierKind::Field(Arc::from(name)))
    }

    pub fn index(id: ExprId, key: Value) -> Self {
        Self::new(id, QualifierKind::Index(key))
    }

    pub fn computed(id: ExprId, node: Arc<dyn Interpretable>) -> Self {
        Self::new(id, QualifierKind::Computed(node))
    }

    fn new(id: ExprId, kind: QualifierKind) -> Self {
        Self {
            id,
            kind,
            presence_test: false,
        }
    }

    pub fn presence_test(mut self) -> Self {
        self.presence_test = true;
        self
    }

    /// The field name or index key this step selects.
    fn key(&self, activation: &dyn Activation) -> Value {
        match &self.kind {
            QualifierKind::Field(name) => Value::string(name.clone()),
            QualifierKind::Index(key) => key.clone(),
            QualifierKind::Computed(node) => node.eval(activation),
        }
    }

    /// Applies this step to `obj`. Error and unknown inputs pass through.
    pub fn qualify(&self, activation: &dyn Activation, obj: &Value) -> Value {
        if obj.is_error_or_unknown() {
            return obj.clone();
        }
        if let QualifierKind::Field(name) = &self.kind {
            return if self.presence_test {
                obj.has_field(name)
            } else {
                obj.select_field(name)
            };
        }
        let key = self.key(activation);
        if key.is_error_or_unknown() {
            return key;
        }
        match (&key, self.presence_test) {
            (Value::String(name), true) => obj.has_field(name),
            _ => obj.index(&key),
        }
    }

    fn cost(&self) -> Cost {
        match &self.kind {
            QualifierKind::Computed(node) => node.cost(),
            _ => Cost::ZERO,
        }
    }
}

fn apply_qualifiers(activation: &dyn Activation, value: Value, qualifiers: &[Qualifier]) -> Value {
    qualifiers
        .iter()
        .fold(value, |obj, qualifier| qualifier.qualify(activation, &obj))
}

/// A root variable, its candidate names and its qualifiers.
#[derive(Debug, Clone)]
pub struct AbsoluteAttribute {
    id: ExprId,
    names: Vec<String>,
    qualifiers: Vec<Qualifier>,
    provider: Arc<dyn TypeProvider>,
    partial: bool,
}

impl AbsoluteAttribute {
    pub fn id(&self) -> ExprId {
        self.id
    }

    /// Fully qualified names to try, most-qualified first.
    pub fn candidate_names(&self) -> &[String] {
        &self.names
    }

    pub fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }

    fn resolve(&self, activation: &dyn Activation) -> Value {
        if self.partial {
            if let Some(unknown) = self.match_unknown_patterns(activation) {
                return unknown;
            }
        }
        for name in &self.names {
            if let Some(value) = activation.resolve(name) {
                return apply_qualifiers(activation, value, &self.qualifiers);
            }
            if self.qualifiers.is_empty() {
                if let Some(value) = self.provider.find_ident(name) {
                    return value;
                }
            }
        }
        Value::error(EvalError::unknown_identifier(self.display_name()))
    }

    /// The unknown this attribute evaluates to under the activation's
    /// unknown patterns, if any pattern covers it.
    ///
    /// The unknown carries the id of the last qualifier the matching pattern
    /// compared, or the attribute id when no qualifier was compared.
    fn match_unknown_patterns(&self, activation: &dyn Activation) -> Option<Value> {
        let candidates: Vec<_> = self
            .names
            .iter()
            .flat_map(|name| activation.unknown_patterns(name))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        if self.qualifiers.is_empty() {
            tracing::trace!(attribute = self.display_name(), "matched unknown pattern");
            return Some(Value::unknown(self.id));
        }

        let mut keys = Vec::with_capacity(self.qualifiers.len());
        for qualifier in &self.qualifiers {
            let key = qualifier.key(activation);
            if key.is_error_or_unknown() {
                return Some(key);
            }
            keys.push((qualifier.id, key));
        }

        candidates.into_iter().find_map(|pattern| {
            let mut matched_id = self.id;
            for ((id, key), expected) in keys.iter().zip(pattern.qualifiers()) {
                matched_id = *id;
                if !expected.matches(key) {
                    return None;
                }
            }
            tracing::trace!(pattern = %pattern, "matched unknown pattern");
            Some(Value::unknown(matched_id))
        })
    }

    fn display_name(&self) -> &str {
        self.names.last().map(String::as_str).unwrap_or_default()
    }

    fn cost(&self) -> Cost {
        Cost::sum(self.qualifiers.iter().map(Qualifier::cost)).plus(1)
    }
}

/// A variable reference plus a chain of qualifiers.
#[derive(Debug, Clone)]
pub enum Attribute {
    Absolute(AbsoluteAttribute),
    Maybe {
        id: ExprId,
        /// Readings of the chain, most specific first.
        attrs: Vec<AbsoluteAttribute>,
    },
    Relative {
        id: ExprId,
        operand: Arc<dyn Interpretable>,
        qualifiers: Vec<Qualifier>,
    },
}

impl Attribute {
    pub fn id(&self) -> ExprId {
        match self {
            Attribute::Absolute(attr) => attr.id,
            Attribute::Maybe { id, .. } | Attribute::Relative { id, .. } => *id,
        }
    }

    pub fn add_qualifier(&mut self, qualifier: Qualifier) {
        match self {
            Attribute::Absolute(attr) => attr.qualifiers.push(qualifier),
            Attribute::Relative { qualifiers, .. } => qualifiers.push(qualifier),
            Attribute::Maybe { attrs, .. } => {
                // A plain field select may extend a qualified variable name,
                // so `a.b` also reads as the variable `a.b`.
                let mut extended = Vec::new();
                if let (QualifierKind::Field(field), false) =
                    (&qualifier.kind, qualifier.presence_test)
                {
                    for attr in attrs.iter().filter(|a| a.qualifiers.is_empty()) {
                        extended.extend(attr.names.iter().map(|n| format!("{}.{}", n, field)));
                    }
                }
                for attr in attrs.iter_mut() {
                    attr.qualifiers.push(qualifier.clone());
                }
                if let (false, Some(template)) = (extended.is_empty(), attrs.first()) {
                    let reading = AbsoluteAttribute {
                        id: qualifier.id,
                        names: extended,
                        qualifiers: Vec::new(),
                        provider: template.provider.clone(),
                        partial: template.partial,
                    };
                    attrs.insert(0, reading);
                }
            }
        }
    }

    /// Resolves the attribute. Never fails outside the value domain.
    pub fn resolve(&self, activation: &dyn Activation) -> Value {
        match self {
            Attribute::Absolute(attr) => attr.resolve(activation),
            Attribute::Relative {
                operand,
                qualifiers,
                ..
            } => apply_qualifiers(activation, operand.eval(activation), qualifiers),
            Attribute::Maybe { attrs, .. } => {
                let mut missing = None;
                for attr in attrs {
                    let value = attr.resolve(activation);
                    if value.as_error().is_some_and(EvalError::is_missing_attribute) {
                        missing.get_or_insert(value);
                        continue;
                    }
                    return value;
                }
                missing.unwrap_or_else(|| {
                    Value::error(EvalError::internal("attribute has no candidate readings"))
                })
            }
        }
    }

    pub fn qualifiers(&self) -> &[Qualifier] {
        match self {
            Attribute::Absolute(attr) => &attr.qualifiers,
            Attribute::Relative { qualifiers, .. } => qualifiers,
            Attribute::Maybe { attrs, .. } => {
                attrs.last().map_or(&[][..], |a| a.qualifiers.as_slice())
            }
        }
    }

    /// Nodes evaluated while resolving: computed qualifiers and the operand
    /// of a relative attribute.
    pub fn children(&self) -> Vec<&dyn Interpretable> {
        let mut out: Vec<&dyn Interpretable> = Vec::new();
        if let Attribute::Relative { operand, .. } = self {
            out.push(operand.as_ref());
        }
        for qualifier in self.qualifiers() {
            if let QualifierKind::Computed(node) = &qualifier.kind {
                out.push(node.as_ref());
            }
        }
        out
    }

    pub fn cost(&self) -> Cost {
        match self {
            Attribute::Absolute(attr) => attr.cost(),
            Attribute::Relative {
                operand,
                qualifiers,
                ..
            } => operand
                .cost()
                .add(Cost::sum(qualifiers.iter().map(Qualifier::cost)))
                .plus(1),
            Attribute::Maybe { attrs, .. } => {
                let costs: Vec<Cost> = attrs.iter().map(AbsoluteAttribute::cost).collect();
                Cost::new(
                    costs.iter().map(|c| c.min).min().unwrap_or(0),
                    costs.iter().map(|c| c.max).max().unwrap_or(0),
                )
            }
        }
    }
}

/// Creates attributes bound to one container and type provider.
#[derive(Debug, Clone)]
pub struct AttributeFactory {
    container: Container,
    provider: Arc<dyn TypeProvider>,
    partial: bool,
}

impl AttributeFactory {
    pub fn new(container: Container, provider: Arc<dyn TypeProvider>) -> Self {
        Self {
            container,
            provider,
            partial: false,
        }
    }

    /// A factory whose attributes consult the activation's unknown patterns
    /// before resolving.
    pub fn partial(container: Container, provider: Arc<dyn TypeProvider>) -> Self {
        Self {
            partial: true,
            ..Self::new(container, provider)
        }
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn provider(&self) -> &Arc<dyn TypeProvider> {
        &self.provider
    }

    /// An attribute over already-resolved candidate names.
    pub fn absolute(&self, id: ExprId, names: Vec<String>) -> Attribute {
        Attribute::Absolute(self.absolute_reading(id, names))
    }

    /// An attribute for a name as written, resolved through the container.
    pub fn maybe(&self, id: ExprId, name: &str) -> Attribute {
        Attribute::Maybe {
            id,
            attrs: vec![self.absolute_reading(id, self.container.candidate_names(name))],
        }
    }

    pub fn relative(&self, id: ExprId, operand: Arc<dyn Interpretable>) -> Attribute {
        Attribute::Relative {
            id,
            operand,
            qualifiers: Vec::new(),
        }
    }

    fn absolute_reading(&self, id: ExprId, names: Vec<String>) -> AbsoluteAttribute {
        AbsoluteAttribute {
            id,
            names,
            qualifiers: Vec::new(),
            provider: self.provider.clone(),
            partial: self.partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalErrorKind, MapActivation, PartialActivation, TypeRegistry, ValueMap};
    use crate::interpreter::AttributePattern;

    fn factory(container: &str) -> AttributeFactory {
        AttributeFactory::new(
            Container::new(container).unwrap(),
            Arc::new(TypeRegistry::new()),
        )
    }

    fn nested() -> Value {
        let inner = ValueMap::from_entries([("b".into(), Value::Int(1))]);
        Value::map([("a".into(), Value::from(inner))])
    }

    #[test]
    fn test_qualifier_chain() {
        let activation = MapActivation::new().with("x", nested());
        let mut attr = factory("").maybe(1, "x");
        attr.add_qualifier(Qualifier::field(2, "a"));
        let mut found = attr.clone();
        found.add_qualifier(Qualifier::field(3, "b"));
        assert_eq!(found.resolve(&activation), Value::Int(1));

        attr.add_qualifier(Qualifier::field(3, "c"));
        let err = attr.resolve(&activation);
        assert_eq!(err.as_error().map(|e| e.kind), Some(EvalErrorKind::NoSuchField));
    }

    #[test]
    fn test_qualified_variable_name_preferred() {
        let activation = MapActivation::new()
            .with("a.b", 10)
            .with("a", Value::map([("b".into(), Value::Int(20))]));
        let mut attr = factory("").maybe(1, "a");
        attr.add_qualifier(Qualifier::field(2, "b"));
        assert_eq!(attr.resolve(&activation), Value::Int(10));
    }

    #[test]
    fn test_container_candidates() {
        let activation = MapActivation::new().with("ns.x", 1).with("x", 2);
        assert_eq!(factory("ns").maybe(1, "x").resolve(&activation), Value::Int(1));
        assert_eq!(factory("other").maybe(1, "x").resolve(&activation), Value::Int(2));
    }

    #[test]
    fn test_missing_variable() {
        let err = factory("").maybe(1, "missing").resolve(&MapActivation::new());
        assert!(err.as_error().is_some_and(EvalError::is_missing_attribute));
        assert_eq!(err.as_error().unwrap().to_string(), "no such attribute: missing");
    }

    #[test]
    fn test_type_names_resolve_through_provider() {
        let attr = factory("").absolute(1, vec!["int".to_string()]);
        assert_eq!(attr.resolve(&MapActivation::new()), Value::new_type("int"));
    }

    #[test]
    fn test_unknown_pattern_short_circuits() {
        let partial = AttributeFactory::partial(Container::root(), Arc::new(TypeRegistry::new()));
        let activation = PartialActivation::new(
            MapActivation::new().with("a", nested()),
            [AttributePattern::new("a").qualify_string("a")],
        );

        let mut covered = partial.maybe(1, "a");
        covered.add_qualifier(Qualifier::field(2, "a"));
        covered.add_qualifier(Qualifier::field(3, "b"));
        let value = covered.resolve(&activation);
        assert_eq!(value.as_unknown().map(|u| u.ids().collect::<Vec<_>>()), Some(vec![2]));

        let mut other = partial.maybe(4, "a");
        other.add_qualifier(Qualifier::field(5, "z"));
        let err = other.resolve(&activation);
        assert_eq!(err.as_error().map(|e| e.kind), Some(EvalErrorKind::NoSuchField));
    }

    #[test]
    fn test_patterns_ignored_without_partial_factory() {
        let activation = PartialActivation::new(
            MapActivation::new().with("a", 1),
            [AttributePattern::new("a")],
        );
        assert_eq!(factory("").maybe(1, "a").resolve(&activation), Value::Int(1));
    }

    #[test]
    fn test_presence_test() {
        let activation = MapActivation::new().with("x", nested());
        let mut attr = factory("").maybe(1, "x");
        attr.add_qualifier(Qualifier::field(2, "a"));
        attr.add_qualifier(Qualifier::field(3, "b").presence_test());
        assert_eq!(attr.resolve(&activation), Value::Bool(true));
    }
}
