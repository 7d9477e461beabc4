mod class;
pub mod error;
pub mod formatter;
mod function;

pub use class::{ClassDefinition, Instance};
use compact_str::{format_compact, CompactString};
use error::OperationError;
pub use function::{Callable, FunctionValue};
use parking_lot::Mutex;
use std::{fmt::Display, sync::Arc};

use crate::lexer::Span;

pub type SharedList = Arc<Mutex<Vec<Value>>>;
pub type SharedMap = Arc<Mutex<ValueMap>>;

/// A runtime value tagged with the span of the expression that produced it.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Number(f64),
    String(CompactString),
    List(SharedList),
    Map(SharedMap),
    Function(Arc<FunctionValue>),
    Instance(Arc<Instance>),
}

impl Value {
    pub fn new(kind: ValueKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn null(span: Span) -> Self {
        Self::new(ValueKind::Null, span)
    }

    pub fn boolean(value: bool, span: Span) -> Self {
        Self::new(ValueKind::Boolean(value), span)
    }

    pub fn number(value: f64, span: Span) -> Self {
        Self::new(ValueKind::Number(value), span)
    }

    pub fn string(value: impl Into<CompactString>, span: Span) -> Self {
        Self::new(ValueKind::String(value.into()), span)
    }

    pub fn list(values: Vec<Value>, span: Span) -> Self {
        Self::new(ValueKind::List(Arc::new(Mutex::new(values))), span)
    }

    pub fn map(map: ValueMap, span: Span) -> Self {
        Self::new(ValueKind::Map(Arc::new(Mutex::new(map))), span)
    }

    pub fn function(function: FunctionValue, span: Span) -> Self {
        Self::new(ValueKind::Function(Arc::new(function)), span)
    }

    /// Rebinds the value to a new source span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The copy made when a value flows into a new binding or expression.
    /// Primitives are copied outright while lists, maps and instances keep
    /// sharing their contents.
    pub fn copied(&self, span: Span) -> Self {
        self.clone().with_span(span)
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ValueKind::Null => "Null",
            ValueKind::Boolean(_) => "Boolean",
            ValueKind::Number(_) => "Number",
            ValueKind::String(_) => "String",
            ValueKind::List(_) => "List",
            ValueKind::Map(_) => "Map",
            ValueKind::Function(_) => "Function",
            ValueKind::Instance(_) => "Instance",
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Number(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_equal(&self, other: &Value) -> bool {
        self.equal_within(other, &mut Vec::new())
    }

    /// Structural equality. Container pairs already under comparison count
    /// as equal, so cyclic lists and maps terminate.
    fn equal_within(&self, other: &Value, visited: &mut Vec<(usize, usize)>) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::Boolean(lhs), ValueKind::Boolean(rhs)) => lhs == rhs,
            (ValueKind::Number(lhs), ValueKind::Number(rhs)) => lhs == rhs,
            (ValueKind::String(lhs), ValueKind::String(rhs)) => lhs == rhs,
            (ValueKind::List(lhs), ValueKind::List(rhs)) => {
                let pair = (address(lhs), address(rhs));
                if Arc::ptr_eq(lhs, rhs) || visited.contains(&pair) {
                    return true;
                }
                visited.push(pair);
                // Snapshot both sides so nested comparisons never hold a lock.
                let lhs = lhs.lock().clone();
                let rhs = rhs.lock().clone();
                lhs.len() == rhs.len()
                    && lhs
                        .iter()
                        .zip(rhs.iter())
                        .all(|(l, r)| l.equal_within(r, visited))
            }
            (ValueKind::Map(lhs), ValueKind::Map(rhs)) => {
                let pair = (address(lhs), address(rhs));
                if Arc::ptr_eq(lhs, rhs) || visited.contains(&pair) {
                    return true;
                }
                visited.push(pair);
                let lhs = lhs.lock().clone();
                let rhs = rhs.lock().clone();
                lhs.len() == rhs.len()
                    && lhs.iter().all(|(key, value)| {
                        rhs.position(key).is_some_and(|index| {
                            value.equal_within(&rhs.entries[index].1, visited)
                        })
                    })
            }
            (ValueKind::Function(lhs), ValueKind::Function(rhs)) => Arc::ptr_eq(lhs, rhs),
            (ValueKind::Instance(lhs), ValueKind::Instance(rhs)) => Arc::ptr_eq(lhs, rhs),
            _ => false,
        }
    }
}

fn address<T>(shared: &Arc<T>) -> usize {
    Arc::as_ptr(shared) as *const () as usize
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

// Unary operators
impl Value {
    pub fn not(&self) -> Result<ValueKind, OperationError> {
        match self.kind {
            ValueKind::Boolean(v) => Ok(ValueKind::Boolean(!v)),
            _ => Err(OperationError::Mismatch),
        }
    }

    pub fn negate(&self) -> Result<ValueKind, OperationError> {
        match self.kind {
            ValueKind::Number(v) => Ok(ValueKind::Number(-v)),
            _ => Err(OperationError::Mismatch),
        }
    }
}

// Binary operators
impl Value {
    pub fn add_to(&self, other: &Value) -> Result<ValueKind, OperationError> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(lhs), ValueKind::Number(rhs)) => Ok(ValueKind::Number(lhs + rhs)),
            (ValueKind::String(lhs), _) => Ok(ValueKind::String(format_compact!("{lhs}{other}"))),
            (ValueKind::List(lhs), _) => {
                let mut values = lhs.lock().clone();
                values.push(other.clone());
                Ok(ValueKind::List(Arc::new(Mutex::new(values))))
            }
            _ => Err(OperationError::Mismatch),
        }
    }

    pub fn subtract_by(&self, other: &Value) -> Result<ValueKind, OperationError> {
        let (lhs, rhs) = self.numbers(other)?;
        Ok(ValueKind::Number(lhs - rhs))
    }

    pub fn multiply_by(&self, other: &Value) -> Result<ValueKind, OperationError> {
        let (lhs, rhs) = self.numbers(other)?;
        Ok(ValueKind::Number(lhs * rhs))
    }

    pub fn divide_by(&self, other: &Value) -> Result<ValueKind, OperationError> {
        let (lhs, rhs) = self.numbers(other)?;
        if rhs == 0.0 {
            return Err(OperationError::DivisionByZero);
        }
        Ok(ValueKind::Number(lhs / rhs))
    }

    pub fn power_by(&self, other: &Value) -> Result<ValueKind, OperationError> {
        let (lhs, rhs) = self.numbers(other)?;
        Ok(ValueKind::Number(lhs.powf(rhs)))
    }

    pub fn less_than(&self, other: &Value) -> Result<ValueKind, OperationError> {
        let (lhs, rhs) = self.numbers(other)?;
        Ok(ValueKind::Boolean(lhs < rhs))
    }

    pub fn less_than_equal(&self, other: &Value) -> Result<ValueKind, OperationError> {
        let (lhs, rhs) = self.numbers(other)?;
        Ok(ValueKind::Boolean(lhs <= rhs))
    }

    pub fn greater_than(&self, other: &Value) -> Result<ValueKind, OperationError> {
        let (lhs, rhs) = self.numbers(other)?;
        Ok(ValueKind::Boolean(lhs > rhs))
    }

    pub fn greater_than_equal(&self, other: &Value) -> Result<ValueKind, OperationError> {
        let (lhs, rhs) = self.numbers(other)?;
        Ok(ValueKind::Boolean(lhs >= rhs))
    }

    pub fn and_with(&self, other: &Value) -> Result<ValueKind, OperationError> {
        match (&self.kind, &other.kind) {
            (ValueKind::Boolean(lhs), ValueKind::Boolean(rhs)) => {
                Ok(ValueKind::Boolean(*lhs && *rhs))
            }
            _ => Err(OperationError::Mismatch),
        }
    }

    pub fn or_with(&self, other: &Value) -> Result<ValueKind, OperationError> {
        match (&self.kind, &other.kind) {
            (ValueKind::Boolean(lhs), ValueKind::Boolean(rhs)) => {
                Ok(ValueKind::Boolean(*lhs || *rhs))
            }
            _ => Err(OperationError::Mismatch),
        }
    }

    fn numbers(&self, other: &Value) -> Result<(f64, f64), OperationError> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(lhs), ValueKind::Number(rhs)) => Ok((*lhs, *rhs)),
            _ => Err(OperationError::Mismatch),
        }
    }
}

impl Value {
    /// Renders the value. A container already being rendered further up
    /// shows as `[...]` or `{...}`.
    fn render(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        visited: &mut Vec<usize>,
    ) -> std::fmt::Result {
        match &self.kind {
            ValueKind::Null => write!(f, "null"),
            ValueKind::Boolean(v) => write!(f, "{v}"),
            ValueKind::Number(v) => write!(f, "{v}"),
            ValueKind::String(v) => write!(f, "{v}"),
            ValueKind::List(list) => {
                let address = address(list);
                if visited.contains(&address) {
                    return write!(f, "[...]");
                }
                let values = list.lock().clone();
                visited.push(address);
                write!(f, "[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    value.render(f, visited)?;
                }
                visited.pop();
                write!(f, "]")
            }
            ValueKind::Map(map) => {
                let address = address(map);
                if visited.contains(&address) {
                    return write!(f, "{{...}}");
                }
                let map = map.lock().clone();
                visited.push(address);
                write!(f, "{{")?;
                for (index, (key, value)) in map.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    key.render(f, visited)?;
                    write!(f, ": ")?;
                    value.render(f, visited)?;
                }
                visited.pop();
                write!(f, "}}")
            }
            ValueKind::Function(function) => write!(f, "<function {}>", function.name()),
            ValueKind::Instance(instance) => write!(f, "<class {}>", instance.class.name()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.render(f, &mut Vec::new())
    }
}

/// Insertion ordered map keyed by value equality.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.position(key).map(|index| self.entries[index].1.clone())
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    pub fn position(&self, key: &Value) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.is_equal(key))
    }

    /// Inserts or replaces, returning the previous value.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }
}

/// Access to a shared map that compares keys outside the map's lock. Key
/// comparison may lock other containers, including this one when the key
/// holds the map itself.
pub trait SharedMapExt {
    fn lookup(&self, key: &Value) -> Option<Value>;
    fn has_key(&self, key: &Value) -> bool;
    fn store(&self, key: Value, value: Value) -> Option<Value>;
    fn take(&self, key: &Value) -> Option<Value>;
}

impl SharedMapExt for SharedMap {
    fn lookup(&self, key: &Value) -> Option<Value> {
        let snapshot = self.lock().clone();
        snapshot.get(key)
    }

    fn has_key(&self, key: &Value) -> bool {
        let snapshot = self.lock().clone();
        snapshot.contains_key(key)
    }

    fn store(&self, key: Value, value: Value) -> Option<Value> {
        let snapshot = self.lock().clone();
        let index = snapshot.position(&key);
        let mut map = self.lock();
        match index {
            Some(index) if index < map.entries.len() => {
                Some(std::mem::replace(&mut map.entries[index].1, value))
            }
            _ => {
                map.entries.push((key, value));
                None
            }
        }
    }

    fn take(&self, key: &Value) -> Option<Value> {
        let snapshot = self.lock().clone();
        let index = snapshot.position(key)?;
        let mut map = self.lock();
        (index < map.entries.len()).then(|| map.entries.remove(index).1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(v: f64) -> Value {
        Value::number(v, Span::default())
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(number(5.0).to_string(), "5");
        assert_eq!(number(2.5).to_string(), "2.5");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(
            number(1.0).divide_by(&number(0.0)).unwrap_err(),
            OperationError::DivisionByZero
        );
    }

    #[test]
    fn map_keys_use_value_equality() {
        let mut map = ValueMap::new();
        map.insert(number(1.0), Value::string("a", Span::default()));
        map.insert(number(1.0), Value::string("b", Span::default()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&number(1.0)).unwrap().to_string(), "b");
    }

    #[test]
    fn self_containing_list_renders() {
        let list = Value::list(vec![number(1.0)], Span::default());
        if let ValueKind::List(inner) = &list.kind {
            inner.lock().push(list.clone());
        }
        assert_eq!(list.to_string(), "[1, [...]]");
    }

    fn push(list: &Value, value: Value) {
        if let ValueKind::List(inner) = &list.kind {
            inner.lock().push(value);
        }
    }

    #[test]
    fn self_containing_map_renders() {
        let map = Value::map(ValueMap::new(), Span::default());
        if let ValueKind::Map(inner) = &map.kind {
            inner.store(number(1.0), map.clone());
        }
        assert_eq!(map.to_string(), "{1: {...}}");
    }

    #[test]
    fn indirect_list_cycles_render_and_compare() {
        let outer = Value::list(vec![], Span::default());
        let inner = Value::list(vec![outer.clone()], Span::default());
        push(&outer, inner.clone());
        assert_eq!(outer.to_string(), "[[[...]]]");

        let other_outer = Value::list(vec![], Span::default());
        let other_inner = Value::list(vec![other_outer.clone()], Span::default());
        push(&other_outer, other_inner);
        assert!(outer.is_equal(&other_outer));
    }

    #[test]
    fn repeated_siblings_are_not_cycles() {
        let shared = Value::list(vec![number(1.0)], Span::default());
        let list = Value::list(vec![shared.clone(), shared], Span::default());
        assert_eq!(list.to_string(), "[[1], [1]]");
    }

    #[test]
    fn shared_map_accepts_itself_as_key() {
        let map = Value::map(ValueMap::new(), Span::default());
        let ValueKind::Map(inner) = &map.kind else {
            unreachable!();
        };
        inner.store(Value::map(ValueMap::new(), Span::default()), number(1.0));
        assert!(!inner.has_key(&map));
        assert!(inner.store(map.clone(), number(2.0)).is_none());
        assert!(inner.has_key(&map));
        assert_eq!(inner.lookup(&map).and_then(|v| v.as_number()), Some(2.0));
        assert_eq!(inner.take(&map).and_then(|v| v.as_number()), Some(2.0));
        assert_eq!(inner.lock().len(), 1);
    }
}
