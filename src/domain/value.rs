//! Native values carried between caller objects and the node tree.

use std::collections::BTreeMap;
use std::fmt;

use num_bigint::BigInt;

use crate::domain::{MacAddress, Sxp};

/// A native (decoded) value.
///
/// `Null` is an attribute that exists but holds nothing; it is treated as
/// absent when exporting and never written to a store.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Long(BigInt),
    Str(String),
    Mac(MacAddress),
    Sxp(Sxp),
    Record(Record),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Long(_) => "long",
            Value::Str(_) => "str",
            Value::Mac(_) => "mac",
            Value::Sxp(_) => "sxpr",
            Value::Record(_) => "record",
        }
    }

    /// Truthiness: zero, empty and null are false, everything else true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Long(l) => *l != BigInt::from(0),
            Value::Str(s) => !s.is_empty(),
            Value::Mac(_) => true,
            Value::Sxp(s) => !s.is_empty(),
            Value::Record(r) => !r.is_empty(),
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Natural text form of a value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            // Debug keeps the fractional part: 1.0 stays "1.0"
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Long(l) => write!(f, "{}", l),
            Value::Str(s) => f.write_str(s),
            Value::Mac(m) => write!(f, "{}", m),
            Value::Sxp(s) => write!(f, "{}", s),
            Value::Record(r) => write!(f, "{}", r),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::Long(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<MacAddress> for Value {
    fn from(v: MacAddress) -> Self {
        Value::Mac(v)
    }
}

impl From<Sxp> for Value {
    fn from(v: Sxp) -> Self {
        Value::Sxp(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

/// An object as a map of named attributes.
///
/// Nested objects are `Value::Record` attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    attrs: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attrs.remove(name)
    }

    /// Nested record under `name`, created when the attribute is missing or null.
    ///
    /// Fails with the type name of the existing attribute when it is not a record.
    pub fn record_mut(&mut self, name: &str) -> Result<&mut Record, &'static str> {
        let slot = self
            .attrs
            .entry(name.to_string())
            .or_insert_with(|| Value::Record(Record::new()));
        if slot.is_null() {
            *slot = Value::Record(Record::new());
        }
        match slot {
            Value::Record(r) => Ok(r),
            other => Err(other.type_name()),
        }
    }

    /// Follow a chain of nested record attributes.
    pub fn walk<'a, I>(&self, names: I) -> Option<&Record>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self;
        for name in names {
            current = current.get(name)?.as_record()?;
        }
        Some(current)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        f.write_str("}")
    }
}

/// A value assigned into the node tree.
///
/// Scalars become a node's own data; maps fan out into named children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Scalar(String),
    Map(BTreeMap<String, NodeValue>),
}

impl NodeValue {
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<NodeValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        NodeValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<&str> for NodeValue {
    fn from(v: &str) -> Self {
        NodeValue::Scalar(v.to_string())
    }
}

impl From<String> for NodeValue {
    fn from(v: String) -> Self {
        NodeValue::Scalar(v)
    }
}

impl From<BTreeMap<String, NodeValue>> for NodeValue {
    fn from(v: BTreeMap<String, NodeValue>) -> Self {
        NodeValue::Map(v)
    }
}
