//! Converters between native values and store text
//!
//! A [`ConverterRegistry`] maps type tags to converters. It is built once at
//! start-up and passed by reference to whatever needs it; tags can be added
//! but never removed or replaced.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::sxp;
use crate::domain::{ConvertError, ConvertResult, MacAddress, Sxp, Value};

/// Tag used when a binding names no type.
pub const DEFAULT_TAG: &str = "str";

/// Bidirectional transform between a native value and its stored text.
pub trait Converter: Send + Sync + fmt::Debug {
    fn to_store(&self, value: &Value) -> ConvertResult<String>;

    fn from_store(&self, text: &str) -> ConvertResult<Value>;
}

fn mismatch(tag: &str, value: &Value) -> ConvertError {
    ConvertError::TypeMismatch {
        tag: tag.to_string(),
        found: value.type_name(),
    }
}

fn out_of_range(tag: &str, value: impl ToString) -> ConvertError {
    ConvertError::OutOfRange {
        tag: tag.to_string(),
        text: value.to_string(),
    }
}

// Truncate toward zero; NaN, infinities and values beyond i64 are rejected.
fn float_to_int(f: f64) -> ConvertResult<i64> {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, hence the exclusive upper bound
    if !t.is_finite() || t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return Err(out_of_range("int", f));
    }
    Ok(t as i64)
}

fn float_to_long(f: f64) -> ConvertResult<BigInt> {
    if !f.is_finite() {
        return Err(out_of_range("long", f));
    }
    parse_long(&format!("{:.0}", f.trunc()))
}

fn parse_int(text: &str) -> ConvertResult<i64> {
    text.trim().parse().map_err(|source| ConvertError::ParseInt {
        text: text.to_string(),
        source,
    })
}

fn parse_float(text: &str) -> ConvertResult<f64> {
    text.trim().parse().map_err(|source| ConvertError::ParseFloat {
        text: text.to_string(),
        source,
    })
}

fn parse_long(text: &str) -> ConvertResult<BigInt> {
    BigInt::from_str(text.trim()).map_err(|source| ConvertError::ParseBigInt {
        text: text.to_string(),
        source,
    })
}

/// Text passes through unchanged; booleans are stored as `1`/`0`.
#[derive(Debug, Default)]
pub struct StrConverter;

impl Converter for StrConverter {
    fn to_store(&self, value: &Value) -> ConvertResult<String> {
        match value {
            Value::Null => Err(mismatch("str", value)),
            Value::Bool(b) => Ok(i64::from(*b).to_string()),
            other => Ok(other.to_string()),
        }
    }

    fn from_store(&self, text: &str) -> ConvertResult<Value> {
        Ok(Value::Str(text.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct BoolConverter;

impl Converter for BoolConverter {
    fn to_store(&self, value: &Value) -> ConvertResult<String> {
        Ok(if value.is_truthy() { "1" } else { "0" }.to_string())
    }

    fn from_store(&self, text: &str) -> ConvertResult<Value> {
        Ok(Value::Bool(parse_long(text)? != BigInt::from(0)))
    }
}

/// Signed 64-bit integers. Floats truncate toward zero; anything that does
/// not fit in `i64` is `OutOfRange`.
#[derive(Debug, Default)]
pub struct IntConverter;

impl Converter for IntConverter {
    fn to_store(&self, value: &Value) -> ConvertResult<String> {
        let i = match value {
            Value::Int(i) => *i,
            Value::Bool(b) => i64::from(*b),
            Value::Float(f) => float_to_int(*f)?,
            Value::Long(l) => i64::try_from(l).map_err(|_| out_of_range("int", l))?,
            Value::Str(s) => parse_int(s)?,
            other => return Err(mismatch("int", other)),
        };
        Ok(i.to_string())
    }

    fn from_store(&self, text: &str) -> ConvertResult<Value> {
        parse_int(text).map(Value::Int)
    }
}

#[derive(Debug, Default)]
pub struct FloatConverter;

impl Converter for FloatConverter {
    fn to_store(&self, value: &Value) -> ConvertResult<String> {
        let f = match value {
            Value::Float(f) => *f,
            Value::Int(i) => *i as f64,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Str(s) => parse_float(s)?,
            other => return Err(mismatch("float", other)),
        };
        Ok(Value::Float(f).to_string())
    }

    fn from_store(&self, text: &str) -> ConvertResult<Value> {
        parse_float(text).map(Value::Float)
    }
}

/// Arbitrary-precision integers. Finite floats truncate toward zero.
#[derive(Debug, Default)]
pub struct LongConverter;

impl Converter for LongConverter {
    fn to_store(&self, value: &Value) -> ConvertResult<String> {
        let l = match value {
            Value::Long(l) => l.clone(),
            Value::Int(i) => BigInt::from(*i),
            Value::Bool(b) => BigInt::from(u8::from(*b)),
            Value::Float(f) => float_to_long(*f)?,
            Value::Str(s) => parse_long(s)?,
            other => return Err(mismatch("long", other)),
        };
        Ok(l.to_string())
    }

    fn from_store(&self, text: &str) -> ConvertResult<Value> {
        parse_long(text).map(Value::Long)
    }
}

#[derive(Debug, Default)]
pub struct MacConverter;

impl Converter for MacConverter {
    fn to_store(&self, value: &Value) -> ConvertResult<String> {
        match value {
            Value::Mac(mac) => Ok(mac.to_string()),
            Value::Str(s) => Ok(s.parse::<MacAddress>()?.to_string()),
            other => Err(mismatch("mac", other)),
        }
    }

    fn from_store(&self, text: &str) -> ConvertResult<Value> {
        text.parse::<MacAddress>().map(Value::Mac)
    }
}

/// Structured values in s-expression notation.
#[derive(Debug, Default)]
pub struct SxprConverter;

impl Converter for SxprConverter {
    fn to_store(&self, value: &Value) -> ConvertResult<String> {
        match value {
            Value::Sxp(s) => Ok(s.to_string()),
            Value::Str(s) => Ok(Sxp::atom(s.as_str()).to_string()),
            other => Err(mismatch("sxpr", other)),
        }
    }

    fn from_store(&self, text: &str) -> ConvertResult<Value> {
        sxp::parse(text).map(Value::Sxp)
    }
}

#[derive(Debug)]
pub struct ConverterRegistry {
    converters: BTreeMap<String, Box<dyn Converter>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterRegistry {
    /// Registry holding the built-in converters.
    pub fn new() -> Self {
        let mut converters: BTreeMap<String, Box<dyn Converter>> = BTreeMap::new();
        converters.insert(DEFAULT_TAG.into(), Box::new(StrConverter));
        converters.insert("bool".into(), Box::new(BoolConverter));
        converters.insert("int".into(), Box::new(IntConverter));
        converters.insert("float".into(), Box::new(FloatConverter));
        converters.insert("long".into(), Box::new(LongConverter));
        converters.insert("mac".into(), Box::new(MacConverter));
        converters.insert("sxpr".into(), Box::new(SxprConverter));
        Self { converters }
    }

    /// Add a converter under a new, non-empty tag.
    pub fn register(
        &mut self,
        tag: &str,
        converter: impl Converter + 'static,
    ) -> ApplicationResult<()> {
        if tag.is_empty() {
            return Err(ApplicationError::configuration(
                "invalid converter name: ''",
            ));
        }
        if self.converters.contains_key(tag) {
            return Err(ApplicationError::configuration(format!(
                "converter already registered: '{}'",
                tag
            )));
        }
        debug!("register: tag={}", tag);
        self.converters.insert(tag.to_string(), Box::new(converter));
        Ok(())
    }

    /// Fail unless `tag` is unset or registered.
    pub fn check_type(&self, tag: Option<&str>) -> ApplicationResult<()> {
        match tag {
            Some(t) if !self.converters.contains_key(t) => Err(
                ApplicationError::configuration(format!("invalid converter type: '{}'", t)),
            ),
            _ => Ok(()),
        }
    }

    /// Converter for `tag`, or the string converter when `tag` is unset.
    pub fn lookup(&self, tag: Option<&str>) -> ApplicationResult<&dyn Converter> {
        let tag = tag.unwrap_or(DEFAULT_TAG);
        self.converters
            .get(tag)
            .map(|c| c.as_ref())
            .ok_or_else(|| {
                ApplicationError::configuration(format!("no converter for type: '{}'", tag))
            })
    }

    #[instrument(level = "trace", skip(self))]
    pub fn encode(&self, value: &Value, tag: Option<&str>) -> ApplicationResult<String> {
        Ok(self.lookup(tag)?.to_store(value)?)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn decode(&self, text: &str, tag: Option<&str>) -> ApplicationResult<Value> {
        Ok(self.lookup(tag)?.from_store(text)?)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.converters.keys().map(String::as_str)
    }
}
