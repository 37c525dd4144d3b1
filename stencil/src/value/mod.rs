//! Provides a dynamic value type abstraction.
//!
//! This module gives access to a dynamically typed value which is used by
//! the stencil engine during rendering.  Contexts are converted into values
//! by going through [`serde`]: anything that implements
//! [`Serialize`](serde::Serialize) can be turned into a [`Value`].
//!
//! ```
//! # use stencil::value::Value;
//! let value = Value::from_serialize(&vec!["mysql", "postgres"]);
//! assert_eq!(value.to_string(), "[\"mysql\", \"postgres\"]");
//! ```
//!
//! # Truthiness
//!
//! Only the empty string, `false`, none and undefined are false.  Numeric
//! zero and empty collections are true.
//!
//! # Stringification
//!
//! Values are turned into strings via [`Display`](std::fmt::Display).
//! Strings render verbatim, booleans as `true` / `false`, floats always
//! carry a fractional digit and undefined as well as none render as the
//! empty string.  Strings nested in collections are quoted.
use std::borrow::Cow;
use std::cmp::Ordering;
#[cfg(not(feature = "preserve_order"))]
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, Serializer};

pub use crate::value::argtypes::{ArgType, HelperResult};

mod argtypes;
mod serialize;

/// The map type used for map values.
///
/// With the `preserve_order` feature this is an `IndexMap` which keeps the
/// insertion order of the context, otherwise it is a `BTreeMap`.
#[cfg(feature = "preserve_order")]
pub type ValueMap = indexmap::IndexMap<Arc<str>, Value>;

/// The map type used for map values.
///
/// With the `preserve_order` feature this is an `IndexMap` which keeps the
/// insertion order of the context, otherwise it is a `BTreeMap`.
#[cfg(not(feature = "preserve_order"))]
pub type ValueMap = BTreeMap<Arc<str>, Value>;

/// Describes the kind of value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValueKind {
    /// The value is undefined
    Undefined,
    /// The value is the none singleton
    None,
    /// The value is a [`bool`]
    Bool,
    /// The value is a number of a supported type.
    Number,
    /// The value is a string.
    String,
    /// The value is a sequence of values.
    Seq,
    /// The value is a key/value mapping.
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ValueKind::Undefined => "undefined",
            ValueKind::None => "none",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Seq => "sequence",
            ValueKind::Map => "map",
        })
    }
}

#[derive(Clone)]
pub(crate) enum ValueRepr {
    Undefined,
    None,
    Bool(bool),
    U64(u64),
    I64(i64),
    F64(f64),
    String(Arc<str>),
    Seq(Arc<Vec<Value>>),
    Map(Arc<ValueMap>),
    Invalid(Arc<str>),
}

/// Represents a dynamically typed value in the stencil engine.
#[derive(Clone)]
pub struct Value(pub(crate) ValueRepr);

impl Default for Value {
    fn default() -> Value {
        Value::UNDEFINED
    }
}

fn as_f64(repr: &ValueRepr) -> Option<f64> {
    match *repr {
        ValueRepr::U64(v) => Some(v as f64),
        ValueRepr::I64(v) => Some(v as f64),
        ValueRepr::F64(v) => Some(v),
        _ => None,
    }
}

fn as_i128(repr: &ValueRepr) -> Option<i128> {
    match *repr {
        ValueRepr::U64(v) => Some(v as i128),
        ValueRepr::I64(v) => Some(v as i128),
        _ => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (ValueRepr::Undefined, ValueRepr::Undefined) => true,
            (ValueRepr::None, ValueRepr::None) => true,
            (ValueRepr::Bool(a), ValueRepr::Bool(b)) => a == b,
            (ValueRepr::String(a), ValueRepr::String(b)) => a == b,
            (ValueRepr::Seq(a), ValueRepr::Seq(b)) => a == b,
            (ValueRepr::Map(a), ValueRepr::Map(b)) => a == b,
            (a, b) => match (as_i128(a), as_i128(b)) {
                (Some(a), Some(b)) => a == b,
                _ => match (as_f64(a), as_f64(b)) {
                    (Some(a), Some(b)) => a.partial_cmp(&b) == Some(Ordering::Equal),
                    _ => false,
                },
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ValueRepr::Undefined => f.write_str("undefined"),
            ValueRepr::Invalid(ref err) => write!(f, "<invalid value: {err}>"),
            _ => fmt_nested(self, f),
        }
    }
}

fn fmt_float(v: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if v.is_nan() {
        f.write_str("NaN")
    } else if v.is_infinite() {
        write!(f, "{}inf", if v.is_sign_negative() { "-" } else { "" })
    } else {
        let mut num = v.to_string();
        if !num.contains('.') {
            num.push_str(".0");
        }
        f.write_str(&num)
    }
}

/// Formats a value as it appears inside a collection.
fn fmt_nested(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value.0 {
        ValueRepr::Undefined => f.write_str("undefined"),
        ValueRepr::None => f.write_str("none"),
        ValueRepr::String(ref s) => write!(f, "{:?}", &**s),
        _ => fmt::Display::fmt(value, f),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ValueRepr::Undefined | ValueRepr::None => Ok(()),
            ValueRepr::Bool(val) => fmt::Display::fmt(&val, f),
            ValueRepr::U64(val) => fmt::Display::fmt(&val, f),
            ValueRepr::I64(val) => fmt::Display::fmt(&val, f),
            ValueRepr::F64(val) => fmt_float(val, f),
            ValueRepr::String(ref val) => f.write_str(val),
            ValueRepr::Seq(ref items) => {
                ok!(f.write_str("["));
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        ok!(f.write_str(", "));
                    }
                    ok!(fmt_nested(item, f));
                }
                f.write_str("]")
            }
            ValueRepr::Map(ref map) => {
                ok!(f.write_str("{"));
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        ok!(f.write_str(", "));
                    }
                    ok!(write!(f, "{:?}: ", &**key));
                    ok!(fmt_nested(value, f));
                }
                f.write_str("}")
            }
            ValueRepr::Invalid(ref err) => write!(f, "<invalid value: {err}>"),
        }
    }
}

impl Value {
    /// The undefined value.
    ///
    /// This is what lookups of missing variables, attributes and items
    /// resolve to.
    pub const UNDEFINED: Value = Value(ValueRepr::Undefined);

    /// Creates a value from something that can be serialized.
    ///
    /// This is the method the engine uses whenever a serializable object is
    /// passed to one of the APIs that internally want to create a value, for
    /// instance [`context!`](crate::context) and
    /// [`render`](crate::Template::render).
    ///
    /// ```
    /// # use stencil::value::Value;
    /// let val = Value::from_serialize(&vec![1, 2, 3]);
    /// ```
    ///
    /// This method does not fail.  If the [`Serialize`] implementation fails
    /// the value is marked invalid and rendering against it fails with
    /// [`BadSerialization`](crate::ErrorKind::BadSerialization).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Value {
        serialize::transform(value)
    }

    /// Returns the kind of the value.
    pub fn kind(&self) -> ValueKind {
        match self.0 {
            ValueRepr::Undefined => ValueKind::Undefined,
            ValueRepr::None | ValueRepr::Invalid(_) => ValueKind::None,
            ValueRepr::Bool(_) => ValueKind::Bool,
            ValueRepr::U64(_) | ValueRepr::I64(_) | ValueRepr::F64(_) => ValueKind::Number,
            ValueRepr::String(_) => ValueKind::String,
            ValueRepr::Seq(_) => ValueKind::Seq,
            ValueRepr::Map(_) => ValueKind::Map,
        }
    }

    /// Is this value true?
    pub fn is_true(&self) -> bool {
        match self.0 {
            ValueRepr::Undefined | ValueRepr::None | ValueRepr::Invalid(_) => false,
            ValueRepr::Bool(val) => val,
            ValueRepr::String(ref s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Returns `true` if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self.0, ValueRepr::Undefined)
    }

    /// Returns `true` if this value is none.
    pub fn is_none(&self) -> bool {
        matches!(self.0, ValueRepr::None)
    }

    /// If the value is a string, return it.
    pub fn as_str(&self) -> Option<&str> {
        match self.0 {
            ValueRepr::String(ref s) => Some(&**s),
            _ => None,
        }
    }

    /// Returns the length of strings, sequences and maps.
    pub fn len(&self) -> Option<usize> {
        match self.0 {
            ValueRepr::String(ref s) => Some(s.chars().count()),
            ValueRepr::Seq(ref items) => Some(items.len()),
            ValueRepr::Map(ref map) => Some(map.len()),
            _ => None,
        }
    }

    /// Looks up an attribute by name.
    ///
    /// Only maps have attributes.  Everything else, as well as missing
    /// keys, yields [`Value::UNDEFINED`].
    ///
    /// ```
    /// # use stencil::{context, value::Value};
    /// let ctx = context!(cookbook => context!(name => "myapp"));
    /// assert_eq!(ctx.get_attr("cookbook").get_attr("name"), Value::from("myapp"));
    /// assert!(ctx.get_attr("options").is_undefined());
    /// ```
    pub fn get_attr(&self, key: &str) -> Value {
        match self.0 {
            ValueRepr::Map(ref map) => map.get(key).cloned().unwrap_or_default(),
            _ => Value::UNDEFINED,
        }
    }

    /// Looks up an item by integer index.
    ///
    /// Sequences are indexed by position, maps are looked up by the decimal
    /// form of the index.
    pub fn get_item_by_index(&self, idx: u64) -> Value {
        match self.0 {
            ValueRepr::Seq(ref items) => usize::try_from(idx)
                .ok()
                .and_then(|idx| items.get(idx))
                .cloned()
                .unwrap_or_default(),
            ValueRepr::Map(ref map) => map
                .get(idx.to_string().as_str())
                .cloned()
                .unwrap_or_default(),
            _ => Value::UNDEFINED,
        }
    }

    /// Iterates over the items of a sequence.
    pub fn try_iter(&self) -> Option<impl Iterator<Item = &Value>> {
        match self.0 {
            ValueRepr::Seq(ref items) => Some(items.iter()),
            _ => None,
        }
    }

    /// Returns the serialization error if this value is invalid.
    pub(crate) fn invalid_reason(&self) -> Option<&str> {
        match self.0 {
            ValueRepr::Invalid(ref err) => Some(&**err),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            ValueRepr::Bool(b) => serializer.serialize_bool(b),
            ValueRepr::U64(u) => serializer.serialize_u64(u),
            ValueRepr::I64(i) => serializer.serialize_i64(i),
            ValueRepr::F64(f) => serializer.serialize_f64(f),
            ValueRepr::None | ValueRepr::Undefined => serializer.serialize_unit(),
            ValueRepr::String(ref s) => serializer.serialize_str(s),
            ValueRepr::Seq(ref elements) => elements.serialize(serializer),
            ValueRepr::Map(ref entries) => {
                use serde::ser::SerializeMap;
                let mut map = ok!(serializer.serialize_map(Some(entries.len())));
                for (k, v) in entries.iter() {
                    ok!(map.serialize_entry(&**k, v));
                }
                map.end()
            }
            ValueRepr::Invalid(ref err) => Err(serde::ser::Error::custom(err)),
        }
    }
}

macro_rules! value_from {
    ($src:ty, $dst:ident) => {
        impl From<$src> for Value {
            #[inline(always)]
            fn from(val: $src) -> Self {
                Value(ValueRepr::$dst(val as _))
            }
        }
    };
}

value_from!(bool, Bool);
value_from!(u8, U64);
value_from!(u16, U64);
value_from!(u32, U64);
value_from!(u64, U64);
value_from!(usize, U64);
value_from!(i8, I64);
value_from!(i16, I64);
value_from!(i32, I64);
value_from!(i64, I64);
value_from!(isize, I64);
value_from!(f32, F64);
value_from!(f64, F64);

impl From<()> for Value {
    #[inline(always)]
    fn from(_: ()) -> Self {
        Value(ValueRepr::None)
    }
}

impl From<&str> for Value {
    #[inline(always)]
    fn from(val: &str) -> Self {
        Value(ValueRepr::String(Arc::from(val)))
    }
}

impl From<String> for Value {
    #[inline(always)]
    fn from(val: String) -> Self {
        Value(ValueRepr::String(Arc::from(val)))
    }
}

impl From<Arc<str>> for Value {
    #[inline(always)]
    fn from(val: Arc<str>) -> Self {
        Value(ValueRepr::String(val))
    }
}

impl<'a> From<Cow<'a, str>> for Value {
    #[inline(always)]
    fn from(val: Cow<'a, str>) -> Self {
        match val {
            Cow::Borrowed(s) => s.into(),
            Cow::Owned(s) => s.into(),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        match val {
            Some(val) => val.into(),
            None => Value(ValueRepr::None),
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Self {
        Value(ValueRepr::Seq(Arc::new(
            val.into_iter().map(Into::into).collect(),
        )))
    }
}

impl From<ValueMap> for Value {
    #[inline(always)]
    fn from(val: ValueMap) -> Self {
        Value(ValueRepr::Map(Arc::new(val)))
    }
}

impl<K: Into<Arc<str>>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<ValueMap>()
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use similar_asserts::assert_eq;

    #[test]
    fn test_truthiness() {
        assert!(!Value::from("").is_true());
        assert!(!Value::from(false).is_true());
        assert!(!Value::from(()).is_true());
        assert!(!Value::UNDEFINED.is_true());
        assert!(Value::from("0").is_true());
        assert!(Value::from(0).is_true());
        assert!(Value::from(0.0).is_true());
        assert!(Value::from(Vec::<i32>::new()).is_true());
        assert!(Value::from_serialize(&BTreeMap::<String, i32>::new()).is_true());
    }

    #[test]
    fn test_stringify() {
        assert_eq!(Value::from("x").to_string(), "x");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(false).to_string(), "false");
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(-3i64).to_string(), "-3");
        assert_eq!(Value::from(1.0).to_string(), "1.0");
        assert_eq!(Value::from(0.5).to_string(), "0.5");
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::from(()).to_string(), "");
        assert_eq!(Value::UNDEFINED.to_string(), "");
        assert_eq!(
            Value::from(vec![Value::from("a"), Value::from(1), Value::from(())]).to_string(),
            "[\"a\", 1, none]"
        );
        let map: Value = [("host", Value::from("db1")), ("port", Value::from(3306))]
            .into_iter()
            .collect();
        insta::assert_snapshot!(map.to_string(), @r###"{"host": "db1", "port": 3306}"###);
    }

    #[test]
    fn test_equality() {
        assert_eq!(Value::from(1), Value::from(1u64));
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::from(()), Value::UNDEFINED);
        assert_ne!(Value::from(""), Value::UNDEFINED);
        assert_eq!(
            Value::from(vec!["a", "b"]),
            Value::from_serialize(&["a", "b"])
        );
    }

    #[test]
    fn test_lookups() {
        let value = Value::from_serialize(&serde_json::json!({
            "options": {"host": "db1", "replicas": ["a", "b"], "1": "one"},
        }));
        let options = value.get_attr("options");
        assert_eq!(options.get_attr("host"), Value::from("db1"));
        assert_eq!(options.get_item_by_index(1), Value::from("one"));
        assert_eq!(
            options.get_attr("replicas").get_item_by_index(1),
            Value::from("b")
        );
        assert!(options.get_attr("replicas").get_item_by_index(2).is_undefined());
        assert!(options.get_attr("host").get_attr("len").is_undefined());
        assert!(Value::UNDEFINED.get_attr("x").is_undefined());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Value::from(1).kind(), ValueKind::Number);
        assert_eq!(Value::from("").kind(), ValueKind::String);
        assert_eq!(Value::from(vec![1]).kind(), ValueKind::Seq);
        assert_eq!(Value::UNDEFINED.kind(), ValueKind::Undefined);
        assert_eq!(ValueKind::Seq.to_string(), "sequence");
    }
}
