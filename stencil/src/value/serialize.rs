use std::fmt;
use std::sync::Arc;

use serde::{ser, Serialize, Serializer};

use crate::value::{Value, ValueMap, ValueRepr};

/// Upper bound for preallocations based on size hints from serde.
const MAX_SIZE_HINT: usize = 1024;

/// Transforms a serializable value to a value object.
///
/// This neither fails nor panics.  Values that cannot be represented turn
/// into invalid values carrying the serialization error.
pub fn transform<T: Serialize + ?Sized>(value: &T) -> Value {
    match value.serialize(ValueSerializer) {
        Ok(rv) => rv,
        Err(invalid) => Value(ValueRepr::Invalid(invalid.0)),
    }
}

/// Converts a serialized map key into a string key.
///
/// Strings are used as is, numbers and booleans use their string form.
/// Anything else cannot be addressed by a variable path.
fn key_from_value(key: Value) -> Result<Arc<str>, InvalidValue> {
    match key.0 {
        ValueRepr::String(s) => Ok(s),
        ValueRepr::Bool(_) | ValueRepr::U64(_) | ValueRepr::I64(_) => {
            Ok(Arc::from(key.to_string()))
        }
        ValueRepr::Invalid(err) => Err(InvalidValue(err)),
        _ => Err(ser::Error::custom(format!(
            "map keys must be strings, numbers or booleans, got {}",
            key.kind()
        ))),
    }
}

fn size_hint(len: usize) -> usize {
    len.min(MAX_SIZE_HINT)
}

#[derive(Debug)]
pub struct InvalidValue(Arc<str>);

impl std::error::Error for InvalidValue {}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ser::Error for InvalidValue {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        InvalidValue(Arc::from(msg.to_string()))
    }
}

pub struct ValueSerializer;

impl Serializer for ValueSerializer {
    type Ok = Value;
    type Error = InvalidValue;

    type SerializeSeq = SerializeSeq;
    type SerializeTuple = SerializeSeq;
    type SerializeTupleStruct = SerializeSeq;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeStruct;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, InvalidValue> {
        match i64::try_from(v) {
            Ok(v) => Ok(Value::from(v)),
            Err(_) => Err(ser::Error::custom("integer out of range")),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value, InvalidValue> {
        match u64::try_from(v) {
            Ok(v) => Ok(Value::from(v)),
            Err(_) => Err(ser::Error::custom("integer out of range")),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, InvalidValue> {
        Ok(Value::from(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, InvalidValue> {
        Ok(Value::from(v.to_string()))
    }

    fn serialize_str(self, value: &str) -> Result<Value, InvalidValue> {
        Ok(Value::from(value))
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Value, InvalidValue> {
        Ok(Value::from(
            value.iter().copied().map(Value::from).collect::<Vec<_>>(),
        ))
    }

    fn serialize_none(self) -> Result<Value, InvalidValue> {
        Ok(Value::from(()))
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Value, InvalidValue>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, InvalidValue> {
        Ok(Value::from(()))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, InvalidValue> {
        Ok(Value::from(()))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, InvalidValue> {
        Ok(Value::from(variant))
    }

    fn serialize_newtype_struct<T: ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, InvalidValue>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, InvalidValue>
    where
        T: Serialize,
    {
        let mut map = ValueMap::default();
        map.insert(Arc::from(variant), ok!(value.serialize(self)));
        Ok(Value::from(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, InvalidValue> {
        Ok(SerializeSeq {
            elements: Vec::with_capacity(size_hint(len.unwrap_or(0))),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, InvalidValue> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, InvalidValue> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, InvalidValue> {
        Ok(SerializeTupleVariant {
            name: variant,
            fields: Vec::with_capacity(size_hint(len)),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, InvalidValue> {
        Ok(SerializeMap {
            entries: ValueMap::default(),
            key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, InvalidValue> {
        Ok(SerializeStruct {
            fields: ValueMap::default(),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, InvalidValue> {
        Ok(SerializeStructVariant {
            variant,
            map: ValueMap::default(),
        })
    }
}

pub struct SerializeSeq {
    elements: Vec<Value>,
}

impl ser::SerializeSeq for SerializeSeq {
    type Ok = Value;
    type Error = InvalidValue;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), InvalidValue>
    where
        T: Serialize,
    {
        self.elements.push(ok!(value.serialize(ValueSerializer)));
        Ok(())
    }

    fn end(self) -> Result<Value, InvalidValue> {
        Ok(Value(ValueRepr::Seq(Arc::new(self.elements))))
    }
}

impl ser::SerializeTuple for SerializeSeq {
    type Ok = Value;
    type Error = InvalidValue;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), InvalidValue>
    where
        T: Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, InvalidValue> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeSeq {
    type Ok = Value;
    type Error = InvalidValue;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), InvalidValue>
    where
        T: Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, InvalidValue> {
        ser::SerializeSeq::end(self)
    }
}

pub struct SerializeTupleVariant {
    name: &'static str,
    fields: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = InvalidValue;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), InvalidValue>
    where
        T: Serialize,
    {
        self.fields.push(ok!(value.serialize(ValueSerializer)));
        Ok(())
    }

    fn end(self) -> Result<Value, InvalidValue> {
        let mut map = ValueMap::default();
        map.insert(Arc::from(self.name), Value::from(self.fields));
        Ok(Value::from(map))
    }
}

pub struct SerializeMap {
    entries: ValueMap,
    key: Option<Arc<str>>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = InvalidValue;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<(), InvalidValue>
    where
        T: Serialize,
    {
        self.key = Some(ok!(key_from_value(ok!(key.serialize(ValueSerializer)))));
        Ok(())
    }

    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<(), InvalidValue>
    where
        T: Serialize,
    {
        match self.key.take() {
            Some(key) => {
                self.entries.insert(key, ok!(value.serialize(ValueSerializer)));
                Ok(())
            }
            None => Err(ser::Error::custom("map value serialized without a key")),
        }
    }

    fn end(self) -> Result<Value, InvalidValue> {
        Ok(Value::from(self.entries))
    }
}

pub struct SerializeStruct {
    fields: ValueMap,
}

impl ser::SerializeStruct for SerializeStruct {
    type Ok = Value;
    type Error = InvalidValue;

    fn serialize_field<T: ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), InvalidValue>
    where
        T: Serialize,
    {
        self.fields
            .insert(Arc::from(key), ok!(value.serialize(ValueSerializer)));
        Ok(())
    }

    fn end(self) -> Result<Value, InvalidValue> {
        Ok(Value::from(self.fields))
    }
}

pub struct SerializeStructVariant {
    variant: &'static str,
    map: ValueMap,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = InvalidValue;

    fn serialize_field<T: ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), InvalidValue>
    where
        T: Serialize,
    {
        self.map
            .insert(Arc::from(key), ok!(value.serialize(ValueSerializer)));
        Ok(())
    }

    fn end(self) -> Result<Value, InvalidValue> {
        let mut rv = ValueMap::default();
        rv.insert(Arc::from(self.variant), Value::from(self.map));
        Ok(Value::from(rv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use similar_asserts::assert_eq;

    #[derive(Serialize)]
    struct Cookbook {
        name: &'static str,
        year: u32,
        maintainers: Vec<&'static str>,
    }

    #[derive(Serialize)]
    enum Engine {
        Mysql,
        Custom(String),
    }

    #[test]
    fn test_struct() {
        let value = transform(&Cookbook {
            name: "myapp",
            year: 2015,
            maintainers: vec!["ops"],
        });
        assert_eq!(value.get_attr("name"), Value::from("myapp"));
        assert_eq!(value.get_attr("year"), Value::from(2015));
        assert_eq!(value.get_attr("maintainers").to_string(), "[\"ops\"]");
    }

    #[test]
    fn test_enums() {
        assert_eq!(transform(&Engine::Mysql), Value::from("Mysql"));
        let custom = transform(&Engine::Custom("sqlite".into()));
        assert_eq!(custom.get_attr("Custom"), Value::from("sqlite"));
    }

    #[test]
    fn test_map_keys() {
        let value = transform(&BTreeMap::from([(1, "one"), (2, "two")]));
        assert_eq!(value.get_attr("2"), Value::from("two"));
        assert_eq!(value.get_item_by_index(1), Value::from("one"));
    }

    #[test]
    fn test_unsupported_map_keys() {
        let value = transform(&BTreeMap::from([(vec![1], "one")]));
        assert!(value.invalid_reason().is_some());
        assert!(!value.is_true());
    }

    #[test]
    fn test_options() {
        assert!(transform(&None::<i32>).is_none());
        assert_eq!(transform(&Some("x")), Value::from("x"));
    }
}
