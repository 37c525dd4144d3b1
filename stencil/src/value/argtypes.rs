use std::sync::Arc;

use crate::error::{Error, ErrorKind};
use crate::value::{Value, ValueKind, ValueRepr};

/// A utility trait that represents the return value of helpers.
///
/// It's implemented for the following types:
///
/// * `Rv` where `Rv` implements `Into<Value>`
/// * `Result<Rv, Error>` where `Rv` implements `Into<Value>`
///
/// The equivalent for the argument side is [`ArgType`].
pub trait HelperResult {
    #[doc(hidden)]
    fn into_result(self) -> Result<Value, Error>;
}

impl<I: Into<Value>> HelperResult for Result<I, Error> {
    fn into_result(self) -> Result<Value, Error> {
        self.map(Into::into)
    }
}

impl<I: Into<Value>> HelperResult for I {
    fn into_result(self) -> Result<Value, Error> {
        Ok(self.into())
    }
}

/// A trait implemented by all helper argument types.
///
/// Helpers take exactly one argument.  Instead of working with a raw
/// [`Value`] a helper can ask for a concrete type and the conversion is
/// performed before the helper is invoked:
///
/// * [`Value`]: the argument unchanged.
/// * [`String`]: strings, numbers and booleans.  Undefined converts to the
///   empty string.
/// * [`bool`]: booleans.  Undefined converts to `false`.
/// * [`i64`]: integers and floats without a fractional part.
/// * `Option<T>`: `None` for undefined and none, otherwise `T`.
///
/// Failing conversions raise [`InvalidOperation`](ErrorKind::InvalidOperation).
pub trait ArgType: Sized {
    /// Converts the helper argument.
    #[doc(hidden)]
    fn from_value(value: Value) -> Result<Self, Error>;
}

fn type_mismatch(expected: &str, value: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("expected {expected} argument, got {}", value.kind()),
    )
}

impl ArgType for Value {
    fn from_value(value: Value) -> Result<Self, Error> {
        Ok(value)
    }
}

impl ArgType for String {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value.kind() {
            ValueKind::String | ValueKind::Number | ValueKind::Bool | ValueKind::Undefined => {
                Ok(value.to_string())
            }
            _ => Err(type_mismatch("string", &value)),
        }
    }
}

impl ArgType for Arc<str> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value.0 {
            ValueRepr::String(s) => Ok(s),
            _ => String::from_value(value).map(Arc::from),
        }
    }
}

impl ArgType for bool {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value.0 {
            ValueRepr::Bool(b) => Ok(b),
            ValueRepr::Undefined => Ok(false),
            _ => Err(type_mismatch("boolean", &value)),
        }
    }
}

impl ArgType for i64 {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value.0 {
            ValueRepr::I64(v) => Ok(v),
            ValueRepr::U64(v) => i64::try_from(v).map_err(|_| {
                Error::new(ErrorKind::InvalidOperation, "integer argument out of range")
            }),
            ValueRepr::F64(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
            _ => Err(type_mismatch("integer", &value)),
        }
    }
}

impl<T: ArgType> ArgType for Option<T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        if value.is_undefined() || value.is_none() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
