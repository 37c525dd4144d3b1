use crate::error::{Error, ErrorKind};
use crate::value::Value;

/// internal marker to seal up some trait methods
pub struct SealedMarker;

pub fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Defines the behavior of undefined values in the engine.
///
/// A variable path is undefined if any step of it misses: the root is not
/// in the context, a key is not in a map, an index is out of bounds or a
/// step is applied to something that is neither a map nor a sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum UndefinedBehavior {
    /// The default, lenient undefined behavior.
    ///
    /// * **printing:** allowed (renders as the empty string)
    /// * **conditions:** allowed (undefined is false)
    /// * **comparisons:** allowed (undefined compares as the empty string)
    #[default]
    Lenient,
    /// Complains about every undefined path.
    ///
    /// * **printing:** fails
    /// * **conditions:** fails
    /// * **comparisons:** fails
    Strict,
}

impl UndefinedBehavior {
    /// Utility method used in the engine to determine what to do when a
    /// path resolved to undefined.
    pub(crate) fn handle_undefined(self, path: &dyn std::fmt::Display) -> Result<Value, Error> {
        match self {
            UndefinedBehavior::Lenient => Ok(Value::UNDEFINED),
            UndefinedBehavior::Strict => Err(Error::new(
                ErrorKind::UndefinedError,
                format!("{path} is undefined"),
            )),
        }
    }

    /// Prepares a value to be used as an operand of a comparison.
    #[inline]
    pub(crate) fn comparable(self, value: Value) -> Value {
        if matches!(self, UndefinedBehavior::Lenient) && value.is_undefined() {
            Value::from("")
        } else {
            value
        }
    }
}
