//! Host helpers and abstractions.
//!
//! Helpers are single-argument functions registered by the host with
//! [`add_helper`](crate::Environment::add_helper).  The engine itself does
//! not define any helpers: everything a stencil calls has to be provided by
//! the application rendering it.
//!
//! ```text
//! database_name |{ qstring(options['database']) }|
//! ```
//!
//! # Custom Helpers
//!
//! A helper is a plain rust function or closure that accepts exactly one
//! argument and returns a result.  The argument is converted from the
//! evaluated expression via [`ArgType`](crate::value::ArgType), the return
//! value into a [`Value`] via [`HelperResult`](crate::value::HelperResult).
//!
//! ```rust
//! # use stencil::{Environment, context};
//! let mut env = Environment::new();
//! env.add_helper("qstring", |s: String| format!("'{s}'"));
//! let rv = env.render_str(
//!     "database_name |{ qstring(options['database']) }|",
//!     context!(options => context!(database => "myapp")),
//! ).unwrap();
//! assert_eq!(rv, "database_name 'myapp'");
//! ```
//!
//! Helpers can fail by returning an [`Error`]:
//!
//! ```rust
//! # use stencil::Environment;
//! # let mut env = Environment::new();
//! use stencil::{Error, ErrorKind};
//!
//! fn port(value: i64) -> Result<i64, Error> {
//!     if (1..=65535).contains(&value) {
//!         Ok(value)
//!     } else {
//!         Err(Error::new(ErrorKind::InvalidOperation, "port out of range"))
//!     }
//! }
//!
//! env.add_helper("port", port);
//! ```
use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::utils::SealedMarker;
use crate::value::{ArgType, HelperResult, Value};

type HelperFunc = dyn Fn(Value) -> Result<Value, Error> + Sync + Send + 'static;

/// A boxed helper.
#[derive(Clone)]
pub(crate) struct BoxedHelper(Arc<HelperFunc>, &'static str);

/// A utility trait that represents helpers.
///
/// This trait is used by the [`add_helper`](crate::Environment::add_helper)
/// method to abstract over different types of helpers.  It is implemented for
/// all functions and closures taking a single [`ArgType`] argument and
/// returning a [`HelperResult`]:
///
/// * `Rv` where `Rv` implements `Into<Value>`
/// * `Result<Rv, Error>` where `Rv` implements `Into<Value>`
pub trait Helper<Rv, Arg>: Send + Sync + 'static {
    /// Calls the helper with the converted argument.
    #[doc(hidden)]
    fn invoke(&self, arg: Arg, _: SealedMarker) -> Rv;
}

impl<F, Rv, Arg> Helper<Rv, Arg> for F
where
    F: Fn(Arg) -> Rv + Send + Sync + 'static,
    Rv: HelperResult,
    Arg: ArgType,
{
    fn invoke(&self, arg: Arg, _: SealedMarker) -> Rv {
        (self)(arg)
    }
}

impl BoxedHelper {
    /// Creates a new boxed helper.
    pub fn new<F, Rv, Arg>(f: F) -> BoxedHelper
    where
        F: Helper<Rv, Arg>,
        Rv: HelperResult,
        Arg: ArgType,
    {
        BoxedHelper(
            Arc::new(move |value| -> Result<Value, Error> {
                f.invoke(ok!(Arg::from_value(value)), SealedMarker)
                    .into_result()
            }),
            std::any::type_name::<F>(),
        )
    }

    /// Invokes the helper.
    pub fn invoke(&self, arg: Value) -> Result<Value, Error> {
        (self.0)(arg)
    }
}

impl fmt::Debug for BoxedHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            if self.1.is_empty() {
                "BoxedHelper"
            } else {
                self.1
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    use crate::error::ErrorKind;

    #[test]
    fn test_boxed_helper_converts_arguments() {
        let helper = BoxedHelper::new(|s: String| format!("'{s}'"));
        assert_eq!(
            helper.invoke(Value::from("myapp")).unwrap(),
            Value::from("'myapp'")
        );
        let err = helper.invoke(Value::from(vec![1])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_boxed_helper_errors() {
        let helper = BoxedHelper::new(|_: Value| -> Result<Value, Error> {
            Err(Error::new(ErrorKind::InvalidOperation, "helper failed"))
        });
        assert_eq!(
            helper.invoke(Value::UNDEFINED).unwrap_err().detail(),
            Some("helper failed")
        );
    }

    #[test]
    fn test_optional_argument() {
        let helper = BoxedHelper::new(|value: Option<i64>| value.unwrap_or(3306));
        assert_eq!(helper.invoke(Value::UNDEFINED).unwrap(), Value::from(3306));
        assert_eq!(helper.invoke(Value::from(5432)).unwrap(), Value::from(5432));
    }
}
