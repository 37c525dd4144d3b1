use std::fmt;

use serde::Serialize;

use crate::compiler::ast;
use crate::environment::Environment;
use crate::error::Error;
use crate::renderer::Renderer;
use crate::value::Value;

/// A handle to a compiled expression.
///
/// An expression is created via the
/// [`compile_expression`](Environment::compile_expression) method.  It
/// evaluates a single stencil expression (the part between `|{` and `}|`)
/// against a context and returns the result as value object.  This can be
/// used to check conditions outside of a stencil with the exact same lookup
/// and helper semantics.
///
/// # Example
///
/// ```rust
/// # use stencil::{Environment, context};
/// let env = Environment::new();
/// let expr = env.compile_expression("options.adapter == 'mysql'").unwrap();
/// let rv = expr.eval(context!(options => context!(adapter => "mysql"))).unwrap();
/// assert!(rv.is_true());
/// ```
pub struct Expression<'env, 'source> {
    env: &'env Environment<'source>,
    expr: ast::Expr<'source>,
    source: &'source str,
}

impl fmt::Debug for Expression<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("env", &self.env)
            .finish()
    }
}

impl<'env, 'source> Expression<'env, 'source> {
    pub(crate) fn new(
        env: &'env Environment<'source>,
        expr: ast::Expr<'source>,
        source: &'source str,
    ) -> Expression<'env, 'source> {
        Expression { env, expr, source }
    }

    /// Evaluates the expression with some context.
    ///
    /// The result of the expression is returned as [`Value`].
    pub fn eval<S: Serialize>(&self, ctx: S) -> Result<Value, Error> {
        // reduce total amount of code falling under mono morphization into
        // this function, and share the rest in _eval.
        self._eval(Value::from_serialize(&ctx))
    }

    fn _eval(&self, root: Value) -> Result<Value, Error> {
        ok!(crate::renderer::check_context(&root));
        Renderer::new(self.env)
            .eval(&self.expr, &root)
            .map_err(|err| {
                let mut err = err.with_span(self.expr.span());
                err.attach_location(Some("<expression>"), self.source);
                err
            })
    }
}
