use std::fmt::Write;

use log::trace;

use crate::compiler::ast;
use crate::environment::Environment;
use crate::error::{Error, ErrorKind};
use crate::value::Value;

/// Walks a compiled stencil and renders it against a context.
///
/// The renderer holds no state besides the environment it was created
/// from, so one renderer can render any number of stencils concurrently.
pub struct Renderer<'env, 'source> {
    env: &'env Environment<'source>,
}

impl<'env, 'source> Renderer<'env, 'source> {
    /// Creates a new renderer.
    pub fn new(env: &'env Environment<'source>) -> Renderer<'env, 'source> {
        Renderer { env }
    }

    /// Renders the stencil into `out`.
    ///
    /// On error `out` may contain partial output; callers are expected to
    /// discard it.
    pub fn render(
        &self,
        tmpl: &ast::Template<'_>,
        root: &Value,
        out: &mut String,
    ) -> Result<(), Error> {
        ok!(check_context(root));
        self.render_nodes(&tmpl.children, root, 0, out)
    }

    fn render_nodes(
        &self,
        nodes: &[ast::Node<'_>],
        ctx: &Value,
        depth: usize,
        out: &mut String,
    ) -> Result<(), Error> {
        for node in nodes {
            match node {
                ast::Node::EmitRaw(raw) => out.push_str(raw.raw),
                ast::Node::EmitExpr(emit) => {
                    let value = ok!(self
                        .eval(&emit.expr, ctx)
                        .map_err(|err| err.with_span(emit.expr.span())));
                    ok!(write!(out, "{value}").map_err(Error::from));
                }
                ast::Node::IfCond(cond) => {
                    if depth >= self.env.max_depth() {
                        return Err(
                            Error::new_depth_exceeded(self.env.max_depth()).with_span(cond.span())
                        );
                    }
                    let test = ok!(self
                        .eval(&cond.expr, ctx)
                        .map_err(|err| err.with_span(cond.expr.span())));
                    let branch = if test.is_true() {
                        Some(&cond.true_body)
                    } else {
                        cond.false_body.as_ref()
                    };
                    if let Some(body) = branch {
                        ok!(stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
                            self.render_nodes(body, ctx, depth + 1, out)
                        }));
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluates an expression against a context.
    pub fn eval(&self, expr: &ast::Expr<'_>, ctx: &Value) -> Result<Value, Error> {
        match expr {
            ast::Expr::Const(c) => Ok(c.value.clone()),
            ast::Expr::Path(path) => self
                .resolve_path(path, ctx)
                .map_err(|err| err.with_span(path.span())),
            ast::Expr::Compare(cmp) => {
                let behavior = self.env.undefined_behavior();
                let left = behavior.comparable(ok!(self.eval(&cmp.left, ctx)));
                let right = behavior.comparable(ok!(self.eval(&cmp.right, ctx)));
                Ok(Value::from(match cmp.op {
                    ast::CompareOp::Eq => left == right,
                    ast::CompareOp::Ne => left != right,
                }))
            }
            ast::Expr::Call(call) => {
                let helper = match self.env.get_helper(call.name) {
                    Some(helper) => helper,
                    None => return Err(Error::new_unknown_helper(call.name).with_span(call.name_span)),
                };
                let arg = ok!(self.eval(&call.arg, ctx));
                trace!("invoking helper {} with {:?}", call.name, arg);
                helper.invoke(arg).map_err(|err| err.with_span(call.span()))
            }
        }
    }

    fn resolve_path(&self, path: &ast::Path<'_>, ctx: &Value) -> Result<Value, Error> {
        let mut value = ctx.get_attr(path.root);
        for segment in &path.segments {
            if value.is_undefined() {
                break;
            }
            value = match *segment {
                ast::PathSegment::Key(key) => value.get_attr(key),
                ast::PathSegment::Index(idx) => value.get_item_by_index(idx),
            };
        }
        if value.is_undefined() {
            self.env.undefined_behavior().handle_undefined(path)
        } else {
            Ok(value)
        }
    }
}

/// Makes sure the context can be rendered against.
pub(crate) fn check_context(root: &Value) -> Result<(), Error> {
    match root.invalid_reason() {
        Some(reason) => Err(Error::new(
            ErrorKind::BadSerialization,
            format!("context could not be converted: {reason}"),
        )),
        None => Ok(()),
    }
}
