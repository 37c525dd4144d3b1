use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

use crate::compiler::tokens::Span;
use crate::value::Value;

/// Container for nodes with location info.
///
/// This container fulfills two purposes: it adds location information
/// to nodes, but it also ensures the nodes is heap allocated.  The
/// latter is useful to ensure that enum variants do not cause the enum
/// to become too large.
pub struct Spanned<T> {
    inner: Box<(T, Span)>,
}

impl<T> Spanned<T> {
    /// Creates a new spanned node.
    pub fn new(node: T, span: Span) -> Spanned<T> {
        Spanned {
            inner: Box::new((node, span)),
        }
    }

    /// Accesses the span.
    pub fn span(&self) -> Span {
        self.inner.1
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner.0
    }
}

impl<T> DerefMut for Spanned<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ok!(fmt::Debug::fmt(&self.inner.0, f));
        write!(f, "{:?}", self.inner.1)
    }
}

/// The root of a compiled stencil.
#[derive(Debug)]
pub struct Template<'a> {
    pub children: Vec<Node<'a>>,
}

/// A node in the stencil tree.
pub enum Node<'a> {
    EmitRaw(Spanned<EmitRaw<'a>>),
    EmitExpr(Spanned<EmitExpr<'a>>),
    IfCond(Spanned<IfCond<'a>>),
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::EmitRaw(s) => fmt::Debug::fmt(s, f),
            Node::EmitExpr(s) => fmt::Debug::fmt(s, f),
            Node::IfCond(s) => fmt::Debug::fmt(s, f),
        }
    }
}

/// Outputs literal text unchanged.
#[derive(Debug)]
pub struct EmitRaw<'a> {
    pub raw: &'a str,
}

/// Outputs the stringified result of an expression.
#[derive(Debug)]
pub struct EmitExpr<'a> {
    pub expr: Expr<'a>,
}

/// A conditional with an optional else branch.
#[derive(Debug)]
pub struct IfCond<'a> {
    pub expr: Expr<'a>,
    pub true_body: Vec<Node<'a>>,
    pub false_body: Option<Vec<Node<'a>>>,
}

impl Drop for IfCond<'_> {
    fn drop(&mut self) {
        // nested bodies are moved onto a work list so that dropping a deep
        // tree does not recurse once per nesting level.
        let mut pending = mem::take(&mut self.true_body);
        pending.extend(self.false_body.take().into_iter().flatten());
        while let Some(node) = pending.pop() {
            if let Node::IfCond(mut cond) = node {
                pending.append(&mut cond.true_body);
                pending.extend(cond.false_body.take().into_iter().flatten());
            }
        }
    }
}

/// An expression node.
pub enum Expr<'a> {
    Const(Spanned<Const>),
    Path(Spanned<Path<'a>>),
    Compare(Spanned<Compare<'a>>),
    Call(Spanned<Call<'a>>),
}

impl fmt::Debug for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(s) => fmt::Debug::fmt(s, f),
            Expr::Path(s) => fmt::Debug::fmt(s, f),
            Expr::Compare(s) => fmt::Debug::fmt(s, f),
            Expr::Call(s) => fmt::Debug::fmt(s, f),
        }
    }
}

impl Expr<'_> {
    #[cfg(test)]
    pub fn description(&self) -> &'static str {
        match self {
            Expr::Const(_) => "constant",
            Expr::Path(_) => "variable",
            Expr::Compare(_) => "comparison",
            Expr::Call(_) => "call",
        }
    }

    /// Returns the span covering the whole expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Const(s) => s.span(),
            Expr::Path(s) => s.span(),
            Expr::Compare(s) => s.span(),
            Expr::Call(s) => s.span(),
        }
    }
}

/// A constant (string literal, boolean or none).
#[derive(Debug)]
pub struct Const {
    pub value: Value,
}

/// A variable path rooted in the context.
#[derive(Debug)]
pub struct Path<'a> {
    pub root: &'a str,
    pub segments: Vec<PathSegment<'a>>,
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ok!(f.write_str(self.root));
        for segment in &self.segments {
            ok!(match segment {
                PathSegment::Key(key) => write!(f, "[{key:?}]"),
                PathSegment::Index(idx) => write!(f, "[{idx}]"),
            });
        }
        Ok(())
    }
}

/// A single step of a variable path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// Attribute access (`.name`) or string subscript (`['name']`).
    Key(&'a str),
    /// Integer subscript (`[0]`).
    Index(u64),
}

/// The kind of comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// An equality comparison.
#[derive(Debug)]
pub struct Compare<'a> {
    pub op: CompareOp,
    pub left: Expr<'a>,
    pub right: Expr<'a>,
}

/// A helper call with exactly one argument.
#[derive(Debug)]
pub struct Call<'a> {
    pub name: &'a str,
    pub name_span: Span,
    pub arg: Expr<'a>,
}
