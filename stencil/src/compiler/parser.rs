use std::borrow::Cow;
use std::fmt;

use crate::compiler::ast::{self, Spanned};
use crate::compiler::lexer::ExprTokenizer;
use crate::compiler::tokens::{ExprToken, Span};
use crate::error::{Error, ErrorKind};
use crate::value::Value;

fn unexpected<D: fmt::Display>(unexpected: D, expected: &str) -> Error {
    Error::new(
        ErrorKind::SyntaxError,
        format!("unexpected {unexpected}, expected {expected}"),
    )
}

fn make_const(value: Value, span: Span) -> ast::Expr<'static> {
    ast::Expr::Const(Spanned::new(ast::Const { value }, span))
}

fn is_literal(name: &str) -> bool {
    matches!(name, "true" | "True" | "false" | "False" | "none" | "None")
}

fn syntax_error(msg: Cow<'static, str>) -> Error {
    Error::new(ErrorKind::SyntaxError, msg)
}

macro_rules! syntax_error {
    ($msg:expr) => {{
        return Err(syntax_error(Cow::Borrowed($msg)));
    }};
    ($msg:expr, $($tt:tt)*) => {{
        return Err(syntax_error(Cow::Owned(format!($msg, $($tt)*))));
    }};
}

macro_rules! expect_token {
    ($parser:expr, $match:pat => $target:expr, $expectation:expr) => {{
        match ok!($parser.stream.next()) {
            Some(($match, span)) => ($target, span),
            Some((token, span)) => return Err(unexpected(token, $expectation).with_span(span)),
            None => return Err($parser.stream.unexpected_eof($expectation)),
        }
    }};
}

macro_rules! skip_token {
    ($p:expr, $match:pat) => {
        match $p.stream.current() {
            Err(err) => return Err(err),
            Ok(Some(($match, _))) => {
                let _ = $p.stream.next();
                true
            }
            _ => false,
        }
    };
}

struct TokenStream<'a> {
    tokenizer: ExprTokenizer<'a>,
    current: Option<Result<(ExprToken<'a>, Span), Error>>,
    last_span: Span,
}

impl<'a> TokenStream<'a> {
    fn new(raw: &'a str, span: Span) -> TokenStream<'a> {
        let mut tokenizer = ExprTokenizer::new(raw, span);
        let first_span = tokenizer.current_span();
        let current = tokenizer.next_token().transpose();
        TokenStream {
            tokenizer,
            current,
            last_span: first_span,
        }
    }

    /// Advance the stream.
    fn next(&mut self) -> Result<Option<(ExprToken<'a>, Span)>, Error> {
        let rv = self.current.take();
        self.current = self.tokenizer.next_token().transpose();
        if let Some(Ok((_, span))) = rv {
            self.last_span = span;
        }
        rv.transpose()
    }

    /// Look at the current token
    fn current(&mut self) -> Result<Option<(ExprToken<'a>, Span)>, Error> {
        match self.current.take() {
            Some(Ok(tok)) => {
                self.current = Some(Ok(tok));
                Ok(Some(tok))
            }
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    /// Expands the span to the last consumed token.
    #[inline(always)]
    fn expand_span(&self, mut span: Span) -> Span {
        span.end_line = self.last_span.end_line;
        span.end_col = self.last_span.end_col;
        span.end_offset = self.last_span.end_offset;
        span
    }

    /// Creates an error for a premature end of the expression.
    fn unexpected_eof(&self, expected: &str) -> Error {
        unexpected("end of expression", expected).with_span(self.tokenizer.current_span())
    }

    /// Returns the current span.
    #[inline(always)]
    fn current_span(&self) -> Span {
        if let Some(Ok((_, span))) = self.current {
            span
        } else {
            self.last_span
        }
    }
}

struct Parser<'a> {
    stream: TokenStream<'a>,
}

impl<'a> Parser<'a> {
    fn new(raw: &'a str, span: Span) -> Parser<'a> {
        Parser {
            stream: TokenStream::new(raw, span),
        }
    }

    fn parse_expr(&mut self) -> Result<ast::Expr<'a>, Error> {
        let span = self.stream.current_span();
        let left = ok!(self.parse_operand());
        let op = match ok!(self.stream.current()) {
            Some((ExprToken::Eq, _)) => ast::CompareOp::Eq,
            Some((ExprToken::Ne, _)) => ast::CompareOp::Ne,
            _ => return Ok(left),
        };
        ok!(self.stream.next());
        let right = ok!(self.parse_operand());
        Ok(ast::Expr::Compare(Spanned::new(
            ast::Compare { op, left, right },
            self.stream.expand_span(span),
        )))
    }

    fn parse_operand(&mut self) -> Result<ast::Expr<'a>, Error> {
        match ok!(self.stream.current()) {
            Some((ExprToken::Ident(name), span)) if !is_literal(name) => {
                ok!(self.stream.next());
                if matches!(ok!(self.stream.current()), Some((ExprToken::ParenOpen, _))) {
                    self.parse_call(name, span)
                } else {
                    self.parse_path(name, span)
                }
            }
            _ => self.parse_argument(),
        }
    }

    fn parse_call(&mut self, name: &'a str, name_span: Span) -> Result<ast::Expr<'a>, Error> {
        expect_token!(self, ExprToken::ParenOpen => (), "`(`");
        if skip_token!(self, ExprToken::ParenClose) {
            syntax_error!("helper {} requires exactly one argument", name);
        }
        let arg = ok!(self.parse_argument());
        match ok!(self.stream.next()) {
            Some((ExprToken::ParenClose, _)) => {}
            Some((ExprToken::Comma, _)) => {
                syntax_error!("helper {} requires exactly one argument", name)
            }
            Some((token, span)) => return Err(unexpected(token, "`)`").with_span(span)),
            None => return Err(self.stream.unexpected_eof("`)`")),
        }
        Ok(ast::Expr::Call(Spanned::new(
            ast::Call {
                name,
                name_span,
                arg,
            },
            self.stream.expand_span(name_span),
        )))
    }

    fn parse_argument(&mut self) -> Result<ast::Expr<'a>, Error> {
        let (token, span) = match ok!(self.stream.next()) {
            Some(rv) => rv,
            None => return Err(self.stream.unexpected_eof("string, literal or variable")),
        };
        match token {
            ExprToken::Str(s) => Ok(make_const(Value::from(s), span)),
            ExprToken::Ident("true" | "True") => Ok(make_const(Value::from(true), span)),
            ExprToken::Ident("false" | "False") => Ok(make_const(Value::from(false), span)),
            ExprToken::Ident("none" | "None") => Ok(make_const(Value::from(()), span)),
            ExprToken::Ident(root) => {
                if matches!(ok!(self.stream.current()), Some((ExprToken::ParenOpen, _))) {
                    return Err(syntax_error(Cow::Borrowed("helper calls cannot be nested"))
                        .with_span(span));
                }
                self.parse_path(root, span)
            }
            token => Err(unexpected(token, "string, literal or variable").with_span(span)),
        }
    }

    fn parse_path(&mut self, root: &'a str, span: Span) -> Result<ast::Expr<'a>, Error> {
        let mut segments = Vec::new();
        loop {
            if skip_token!(self, ExprToken::Dot) {
                let (key, _) = expect_token!(self, ExprToken::Ident(name) => name, "identifier");
                segments.push(ast::PathSegment::Key(key));
            } else if skip_token!(self, ExprToken::BracketOpen) {
                let segment = match ok!(self.stream.next()) {
                    Some((ExprToken::Str(key), _)) => ast::PathSegment::Key(key),
                    Some((ExprToken::Int(idx), _)) => ast::PathSegment::Index(idx),
                    Some((token, span)) => {
                        return Err(unexpected(token, "string or integer").with_span(span))
                    }
                    None => return Err(self.stream.unexpected_eof("string or integer")),
                };
                expect_token!(self, ExprToken::BracketClose => (), "`]`");
                segments.push(segment);
            } else {
                break;
            }
        }
        Ok(ast::Expr::Path(Spanned::new(
            ast::Path { root, segments },
            self.stream.expand_span(span),
        )))
    }

    fn parse_standalone(&mut self) -> Result<ast::Expr<'a>, Error> {
        if ok!(self.stream.current()).is_none() {
            syntax_error!("empty expression");
        }
        let expr = ok!(self.parse_expr());
        if let Some((token, span)) = ok!(self.stream.current()) {
            return Err(unexpected(token, "end of expression").with_span(span));
        }
        Ok(expr)
    }
}

/// Parses a marker interior into an expression.
///
/// `span` is the location of `raw` within the stencil source so that the
/// spans of the produced nodes and errors point into the stencil.
pub fn parse_expr(raw: &str, span: Span) -> Result<ast::Expr<'_>, Error> {
    Parser::new(raw, span)
        .parse_standalone()
        .map_err(|err| err.with_span(span))
}
