use std::borrow::Cow;
use std::fmt;

use crate::compiler::ast::{self, Spanned};
use crate::compiler::lexer::{Tokenizer, WhitespaceConfig};
use crate::compiler::parser::parse_expr;
use crate::compiler::tokens::{Span, Token};
use crate::error::{Error, ErrorKind};

/// The default limit for nested directives.
pub const DEFAULT_MAX_DEPTH: usize = 150;

fn unexpected<D: fmt::Display>(unexpected: D, expected: &str) -> Error {
    Error::new(
        ErrorKind::SyntaxError,
        format!("unexpected {unexpected}, expected {expected}"),
    )
}

fn syntax_error(msg: Cow<'static, str>) -> Error {
    Error::new(ErrorKind::SyntaxError, msg)
}

fn unbalanced(msg: &'static str) -> Error {
    Error::new(ErrorKind::UnbalancedDirective, msg)
}

fn span_between(start: Span, end: Span) -> Span {
    Span {
        end_line: end.end_line,
        end_col: end.end_col,
        end_offset: end.end_offset,
        ..start
    }
}

/// An `if` directive whose `endif` has not been seen yet.
struct Frame<'a> {
    expr: ast::Expr<'a>,
    span: Span,
    true_body: Vec<ast::Node<'a>>,
    false_body: Option<Vec<ast::Node<'a>>>,
}

impl<'a> Frame<'a> {
    fn active_body(&mut self) -> &mut Vec<ast::Node<'a>> {
        match self.false_body {
            Some(ref mut body) => body,
            None => &mut self.true_body,
        }
    }
}

/// Turns the token stream into a tree with an explicit frame stack.
struct TreeBuilder<'a> {
    tokenizer: Tokenizer<'a>,
    root: Vec<ast::Node<'a>>,
    stack: Vec<Frame<'a>>,
    max_depth: usize,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str, ws_config: WhitespaceConfig, max_depth: usize) -> TreeBuilder<'a> {
        TreeBuilder {
            tokenizer: Tokenizer::new(source, ws_config),
            root: Vec::new(),
            stack: Vec::new(),
            max_depth,
        }
    }

    fn push_node(&mut self, node: ast::Node<'a>) {
        match self.stack.last_mut() {
            Some(frame) => frame.active_body().push(node),
            None => self.root.push(node),
        }
    }

    fn expect_raw(&mut self, start: Span) -> Result<(&'a str, Span), Error> {
        match self.tokenizer.next_token() {
            Some((Token::Raw(raw), span)) => Ok((raw, span)),
            Some((token, span)) => Err(unexpected(token, "expression").with_span(span)),
            None => Err(syntax_error(Cow::Borrowed("unexpected end of input")).with_span(start)),
        }
    }

    fn expect_end(
        &mut self,
        end: Token<'a>,
        start: Span,
        expected: &'static str,
    ) -> Result<Span, Error> {
        match self.tokenizer.next_token() {
            Some((token, span)) if token == end => Ok(span),
            Some((token, span)) => Err(unexpected(token, expected).with_span(span)),
            None => Err(syntax_error(Cow::Owned(format!(
                "unexpected end of input, expected {expected}"
            )))
            .with_span(start)),
        }
    }

    fn build(mut self) -> Result<ast::Template<'a>, Error> {
        while let Some((token, span)) = self.tokenizer.next_token() {
            match token {
                Token::TemplateData(raw) => {
                    self.push_node(ast::Node::EmitRaw(Spanned::new(ast::EmitRaw { raw }, span)))
                }
                Token::VariableStart => {
                    let (raw, raw_span) = ok!(self.expect_raw(span));
                    let expr = ok!(parse_expr(raw, raw_span));
                    let end = ok!(self.expect_end(
                        Token::VariableEnd,
                        span_between(span, raw_span),
                        "end of interpolation `}|`"
                    ));
                    self.push_node(ast::Node::EmitExpr(Spanned::new(
                        ast::EmitExpr { expr },
                        span_between(span, end),
                    )));
                }
                Token::BlockStart => ok!(self.build_directive(span)),
                token => return Err(unexpected(token, "template data").with_span(span)),
            }
        }

        if let Some(frame) = self.stack.last() {
            return Err(unbalanced("unclosed if, expected endif").with_span(frame.span));
        }
        Ok(ast::Template {
            children: self.root,
        })
    }

    fn build_directive(&mut self, start: Span) -> Result<(), Error> {
        let (keyword, keyword_span) = match self.tokenizer.next_token() {
            Some((Token::Keyword(keyword), span)) => (keyword, span),
            Some((token, span)) => return Err(unexpected(token, "directive keyword").with_span(span)),
            None => return Err(syntax_error(Cow::Borrowed("unexpected end of input")).with_span(start)),
        };
        let (raw, raw_span) = ok!(self.expect_raw(span_between(start, keyword_span)));
        let directive_span = span_between(start, raw_span);

        match keyword {
            "if" => {
                let expr = ok!(parse_expr(raw, raw_span));
                let end = ok!(self.expect_end(Token::BlockEnd, directive_span, "end of directive `%}`"));
                if self.stack.len() >= self.max_depth {
                    return Err(
                        Error::new_depth_exceeded(self.max_depth).with_span(span_between(start, end))
                    );
                }
                self.stack.push(Frame {
                    expr,
                    span: span_between(start, end),
                    true_body: Vec::new(),
                    false_body: None,
                });
            }
            "else" => {
                ok!(self.ensure_bare(keyword, raw, raw_span));
                let end = ok!(self.expect_end(Token::BlockEnd, directive_span, "end of directive `%}`"));
                match self.stack.last_mut() {
                    None => {
                        return Err(unbalanced("unexpected else outside of if")
                            .with_span(span_between(start, end)))
                    }
                    Some(frame) if frame.false_body.is_some() => {
                        return Err(unbalanced("duplicate else in if")
                            .with_span(span_between(start, end)))
                    }
                    Some(frame) => frame.false_body = Some(Vec::new()),
                }
            }
            "endif" => {
                ok!(self.ensure_bare(keyword, raw, raw_span));
                let end = ok!(self.expect_end(Token::BlockEnd, directive_span, "end of directive `%}`"));
                let frame = match self.stack.pop() {
                    Some(frame) => frame,
                    None => {
                        return Err(unbalanced("unexpected endif without matching if")
                            .with_span(span_between(start, end)))
                    }
                };
                self.push_node(ast::Node::IfCond(Spanned::new(
                    ast::IfCond {
                        expr: frame.expr,
                        true_body: frame.true_body,
                        false_body: frame.false_body,
                    },
                    span_between(frame.span, end),
                )));
            }
            "" if raw.trim().is_empty() => {
                return Err(syntax_error(Cow::Borrowed("empty directive")).with_span(directive_span))
            }
            "" => {
                return Err(syntax_error(Cow::Borrowed("expected directive keyword"))
                    .with_span(raw_span))
            }
            other => {
                return Err(syntax_error(Cow::Owned(format!("unknown directive `{other}`")))
                    .with_span(keyword_span))
            }
        }
        Ok(())
    }

    fn ensure_bare(&self, keyword: &str, raw: &str, raw_span: Span) -> Result<(), Error> {
        if raw.trim().is_empty() {
            Ok(())
        } else {
            Err(syntax_error(Cow::Owned(format!(
                "unexpected `{}` after {keyword}",
                raw.trim()
            )))
            .with_span(raw_span))
        }
    }
}

/// Builds the directive tree of a stencil.
///
/// Errors carry the location within `source`; `name` is only used for
/// error reporting.
pub fn build<'source>(
    source: &'source str,
    name: Option<&str>,
    ws_config: WhitespaceConfig,
    max_depth: usize,
) -> Result<ast::Template<'source>, Error> {
    TreeBuilder::new(source, ws_config, max_depth)
        .build()
        .map_err(|mut err| {
            err.attach_location(name, source);
            err
        })
}
