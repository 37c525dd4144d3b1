use std::ops::ControlFlow;

use crate::compiler::tokens::{ExprToken, Span, Token};
use crate::error::{Error, ErrorKind};
use crate::utils::memstr;

const VARIABLE_START: &str = "|{";
const VARIABLE_END: &str = "}|";
const BLOCK_START: &str = "{%";
const BLOCK_END: &str = "%}";

/// Internal config struct to control whitespace in the engine.
#[derive(Copy, Clone, Debug, Default)]
pub struct WhitespaceConfig {
    pub keep_trailing_newline: bool,
    pub lstrip_blocks: bool,
    pub trim_blocks: bool,
}

/// Utility enum that defines a marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum StartMarker {
    Variable,
    Block,
}

enum LexerState {
    Template,
    VariableInterior,
    VariableEnd,
    BlockKeyword,
    BlockInterior,
    BlockEnd,
}

/// Tracks the location of a tokenizer within the source.
struct Cursor<'s> {
    rest: &'s str,
    current_line: u32,
    current_col: u32,
    current_offset: u32,
}

impl<'s> Cursor<'s> {
    fn new(rest: &'s str, line: u32, col: u32, offset: u32) -> Cursor<'s> {
        Cursor {
            rest,
            current_line: line,
            current_col: col,
            current_offset: offset,
        }
    }

    fn advance(&mut self, bytes: usize) -> &'s str {
        let (skipped, new_rest) = self.rest.split_at(bytes);
        for c in skipped.chars() {
            match c {
                '\n' => {
                    self.current_line += 1;
                    self.current_col = 0;
                }
                _ => self.current_col += 1,
            }
        }
        self.current_offset += bytes as u32;
        self.rest = new_rest;
        skipped
    }

    #[inline]
    fn loc(&self) -> (u32, u32, u32) {
        (self.current_line, self.current_col, self.current_offset)
    }

    #[inline]
    fn span(&self, (start_line, start_col, start_offset): (u32, u32, u32)) -> Span {
        Span {
            start_line,
            start_col,
            start_offset,
            end_line: self.current_line,
            end_col: self.current_col,
            end_offset: self.current_offset,
        }
    }
}

fn find_start_marker(a: &str) -> Option<(usize, StartMarker)> {
    let bytes = a.as_bytes();
    let mut offset = 0;
    loop {
        let idx = some!(bytes[offset..]
            .iter()
            .position(|&b| b == b'|' || b == b'{'));
        match (bytes[offset + idx], bytes.get(offset + idx + 1)) {
            (b'|', Some(b'{')) => return Some((offset + idx, StartMarker::Variable)),
            (b'{', Some(b'%')) => return Some((offset + idx, StartMarker::Block)),
            _ => offset += idx + 1,
        }
    }
}

fn match_start_marker(rest: &str) -> Option<StartMarker> {
    match rest.get(..2) {
        Some(VARIABLE_START) => Some(StartMarker::Variable),
        Some(BLOCK_START) => Some(StartMarker::Block),
        _ => None,
    }
}

fn lex_identifier(s: &str) -> usize {
    s.as_bytes()
        .iter()
        .enumerate()
        .take_while(|&(idx, &c)| {
            if c == b'_' {
                true
            } else if idx == 0 {
                c.is_ascii_alphabetic()
            } else {
                c.is_ascii_alphanumeric()
            }
        })
        .count()
}

/// Strips spaces and tabs in front of a directive if they start a line.
fn lstrip_block(s: &str, at_line_start: bool) -> &str {
    let trimmed = s.trim_end_matches(|x| x == ' ' || x == '\t');
    if (trimmed.is_empty() && at_line_start) || trimmed.ends_with('\n') {
        trimmed
    } else {
        s
    }
}

/// Tokenizes stencils.
///
/// The tokenizer never fails.  Unterminated markers produce their start
/// token and interior and the stream simply ends; it's up to the tree
/// builder to complain about the missing end marker.
pub struct Tokenizer<'s> {
    cursor: Cursor<'s>,
    state: LexerState,
    ws_config: WhitespaceConfig,
}

impl<'s> Tokenizer<'s> {
    /// Creates a new tokenizer.
    pub fn new(input: &'s str, ws_config: WhitespaceConfig) -> Tokenizer<'s> {
        let mut rest = input;
        if !ws_config.keep_trailing_newline {
            if rest.ends_with('\n') {
                rest = &rest[..rest.len() - 1];
            }
            if rest.ends_with('\r') {
                rest = &rest[..rest.len() - 1];
            }
        }
        Tokenizer {
            cursor: Cursor::new(rest, 1, 0, 0),
            state: LexerState::Template,
            ws_config,
        }
    }

    /// Produces the next token from the tokenizer.
    pub fn next_token(&mut self) -> Option<(Token<'s>, Span)> {
        loop {
            let outcome = match self.state {
                LexerState::Template => {
                    if self.cursor.rest.is_empty() {
                        return None;
                    }
                    self.tokenize_root()
                }
                LexerState::VariableInterior => {
                    self.tokenize_interior(VARIABLE_END, LexerState::VariableEnd)
                }
                LexerState::BlockKeyword => self.tokenize_keyword(),
                LexerState::BlockInterior => {
                    self.tokenize_interior(BLOCK_END, LexerState::BlockEnd)
                }
                LexerState::VariableEnd => return self.tokenize_end(VARIABLE_END),
                LexerState::BlockEnd => return self.tokenize_end(BLOCK_END),
            };
            match outcome {
                ControlFlow::Break(rv) => return Some(rv),
                ControlFlow::Continue(()) => continue,
            }
        }
    }

    fn tokenize_root(&mut self) -> ControlFlow<(Token<'s>, Span)> {
        let old_loc = self.cursor.loc();
        if let Some(marker) = match_start_marker(self.cursor.rest) {
            self.cursor.advance(2);
            let token = match marker {
                StartMarker::Variable => {
                    self.state = LexerState::VariableInterior;
                    Token::VariableStart
                }
                StartMarker::Block => {
                    self.state = LexerState::BlockKeyword;
                    Token::BlockStart
                }
            };
            return ControlFlow::Break((token, self.cursor.span(old_loc)));
        }

        let rest = self.cursor.rest;
        let (lead, span) = match find_start_marker(rest) {
            Some((start, StartMarker::Block)) if self.ws_config.lstrip_blocks => {
                let peeked = &rest[..start];
                let trimmed = lstrip_block(peeked, old_loc.1 == 0);
                let lead = self.cursor.advance(trimmed.len());
                let span = self.cursor.span(old_loc);
                self.cursor.advance(peeked.len() - trimmed.len());
                (lead, span)
            }
            Some((start, _)) => (self.cursor.advance(start), self.cursor.span(old_loc)),
            None => {
                let lead = self.cursor.advance(self.cursor.rest.len());
                (lead, self.cursor.span(old_loc))
            }
        };
        if lead.is_empty() {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break((Token::TemplateData(lead), span))
        }
    }

    fn tokenize_keyword(&mut self) -> ControlFlow<(Token<'s>, Span)> {
        let ws = self
            .cursor
            .rest
            .bytes()
            .take_while(|c| c.is_ascii_whitespace())
            .count();
        self.cursor.advance(ws);
        let old_loc = self.cursor.loc();
        let keyword = self.cursor.advance(lex_identifier(self.cursor.rest));
        self.state = LexerState::BlockInterior;
        ControlFlow::Break((Token::Keyword(keyword), self.cursor.span(old_loc)))
    }

    fn tokenize_interior(
        &mut self,
        end_marker: &str,
        next_state: LexerState,
    ) -> ControlFlow<(Token<'s>, Span)> {
        let old_loc = self.cursor.loc();
        let end = memstr(self.cursor.rest.as_bytes(), end_marker.as_bytes())
            .unwrap_or(self.cursor.rest.len());
        let raw = self.cursor.advance(end);
        self.state = next_state;
        ControlFlow::Break((Token::Raw(raw), self.cursor.span(old_loc)))
    }

    fn tokenize_end(&mut self, end_marker: &str) -> Option<(Token<'s>, Span)> {
        if !self.cursor.rest.starts_with(end_marker) {
            return None;
        }
        let old_loc = self.cursor.loc();
        self.cursor.advance(end_marker.len());
        let span = self.cursor.span(old_loc);
        self.state = LexerState::Template;
        if end_marker == BLOCK_END {
            self.skip_newline_if_trim_blocks();
            Some((Token::BlockEnd, span))
        } else {
            Some((Token::VariableEnd, span))
        }
    }

    fn skip_newline_if_trim_blocks(&mut self) {
        if self.ws_config.trim_blocks {
            if self.cursor.rest.as_bytes().first() == Some(&b'\r') {
                self.cursor.advance(1);
            }
            if self.cursor.rest.as_bytes().first() == Some(&b'\n') {
                self.cursor.advance(1);
            }
        }
    }
}

/// Tokenizes the interior of a marker pair into expression tokens.
pub struct ExprTokenizer<'s> {
    cursor: Cursor<'s>,
}

impl<'s> ExprTokenizer<'s> {
    /// Creates a tokenizer for a raw interior located at `span`.
    pub fn new(raw: &'s str, span: Span) -> ExprTokenizer<'s> {
        ExprTokenizer {
            cursor: Cursor::new(raw, span.start_line, span.start_col, span.start_offset),
        }
    }

    /// Returns the current (empty) span of the tokenizer.
    pub fn current_span(&self) -> Span {
        self.cursor.span(self.cursor.loc())
    }

    fn syntax_error(&self, msg: &'static str, span: Span) -> Error {
        Error::new(ErrorKind::SyntaxError, msg).with_span(span)
    }

    /// Produces the next expression token.
    pub fn next_token(&mut self) -> Result<Option<(ExprToken<'s>, Span)>, Error> {
        let ws: usize = self
            .cursor
            .rest
            .chars()
            .map_while(|c| c.is_whitespace().then(|| c.len_utf8()))
            .sum();
        self.cursor.advance(ws);
        if self.cursor.rest.is_empty() {
            return Ok(None);
        }

        let old_loc = self.cursor.loc();
        let rest = self.cursor.rest;
        let bytes = rest.as_bytes();
        let op = match bytes.get(..2) {
            Some(b"==") => Some(ExprToken::Eq),
            Some(b"!=") => Some(ExprToken::Ne),
            _ => None,
        };
        if let Some(op) = op {
            self.cursor.advance(2);
            return Ok(Some((op, self.cursor.span(old_loc))));
        }

        let op = match bytes[0] {
            b'.' => Some(ExprToken::Dot),
            b',' => Some(ExprToken::Comma),
            b'[' => Some(ExprToken::BracketOpen),
            b']' => Some(ExprToken::BracketClose),
            b'(' => Some(ExprToken::ParenOpen),
            b')' => Some(ExprToken::ParenClose),
            b'\'' | b'"' => return self.eat_string(bytes[0]).map(Some),
            c if c.is_ascii_digit() => return self.eat_number().map(Some),
            _ => None,
        };
        if let Some(op) = op {
            self.cursor.advance(1);
            return Ok(Some((op, self.cursor.span(old_loc))));
        }

        let ident_len = lex_identifier(self.cursor.rest);
        if ident_len > 0 {
            let ident = self.cursor.advance(ident_len);
            Ok(Some((ExprToken::Ident(ident), self.cursor.span(old_loc))))
        } else {
            let char_len = self.cursor.rest.chars().next().map_or(1, |c| c.len_utf8());
            self.cursor.advance(char_len);
            Err(self.syntax_error("unexpected character", self.cursor.span(old_loc)))
        }
    }

    fn eat_number(&mut self) -> Result<(ExprToken<'s>, Span), Error> {
        let old_loc = self.cursor.loc();
        let num_len = self
            .cursor
            .rest
            .as_bytes()
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        let num = self.cursor.advance(num_len);
        match num.parse() {
            Ok(int) => Ok((ExprToken::Int(int), self.cursor.span(old_loc))),
            Err(_) => Err(self.syntax_error("invalid integer", self.cursor.span(old_loc))),
        }
    }

    fn eat_string(&mut self, delim: u8) -> Result<(ExprToken<'s>, Span), Error> {
        let old_loc = self.cursor.loc();
        let rest = self.cursor.rest;
        match rest.as_bytes()[1..].iter().position(|&c| c == delim) {
            Some(str_len) => {
                let s = self.cursor.advance(str_len + 2);
                Ok((ExprToken::Str(&s[1..s.len() - 1]), self.cursor.span(old_loc)))
            }
            None => {
                self.cursor.advance(self.cursor.rest.len());
                Err(self.syntax_error("unexpected end of string", self.cursor.span(old_loc)))
            }
        }
    }
}

/// Utility function to quickly tokenize into an iterator.
#[cfg(any(test, feature = "unstable_machinery"))]
pub fn tokenize(
    input: &str,
    ws_config: WhitespaceConfig,
) -> impl Iterator<Item = (Token<'_>, Span)> {
    // only used in tests and in the unstable machinery, the tree builder
    // drives the tokenizer directly.
    let mut tokenizer = Tokenizer::new(input, ws_config);
    std::iter::from_fn(move || tokenizer.next_token())
}
