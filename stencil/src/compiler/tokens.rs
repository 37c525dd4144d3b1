use std::fmt;

/// Represents a token in the stencil stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Raw template data.
    TemplateData(&'a str),
    /// Interpolation start (`|{`).
    VariableStart,
    /// Interpolation end (`}|`).
    VariableEnd,
    /// Directive start (`{%`).
    BlockStart,
    /// Directive end (`%}`).
    BlockEnd,
    /// The keyword right after a directive start (`if`, `else`, `endif`).
    Keyword(&'a str),
    /// The unparsed interior of a marker pair.
    Raw(&'a str),
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::TemplateData(_) => f.write_str("template-data"),
            Token::VariableStart => f.write_str("start of interpolation"),
            Token::VariableEnd => f.write_str("end of interpolation"),
            Token::BlockStart => f.write_str("start of directive"),
            Token::BlockEnd => f.write_str("end of directive"),
            Token::Keyword(_) => f.write_str("directive keyword"),
            Token::Raw(_) => f.write_str("expression"),
        }
    }
}

/// Represents a token within an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprToken<'a> {
    /// An identifier.
    Ident(&'a str),
    /// A quoted string (without the quotes).
    Str(&'a str),
    /// An integer.
    Int(u64),
    /// A dot operator (`.`)
    Dot,
    /// The comma operator (`,`)
    Comma,
    /// `==` operator
    Eq,
    /// `!=` operator
    Ne,
    /// Open Bracket
    BracketOpen,
    /// Close Bracket
    BracketClose,
    /// Open Parenthesis
    ParenOpen,
    /// Close Parenthesis
    ParenClose,
}

impl<'a> fmt::Display for ExprToken<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprToken::Ident(_) => f.write_str("identifier"),
            ExprToken::Str(_) => f.write_str("string"),
            ExprToken::Int(_) => f.write_str("integer"),
            ExprToken::Dot => f.write_str("`.`"),
            ExprToken::Comma => f.write_str("`,`"),
            ExprToken::Eq => f.write_str("`==`"),
            ExprToken::Ne => f.write_str("`!=`"),
            ExprToken::BracketOpen => f.write_str("`[`"),
            ExprToken::BracketClose => f.write_str("`]`"),
            ExprToken::ParenOpen => f.write_str("`(`"),
            ExprToken::ParenClose => f.write_str("`)`"),
        }
    }
}

/// Token span information.
///
/// Lines are 1-based, columns are 0-based and counted in characters,
/// offsets are byte offsets into the stencil source.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub start_offset: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub end_offset: u32,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " @ {}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}
