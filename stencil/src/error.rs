use std::borrow::Cow;
use std::fmt;

use crate::compiler::tokens::Span;

/// Maximum number of characters of source kept as error snippet.
const MAX_SNIPPET_LEN: usize = 60;

/// Represents stencil errors.
///
/// Errors raised while parsing carry the location (line and [`Span`]) of the
/// offending construct as well as a short snippet of the source.  The
/// alternative formatting (``format!("{:#}", err)``) renders the source line
/// the error points to.
///
/// # Example
///
/// ```rust
/// # let env = stencil::Environment::new();
/// match env.render_str("{% if x %}never closed", ()) {
///     Ok(result) => println!("{}", result),
///     Err(err) => {
///         eprintln!("Could not render stencil:");
///         eprintln!("  {:#}", err);
///     }
/// }
/// ```
pub struct Error {
    repr: Box<ErrorRepr>,
}

struct ErrorRepr {
    kind: ErrorKind,
    detail: Option<Cow<'static, str>>,
    name: Option<String>,
    lineno: usize,
    span: Option<Span>,
    snippet: Option<String>,
    source_line: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut err = f.debug_struct("Error");
        err.field("kind", &self.kind());
        if let Some(ref detail) = self.repr.detail {
            err.field("detail", detail);
        }
        if let Some(ref name) = self.name() {
            err.field("name", name);
        }
        if let Some(line) = self.line() {
            err.field("line", &line);
        }
        if let Some(ref snippet) = self.repr.snippet {
            err.field("snippet", snippet);
        }
        if let Some(ref source) = self.repr.source {
            err.field("source", source);
        }
        err.finish()
    }
}

/// An enum describing the error kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A marker interior or a directive could not be parsed.
    SyntaxError,
    /// An `if` without `endif`, a stray `endif` or a misplaced `else`.
    UnbalancedDirective,
    /// A helper was invoked that is not registered.
    UnknownHelper,
    /// A variable path did not resolve (strict mode only).
    UndefinedError,
    /// Directives are nested deeper than the configured limit.
    DepthExceeded,
    /// A named template was not registered with the environment.
    TemplateNotFound,
    /// An operation on a value failed (helper arguments, helper failures).
    InvalidOperation,
    /// A context could not be converted into a value.
    BadSerialization,
}

impl ErrorKind {
    fn description(self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "syntax error",
            ErrorKind::UnbalancedDirective => "unbalanced directive",
            ErrorKind::UnknownHelper => "unknown helper",
            ErrorKind::UndefinedError => "undefined value",
            ErrorKind::DepthExceeded => "nesting depth exceeded",
            ErrorKind::TemplateNotFound => "template not found",
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::BadSerialization => "could not serialize to value",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref detail) = self.repr.detail {
            ok!(write!(f, "{}: {}", self.kind(), detail));
        } else {
            ok!(write!(f, "{}", self.kind()));
        }
        if let Some(line) = self.line() {
            ok!(write!(
                f,
                " (in {}:{})",
                self.name().unwrap_or("<string>"),
                line
            ));
        }
        if f.alternate() {
            if let Some(ref source_line) = self.repr.source_line {
                ok!(writeln!(f));
                ok!(writeln!(f, "{:-^1$}", " Stencil Source ", 74));
                ok!(writeln!(f, "{:>4} > {}", self.repr.lineno, source_line));
                if let Some(ref snippet) = self.repr.snippet {
                    ok!(writeln!(f, "     = near {snippet:?}"));
                }
                ok!(write!(f, "{:-^1$}", "", 74));
            }
        }
        Ok(())
    }
}

impl Error {
    /// Creates a new error with kind and detail.
    pub fn new<D: Into<Cow<'static, str>>>(kind: ErrorKind, detail: D) -> Error {
        Error {
            repr: Box::new(ErrorRepr {
                kind,
                detail: Some(detail.into()),
                name: None,
                lineno: 0,
                span: None,
                snippet: None,
                source_line: None,
                source: None,
            }),
        }
    }

    pub(crate) fn new_not_found(name: &str) -> Error {
        Error::new(
            ErrorKind::TemplateNotFound,
            format!("template {name:?} does not exist"),
        )
    }

    pub(crate) fn new_unknown_helper(name: &str) -> Error {
        Error::new(
            ErrorKind::UnknownHelper,
            format!("helper {name} is unknown"),
        )
    }

    pub(crate) fn new_depth_exceeded(limit: usize) -> Error {
        Error::new(
            ErrorKind::DepthExceeded,
            format!("directives nested deeper than the limit of {limit}"),
        )
    }

    /// Attaches a span to the error unless it already carries one.
    pub(crate) fn with_span(mut self, span: Span) -> Error {
        if self.repr.span.is_none() {
            self.repr.span = Some(span);
        }
        self
    }

    /// Resolves the attached span against the source.
    ///
    /// This fills in the line number, the snippet and the source line used
    /// by the alternative formatting.  Errors that already have a location
    /// are left alone.
    pub(crate) fn attach_location(&mut self, name: Option<&str>, source: &str) {
        if self.repr.lineno > 0 {
            return;
        }
        let span = match self.repr.span {
            Some(span) => span,
            None => return,
        };
        self.repr.name = name.map(|x| x.to_string());
        self.repr.lineno = span.start_line as usize;
        let start = (span.start_offset as usize).min(source.len());
        let end = (span.end_offset as usize).clamp(start, source.len());
        if let Some(snippet) = source.get(start..end) {
            self.repr.snippet = Some(snippet.chars().take(MAX_SNIPPET_LEN).collect());
        }
        self.repr.source_line = source
            .lines()
            .nth(self.repr.lineno.saturating_sub(1))
            .map(|x| x.to_string());
    }

    /// Attaches another error as source to this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.repr.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.repr.kind
    }

    /// Returns the error detail.
    ///
    /// The detail is an error message that provides further details about
    /// the error kind, for instance the name of the missing helper.
    pub fn detail(&self) -> Option<&str> {
        self.repr.detail.as_deref()
    }

    /// Returns the name of the template if the error was raised in a named template.
    pub fn name(&self) -> Option<&str> {
        self.repr.name.as_deref()
    }

    /// Returns the line number where the error occurred.
    pub fn line(&self) -> Option<usize> {
        if self.repr.lineno > 0 {
            Some(self.repr.lineno)
        } else {
            None
        }
    }

    /// Returns the span in the stencil source the error points to.
    pub fn span(&self) -> Option<Span> {
        self.repr.span
    }

    /// Returns the piece of source the error points to.
    pub fn snippet(&self) -> Option<&str> {
        self.repr.snippet.as_deref()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.repr.source.as_ref().map(|err| err.as_ref() as _)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            repr: Box::new(ErrorRepr {
                kind,
                detail: None,
                name: None,
                lineno: 0,
                span: None,
                snippet: None,
                source_line: None,
                source: None,
            }),
        }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::new(ErrorKind::InvalidOperation, "formatting failed")
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Error::new(ErrorKind::BadSerialization, msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_location_from_span() {
        let source = "line one\nhello |{ broken( }|\n";
        let span = Span {
            start_line: 2,
            start_col: 9,
            start_offset: 18,
            end_line: 2,
            end_col: 16,
            end_offset: 25,
        };
        let mut err = Error::new(ErrorKind::SyntaxError, "unexpected end").with_span(span);
        err.attach_location(Some("recipe.rb"), source);
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.snippet(), Some("broken("));
        assert_eq!(err.name(), Some("recipe.rb"));
        assert_eq!(
            err.to_string(),
            "syntax error: unexpected end (in recipe.rb:2)"
        );
        let alternate = format!("{err:#}");
        assert!(alternate.contains("   2 > hello |{ broken( }|"));
        assert!(alternate.contains("near \"broken(\""));
    }

    #[test]
    fn test_no_location_without_span() {
        let mut err = Error::new_unknown_helper("qstring");
        err.attach_location(None, "whatever");
        assert_eq!(err.line(), None);
        assert_eq!(err.to_string(), "unknown helper: helper qstring is unknown");
    }
}
