//! Stencil is a small template engine for rendering stencils: text files
//! (typically configuration or source files of a generated project) with a
//! tiny amount of templating mixed in.  It is implemented on top of
//! [`serde`] so any serializable value can act as context.
//!
//! The syntax is intentionally minimal so that it does not collide with the
//! syntax of the text it is embedded into.  Only two constructs exist:
//!
//! ```text
//! |{ expression }|
//! {% if expression %} ... {% else %} ... {% endif %}
//! ```
//!
//! Everything else (including `{{ }}`, `#{ }` or `%w()`) is literal text and
//! passed through unchanged.
//!
//! ```ruby
//! default['myapp']['database'] = |{ qstring(options['database']) }|
//! {% if options.adapter == 'mysql' %}
//! include_recipe "mysql::server"
//! {% endif %}
//! ```
//!
//! # Template Usage
//!
//! To use stencil one needs to create an [`Environment`] and populate it
//! with templates and helpers.  Afterwards templates can be loaded and
//! rendered.  To pass data one can pass any serde serializable value.  The
//! [`context!`] macro can be used to quickly construct a context:
//!
//! ```
//! use stencil::{Environment, context};
//!
//! let mut env = Environment::new();
//! env.add_template("hello", "Hello |{ name }|!").unwrap();
//! let tmpl = env.get_template("hello").unwrap();
//! println!("{}", tmpl.render(context!(name => "John")).unwrap());
//! ```
//!
//! ```plain
//! Hello John!
//! ```
//!
//! For cases where a template is only rendered once
//! [`Environment::render_str`] parses and renders in one go.
//!
//! # Expressions
//!
//! Expressions are deliberately limited.  They are one of:
//!
//! * a variable path: `cookbook.name`, `options['database']`, `servers[0]`
//! * a string literal: `'mysql'` or `"mysql"`
//! * `true`, `false` or `none`
//! * a comparison of two of the above with `==` or `!=`
//! * a call of a host registered helper with exactly one argument:
//!   `qstring(options.name)`
//!
//! There are no arithmetic, boolean operators, filters or loops.  The
//! [`Environment::compile_expression`] method evaluates a standalone
//! expression against a context:
//!
//! ```
//! use stencil::{Environment, context};
//!
//! let env = Environment::new();
//! let expr = env.compile_expression("node.platform != 'windows'").unwrap();
//! let result = expr.eval(context!(node => context!(platform => "ubuntu"))).unwrap();
//! assert_eq!(result.is_true(), true);
//! ```
//!
//! # Helpers
//!
//! The engine has no built-in helpers.  Hosts register single-argument
//! functions with [`Environment::add_helper`]; see [`helpers`] for details.
//!
//! # Undefined Values
//!
//! By default missing variables render as the empty string and are false in
//! conditions.  With [`UndefinedBehavior::Strict`] every undefined lookup
//! is an error instead.
//!
//! # Error Handling
//!
//! Syntax errors and unbalanced directives are reported when a template is
//! parsed and carry the line and a snippet of the offending source.  Render
//! errors abort rendering without returning partial output.  See [`Error`].
//!
//! # Logging
//!
//! The engine logs through the [`log`] facade: template compilation and
//! helper registration at `debug`, helper invocations at `trace`.  It never
//! installs a logger itself.
//!
//! # Optional Features
//!
//! - `preserve_order`: when enabled the internal value implementation uses
//!   an indexmap which preserves the original order of maps and structs.
//! - `unstable_machinery`: exposes an unstable internal API (no semver
//!   guarantees) to tokenize and parse stencils and to drive the renderer.
#![allow(clippy::cognitive_complexity)]
#![allow(clippy::needless_borrowed_reference)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

#[macro_use]
mod macros;

mod compiler;
mod environment;
mod error;
mod expression;
mod renderer;
mod template;
mod utils;

pub mod helpers;
pub mod value;

pub use self::environment::Environment;
pub use self::error::{Error, ErrorKind};
pub use self::expression::Expression;
pub use self::template::Template;
pub use self::utils::UndefinedBehavior;

/// Re-export for convenience.
pub use self::value::Value;

pub use self::macros::__context;

/// This module gives access to the low level machinery.
///
/// This module is only provided by the `unstable_machinery` feature and does not
/// have a stable interface.  It mostly exists for internal testing purposes and
/// for debugging.
#[cfg(feature = "unstable_machinery")]
#[cfg_attr(docsrs, doc(cfg(feature = "unstable_machinery")))]
pub mod machinery {
    #![allow(missing_docs)]
    pub use crate::compiler::ast;
    pub use crate::compiler::builder::{build, DEFAULT_MAX_DEPTH};
    pub use crate::compiler::lexer::{tokenize, ExprTokenizer, Tokenizer, WhitespaceConfig};
    pub use crate::compiler::parser::parse_expr;
    pub use crate::compiler::tokens::{ExprToken, Span, Token};
    pub use crate::renderer::Renderer;
    pub use crate::template::CompiledTemplate;

    /// Returns a reference to a [`CompiledTemplate`] from a [`Template`](crate::Template).
    pub fn get_compiled_template<'x, 'env>(
        tmpl: &'x crate::Template<'env, 'env>,
    ) -> &'x CompiledTemplate<'env> {
        &tmpl.compiled
    }
}
