use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::compiler::builder::DEFAULT_MAX_DEPTH;
use crate::compiler::lexer::WhitespaceConfig;
use crate::compiler::parser::parse_expr;
use crate::compiler::tokens::Span;
use crate::error::Error;
use crate::expression::Expression;
use crate::helpers::{BoxedHelper, Helper};
use crate::renderer::Renderer;
use crate::template::{CompiledTemplate, CompiledTemplateRef, Template};
use crate::utils::UndefinedBehavior;
use crate::value::{ArgType, HelperResult, Value};

type TemplateMap<'source> = BTreeMap<&'source str, Arc<CompiledTemplate<'source>>>;

/// Utility to only print the keys of a map in debug output.
struct MapKeysDebug<'a, K, V>(&'a BTreeMap<K, V>);

impl<'a, K: fmt::Debug, V> fmt::Debug for MapKeysDebug<'a, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.keys()).finish()
    }
}

/// An abstraction that holds the engine configuration.
///
/// This object holds the central configuration state for stencils: the
/// registered helpers, the render options and the cache of named templates.
///
/// The environment holds references to the source the templates were created
/// from.  Templates added with [`add_template`](Self::add_template) are parsed
/// once and can then be rendered any number of times, also concurrently from
/// multiple threads.
///
/// ```
/// use stencil::{Environment, context};
///
/// let mut env = Environment::new();
/// env.add_helper("qstring", |s: String| format!("'{s}'"));
/// env.add_template("database.rb", "name |{ qstring(options.database) }|").unwrap();
/// let tmpl = env.get_template("database.rb").unwrap();
/// let ctx = context!(options => context!(database => "myapp"));
/// assert_eq!(tmpl.render(ctx).unwrap(), "name 'myapp'");
/// ```
#[derive(Clone)]
pub struct Environment<'source> {
    templates: TemplateMap<'source>,
    helpers: BTreeMap<Cow<'source, str>, BoxedHelper>,
    undefined_behavior: UndefinedBehavior,
    max_depth: usize,
    ws_config: WhitespaceConfig,
}

impl<'source> Default for Environment<'source> {
    fn default() -> Self {
        Environment::new()
    }
}

impl<'source> fmt::Debug for Environment<'source> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("helpers", &MapKeysDebug(&self.helpers))
            .field("templates", &MapKeysDebug(&self.templates))
            .field("undefined_behavior", &self.undefined_behavior)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl<'source> Environment<'source> {
    /// Creates a new environment.
    ///
    /// The environment does not contain any templates or helpers.  Undefined
    /// values are lenient, nesting is limited to 150 levels and literal text
    /// is passed through unchanged except for a single trailing newline.
    pub fn new() -> Environment<'source> {
        Environment {
            templates: Default::default(),
            helpers: Default::default(),
            undefined_behavior: UndefinedBehavior::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            ws_config: WhitespaceConfig::default(),
        }
    }

    /// Loads a template from a string.
    ///
    /// The `name` parameter defines the name of the template which identifies
    /// it.  To look up a loaded template use the [`get_template`](Self::get_template)
    /// method.  The template is parsed right away, so syntax errors and
    /// unbalanced directives are reported here.
    ///
    /// Templates are parsed with the whitespace and depth settings active
    /// at the time they are added.
    pub fn add_template(&mut self, name: &'source str, source: &'source str) -> Result<(), Error> {
        let compiled = ok!(CompiledTemplate::new(
            Some(name),
            source,
            self.ws_config,
            self.max_depth
        ));
        debug!("compiled template {name} ({} bytes)", source.len());
        self.templates.insert(name, Arc::new(compiled));
        Ok(())
    }

    /// Removes a template by name.
    pub fn remove_template(&mut self, name: &str) {
        self.templates.remove(name);
    }

    /// Fetches a template by name.
    ///
    /// This requires that the template has been loaded with
    /// [`add_template`](Environment::add_template) beforehand.  If the template was
    /// not loaded an error of kind `TemplateNotFound` is returned.
    ///
    /// ```
    /// # use stencil::{Environment, context};
    /// let mut env = Environment::new();
    /// env.add_template("attributes.rb", "default['port'] = |{ options.port }|").unwrap();
    /// let tmpl = env.get_template("attributes.rb").unwrap();
    /// println!("{}", tmpl.render(context!{ options => context!(port => 3306) }).unwrap());
    /// ```
    pub fn get_template(&self, name: &str) -> Result<Template<'_, 'source>, Error> {
        let compiled = ok!(self
            .templates
            .get(name)
            .ok_or_else(|| Error::new_not_found(name)));
        Ok(Template::new(self, CompiledTemplateRef::Borrowed(compiled)))
    }

    /// Loads a template from a string without registering it.
    ///
    /// The resulting template can be rendered many times.  Its name is
    /// `<string>`.
    ///
    /// ```
    /// # use stencil::{Environment, context};
    /// let env = Environment::new();
    /// let tmpl = env.template_from_str("Hello |{ name }|!").unwrap();
    /// assert_eq!(tmpl.render(context!(name => "World")).unwrap(), "Hello World!");
    /// ```
    pub fn template_from_str(&self, source: &'source str) -> Result<Template<'_, 'source>, Error> {
        self._template_from_str(None, source)
    }

    /// Loads a named template from a string without registering it.
    ///
    /// Like [`template_from_str`](Self::template_from_str) but the name shows
    /// up in error messages.
    pub fn template_from_named_str(
        &self,
        name: &'source str,
        source: &'source str,
    ) -> Result<Template<'_, 'source>, Error> {
        self._template_from_str(Some(name), source)
    }

    fn _template_from_str(
        &self,
        name: Option<&'source str>,
        source: &'source str,
    ) -> Result<Template<'_, 'source>, Error> {
        let compiled = ok!(CompiledTemplate::new(
            name,
            source,
            self.ws_config,
            self.max_depth
        ));
        Ok(Template::new(
            self,
            CompiledTemplateRef::Owned(Arc::new(compiled)),
        ))
    }

    /// Parses and renders a template from a string in one go.
    ///
    /// In some cases you really only need a template to be rendered once from
    /// a string and returned.  The internal name of the template is `<string>`.
    ///
    /// ```
    /// # use stencil::{Environment, context};
    /// let env = Environment::new();
    /// let rv = env.render_str("Hello |{ name }|", context! { name => "World" });
    /// assert_eq!(rv.unwrap(), "Hello World");
    /// ```
    ///
    /// **Note on values:** The [`Value`] type implements `Serialize` and can be
    /// passed to render directly.
    pub fn render_str<S: Serialize>(&self, source: &str, ctx: S) -> Result<String, Error> {
        // reduce total amount of code falling under mono morphization into
        // this function, and share the rest in _render_str.
        self._render_str(source, Value::from_serialize(&ctx))
    }

    fn _render_str(&self, source: &str, root: Value) -> Result<String, Error> {
        let compiled = ok!(CompiledTemplate::new(
            None,
            source,
            self.ws_config,
            self.max_depth
        ));
        let mut rv = String::with_capacity(compiled.buffer_size_hint);
        match Renderer::new(self).render(&compiled.root, &root, &mut rv) {
            Ok(()) => Ok(rv),
            Err(mut err) => {
                err.attach_location(None, source);
                Err(err)
            }
        }
    }

    /// Compiles an expression.
    ///
    /// This lets one compile a standalone stencil expression (a variable path,
    /// a literal, a comparison or a helper call) and evaluate it against a
    /// context.  For more information and an example see [`Expression`].
    pub fn compile_expression(
        &self,
        expr: &'source str,
    ) -> Result<Expression<'_, 'source>, Error> {
        let span = Span {
            start_line: 1,
            ..Span::default()
        };
        match parse_expr(expr, span) {
            Ok(ast) => Ok(Expression::new(self, ast, expr)),
            Err(mut err) => {
                err.attach_location(Some("<expression>"), expr);
                Err(err)
            }
        }
    }

    /// Changes the undefined behavior.
    ///
    /// This changes the runtime behavior of [`undefined`](Value::UNDEFINED) values in
    /// the engine.  For more information see [`UndefinedBehavior`].  The
    /// default is [`UndefinedBehavior::Lenient`].
    pub fn set_undefined_behavior(&mut self, behavior: UndefinedBehavior) {
        self.undefined_behavior = behavior;
    }

    /// Returns the current undefined behavior.
    pub fn undefined_behavior(&self) -> UndefinedBehavior {
        self.undefined_behavior
    }

    /// Sets the maximum nesting depth of directives.
    ///
    /// Parsing and rendering fail with
    /// [`DepthExceeded`](crate::ErrorKind::DepthExceeded) if `if` directives
    /// are nested deeper than this.  The default is 150.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Returns the maximum nesting depth.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Preserve the trailing newline when rendering templates.
    ///
    /// The default is `false`, which causes a single newline, if present, to be
    /// stripped from the end of the template.
    pub fn set_keep_trailing_newline(&mut self, yes: bool) {
        self.ws_config.keep_trailing_newline = yes;
    }

    /// Returns the value of the trailing newline preservation flag.
    pub fn keep_trailing_newline(&self) -> bool {
        self.ws_config.keep_trailing_newline
    }

    /// Remove the first newline after a directive.
    ///
    /// This is useful to keep directives on lines of their own without
    /// producing empty lines.  The default is `false`.
    pub fn set_trim_blocks(&mut self, yes: bool) {
        self.ws_config.trim_blocks = yes;
    }

    /// Returns the value of the trim blocks flag.
    pub fn trim_blocks(&self) -> bool {
        self.ws_config.trim_blocks
    }

    /// Remove leading spaces and tabs from the start of a line to a directive.
    ///
    /// The default is `false`.
    pub fn set_lstrip_blocks(&mut self, yes: bool) {
        self.ws_config.lstrip_blocks = yes;
    }

    /// Returns the value of the lstrip blocks flag.
    pub fn lstrip_blocks(&self) -> bool {
        self.ws_config.lstrip_blocks
    }

    /// Adds a new helper.
    ///
    /// Helpers are single-argument functions that stencils can call
    /// (`|{ qstring(options.database) }|`).  Registering a helper under an
    /// existing name replaces it.  For details have a look at
    /// [`helpers`](crate::helpers).
    pub fn add_helper<N, F, Rv, Arg>(&mut self, name: N, f: F)
    where
        N: Into<Cow<'source, str>>,
        F: Helper<Rv, Arg>,
        Rv: HelperResult,
        Arg: ArgType,
    {
        let name = name.into();
        debug!("registered helper {name}");
        self.helpers.insert(name, BoxedHelper::new(f));
    }

    /// Removes a helper by name.
    pub fn remove_helper(&mut self, name: &str) {
        self.helpers.remove(name);
    }

    /// Looks up a helper.
    pub(crate) fn get_helper(&self, name: &str) -> Option<&BoxedHelper> {
        self.helpers.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    use crate::ErrorKind;

    #[test]
    fn test_environment_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Environment<'static>>();
        assert_send_sync::<Template<'static, 'static>>();
    }

    #[test]
    fn test_template_cache() {
        let mut env = Environment::new();
        env.add_template("a.rb", "a").unwrap();
        assert_eq!(env.get_template("a.rb").unwrap().name(), "a.rb");
        env.remove_template("a.rb");
        let err = env.get_template("a.rb").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateNotFound);
        assert_eq!(err.detail(), Some("template \"a.rb\" does not exist"));
    }

    #[test]
    fn test_settings() {
        let mut env = Environment::new();
        assert_eq!(env.undefined_behavior(), UndefinedBehavior::Lenient);
        assert_eq!(env.max_depth(), 150);
        assert!(!env.keep_trailing_newline());
        assert!(!env.trim_blocks());
        assert!(!env.lstrip_blocks());
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_max_depth(3);
        env.set_trim_blocks(true);
        assert_eq!(env.undefined_behavior(), UndefinedBehavior::Strict);
        assert_eq!(env.max_depth(), 3);
        assert!(env.trim_blocks());
    }

    #[test]
    fn test_debug_lists_keys() {
        let mut env = Environment::new();
        env.add_helper("qstring", |s: String| format!("'{s}'"));
        env.add_template("recipe.rb", "x").unwrap();
        let repr = format!("{env:?}");
        assert!(repr.contains("helpers: [\"qstring\"]"));
        assert!(repr.contains("templates: [\"recipe.rb\"]"));
    }
}
