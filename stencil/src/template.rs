use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;

use crate::compiler::ast;
use crate::compiler::builder::build;
use crate::compiler::lexer::WhitespaceConfig;
use crate::environment::Environment;
use crate::error::Error;
use crate::renderer::Renderer;
use crate::value::Value;

/// Represents a handle to a template.
///
/// Templates are stored in the [`Environment`] as directive trees.  With the
/// [`Environment::get_template`] method that is looked up and returned in form of
/// this handle.  Such a template can be cheaply copied as it only holds references.
///
/// To render the [`render`](Template::render) method can be used.
#[derive(Clone)]
pub struct Template<'env, 'source> {
    env: &'env Environment<'source>,
    pub(crate) compiled: CompiledTemplateRef<'env, 'source>,
}

impl fmt::Debug for Template<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ds = f.debug_struct("Template");
        ds.field("name", &self.name());
        #[cfg(feature = "unstable_machinery")]
        {
            ds.field("root", &self.compiled.root);
        }
        ds.finish()
    }
}

impl<'env, 'source> Template<'env, 'source> {
    pub(crate) fn new(
        env: &'env Environment<'source>,
        compiled: CompiledTemplateRef<'env, 'source>,
    ) -> Template<'env, 'source> {
        Template { env, compiled }
    }

    /// Returns the name of the template.
    pub fn name(&self) -> &str {
        self.compiled.name()
    }

    /// Returns the source code of the template.
    pub fn source(&self) -> &str {
        self.compiled.source
    }

    /// Renders the template into a string.
    ///
    /// The provided value is used as the initial context for the template.  It
    /// can be any object that implements [`Serialize`](serde::Serialize).  You
    /// can either create your own struct and derive `Serialize` for it or the
    /// [`context!`](crate::context) macro can be used to create an ad-hoc context.
    ///
    /// ```
    /// # use stencil::{Environment, context};
    /// # let mut env = Environment::new();
    /// # env.add_template("database.rb", "db |{ options.name }|").unwrap();
    /// let tmpl = env.get_template("database.rb").unwrap();
    /// let rv = tmpl.render(context!(options => context!(name => "main"))).unwrap();
    /// assert_eq!(rv, "db main");
    /// ```
    ///
    /// Rendering is all or nothing: on error no partial output is returned.
    pub fn render<S: Serialize>(&self, ctx: S) -> Result<String, Error> {
        // reduce total amount of code falling under mono morphization into
        // this function, and share the rest in _render.
        self._render(Value::from_serialize(&ctx))
    }

    fn _render(&self, root: Value) -> Result<String, Error> {
        let mut rv = String::with_capacity(self.compiled.buffer_size_hint);
        match Renderer::new(self.env).render(&self.compiled.root, &root, &mut rv) {
            Ok(()) => Ok(rv),
            Err(mut err) => {
                err.attach_location(self.compiled.name, self.source());
                Err(err)
            }
        }
    }
}

#[derive(Clone)]
pub(crate) enum CompiledTemplateRef<'env, 'source> {
    Owned(Arc<CompiledTemplate<'source>>),
    Borrowed(&'env CompiledTemplate<'source>),
}

impl<'source> Deref for CompiledTemplateRef<'_, 'source> {
    type Target = CompiledTemplate<'source>;

    fn deref(&self) -> &Self::Target {
        match *self {
            CompiledTemplateRef::Owned(ref x) => x,
            CompiledTemplateRef::Borrowed(x) => x,
        }
    }
}

/// Represents a compiled template in memory.
pub struct CompiledTemplate<'source> {
    /// The name of the template.
    pub name: Option<&'source str>,
    /// The source of the template.
    pub source: &'source str,
    /// The directive tree.
    pub root: ast::Template<'source>,
    /// Size hint for string rendering.
    pub buffer_size_hint: usize,
}

impl fmt::Debug for CompiledTemplate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("name", &self.name())
            .field("root", &self.root)
            .finish()
    }
}

impl<'source> CompiledTemplate<'source> {
    /// Creates a compiled template from name and source.
    pub fn new(
        name: Option<&'source str>,
        source: &'source str,
        ws_config: WhitespaceConfig,
        max_depth: usize,
    ) -> Result<CompiledTemplate<'source>, Error> {
        let root = ok!(build(source, name, ws_config, max_depth));
        Ok(CompiledTemplate {
            name,
            source,
            root,
            buffer_size_hint: source.len(),
        })
    }

    /// Returns the name used in error messages.
    pub fn name(&self) -> &str {
        self.name.unwrap_or("<string>")
    }
}
