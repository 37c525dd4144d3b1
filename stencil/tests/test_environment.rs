use std::collections::BTreeMap;

use serde::Serialize;
use similar_asserts::assert_eq;

use stencil::value::Value;
use stencil::{context, Environment, ErrorKind};

#[test]
fn test_basic() {
    let mut env = Environment::new();
    env.add_template("database.rb", "name |{ options.database }|")
        .unwrap();
    let t = env.get_template("database.rb").unwrap();
    let mut options = BTreeMap::new();
    options.insert("database", "myapp");
    let mut ctx = BTreeMap::new();
    ctx.insert("options", options);
    let rv = t.render(ctx).unwrap();
    assert_eq!(rv, "name myapp");
    assert_eq!(t.name(), "database.rb");
    assert_eq!(t.source(), "name |{ options.database }|");
}

#[test]
fn test_struct_context() {
    #[derive(Serialize)]
    struct Cookbook {
        name: String,
        year: u32,
    }

    #[derive(Serialize)]
    struct Ctx {
        cookbook: Cookbook,
    }

    let env = Environment::new();
    let rv = env
        .render_str(
            "# |{ cookbook.name }| (c) |{ cookbook.year }|",
            Ctx {
                cookbook: Cookbook {
                    name: "myapp".into(),
                    year: 2015,
                },
            },
        )
        .unwrap();
    assert_eq!(rv, "# myapp (c) 2015");
}

#[test]
fn test_clone() {
    let mut env = Environment::new();
    env.add_template("test", "a").unwrap();
    let mut env2 = env.clone();
    assert_eq!(env2.get_template("test").unwrap().render(()).unwrap(), "a");
    env2.add_template("test", "b").unwrap();
    assert_eq!(env2.get_template("test").unwrap().render(()).unwrap(), "b");
    assert_eq!(env.get_template("test").unwrap().render(()).unwrap(), "a");
}

#[test]
fn test_template_not_found() {
    let mut env = Environment::new();
    let err = env.get_template("missing.rb").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TemplateNotFound);
    env.add_template("missing.rb", "").unwrap();
    assert_eq!(env.get_template("missing.rb").unwrap().render(()).unwrap(), "");
    env.remove_template("missing.rb");
    assert!(env.get_template("missing.rb").is_err());
}

#[test]
fn test_add_template_reports_errors() {
    let mut env = Environment::new();
    let err = env
        .add_template("recipe.rb", "{% if a %}\n{% else %}\n{% else %}\n{% endif %}")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnbalancedDirective);
    assert_eq!(err.name(), Some("recipe.rb"));
    assert_eq!(err.line(), Some(3));
    assert!(env.get_template("recipe.rb").is_err());
}

#[test]
fn test_expression() {
    let env = Environment::new();
    let expr = env.compile_expression("options.adapter == 'mysql'").unwrap();
    let ctx = context!(options => context!(adapter => "mysql"));
    assert_eq!(expr.eval(&ctx).unwrap(), Value::from(true));

    let expr = env.compile_expression("node.roles[1]").unwrap();
    let rv = expr
        .eval(context!(node => context!(roles => vec!["base", "db"])))
        .unwrap();
    assert_eq!(rv, Value::from("db"));
}

#[test]
fn test_expression_errors() {
    let env = Environment::new();
    let err = env.compile_expression("a == b == c").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(err.name(), Some("<expression>"));

    let expr = env.compile_expression("shout(name)").unwrap();
    let err = expr.eval(context!(name => "x")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownHelper);
    assert_eq!(err.line(), Some(1));
}

#[test]
fn test_trailing_newline() {
    let mut env = Environment::new();
    assert_eq!(env.render_str("a\n", ()).unwrap(), "a");
    assert_eq!(env.render_str("a\n\n", ()).unwrap(), "a\n");
    env.set_keep_trailing_newline(true);
    assert_eq!(env.render_str("a\n", ()).unwrap(), "a\n");
}

#[test]
fn test_trim_and_lstrip_blocks() {
    let source = "a\n  {% if x %}\n  b\n  {% endif %}\nc";
    let mut env = Environment::new();
    assert_eq!(
        env.render_str(source, context!(x => true)).unwrap(),
        "a\n  \n  b\n  \nc"
    );
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    assert!(env.trim_blocks());
    assert!(env.lstrip_blocks());
    assert_eq!(
        env.render_str(source, context!(x => true)).unwrap(),
        "a\n  b\nc"
    );
    assert_eq!(env.render_str(source, context!(x => false)).unwrap(), "a\nc");
}

#[test]
fn test_whitespace_settings_apply_at_add_time() {
    let mut env = Environment::new();
    env.add_template("plain", "{% if x %}\nb{% endif %}").unwrap();
    env.set_trim_blocks(true);
    env.add_template("trimmed", "{% if x %}\nb{% endif %}").unwrap();
    let ctx = context!(x => true);
    assert_eq!(env.get_template("plain").unwrap().render(&ctx).unwrap(), "\nb");
    assert_eq!(env.get_template("trimmed").unwrap().render(&ctx).unwrap(), "b");
}

#[test]
fn test_bad_serialization() {
    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot serialize this"))
        }
    }

    let env = Environment::new();
    let err = env.render_str("|{ x }|", context!(x => Broken)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSerialization);
    assert_eq!(
        err.detail(),
        Some("context could not be converted: cannot serialize this")
    );

    let mut ctx = BTreeMap::new();
    ctx.insert(vec![1, 2], "tuple keys");
    let err = env.render_str("static", ctx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSerialization);
}

#[test]
fn test_settings_defaults() {
    let env = Environment::default();
    assert_eq!(env.max_depth(), 150);
    assert_eq!(env.undefined_behavior(), stencil::UndefinedBehavior::Lenient);
    assert!(!env.keep_trailing_newline());
}
