use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use similar_asserts::assert_eq;

use stencil::value::Value;
use stencil::{context, Environment, Error, ErrorKind, UndefinedBehavior};

fn qstring(value: String) -> String {
    format!("'{value}'")
}

#[test_log::test]
fn test_qstring() {
    let mut env = Environment::new();
    env.add_helper("qstring", qstring);
    let rv = env
        .render_str(
            "default['myapp']['database'] = |{ qstring(options['database']) }|",
            context!(options => context!(database => "myapp")),
        )
        .unwrap();
    assert_eq!(rv, "default['myapp']['database'] = 'myapp'");
}

#[test]
fn test_no_builtin_helpers() {
    let env = Environment::new();
    let err = env
        .render_str("|{ qstring('x') }|", ())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownHelper);
    assert_eq!(
        err.to_string(),
        "unknown helper: helper qstring is unknown (in <string>:1)"
    );
    assert_eq!(err.snippet(), Some("qstring"));
}

#[test]
fn test_helper_lookup_precedes_argument() {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    let err = env.render_str("|{ nope(missing) }|", ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownHelper);
}

#[test]
fn test_helper_in_condition_and_comparison() {
    let mut env = Environment::new();
    env.add_helper("qstring", qstring);
    env.add_helper("is_mysql", |adapter: String| adapter == "mysql");
    let ctx = context!(options => context!(adapter => "mysql", name => "db"));
    assert_eq!(
        env.render_str("{% if is_mysql(options.adapter) %}yes{% endif %}", &ctx)
            .unwrap(),
        "yes"
    );
    assert_eq!(
        env.render_str("{% if qstring(options.name) == \"'db'\" %}quoted{% endif %}", &ctx)
            .unwrap(),
        "quoted"
    );
}

#[test]
fn test_helper_errors_propagate() {
    fn port(value: i64) -> Result<i64, Error> {
        if (1..=65535).contains(&value) {
            Ok(value)
        } else {
            Err(Error::new(ErrorKind::InvalidOperation, "port out of range"))
        }
    }

    let mut env = Environment::new();
    env.add_helper("port", port);
    env.add_template("attributes.rb", "# header\nport = |{ port(options.port) }|")
        .unwrap();
    let tmpl = env.get_template("attributes.rb").unwrap();
    assert_eq!(
        tmpl.render(context!(options => context!(port => 3306))).unwrap(),
        "# header\nport = 3306"
    );
    let err = tmpl
        .render(context!(options => context!(port => 70000)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(err.detail(), Some("port out of range"));
    assert_eq!(err.name(), Some("attributes.rb"));
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_argument_conversion_errors() {
    let mut env = Environment::new();
    env.add_helper("qstring", qstring);
    let err = env
        .render_str("|{ qstring(roles) }|", context!(roles => vec!["a"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(err.detail(), Some("expected string argument, got sequence"));
}

#[test]
fn test_optional_argument() {
    let mut env = Environment::new();
    env.add_helper("port_or_default", |port: Option<i64>| port.unwrap_or(3306));
    assert_eq!(
        env.render_str("|{ port_or_default(options.port) }|", ())
            .unwrap(),
        "3306"
    );
    assert_eq!(
        env.render_str(
            "|{ port_or_default(options.port) }|",
            context!(options => context!(port => 5432))
        )
        .unwrap(),
        "5432"
    );
}

#[test]
fn test_value_argument_and_literals() {
    let mut env = Environment::new();
    env.add_helper("kind", |value: Value| value.kind().to_string());
    assert_eq!(
        env.render_str(
            "|{ kind('x') }| |{ kind(true) }| |{ kind(none) }| |{ kind(missing) }|",
            ()
        )
        .unwrap(),
        "string bool none undefined"
    );
}

#[test]
fn test_stateful_helper() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut env = Environment::new();
    env.add_helper("count", {
        let calls = calls.clone();
        move |value: String| {
            calls.fetch_add(1, Ordering::Relaxed);
            value
        }
    });
    let tmpl = env
        .template_from_str("{% if a %}|{ count(a) }|{% else %}|{ count(b) }|{% endif %}")
        .unwrap();
    assert_eq!(tmpl.render(context!(a => "x")).unwrap(), "x");
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn test_replace_and_remove_helper() {
    let mut env = Environment::new();
    env.add_helper("h", |_: Value| "first");
    env.add_helper("h", |_: Value| "second");
    assert_eq!(env.render_str("|{ h(x) }|", ()).unwrap(), "second");
    env.remove_helper("h");
    assert_eq!(
        env.render_str("|{ h(x) }|", ()).unwrap_err().kind(),
        ErrorKind::UnknownHelper
    );
}

#[test]
fn test_nested_calls_are_rejected() {
    let mut env = Environment::new();
    env.add_helper("qstring", qstring);
    let err = env
        .render_str("|{ qstring(qstring(a)) }|", ())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(err.detail(), Some("helper calls cannot be nested"));
}
