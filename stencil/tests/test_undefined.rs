use similar_asserts::assert_eq;

use stencil::{context, Environment, ErrorKind, UndefinedBehavior};

fn strict_env<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_helper("qstring", |value: String| format!("'{value}'"));
    env
}

#[test]
fn test_lenient_undefined() {
    let env = Environment::new();
    let ctx = context!(options => context!(host => "db1"));
    assert_eq!(
        env.render_str("[|{ options.port }|][|{ cookbook.name }|]", &ctx)
            .unwrap(),
        "[][]"
    );
    assert_eq!(
        env.render_str("{% if options.port %}yes{% else %}no{% endif %}", &ctx)
            .unwrap(),
        "no"
    );
    assert_eq!(
        env.render_str("{% if options.port == '' %}empty{% endif %}", &ctx)
            .unwrap(),
        "empty"
    );
    assert_eq!(
        env.render_str("|{ options.host.name }|", &ctx).unwrap(),
        ""
    );
}

#[test]
fn test_strict_undefined_output() {
    let env = strict_env();
    let err = env
        .render_str(
            "Host: |{ options['host'] }|",
            context!(options => context!(port => 3306)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedError);
    assert_eq!(err.detail(), Some("options[\"host\"] is undefined"));
    assert_eq!(err.snippet(), Some("options['host']"));
}

#[test]
fn test_strict_undefined_condition() {
    let env = strict_env();
    let err = env
        .render_str("{% if options.port %}x{% endif %}", context!(options => ()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedError);
    insta::assert_snapshot!(err.to_string(), @r###"undefined value: options["port"] is undefined (in <string>:1)"###);
}

#[test]
fn test_strict_undefined_comparison_and_helper() {
    let env = strict_env();
    for source in [
        "{% if missing == '' %}x{% endif %}",
        "|{ qstring(missing) }|",
        "|{ list[3] }|",
    ] {
        let err = env
            .render_str(source, context!(list => vec![1, 2, 3]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedError, "for {source:?}");
    }
}

#[test]
fn test_strict_defined_values() {
    let env = strict_env();
    let ctx = context!(
        options => context!(database => "myapp", password => ()),
        flag => false,
    );
    assert_eq!(
        env.render_str(
            "|{ qstring(options.database) }|[|{ options.password }|]{% if flag %}on{% else %}off{% endif %}",
            &ctx
        )
        .unwrap(),
        "'myapp'[]off"
    );
}

#[test]
fn test_untaken_branches_are_not_evaluated() {
    let env = strict_env();
    assert_eq!(
        env.render_str(
            "{% if flag %}|{ missing }|{% else %}fine{% endif %}",
            context!(flag => false)
        )
        .unwrap(),
        "fine"
    );
}
