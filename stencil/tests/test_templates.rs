use std::fmt::Write;
use std::fs;

use similar_asserts::assert_eq;

use stencil::{context, Environment, ErrorKind};

fn create_env<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.add_helper("qstring", |value: String| format!("'{value}'"));
    env
}

/// Every input is a JSON context and a stencil separated by a `---` line.
/// The rendered output (or the error) is compared against a stored snapshot.
#[test]
fn test_stencils() {
    insta::glob!("inputs/*.txt", |path| {
        let filename = path.file_name().unwrap().to_str().unwrap();
        let contents = fs::read_to_string(path).unwrap().replace("\r\n", "\n");
        let mut iter = contents.splitn(2, "\n---\n");
        let ctx: serde_json::Value = serde_json::from_str(iter.next().unwrap()).unwrap();
        let source = iter.next().unwrap();

        let mut env = create_env();
        let rendered = if let Err(err) = env.add_template(filename, source) {
            let mut rendered = String::from("!!!SYNTAX ERROR!!!\n\n");
            writeln!(rendered, "{err:#}").unwrap();
            rendered
        } else {
            let template = env.get_template(filename).unwrap();
            match template.render(&ctx) {
                Ok(mut rendered) => {
                    rendered.push('\n');
                    rendered
                }
                Err(err) => {
                    let mut rendered = String::from("!!!ERROR!!!\n\n");
                    writeln!(rendered, "{err:#}").unwrap();
                    rendered
                }
            }
        };

        insta::with_settings!({
            info => &ctx,
            description => source.trim_end(),
            omit_expression => true
        }, {
            insta::assert_snapshot!(&rendered);
        });
    });
}

#[test]
fn test_render_is_idempotent() {
    let env = create_env();
    let tmpl = env
        .template_from_str(
            "db |{ qstring(options.database) }|{% if options.port %} on |{ options.port }|{% endif %}",
        )
        .unwrap();
    let ctx = context!(options => context!(database => "myapp", port => 3306));
    let first = tmpl.render(&ctx).unwrap();
    let second = tmpl.render(&ctx).unwrap();
    assert_eq!(first, "db 'myapp' on 3306");
    assert_eq!(first, second);
}

#[test]
fn test_document_order_is_preserved() {
    let env = Environment::new();
    let rv = env
        .render_str(
            "1|{ a }|2{% if t %}3|{ b }|4{% else %}x{% endif %}5",
            context!(a => "A", b => "B", t => true),
        )
        .unwrap();
    assert_eq!(rv, "1A23B45");
}

#[test]
fn test_unbalanced_directives() {
    let env = Environment::new();
    for source in [
        "{% if a %}",
        "{% if a %}{% if b %}{% endif %}",
        "{% endif %}",
        "{% if a %}{% endif %}{% endif %}",
        "{% else %}",
        "{% if a %}{% else %}{% else %}{% endif %}",
    ] {
        let err = env.render_str(source, ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnbalancedDirective, "for {source:?}");
    }
}

#[test]
fn test_syntax_errors_point_at_source() {
    let env = Environment::new();
    let err = env
        .template_from_named_str("attributes.rb", "a = 1\nb = |{ options[ }|\n")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(err.name(), Some("attributes.rb"));
    assert_eq!(err.line(), Some(2));
    insta::assert_snapshot!(
        err.to_string(),
        @"syntax error: unexpected end of expression, expected string or integer (in attributes.rb:2)"
    );
    let alternate = format!("{err:#}");
    assert!(alternate.contains("   2 > b = |{ options[ }|"));
}

#[test]
fn test_unknown_directive() {
    let env = Environment::new();
    let err = env.render_str("{% for x in y %}{% endfor %}", ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(err.detail(), Some("unknown directive `for`"));
    assert_eq!(err.snippet(), Some("for"));
}

#[test]
fn test_unterminated_markers() {
    let env = Environment::new();
    let err = env.render_str("name |{ cookbook.name", ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(
        err.detail(),
        Some("unexpected end of input, expected end of interpolation `}|`")
    );
    let err = env.render_str("{% if a ", ()).unwrap_err();
    assert_eq!(
        err.detail(),
        Some("unexpected end of input, expected end of directive `%}`")
    );
}
