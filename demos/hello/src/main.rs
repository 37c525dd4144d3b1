use serde::Serialize;
use stencil::{context, Environment};

#[derive(Serialize)]
pub struct Cookbook {
    name: String,
}

fn main() {
    let mut env = Environment::new();
    env.add_helper("qstring", |value: String| format!("'{value}'"));
    env.add_template(
        "attributes.rb",
        "default[|{ qstring(cookbook.name) }|]['user'] = |{ qstring(cookbook.name) }|",
    )
    .unwrap();
    let template = env.get_template("attributes.rb").unwrap();
    let cookbook = Cookbook {
        name: "myapp".into(),
    };
    println!("{}", template.render(context!(cookbook)).unwrap());
}
