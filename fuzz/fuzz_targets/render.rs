#![no_main]
use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde::Serialize;

#[derive(Debug, Serialize, Arbitrary)]
#[serde(untagged)]
enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

fuzz_target!(|data: (&str, bool, Value)| {
    let (source, strict, value) = data;

    let mut env = stencil::Environment::new();
    env.add_helper("qstring", |s: String| format!("'{s}'"));
    if strict {
        env.set_undefined_behavior(stencil::UndefinedBehavior::Strict);
    }

    if env.add_template("fuzz.rb", source).is_err() {
        return;
    }

    let tmpl = env.get_template("fuzz.rb").unwrap();
    let first = tmpl.render(&value).ok();
    assert_eq!(first, tmpl.render(&value).ok());
});
