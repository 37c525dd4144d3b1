//! This is a small example program that renders a stencil with a JSON
//! context and prints the result to stdout.  It registers the `qstring`
//! helper that wraps a value in single quotes.  Set `RUST_LOG=trace` to see
//! the helper invocations.
use std::fs;
use std::path::PathBuf;

use argh::FromArgs;
use stencil::{Environment, UndefinedBehavior};

/// A small application that renders a stencil.
#[derive(FromArgs)]
struct Cli {
    /// the path to a JSON file with the context
    #[argh(option, short = 'c', long = "context")]
    context: PathBuf,

    /// the path to the stencil that should be rendered
    #[argh(option, short = 't', long = "template")]
    template: PathBuf,

    /// fail on undefined variables
    #[argh(switch, long = "strict")]
    strict: bool,

    /// remove the first newline after a directive and the indentation
    /// in front of it
    #[argh(switch, long = "trim")]
    trim: bool,
}

fn execute() -> Result<(), Box<dyn std::error::Error>> {
    let cli: Cli = argh::from_env();

    let source = fs::read_to_string(&cli.template)?;
    let mut env = Environment::new();
    env.add_helper("qstring", |value: String| format!("'{value}'"));
    if cli.strict {
        env.set_undefined_behavior(UndefinedBehavior::Strict);
    }
    if cli.trim {
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
    }

    let name = cli
        .template
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or("stencil");
    env.add_template(name, &source)?;

    let ctx: serde_json::Value = serde_json::from_slice(&fs::read(&cli.context)?)?;

    let tmpl = env.get_template(name)?;
    println!("{}", tmpl.render(ctx)?);

    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = execute() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
