use std::io::Read;
use std::process;

use clap::{ArgAction, Parser, ValueEnum};
use serde_json::Value;
use tracing::Level;

use jsonq::{Context, QueryError};

/// Run a jsonq query against a JSON document.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON document (string), or `-` to read it from stdin.
    json: String,
    /// Query, e.g. `issue.changelog.items[fieldId=="assignee"][0]`
    query: String,
    /// Further queries applied to the selection, in order (repeatable)
    #[arg(long = "select", value_name = "QUERY")]
    selects: Vec<String>,
    /// Resolve the query to a single value of this type instead of a selection
    #[arg(long, value_enum, conflicts_with = "selects")]
    typed: Option<Kind>,
    /// Print the parsed query tree as JSON and exit
    #[arg(long)]
    ast: bool,
    /// Fallback JSON printed when nothing was selected (optional)
    #[arg(long)]
    default: Option<String>,
    /// Log parsing and evaluation to stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    String,
    Number,
    Integer,
    Boolean,
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if args.ast {
        let path = jsonq::parse_path(&args.query).unwrap_or_else(|e| fail(&e));
        print_json(&serde_json::to_value(&path).unwrap_or_else(|e| fail(&e)));
        return;
    }

    // Parse input JSON.
    let text = if args.json == "-" {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            fail(&e);
        }
        buf
    } else {
        args.json.clone()
    };
    let data: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Invalid JSON: {e}");
            process::exit(1);
        }
    };

    let out = match args.typed {
        Some(kind) => typed(&data, &args.query, kind),
        None => selection(&data, &args.query, &args.selects),
    };
    let out = match out {
        Ok(v) => v,
        Err(QueryError::OptionalMissing { .. }) => Value::Null,
        Err(e) => fail(&e),
    };

    print_json(&or_default(out, args.default.as_deref()));
}

// Falls back to the default when nothing came out.
fn or_default(out: Value, default: Option<&str>) -> Value {
    let empty = out.is_null() || out.as_array().is_some_and(|a| a.is_empty());
    match default {
        Some(def) if empty => {
            serde_json::from_str::<Value>(def).unwrap_or_else(|_| Value::String(def.to_string()))
        }
        _ => out,
    }
}

fn typed(data: &Value, query: &str, kind: Kind) -> jsonq::Result<Value> {
    // `get_string` reads a missing optional path as "", which would hide it
    // from `--default`.
    jsonq::get_one(data, query)?;
    Ok(match kind {
        Kind::String => Value::from(jsonq::get_string(data, query)?),
        Kind::Number => Value::from(jsonq::get_number(data, query)?),
        Kind::Integer => Value::from(jsonq::get_integer(data, query)?),
        Kind::Boolean => Value::from(jsonq::get_boolean(data, query)?),
    })
}

fn selection(data: &Value, query: &str, selects: &[String]) -> jsonq::Result<Value> {
    let mut ctx = Context::new(data);
    ctx.select(query);
    for q in selects {
        ctx.select(q);
    }
    let values = ctx.into_values()?;
    Ok(Value::Array(values.into_iter().cloned().collect()))
}

fn print_json(v: &Value) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{s}"),
        Err(e) => fail(&e),
    }
}

fn fail(e: &dyn std::fmt::Display) -> ! {
    eprintln!("error: {e}");
    process::exit(1);
}
