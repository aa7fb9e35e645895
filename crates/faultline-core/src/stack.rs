//! Stack renderer: an error tree as one deterministic, indented text block.
//!
//! ```text
//! TestError: test error
//!     ---
//!     additional info: "additional info"
//!     from: TestError: from
//!     additional error: TestError: additional error
//!     field: TestError: field error
//! ```

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

use crate::types::{Additional, ErrorRef};
use crate::value::{from_value, wrap_sequence};

const SEPARATOR: &str = "\n    ---";
const INDENT: &str = "\n    ";

/// How far below a record the renderer descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// Additional info, cause, list errors and field errors.
    #[default]
    Full,
    /// Additional info, cause and list errors; field errors are skipped.
    Errors,
    /// Additional info and cause only.
    Causes,
}

/// Render the full stack of `err`.
pub fn render(err: &ErrorRef) -> String {
    render_with(err, Depth::Full)
}

/// Render `err`, descending no further than `depth`.
pub fn render_with(err: &ErrorRef, depth: Depth) -> String {
    let mut path = Vec::new();
    render_node(err, depth, &mut path)
}

/// Render a sequence of errors. A non-empty sequence is shown as an `Array`
/// record listing each entry.
pub fn render_all(errors: &[ErrorRef]) -> String {
    if errors.is_empty() {
        return render_value(&Value::Array(Vec::new()));
    }
    render(&wrap_sequence(errors.to_vec()))
}

/// Render any JSON value; see [`from_value`] for how it is read.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Array(items) if !items.is_empty() => {
            render(&wrap_sequence(items.iter().map(from_value).collect()))
        }
        other => render(&from_value(other)),
    }
}

fn render_node(err: &ErrorRef, depth: Depth, path: &mut Vec<usize>) -> String {
    let (head, additional, from, errors, fields, sectioned) = {
        let record = err.read();
        // Collections present at this depth get a separator even when
        // nothing under them ends up rendered.
        let sectioned = record.from.is_some()
            || record.additional.is_some()
            || (depth != Depth::Causes && (!record.errors.is_empty() || record.fields.is_some()));
        let errors = match depth {
            Depth::Full | Depth::Errors => record.errors.clone(),
            Depth::Causes => Vec::new(),
        };
        let fields: Vec<(String, ErrorRef)> = match depth {
            Depth::Full => record
                .field_errors()
                .map(|(name, sub)| (name.clone(), sub.clone()))
                .collect(),
            Depth::Errors | Depth::Causes => Vec::new(),
        };
        (
            record.headline(),
            record.additional.clone(),
            record.from.clone(),
            errors,
            fields,
            sectioned,
        )
    };

    // A record already being rendered further up closes a cycle.
    let id = err.id();
    if path.contains(&id) {
        return head;
    }
    path.push(id);

    let mut blocks = String::new();
    match &additional {
        Some(Additional::Json(payload)) => match pretty(payload) {
            Ok(text) => push_block(&mut blocks, "additional info", &text),
            Err(e) => push_block(&mut blocks, "additional info error", &e.to_string()),
        },
        Some(Additional::Unserializable(reason)) => {
            push_block(&mut blocks, "additional info error", reason)
        }
        None => {}
    }
    if let Some(from) = &from {
        let text = render_node(from, Depth::Causes, path);
        push_block(&mut blocks, "from", &text);
    }
    for sub in &errors {
        let text = render_node(sub, Depth::Causes, path);
        push_block(&mut blocks, "additional error", &text);
    }
    for (name, sub) in &fields {
        let text = render_node(sub, Depth::Errors, path);
        push_block(&mut blocks, name, &text);
    }

    path.pop();

    if sectioned {
        format!("{head}{SEPARATOR}{blocks}")
    } else {
        head
    }
}

/// Append `"\n<label>: <text>"` with every line pushed one level deeper.
fn push_block(out: &mut String, label: &str, text: &str) {
    let block = format!("\n{label}: {text}");
    out.push_str(&block.replace('\n', INDENT));
}

fn pretty(value: &Value) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
