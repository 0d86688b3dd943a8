//! Variable interpolation over configuration values
//!
//! Strings in a resolved configuration may reference variables as `{name}`.
//! A string that is exactly one `{name}` token substitutes the bound value
//! with its type preserved, so a field can resolve to a list or boolean.
//! Any other string is treated as a template: each embedded `{name}` is
//! replaced by the binding's string form, and names absent from the binding
//! table render as empty rather than failing. `{{` and `}}` escape literal
//! braces.

use serde_json::{Map, Value};

/// Replace variable references in `value`, recursing through lists and maps.
pub fn interpolate(value: &Value, variables: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => {
            if let Some(name) = whole_token(s) {
                return variables.get(name).cloned().unwrap_or(Value::String(String::new()));
            }
            Value::String(render_template(s, variables))
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate(v, variables)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate(v, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Render a template string, substituting each `{name}` placeholder.
pub fn render_template(template: &str, variables: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if closed {
                    if let Some(value) = variables.get(&name) {
                        out.push_str(&value_to_string(value));
                    }
                } else {
                    // Unterminated reference, keep the literal text
                    out.push('{');
                    out.push_str(&name);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Returns the variable name if the string is exactly one `{name}` token.
fn whole_token(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() || inner.contains(['{', '}']) {
        return None;
    }
    Some(inner)
}

/// The string form of a binding when substituted inside a larger template.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
