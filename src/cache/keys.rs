//! Cache key derivation.
//!
//! A key is `"{prefix}_{sha256(args_json ++ kwargs_json)}"`. Positional
//! arguments serialize as a JSON array and named arguments as a JSON object
//! whose keys are sorted, so the order in which named arguments were supplied
//! never changes the key.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Arguments of one wrapped call, split the same way the key is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyArgs {
    args: Vec<Value>,
    kwargs: Map<String, Value>,
}

impl KeyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    ///
    /// Values whose `Serialize` impl is not deterministic (for example a
    /// `HashMap` serialized as a sequence) must be normalized by the caller.
    pub fn arg(mut self, value: impl Serialize) -> Self {
        self.args.push(to_value(value));
        self
    }

    /// Add a named argument. A repeated name replaces the previous value.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        self.kwargs.insert(name.into(), to_value(value));
        self
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    /// Derive the cache key for these arguments under `prefix`.
    pub fn key(&self, prefix: &str) -> String {
        build_key(prefix, &self.args, &self.kwargs)
    }
}

fn to_value(value: impl Serialize) -> Value {
    // Serializing into a `Value` only fails for maps with non-string keys;
    // those collapse to null rather than aborting the call.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Build the cache key for a call of `prefix` with the given arguments.
pub fn build_key(prefix: &str, args: &[Value], kwargs: &Map<String, Value>) -> String {
    let args_repr = canonical_json(&Value::Array(args.to_vec()));
    let kwargs_repr = canonical_json(&Value::Object(kwargs.clone()));

    let mut hasher = Sha256::new();
    hasher.update(args_repr.as_bytes());
    hasher.update(kwargs_repr.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{prefix}_{digest}")
}

/// Render a value with object keys in sorted order at every depth.
fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (index, (name, item)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
