//! Deterministic call key derivation
//!
//! The cache key and the task id are both derived from the tool name and the
//! canonicalized call arguments, so a later poll with the same logical call
//! lands on the same entry regardless of the JSON key order the client used.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of digest hex characters carried into the task id
const TASK_ID_HEX_LEN: usize = 16;

/// Prefix marking gateway task ids
const TASK_ID_PREFIX: &str = "t-";

/// Deterministic key of a `(tool, arguments)` pair.
///
/// The full sha256 hex digest is the cache key; the task id is the prefixed
/// leading 16 hex characters of the same digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey(String);

impl CallKey {
    /// Derive the key from a tool name and its call arguments
    pub fn derive(tool_name: &str, arguments: &Value) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tool_name.as_bytes());
        hasher.update(b"\0");
        hasher.update(canonical_json(arguments).as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The cache key string (full hex digest)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The task id correlated with this key
    pub fn task_id(&self) -> String {
        format!("{}{}", TASK_ID_PREFIX, &self.0[..TASK_ID_HEX_LEN])
    }

    /// Shape check for externally supplied task ids.
    ///
    /// Validates format only, not existence: `t-` followed by 16 lowercase
    /// hex characters.
    pub fn is_valid_task_id(task_id: &str) -> bool {
        task_id
            .strip_prefix(TASK_ID_PREFIX)
            .is_some_and(|rest| {
                rest.len() == TASK_ID_HEX_LEN
                    && rest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
            })
    }
}

impl std::fmt::Display for CallKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialize a JSON value with object keys recursively sorted.
///
/// `serde_json`'s default map is ordered, but canonicalization must not
/// depend on a crate feature choice, so the value is rebuilt explicitly.
fn canonical_json(value: &Value) -> String {
    fn write_value(out: &mut String, value: &Value) {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                out.push('{');
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&Value::String((*key).clone()).to_string());
                    out.push(':');
                    write_value(out, &map[*key]);
                }
                out.push('}');
            }
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_value(out, item);
                }
                out.push(']');
            }
            scalar => out.push_str(&scalar.to_string()),
        }
    }

    let mut out = String::new();
    write_value(&mut out, value);
    out
}
