//! Locating the JSON object in free-form model output.

use serde_json::{Map, Value};

use crate::InferenceError;

fn invalid(reason: &str, text: &str) -> InferenceError {
    InferenceError::InvalidJson {
        reason: reason.to_string(),
        raw: text.to_string(),
    }
}

/// Byte span of the first balanced `{...}` block. Braces inside string
/// literals are ignored.
fn first_object_span(text: &str) -> Result<(usize, usize), &'static str> {
    let start = text.find('{').ok_or("no JSON object found")?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((start, i + 1));
                }
            }
            _ => {}
        }
    }
    Err("unbalanced braces")
}

/// Parse the first JSON object embedded in `text` (prose, code fences and
/// trailing chatter are ignored).
pub fn first_json_object(text: &str) -> Result<Map<String, Value>, InferenceError> {
    let (start, end) = first_object_span(text).map_err(|reason| invalid(reason, text))?;
    match serde_json::from_str::<Value>(&text[start..end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(invalid("not a JSON object", text)),
        Err(e) => Err(invalid(&e.to_string(), text)),
    }
}
