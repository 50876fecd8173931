//! Response-shape matching for the remote model endpoint.
//!
//! Enterprise gateways in front of different model servers answer in one of
//! three JSON shapes. Rather than branching on them inside the client, each
//! shape is a matcher in [`RESPONSE_SHAPES`], tried in order; the first one
//! that recognises the body wins.
//!
//! | Order | Shape                                   | Typical server            |
//! |-------|-----------------------------------------|---------------------------|
//! | 1     | `{"choices":[{"message":{"content"}}]}` | OpenAI-compatible         |
//! | 2     | `{"generated_text": …}`                 | text-generation-inference |
//! | 3     | `{"content": …}`                        | bespoke gateways          |

use serde_json::Value;

/// What a single matcher concluded about a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeMatch {
    /// The body is not of this shape; try the next matcher.
    NotThisShape,
    /// The body is of this shape and carries this text (may be empty).
    Text(String),
    /// The body claims this shape but the text field is missing.
    Malformed(String),
}

/// A named response-shape matcher.
pub struct ResponseShape {
    pub name: &'static str,
    pub matcher: fn(&Value) -> ShapeMatch,
}

/// All known shapes, in priority order.
pub const RESPONSE_SHAPES: &[ResponseShape] = &[
    ResponseShape {
        name: "choices",
        matcher: match_choices,
    },
    ResponseShape {
        name: "generated_text",
        matcher: match_generated_text,
    },
    ResponseShape {
        name: "content",
        matcher: match_content,
    },
];

/// Run the matchers in order and return the first conclusive result.
///
/// `None` means no shape recognised the body.
pub fn match_response(body: &Value) -> Option<Result<String, String>> {
    RESPONSE_SHAPES
        .iter()
        .find_map(|shape| match (shape.matcher)(body) {
            ShapeMatch::NotThisShape => None,
            ShapeMatch::Text(t) => Some(Ok(t)),
            ShapeMatch::Malformed(why) => Some(Err(format!("{} shape: {}", shape.name, why))),
        })
}

fn match_choices(body: &Value) -> ShapeMatch {
    let Some(first) = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        // Absent or empty `choices` falls through to the next shape.
        return ShapeMatch::NotThisShape;
    };

    match first.get("message").and_then(|m| m.get("content")) {
        Some(v) => ShapeMatch::Text(value_text(v)),
        None => ShapeMatch::Malformed("choices[0].message.content missing".into()),
    }
}

fn match_generated_text(body: &Value) -> ShapeMatch {
    match body.get("generated_text") {
        Some(v) => ShapeMatch::Text(value_text(v)),
        None => ShapeMatch::NotThisShape,
    }
}

fn match_content(body: &Value) -> ShapeMatch {
    match body.get("content") {
        Some(v) => ShapeMatch::Text(value_text(v)),
        None => ShapeMatch::NotThisShape,
    }
}

/// Strings are taken verbatim, `null` becomes empty, anything else is
/// serialised.
fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
