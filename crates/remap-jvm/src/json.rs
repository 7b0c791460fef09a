//! Span-aware JSON scanner.
//!
//! serde_json discards positions, and rewriting metadata files must touch
//! only the string literals that change. This parser keeps the byte span of
//! every value so adapters can replace a single literal and leave the rest
//! of the file byte-for-byte intact.
//!
//! ## Grammar
//!
//! ```text
//! <value>  := <object> | <array> | <string> | <number> | "true" | "false" | "null"
//! <object> := "{" [<string> ":" <value> ("," <string> ":" <value>)*] "}"
//! <array>  := "[" [<value> ("," <value>)*] "]"
//! ```

use thiserror::Error;
use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, preceded, repeat, separated, separated_pair};
use winnow::prelude::*;
use winnow::stream::LocatingSlice;
use winnow::token::{any, none_of, take_while};
use winnow::ModalResult;

use remap_core::patch::Span;

type Input<'i> = LocatingSlice<&'i str>;

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("invalid JSON: {message}")]
    Syntax { message: String },
}

/// A JSON value with the span it occupies in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonNode {
    pub value: JsonValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    /// Numbers are kept as written.
    Number(String),
    /// Decoded string contents; the span covers the quotes.
    String(String),
    Array(Vec<JsonNode>),
    /// Members in document order.
    Object(Vec<(String, JsonNode)>),
}

impl JsonNode {
    /// First member named `key` of an object.
    pub fn get(&self, key: &str) -> Option<&JsonNode> {
        match &self.value {
            JsonValue::Object(members) => members.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonNode]> {
        match &self.value {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, JsonNode)]> {
        match &self.value {
            JsonValue::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Integer value of a number without fraction or exponent.
    pub fn as_i64(&self) -> Option<i64> {
        match &self.value {
            JsonValue::Number(n) => n.parse().ok(),
            _ => None,
        }
    }
}

/// Parse a whole document.
pub fn parse_json(text: &str) -> Result<JsonNode, JsonError> {
    delimited(multispace0, value, multispace0)
        .parse(LocatingSlice::new(text))
        .map_err(|e| JsonError::Syntax {
            message: format!("at byte {}: {}", e.offset(), e.inner()),
        })
}

/// Encode `value` as a JSON string literal, quotes included.
pub fn string_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

fn value(input: &mut Input<'_>) -> ModalResult<JsonNode> {
    alt((
        object.with_span().map(|(v, r)| node(v, r)),
        array.with_span().map(|(v, r)| node(v, r)),
        string.with_span().map(|(s, r)| node(JsonValue::String(s), r)),
        "true".with_span().map(|(_, r)| node(JsonValue::Bool(true), r)),
        "false".with_span().map(|(_, r)| node(JsonValue::Bool(false), r)),
        "null".with_span().map(|(_, r)| node(JsonValue::Null, r)),
        number.with_span().map(|(n, r)| node(JsonValue::Number(n), r)),
    ))
    .parse_next(input)
}

fn node(value: JsonValue, range: std::ops::Range<usize>) -> JsonNode {
    JsonNode {
        value,
        span: Span::new(range.start as u64, range.end as u64),
    }
}

fn string(input: &mut Input<'_>) -> ModalResult<String> {
    let body = repeat::<_, _, (), _, _>(0.., alt((preceded('\\', any).void(), none_of(['"', '\\']).void())));
    delimited('"', body, '"')
        .take()
        .try_map(|raw: &str| serde_json::from_str::<String>(raw))
        .parse_next(input)
}

fn number(input: &mut Input<'_>) -> ModalResult<String> {
    take_while(1.., |c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        .map(str::to_string)
        .parse_next(input)
}

fn array(input: &mut Input<'_>) -> ModalResult<JsonValue> {
    delimited(
        ('[', multispace0),
        separated(0.., value, (multispace0, ',', multispace0)),
        (multispace0, ']'),
    )
    .map(JsonValue::Array)
    .parse_next(input)
}

fn member(input: &mut Input<'_>) -> ModalResult<(String, JsonNode)> {
    separated_pair(string, (multispace0, ':', multispace0), value).parse_next(input)
}

fn object(input: &mut Input<'_>) -> ModalResult<JsonValue> {
    delimited(
        ('{', multispace0),
        separated(0.., member, (multispace0, ',', multispace0)),
        (multispace0, '}'),
    )
    .map(JsonValue::Object)
    .parse_next(input)
}
