//! Per-endpoint response shapes
//!
//! Each listing endpoint wraps its record array differently. Instead of
//! probing the body for whichever property happens to exist, every resource
//! declares its shape up front and unwraps it with one explicit rule.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{"payload": {"result": [...]}}`
    PayloadResult,
    /// `{"payload": {"<field>": [...]}}`
    PayloadField(&'static str),
    /// `{"<field>": [...]}`
    Field(&'static str),
    /// `[...]`
    PlainArray,
}

impl Envelope {
    /// Extract the record array, or `None` when the body does not have the
    /// declared shape
    pub fn unwrap(&self, body: &Value) -> Option<Vec<Value>> {
        let array = match self {
            Envelope::PayloadResult => body.get("payload")?.get("result")?,
            Envelope::PayloadField(field) => body.get("payload")?.get(*field)?,
            Envelope::Field(field) => body.get(*field)?,
            Envelope::PlainArray => body,
        };
        array.as_array().cloned()
    }
}
