//! Typed projections over JSON payloads.
//!
//! Fields are addressed with JSON pointers (`/account/login`).

use serde_json::Value;

use crate::error::ApiError;

fn missing(pointer: &str, expected: &str) -> ApiError {
    ApiError::unexpected_payload(format!(
        "missing or invalid field `{}` (expected {})",
        pointer, expected
    ))
}

pub(crate) fn required_str<'a>(data: &'a Value, pointer: &str) -> Result<&'a str, ApiError> {
    optional_str(data, pointer).ok_or_else(|| missing(pointer, "a string"))
}

pub(crate) fn optional_str<'a>(data: &'a Value, pointer: &str) -> Option<&'a str> {
    data.pointer(pointer).and_then(Value::as_str)
}

pub(crate) fn required_u64(data: &Value, pointer: &str) -> Result<u64, ApiError> {
    data.pointer(pointer)
        .and_then(Value::as_u64)
        .ok_or_else(|| missing(pointer, "an unsigned integer"))
}

/// Absent, null and non-boolean values all read as `false`.
pub(crate) fn bool_or_false(data: &Value, pointer: &str) -> bool {
    data.pointer(pointer)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
