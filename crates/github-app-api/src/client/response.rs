//! Response decoding.

use serde_json::Value;

use crate::client::HttpResponse;
use crate::error::ApiError;

/// Decode a response body into JSON.
///
/// A 204 decodes to an empty object whatever the body says. Top-level arrays
/// are returned as arrays.
///
/// # Errors
///
/// Returns `ApiError::JsonDecode` with the parser's message, line and column
/// when the body is not valid JSON.
pub fn decode(response: &HttpResponse) -> Result<Value, ApiError> {
    if response.status == 204 {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    Ok(serde_json::from_str(&response.body)?)
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
