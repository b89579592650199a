use serde::Serialize;
use serde_json::Value;

use crate::errors::AuthError;

/// Convert a caller payload into the structured value stored for a session.
///
/// Only JSON objects and arrays are accepted.
pub fn to_payload<T>(payload: &T) -> Result<Value, AuthError>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(payload)
        .map_err(|e| AuthError::InvalidArgument(format!("Invalid session: {e}")))?;
    if !is_structured(&value) {
        return Err(AuthError::InvalidArgument(
            "Invalid session: payload must be an object or an array".to_string(),
        ));
    }
    Ok(value)
}

pub(crate) fn encode_payload(payload: &Value) -> Result<String, AuthError> {
    if !is_structured(payload) {
        return Err(AuthError::InvalidArgument(
            "Invalid session: payload must be an object or an array".to_string(),
        ));
    }
    serde_json::to_string(payload).map_err(|e| AuthError::InvalidArgument(e.to_string()))
}

pub(crate) fn decode_payload(raw: &str) -> Result<Value, AuthError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AuthError::Malformed(format!("Stored session is not valid JSON: {e}")))?;
    if !is_structured(&value) {
        return Err(AuthError::Malformed(
            "Stored session is not an object or an array".to_string(),
        ));
    }
    Ok(value)
}

fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
