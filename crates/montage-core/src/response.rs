//! JSON response envelopes returned to bus API callers.

use serde_json::{Value, json};

/// Error code carried by every error response.
pub const ERROR_CODE: u32 = 999;

/// Wrap a successful API result: `{"result": <value>}`.
pub fn result_response(result: &Value) -> String {
    json!({ "result": result }).to_string()
}

/// Wrap a failure: `{"error": {"code": 999, "message": "<message>"}}`.
pub fn error_response(error: &impl std::fmt::Display) -> String {
    json!({
        "error": {
            "code": ERROR_CODE,
            "message": error.to_string(),
        }
    })
    .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn result_envelope() {
        let response: Value = serde_json::from_str(&result_response(&json!("0"))).unwrap();
        assert_eq!(response, json!({ "result": "0" }));
    }

    #[test]
    fn error_message_is_escaped() {
        let raw = error_response(&"bad \"quote\"\nnewline");
        let response: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(response["error"]["code"], 999);
        assert_eq!(response["error"]["message"], "bad \"quote\"\nnewline");
    }
}
