//! Response body decoding
//!
//! Turns the raw bytes of a round trip into the [`BackendReply`] the
//! conditional cache reconciles against.

use serde_json::Value;
use tracing::error;

use crate::app::etag::BackendReply;
use crate::constants::status;
use crate::errors::NetworkError;

use super::request::json_kind;
use super::types::{JsonObject, RawResponse};

/// Decode a raw response
///
/// A 304 or an empty body decodes to an empty object. Anything else must be
/// a JSON object; other JSON values and malformed bytes are reported through
/// `decode_error` and leave the body unset.
pub fn decode_reply(raw: RawResponse) -> BackendReply {
    let status_code = i32::from(raw.status_code);

    if status_code == status::NOT_MODIFIED || raw.body.is_empty() {
        return BackendReply {
            status_code,
            etag: raw.etag,
            body: Some(JsonObject::new()),
            decode_error: None,
        };
    }

    let (body, decode_error) = match decode_object(&raw.body) {
        Ok(body) => (Some(body), None),
        Err(decode_error) => {
            error!("Error parsing JSON response: {}", decode_error);
            error!("Data received: {}", String::from_utf8_lossy(&raw.body));
            (None, Some(decode_error))
        }
    };

    BackendReply {
        status_code,
        etag: raw.etag,
        body,
        decode_error,
    }
}

fn decode_object(bytes: &[u8]) -> Result<JsonObject, NetworkError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(NetworkError::Decode {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(NetworkError::Decode {
            reason: e.to_string(),
        }),
    }
}
