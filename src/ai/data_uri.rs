//! `data:<mime>;base64,<payload>` strings, the wire form images take to and
//! from the suggestion service.

use super::RemoteServiceError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Parse a base64 data URI. Non-base64 (percent-encoded) URIs are rejected.
pub fn decode(uri: &str) -> Result<DataUri, RemoteServiceError> {
    let invalid = |reason: &str| RemoteServiceError::InvalidDataUri(reason.to_string());

    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| invalid("missing data: prefix"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing payload separator"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| invalid("payload is not base64"))?;
    if mime.is_empty() {
        return Err(invalid("missing MIME type"));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| RemoteServiceError::InvalidDataUri(e.to_string()))?;
    Ok(DataUri {
        mime: mime.to_ascii_lowercase(),
        bytes,
    })
}
