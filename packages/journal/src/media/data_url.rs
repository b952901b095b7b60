//! `data:<mime>;base64,<payload>` encoding for media carried inside JSON.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{JournalError, Result};

/// A decoded data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Parse a base64 data URL. Anything else is a `Decode` error.
    pub fn parse(src: &str) -> Result<Self> {
        let rest = src
            .strip_prefix("data:")
            .ok_or_else(|| JournalError::Decode("not a data URL".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| JournalError::Decode("data URL has no payload separator".into()))?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default().trim().to_string();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(JournalError::Decode(
                "only base64 data URLs are supported".into(),
            ));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| JournalError::Decode(format!("invalid base64 payload: {e}")))?;

        let mime_type = if mime_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            mime_type
        };
        Ok(Self { mime_type, bytes })
    }
}

/// Encode bytes as a data URL.
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Payload size of a data URL without decoding it.
///
/// Malformed input counts as zero bytes.
pub fn approx_bytes(src: &str) -> u64 {
    let Some((_, payload)) = src.split_once(',') else {
        return 0;
    };
    let padding = if payload.ends_with("==") {
        2
    } else if payload.ends_with('=') {
        1
    } else {
        0
    };
    ((payload.len() as u64 * 3) / 4).saturating_sub(padding)
}
