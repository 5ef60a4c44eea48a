//! Reversible encoding of project API keys for storage and transit.
//!
//! This is plain base64: it keeps keys out of casual view in the dashboard's
//! documents and request bodies, but anyone holding a token can recover the key.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("credential token is not validly encoded")]
    MalformedToken,
}

pub fn encode(secret: &str) -> String {
    STANDARD.encode(secret.as_bytes())
}

pub fn decode(token: &str) -> Result<String, CodecError> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|_| CodecError::MalformedToken)?;
    String::from_utf8(bytes).map_err(|_| CodecError::MalformedToken)
}
