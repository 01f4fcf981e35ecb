//! Data-URI handling for face image payloads.
//!
//! Images arrive either as bare base64 or wrapped as
//! `data:image/<subtype>;base64,<payload>`. Storage always holds the
//! bare payload; presentation always serves a data URI.

use crate::error::Error;

const DATA_URI_PREFIX: &str = "data:image/";

/// Strip a data-URI header if present, returning the bare payload.
///
/// A header without a comma separator is malformed input, not
/// something to silently tolerate.
pub fn strip(input: &str) -> Result<&str, Error> {
    if input.starts_with(DATA_URI_PREFIX) {
        match input.split_once(',') {
            Some((_, payload)) => Ok(payload),
            None => Err(Error::Decode(
                "data URI missing comma separator".to_string(),
            )),
        }
    } else {
        Ok(input)
    }
}

/// Wrap a stored payload for presentation. Bare base64 becomes a JPEG
/// data URI; an already-wrapped payload passes through unchanged.
pub fn wrap_jpeg(payload: &str) -> String {
    if payload.starts_with(DATA_URI_PREFIX) {
        payload.to_string()
    } else {
        format!("data:image/jpeg;base64,{payload}")
    }
}
