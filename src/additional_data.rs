//! Key/value sidecar attached to a container.
//!
//! String pairs are serialized as `base64(key):base64(value);` entries and
//! encrypted under a fixed library-internal key and IV before being written
//! into the container's additional-data region. The fixed key makes this
//! obfuscation, not a security boundary: anyone with the library can read a
//! sidecar, but no user key material is needed to attach or rewrite one.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::cipher;
use crate::error::CryptoError;

const SIDECAR_KEY: [u8; 32] = [
    29, 173, 113, 233, 72, 224, 33, 3, 159, 29, 79, 5, 174, 168, 182, 192, 18, 204, 29, 222, 103,
    183, 101, 113, 185, 220, 180, 47, 94, 75, 17, 250,
];
const SIDECAR_IV: [u8; 16] = [45, 134, 211, 82, 19, 64, 57, 6, 239, 93, 200, 99, 183, 53, 148, 189];

/// Entries with an empty key or value are dropped.
pub(crate) fn serialize(data: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in data {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        out.push_str(&BASE64.encode(key.as_bytes()));
        out.push(':');
        out.push_str(&BASE64.encode(value.as_bytes()));
        out.push(';');
    }
    out
}

pub(crate) fn deserialize(text: &str) -> Result<BTreeMap<String, String>, CryptoError> {
    let mut out = BTreeMap::new();
    for entry in text.split(';') {
        if entry.is_empty() {
            continue;
        }
        let (key, value) = entry.split_once(':').ok_or_else(|| {
            CryptoError::InvalidArgument("malformed additional data entry".to_string())
        })?;
        out.insert(decode_part(key)?, decode_part(value)?);
    }
    Ok(out)
}

fn decode_part(encoded: &str) -> Result<String, CryptoError> {
    let raw = BASE64.decode(encoded).map_err(|_| {
        CryptoError::InvalidArgument("additional data entry is not valid base64".to_string())
    })?;
    String::from_utf8(raw).map_err(|_| {
        CryptoError::InvalidArgument("additional data entry is not valid UTF-8".to_string())
    })
}

pub(crate) fn to_encrypted_blob(data: &BTreeMap<String, String>) -> Result<Vec<u8>, CryptoError> {
    cipher::encrypt_slice(&SIDECAR_KEY, &SIDECAR_IV, serialize(data).as_bytes())
}

/// An empty blob is a normal state (no sidecar attached) and yields an empty
/// map.
pub(crate) fn from_encrypted_blob(blob: &[u8]) -> Result<BTreeMap<String, String>, CryptoError> {
    if blob.is_empty() {
        return Ok(BTreeMap::new());
    }
    let plain = cipher::decrypt_slice(&SIDECAR_KEY, &SIDECAR_IV, blob)?;
    let text = String::from_utf8(plain).map_err(|_| {
        CryptoError::InvalidArgument("additional data is not valid UTF-8".to_string())
    })?;
    deserialize(&text)
}
