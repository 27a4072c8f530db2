//! Key check value.
//!
//! A deliberately weak 24-bit fingerprint of the encryption key, stored in the
//! container header so that a wrong key or password can be reported as such
//! instead of surfacing as corrupted data. The fingerprint is the first three
//! bytes of an all-zero block encrypted under the key with a random IV; the IV
//! is stored next to it so the check can be replayed.

use crate::cipher;
use crate::error::CryptoError;
use crate::random::CryptoRandom;
use crate::util::ct_eq;

pub(crate) const KCV_LEN: usize = 19;
const FINGERPRINT_LEN: usize = 3;

pub(crate) fn generate(key: &[u8], rng: &CryptoRandom) -> Result<[u8; KCV_LEN], CryptoError> {
    let mut iv = [0u8; cipher::IV_LEN];
    rng.fill(&mut iv);
    generate_with_iv(key, &iv)
}

pub(crate) fn generate_with_iv(
    key: &[u8],
    iv: &[u8; cipher::IV_LEN],
) -> Result<[u8; KCV_LEN], CryptoError> {
    let fingerprint = fingerprint(key, iv)?;
    let mut out = [0u8; KCV_LEN];
    out[..FINGERPRINT_LEN].copy_from_slice(&fingerprint);
    out[FINGERPRINT_LEN..].copy_from_slice(iv);
    Ok(out)
}

/// Replays the check against a stored value; mismatch means wrong key.
pub(crate) fn validate(key: &[u8], stored: &[u8; KCV_LEN]) -> Result<(), CryptoError> {
    let mut iv = [0u8; cipher::IV_LEN];
    iv.copy_from_slice(&stored[FINGERPRINT_LEN..]);
    let expected = fingerprint(key, &iv)?;
    if !ct_eq(&expected, &stored[..FINGERPRINT_LEN]) {
        return Err(CryptoError::KeyCheckValueValidation);
    }
    Ok(())
}

fn fingerprint(key: &[u8], iv: &[u8; cipher::IV_LEN]) -> Result<[u8; FINGERPRINT_LEN], CryptoError> {
    let ciphertext = cipher::encrypt_slice(key, iv, &[0u8; 16])?;
    let mut out = [0u8; FINGERPRINT_LEN];
    out.copy_from_slice(&ciphertext[..FINGERPRINT_LEN]);
    Ok(out)
}
