use subtle::ConstantTimeEq;

use crate::error::CryptoError;

pub(crate) fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16, CryptoError> {
    let raw = bytes
        .get(offset..offset + 2)
        .ok_or(CryptoError::DataIsTooShort)?;
    Ok(u16::from_le_bytes([raw[0], raw[1]]))
}

pub(crate) fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32, CryptoError> {
    let raw = bytes
        .get(offset..offset + 4)
        .ok_or(CryptoError::DataIsTooShort)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Constant-time equality for secret-derived byte strings (KCV fingerprints, MAC digests).
/// Length is not secret; unequal lengths compare unequal.
pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    #[cfg(test)]
    tests::CT_EQ_CALLS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

    a.len() == b.len() && bool::from(a.ct_eq(b))
}
