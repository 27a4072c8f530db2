//! Message authentication code over a stream region.
//!
//! HMAC-SHA-384 over everything from a start offset to the end of the stream.
//! Both operations restore the stream position they found, so a failed or
//! successful check leaves the caller's cursor untouched.

use std::io::{Read, Seek, SeekFrom};

use hmac::{Hmac, Mac};
use sha2::Sha384;

use crate::error::CryptoError;
use crate::util::ct_eq;

pub(crate) const MAC_LEN: usize = 48;

type HmacSha384 = Hmac<Sha384>;

pub(crate) fn calculate<S: Read + Seek>(
    key: &[u8],
    stream: &mut S,
    start_offset: u64,
) -> Result<[u8; MAC_LEN], CryptoError> {
    let saved = stream.stream_position()?;
    stream.seek(SeekFrom::Start(start_offset))?;

    let mut mac = HmacSha384::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidArgument("invalid MAC key".to_string()))?;
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        mac.update(&buf[..n]);
    }
    stream.seek(SeekFrom::Start(saved))?;

    let digest = mac.finalize().into_bytes();
    let mut out = [0u8; MAC_LEN];
    out.copy_from_slice(&digest);
    Ok(out)
}

pub(crate) fn validate<S: Read + Seek>(
    key: &[u8],
    stored: &[u8; MAC_LEN],
    stream: &mut S,
    start_offset: u64,
) -> Result<(), CryptoError> {
    let expected = calculate(key, stream, start_offset)?;
    if !ct_eq(&expected, stored) {
        return Err(CryptoError::DataIntegrityValidation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const KEY: [u8; 32] = [0x0F; 32];

    #[test]
    fn digest_is_48_bytes() {
        let mut stream = Cursor::new(b"payload bytes".to_vec());
        let mac = calculate(&KEY, &mut stream, 0).unwrap();
        assert_eq!(mac.len(), MAC_LEN);
    }

    #[test]
    fn stream_position_is_restored() {
        let mut stream = Cursor::new(vec![7u8; 200]);
        stream.set_position(42);
        calculate(&KEY, &mut stream, 0).unwrap();
        assert_eq!(stream.position(), 42);

        let stored = calculate(&KEY, &mut stream, 0).unwrap();
        validate(&KEY, &stored, &mut stream, 0).unwrap();
        assert_eq!(stream.position(), 42);
    }

    #[test]
    fn start_offset_excludes_prefix() {
        let mut full = Cursor::new(b"headerpayload".to_vec());
        let mut tail = Cursor::new(b"payload".to_vec());
        let from_offset = calculate(&KEY, &mut full, 6).unwrap();
        let from_start = calculate(&KEY, &mut tail, 0).unwrap();
        assert_eq!(from_offset, from_start);
    }

    #[test]
    fn tampered_data_fails_validation() {
        let mut stream = Cursor::new(vec![1u8; 64]);
        let stored = calculate(&KEY, &mut stream, 0).unwrap();
        stream.get_mut()[10] ^= 1;
        assert!(matches!(
            validate(&KEY, &stored, &mut stream, 0),
            Err(CryptoError::DataIntegrityValidation)
        ));
    }

    #[test]
    fn different_keys_give_different_macs() {
        let mut stream = Cursor::new(vec![9u8; 32]);
        let a = calculate(&[1u8; 32], &mut stream, 0).unwrap();
        let b = calculate(&[2u8; 32], &mut stream, 0).unwrap();
        assert_ne!(a, b);
    }
}
