//! Streaming AES-256-CBC with PKCS7 padding.
//!
//! Data moves through fixed 4 KiB chunks so arbitrarily large streams never
//! require proportional memory. Decryption holds back the final ciphertext
//! block until end of stream so the padding can be stripped. A cooperative
//! [`OperationToken`] is polled between chunks for cancellation and progress
//! reporting.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use aes::Aes256;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

use crate::error::CryptoError;

pub(crate) const KEY_LEN: usize = 32;
pub(crate) const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;
const CHUNK_LEN: usize = 4096;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Cooperative cancellation and progress reporting for stream operations.
///
/// Share it behind an `Arc` and call [`OperationToken::cancel`] from another
/// thread; the running operation stops at the next chunk boundary with
/// [`CryptoError::Canceled`], leaving partial output for the caller to
/// discard. The progress callback receives the running total of plaintext
/// bytes processed.
pub struct OperationToken {
    canceled: AtomicBool,
    progress: Option<Box<dyn Fn(u64) + Send + Sync>>,
}

impl OperationToken {
    pub fn new() -> Self {
        Self {
            canceled: AtomicBool::new(false),
            progress: None,
        }
    }

    pub fn with_progress(callback: impl Fn(u64) + Send + Sync + 'static) -> Self {
        Self {
            canceled: AtomicBool::new(false),
            progress: Some(Box::new(callback)),
        }
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    fn checkpoint(&self, processed: u64) -> Result<(), CryptoError> {
        if self.is_canceled() {
            return Err(CryptoError::Canceled);
        }
        if let Some(report) = &self.progress {
            report(processed);
        }
        Ok(())
    }
}

impl Default for OperationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OperationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationToken")
            .field("canceled", &self.is_canceled())
            .finish_non_exhaustive()
    }
}

pub(crate) fn check_key_and_iv(key: &[u8], iv: &[u8]) -> Result<(), CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidArgument(format!(
            "key must be {KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    if iv.len() != IV_LEN {
        return Err(CryptoError::InvalidArgument(format!(
            "IV must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }
    Ok(())
}

/// Encrypts `input` to `output`, returning the ciphertext length. The output
/// is always a non-empty multiple of the block size; empty input produces a
/// single padding block.
pub(crate) fn encrypt_stream<R: Read, W: Write>(
    key: &[u8],
    iv: &[u8],
    input: &mut R,
    output: &mut W,
    token: Option<&OperationToken>,
) -> Result<u64, CryptoError> {
    check_key_and_iv(key, iv)?;
    let mut enc = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|_| CryptoError::InvalidArgument("invalid key or IV length".to_string()))?;

    let mut buf = Zeroizing::new(vec![0u8; CHUNK_LEN]);
    let mut plain_total = 0u64;
    let mut cipher_total = 0u64;
    loop {
        let n = read_until_full(input, &mut buf)?;
        plain_total += n as u64;
        if n == CHUNK_LEN {
            encrypt_blocks(&mut enc, &mut buf[..n]);
            output.write_all(&buf[..n])?;
            cipher_total += n as u64;
            if let Some(token) = token {
                token.checkpoint(plain_total)?;
            }
            continue;
        }
        // Final partial chunk: apply PKCS7 within the chunk buffer. A full
        // padding block is emitted when the plaintext is block aligned.
        let pad = BLOCK_LEN - n % BLOCK_LEN;
        buf[n..n + pad].fill(pad as u8);
        let padded = n + pad;
        encrypt_blocks(&mut enc, &mut buf[..padded]);
        output.write_all(&buf[..padded])?;
        cipher_total += padded as u64;
        if let Some(token) = token {
            token.checkpoint(plain_total)?;
        }
        return Ok(cipher_total);
    }
}

/// Decrypts `input` to `output`, returning the plaintext length. Fails with
/// [`CryptoError::DataIntegrityValidation`] when the ciphertext is not a
/// non-empty multiple of the block size or the padding is malformed.
pub(crate) fn decrypt_stream<R: Read, W: Write>(
    key: &[u8],
    iv: &[u8],
    input: &mut R,
    output: &mut W,
    token: Option<&OperationToken>,
) -> Result<u64, CryptoError> {
    check_key_and_iv(key, iv)?;
    let mut dec = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| CryptoError::InvalidArgument("invalid key or IV length".to_string()))?;

    let mut buf = Zeroizing::new(vec![0u8; CHUNK_LEN]);
    let mut held: Option<[u8; BLOCK_LEN]> = None;
    let mut plain_total = 0u64;
    loop {
        let n = read_until_full(input, &mut buf)?;
        if n == 0 {
            break;
        }
        if n % BLOCK_LEN != 0 {
            return Err(CryptoError::DataIntegrityValidation);
        }
        // Blocks stay in ciphertext order: the block held back from the
        // previous chunk is decrypted before this chunk's blocks.
        if let Some(mut prev) = held.take() {
            decrypt_blocks(&mut dec, &mut prev);
            output.write_all(&prev)?;
            plain_total += BLOCK_LEN as u64;
        }
        let keep = n - BLOCK_LEN;
        decrypt_blocks(&mut dec, &mut buf[..keep]);
        output.write_all(&buf[..keep])?;
        plain_total += keep as u64;
        let mut last = [0u8; BLOCK_LEN];
        last.copy_from_slice(&buf[keep..n]);
        held = Some(last);
        if let Some(token) = token {
            token.checkpoint(plain_total)?;
        }
    }

    let Some(mut last) = held else {
        // Even empty plaintext encrypts to one padding block.
        return Err(CryptoError::DataIntegrityValidation);
    };
    decrypt_blocks(&mut dec, &mut last);
    let pad = last[BLOCK_LEN - 1] as usize;
    if pad == 0 || pad > BLOCK_LEN {
        return Err(CryptoError::DataIntegrityValidation);
    }
    if last[BLOCK_LEN - pad..].iter().any(|&b| b != pad as u8) {
        return Err(CryptoError::DataIntegrityValidation);
    }
    output.write_all(&last[..BLOCK_LEN - pad])?;
    plain_total += (BLOCK_LEN - pad) as u64;
    if let Some(token) = token {
        token.checkpoint(plain_total)?;
    }
    Ok(plain_total)
}

pub(crate) fn encrypt_slice(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut out = Vec::with_capacity(plaintext.len() + BLOCK_LEN);
    encrypt_stream(key, iv, &mut &plaintext[..], &mut out, None)?;
    Ok(out)
}

pub(crate) fn decrypt_slice(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut out = Vec::with_capacity(ciphertext.len());
    decrypt_stream(key, iv, &mut &ciphertext[..], &mut out, None)?;
    Ok(out)
}

fn encrypt_blocks(enc: &mut Aes256CbcEnc, data: &mut [u8]) {
    for block in data.chunks_exact_mut(BLOCK_LEN) {
        enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

fn decrypt_blocks(dec: &mut Aes256CbcDec, data: &mut [u8]) {
    for block in data.chunks_exact_mut(BLOCK_LEN) {
        dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Reads until `buf` is full or the stream ends; returns bytes read.
fn read_until_full<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize, CryptoError> {
    let mut filled = 0usize;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
