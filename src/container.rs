//! Container header codec and validation pipeline.
//!
//! Every encrypted payload is wrapped in a 127-byte little-endian header
//! followed by an optional encrypted additional-data blob and the ciphertext:
//!
//! | field                  | offset | size |
//! |------------------------|--------|------|
//! | magic number           | 0      | 4    |
//! | data version           | 4      | 2    |
//! | min compatible version | 6      | 2    |
//! | IV                     | 8      | 16   |
//! | salt                   | 24     | 32   |
//! | key check value        | 56     | 19   |
//! | MAC (HMAC-SHA-384)     | 75     | 48   |
//! | additional data length | 123    | 4    |
//! | additional data        | 127    | var  |
//! | ciphertext             | 127+n  | var  |
//!
//! The encoder reserves the header up front, streams the ciphertext, then
//! seeks back to fill in the fields; the MAC therefore covers exactly the
//! ciphertext region. The decoder validates in a fixed order (length, magic,
//! version, key check, MAC) and stops at the first failure, so a wrong key is
//! always reported as a key error and never as corruption. The salt field is
//! zero-filled when the caller supplied a raw key.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::cipher::IV_LEN;
use crate::error::CryptoError;
use crate::kcv;
use crate::mac;
use crate::random::CryptoRandom;
use crate::request::CryptoRequest;
use crate::util::{read_u16_le, read_u32_le};
use crate::validation::ValidationResult;

pub(crate) const MAGIC_NUMBER: u32 = 212_574_318;
pub(crate) const DATA_VERSION: u16 = 3;
pub(crate) const MIN_COMPATIBLE_DATA_VERSION: u16 = 3;
pub(crate) const HEADER_LEN: usize = 127;
pub(crate) const SALT_LEN: usize = 32;

const MAGIC_OFFSET: usize = 0;
const DATA_VERSION_OFFSET: usize = 4;
const MIN_VERSION_OFFSET: usize = 6;
const IV_OFFSET: usize = 8;
const SALT_OFFSET: usize = 24;
const KCV_OFFSET: usize = 56;
const MAC_OFFSET: usize = 75;
const ADDITIONAL_DATA_LEN_OFFSET: usize = 123;

pub(crate) struct ContainerHeader {
    pub(crate) magic: u32,
    pub(crate) data_version: u16,
    pub(crate) min_compatible_version: u16,
    pub(crate) iv: [u8; IV_LEN],
    pub(crate) salt: [u8; SALT_LEN],
    pub(crate) kcv: [u8; kcv::KCV_LEN],
    pub(crate) mac: [u8; mac::MAC_LEN],
    pub(crate) additional_data_len: u32,
}

impl ContainerHeader {
    pub(crate) fn parse(raw: &[u8; HEADER_LEN]) -> Result<Self, CryptoError> {
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&raw[IV_OFFSET..IV_OFFSET + IV_LEN]);
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&raw[SALT_OFFSET..SALT_OFFSET + SALT_LEN]);
        let mut kcv = [0u8; kcv::KCV_LEN];
        kcv.copy_from_slice(&raw[KCV_OFFSET..KCV_OFFSET + kcv::KCV_LEN]);
        let mut mac = [0u8; mac::MAC_LEN];
        mac.copy_from_slice(&raw[MAC_OFFSET..MAC_OFFSET + mac::MAC_LEN]);
        Ok(Self {
            magic: read_u32_le(raw, MAGIC_OFFSET)?,
            data_version: read_u16_le(raw, DATA_VERSION_OFFSET)?,
            min_compatible_version: read_u16_le(raw, MIN_VERSION_OFFSET)?,
            iv,
            salt,
            kcv,
            mac,
            additional_data_len: read_u32_le(raw, ADDITIONAL_DATA_LEN_OFFSET)?,
        })
    }
}

/// Reserves room for the header so ciphertext can be streamed right after it.
pub(crate) fn write_empty_header<W: Write>(output: &mut W) -> Result<(), CryptoError> {
    output.write_all(&[0u8; HEADER_LEN])?;
    Ok(())
}

/// Backfills the reserved header once the ciphertext has been written. The
/// stream must contain the empty header followed by the ciphertext; on return
/// it is positioned at the start.
pub(crate) fn write_checks_and_embedded_data<S: Read + Write + Seek>(
    request: &CryptoRequest,
    stream: &mut S,
    rng: &CryptoRandom,
) -> Result<(), CryptoError> {
    let mut header = [0u8; HEADER_LEN];
    header[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&MAGIC_NUMBER.to_le_bytes());
    header[DATA_VERSION_OFFSET..DATA_VERSION_OFFSET + 2]
        .copy_from_slice(&DATA_VERSION.to_le_bytes());
    header[MIN_VERSION_OFFSET..MIN_VERSION_OFFSET + 2]
        .copy_from_slice(&MIN_COMPATIBLE_DATA_VERSION.to_le_bytes());
    header[IV_OFFSET..IV_OFFSET + IV_LEN].copy_from_slice(&request.iv);
    if request.embed_salt {
        header[SALT_OFFSET..SALT_OFFSET + SALT_LEN].copy_from_slice(&request.salt);
    }
    let kcv = kcv::generate(&request.key, rng)?;
    header[KCV_OFFSET..KCV_OFFSET + kcv::KCV_LEN].copy_from_slice(&kcv);
    let mac = mac::calculate(&request.key, stream, HEADER_LEN as u64)?;
    header[MAC_OFFSET..MAC_OFFSET + mac::MAC_LEN].copy_from_slice(&mac);
    // Additional data length stays zero; sidecar data is attached after the
    // fact via `write_additional_data`.

    stream.seek(SeekFrom::Start(0))?;
    stream.write_all(&header)?;
    stream.seek(SeekFrom::Start(0))?;
    Ok(())
}

/// Runs the validation pipeline from the start of the stream.
///
/// Checks run in order and stop at the first failure; the failure is recorded
/// in the returned [`ValidationResult`], while I/O errors propagate as `Err`.
/// On a fully valid container the stream is left positioned at the start of
/// the ciphertext and the request holds the effective IV and key (derived
/// from the password and embedded salt when applicable).
pub(crate) fn read_and_validate<S: Read + Seek>(
    request: &mut CryptoRequest,
    stream: &mut S,
) -> Result<ValidationResult, CryptoError> {
    let mut result = ValidationResult::new();

    let total_len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(0))?;
    if total_len < HEADER_LEN as u64 {
        result.fail(CryptoError::DataIsTooShort);
        return Ok(result);
    }

    let mut raw = [0u8; HEADER_LEN];
    stream.read_exact(&mut raw)?;
    let header = ContainerHeader::parse(&raw)?;

    if header.magic != MAGIC_NUMBER {
        result.fail(CryptoError::InvalidMagicNumber);
        return Ok(result);
    }
    result.pass_format();

    // Strict equality: data demanding a different minimum reader version is
    // rejected even when that version is lower than ours.
    if header.min_compatible_version != MIN_COMPATIBLE_DATA_VERSION {
        result.fail(CryptoError::UnsupportedDataVersion {
            required: header.min_compatible_version,
            supported: MIN_COMPATIBLE_DATA_VERSION,
        });
        return Ok(result);
    }
    result.pass_version(header.data_version == DATA_VERSION);

    // The header is the authority on the IV once the container checks out;
    // the caller's IV argument is discarded.
    request.iv = header.iv;
    if request.password.is_some() {
        request.salt = header.salt;
        request.derive_key_from_salt()?;
    }

    let data_start = HEADER_LEN as u64 + u64::from(header.additional_data_len);
    if data_start > total_len {
        result.fail(CryptoError::DataIsTooShort);
        return Ok(result);
    }

    if request.skip_validations {
        // Probe mode vouches only for the format, not for the payload.
        result.pass_key();
        result.pass_integrity();
    } else {
        // Key check before MAC, so a wrong key is never reported as
        // corruption. The MAC covers the ciphertext region only; the
        // additional-data sidecar can be rewritten without key material.
        if let Err(error) = kcv::validate(&request.key, &header.kcv) {
            result.fail(error);
            return Ok(result);
        }
        result.pass_key();

        if let Err(error) = mac::validate(&request.key, &header.mac, stream, data_start) {
            result.fail(error);
            return Ok(result);
        }
        result.pass_integrity();
    }

    stream.seek(SeekFrom::Start(data_start))?;
    Ok(result)
}

/// Reads the additional-data blob without key material. The caller's stream
/// position is restored.
pub(crate) fn read_additional_data<S: Read + Seek>(
    stream: &mut S,
) -> Result<Vec<u8>, CryptoError> {
    let saved = stream.stream_position()?;
    let mut request = CryptoRequest::format_probe();
    let outcome = read_and_validate(&mut request, stream)?.into_result();
    if let Err(error) = outcome {
        stream.seek(SeekFrom::Start(saved))?;
        return Err(error);
    }

    let data_end = stream.stream_position()?;
    let blob_len = (data_end - HEADER_LEN as u64) as usize;
    stream.seek(SeekFrom::Start(HEADER_LEN as u64))?;
    let mut blob = vec![0u8; blob_len];
    stream.read_exact(&mut blob)?;
    stream.seek(SeekFrom::Start(saved))?;
    Ok(blob)
}

/// Replaces the additional-data blob, streaming a new container to
/// `destination`. The header (minus the length field) and the ciphertext are
/// copied unchanged; since the MAC covers only the ciphertext it stays valid.
pub(crate) fn write_additional_data<S: Read + Seek, W: Write>(
    stream: &mut S,
    blob: &[u8],
    destination: &mut W,
) -> Result<(), CryptoError> {
    let blob_len = u32::try_from(blob.len())
        .map_err(|_| CryptoError::InvalidArgument("additional data is too large".to_string()))?;

    let mut request = CryptoRequest::format_probe();
    read_and_validate(&mut request, stream)?.into_result()?;
    // Position is now at 127 + old blob length, the start of the ciphertext.
    let data_start = stream.stream_position()?;

    stream.seek(SeekFrom::Start(0))?;
    let mut head = [0u8; ADDITIONAL_DATA_LEN_OFFSET];
    stream.read_exact(&mut head)?;
    destination.write_all(&head)?;
    destination.write_all(&blob_len.to_le_bytes())?;
    destination.write_all(blob)?;

    stream.seek(SeekFrom::Start(data_start))?;
    io::copy(stream, destination)?;
    Ok(())
}
