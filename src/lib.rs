//! Authenticated symmetric encryption in a self-describing container format.
//!
//! Every encrypted payload is wrapped in a fixed 127-byte header carrying a
//! magic number, format version, the IV, an optional key-derivation salt, a
//! deliberately weak key check value and an HMAC-SHA-384 over the ciphertext.
//! Decryption validates the whole container before touching the payload, so a
//! wrong key or password is reported as exactly that, never as corrupted
//! data, and tampering is reported as an integrity failure.
//!
//! Three ways in:
//! - raw 32-byte AES-256 key with a caller-supplied or random IV
//!   ([`encrypt`], [`encrypt_and_embed_iv`])
//! - password, with PBKDF2-derived key and the salt embedded in the header
//!   ([`encrypt_with_password`], string variants in base64)
//! - streams and files for payloads that should not be buffered in memory
//!
//! Containers also carry an optional key/value sidecar
//! ([`add_additional_data`]) that can be attached and read without any key
//! material.

mod additional_data;
mod cipher;
mod container;
mod error;
mod file;
mod id_generator;
mod kcv;
mod kdf;
mod mac;
mod password_generator;
mod password_hash;
mod random;
mod request;
mod token_generator;
mod util;
mod validation;


use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub use crate::cipher::OperationToken;
pub use crate::error::CryptoError;
pub use crate::file::{
    decrypt_file, decrypt_file_with_password, encrypt_file, encrypt_file_with_password,
};
pub use crate::id_generator::IdGenerator;
pub use crate::kdf::{PasswordHasher, DEFAULT_HASH_ITERATIONS};
pub use crate::password_generator::{
    generate_password, generate_password_with, PasswordGenerationOptions,
    PasswordGenerationOptionsBuilder,
};
pub use crate::password_hash::{
    PasswordHashValidationResult, PasswordHasherAndValidator, MIN_HASH_ITERATIONS,
};
pub use crate::random::CryptoRandom;
pub use crate::token_generator::{TokenGenerator, DEFAULT_TOKEN_CHARS};
pub use crate::validation::{DataValidationErrorKind, ValidationResult};

use crate::request::CryptoRequest;

/// Encrypts `data` with a 32-byte key and 16-byte IV into a container.
pub fn encrypt(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let request = CryptoRequest::with_key(key, iv)?;
    encrypt_to_vec(&request, data)
}

/// Encrypts with a random IV; decrypt with [`decrypt_with_embedded_iv`].
pub fn encrypt_and_embed_iv(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let rng = CryptoRandom::new();
    let request = CryptoRequest::with_key_and_random_iv(key, &rng)?;
    encrypt_to_vec(&request, data)
}

/// Encrypts with a PBKDF2-derived key; the random salt and IV are embedded in
/// the container header.
pub fn encrypt_with_password(data: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    let rng = CryptoRandom::new();
    let request = CryptoRequest::with_new_password(password, &rng)?;
    encrypt_to_vec(&request, data)
}

/// Password-encrypts UTF-8 text and returns the container as base64.
pub fn encrypt_string_with_password(text: &str, password: &str) -> Result<String, CryptoError> {
    Ok(BASE64.encode(encrypt_with_password(text.as_bytes(), password)?))
}

/// Decrypts a container with an explicit key and IV. The container is fully
/// validated before any ciphertext is processed, and the IV recorded in the
/// header takes precedence over the `iv` argument.
pub fn decrypt(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut request = CryptoRequest::with_key(key, iv)?;
    decrypt_to_vec(&mut request, data)
}

/// Decrypts a container written by [`encrypt_and_embed_iv`].
pub fn decrypt_with_embedded_iv(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut request = CryptoRequest::with_key_for_embedded_iv(key)?;
    decrypt_to_vec(&mut request, data)
}

/// Decrypts a container written by [`encrypt_with_password`].
pub fn decrypt_with_password(data: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    let mut request = CryptoRequest::for_password_decryption(password);
    decrypt_to_vec(&mut request, data)
}

/// Decrypts a base64 container written by [`encrypt_string_with_password`].
pub fn decrypt_string_with_password(encoded: &str, password: &str) -> Result<String, CryptoError> {
    let data = BASE64
        .decode(encoded)
        .map_err(|_| CryptoError::InvalidArgument("data is not valid base64".to_string()))?;
    let plain = decrypt_with_password(&data, password)?;
    String::from_utf8(plain)
        .map_err(|_| CryptoError::InvalidArgument("decrypted data is not valid UTF-8".to_string()))
}

/// Streams `input` into an encrypted container written to `output`. The
/// output must be seekable: the header is reserved up front and backfilled
/// after the ciphertext has been written.
pub fn encrypt_stream<R, W>(
    input: &mut R,
    key: &[u8],
    iv: &[u8],
    output: &mut W,
) -> Result<(), CryptoError>
where
    R: Read,
    W: Read + Write + Seek,
{
    let request = CryptoRequest::with_key(key, iv)?;
    encrypt_with_request(&request, input, output, None)
}

/// [`encrypt_stream`] with a cancellation and progress token.
pub fn encrypt_stream_with_token<R, W>(
    input: &mut R,
    key: &[u8],
    iv: &[u8],
    output: &mut W,
    token: &OperationToken,
) -> Result<(), CryptoError>
where
    R: Read,
    W: Read + Write + Seek,
{
    let request = CryptoRequest::with_key(key, iv)?;
    encrypt_with_request(&request, input, output, Some(token))
}

pub fn encrypt_stream_with_password<R, W>(
    input: &mut R,
    password: &str,
    output: &mut W,
) -> Result<(), CryptoError>
where
    R: Read,
    W: Read + Write + Seek,
{
    let rng = CryptoRandom::new();
    let request = CryptoRequest::with_new_password(password, &rng)?;
    encrypt_with_request(&request, input, output, None)
}

/// Validates and decrypts a container from a seekable stream into `output`.
pub fn decrypt_stream<S, W>(
    input: &mut S,
    key: &[u8],
    iv: &[u8],
    output: &mut W,
) -> Result<(), CryptoError>
where
    S: Read + Seek,
    W: Write,
{
    let mut request = CryptoRequest::with_key(key, iv)?;
    decrypt_with_request(&mut request, input, output, None)
}

/// [`decrypt_stream`] with a cancellation and progress token.
pub fn decrypt_stream_with_token<S, W>(
    input: &mut S,
    key: &[u8],
    iv: &[u8],
    output: &mut W,
    token: &OperationToken,
) -> Result<(), CryptoError>
where
    S: Read + Seek,
    W: Write,
{
    let mut request = CryptoRequest::with_key(key, iv)?;
    decrypt_with_request(&mut request, input, output, Some(token))
}

pub fn decrypt_stream_with_password<S, W>(
    input: &mut S,
    password: &str,
    output: &mut W,
) -> Result<(), CryptoError>
where
    S: Read + Seek,
    W: Write,
{
    let mut request = CryptoRequest::for_password_decryption(password);
    decrypt_with_request(&mut request, input, output, None)
}

/// Validates a container without decrypting it. Never fails for invalid data;
/// the outcome is reported through the [`ValidationResult`].
pub fn validate_encrypted_data(
    data: &[u8],
    key: &[u8],
    iv: &[u8],
) -> Result<ValidationResult, CryptoError> {
    let mut request = CryptoRequest::with_key(key, iv)?;
    container::read_and_validate(&mut request, &mut Cursor::new(data))
}

pub fn validate_encrypted_data_with_embedded_iv(
    data: &[u8],
    key: &[u8],
) -> Result<ValidationResult, CryptoError> {
    let mut request = CryptoRequest::with_key_for_embedded_iv(key)?;
    container::read_and_validate(&mut request, &mut Cursor::new(data))
}

pub fn validate_encrypted_data_with_password(
    data: &[u8],
    password: &str,
) -> Result<ValidationResult, CryptoError> {
    let mut request = CryptoRequest::for_password_decryption(password);
    container::read_and_validate(&mut request, &mut Cursor::new(data))
}

/// Attaches (or replaces) a key/value sidecar on an existing container. No
/// key material is needed and the stored MAC stays valid, since it covers
/// only the ciphertext.
pub fn add_additional_data(
    encrypted: &[u8],
    data: &BTreeMap<String, String>,
) -> Result<Vec<u8>, CryptoError> {
    let blob = additional_data::to_encrypted_blob(data)?;
    let mut out = Vec::with_capacity(encrypted.len() + blob.len());
    container::write_additional_data(&mut Cursor::new(encrypted), &blob, &mut out)?;
    Ok(out)
}

/// Reads the key/value sidecar of a container; a container without one yields
/// an empty map.
pub fn read_additional_data(encrypted: &[u8]) -> Result<BTreeMap<String, String>, CryptoError> {
    let blob = container::read_additional_data(&mut Cursor::new(encrypted))?;
    additional_data::from_encrypted_blob(&blob)
}

/// Stream form of [`add_additional_data`]; the source stream's position is
/// restored.
pub fn add_additional_data_to_stream<S, W>(
    source: &mut S,
    data: &BTreeMap<String, String>,
    destination: &mut W,
) -> Result<(), CryptoError>
where
    S: Read + Seek,
    W: Write,
{
    let saved = source.stream_position()?;
    let blob = additional_data::to_encrypted_blob(data)?;
    let outcome = container::write_additional_data(source, &blob, destination);
    source.seek(std::io::SeekFrom::Start(saved))?;
    outcome
}

/// Stream form of [`read_additional_data`].
pub fn read_additional_data_from_stream<S>(
    source: &mut S,
) -> Result<BTreeMap<String, String>, CryptoError>
where
    S: Read + Seek,
{
    let blob = container::read_additional_data(source)?;
    additional_data::from_encrypted_blob(&blob)
}

fn encrypt_to_vec(request: &CryptoRequest, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut output = Cursor::new(Vec::with_capacity(container::HEADER_LEN + data.len() + 16));
    encrypt_with_request(request, &mut &data[..], &mut output, None)?;
    Ok(output.into_inner())
}

fn decrypt_to_vec(request: &mut CryptoRequest, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut output = Vec::with_capacity(data.len().saturating_sub(container::HEADER_LEN));
    decrypt_with_request(request, &mut Cursor::new(data), &mut output, None)?;
    Ok(output)
}

fn encrypt_with_request<R, W>(
    request: &CryptoRequest,
    input: &mut R,
    output: &mut W,
    token: Option<&OperationToken>,
) -> Result<(), CryptoError>
where
    R: Read,
    W: Read + Write + Seek,
{
    let rng = CryptoRandom::new();
    container::write_empty_header(output)?;
    cipher::encrypt_stream(&request.key, &request.iv, input, output, token)?;
    container::write_checks_and_embedded_data(request, output, &rng)
}

fn decrypt_with_request<S, W>(
    request: &mut CryptoRequest,
    input: &mut S,
    output: &mut W,
    token: Option<&OperationToken>,
) -> Result<(), CryptoError>
where
    S: Read + Seek,
    W: Write,
{
    container::read_and_validate(request, input)?.into_result()?;
    // The stream is positioned at the ciphertext and the request holds the
    // effective key and IV.
    cipher::decrypt_stream(&request.key, &request.iv, input, output, token)?;
    Ok(())
}
