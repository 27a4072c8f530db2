//! Standalone password hashing with a self-describing record.
//!
//! Unlike the container's key derivation, which keeps its parameters out of
//! band, this produces a record that embeds everything needed to validate it
//! later: `magic(u32) | hash length(u32) | iterations(u32) | salt(64) |
//! hash(64)`, all little-endian. Validation re-derives with the embedded
//! parameters, so records written with a lower iteration count stay
//! verifiable and are flagged for rehashing instead of rejected.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::CryptoError;
use crate::random::CryptoRandom;
use crate::util::{ct_eq, read_u32_le};

const RECORD_MAGIC: u32 = 90_002;
const HASH_AND_SALT_LEN: usize = 64;
const RECORD_LEN: usize = 12 + HASH_AND_SALT_LEN * 2;

pub const MIN_HASH_ITERATIONS: u32 = 25_000;
const DEFAULT_ITERATIONS: u32 = 28_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordHashValidationResult {
    Valid,
    /// The password matches, but the record was produced with weaker
    /// parameters than this validator is configured for; the caller should
    /// hash it again and store the new record.
    ValidShouldRehash,
    Invalid,
}

impl PasswordHashValidationResult {
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid | Self::ValidShouldRehash)
    }
}

/// PBKDF2 hasher with 64-byte hash and embedded 64-byte random salt.
#[derive(Debug)]
pub struct PasswordHasherAndValidator {
    iterations: u32,
    rng: CryptoRandom,
}

impl PasswordHasherAndValidator {
    /// Validator at 28 000 iterations.
    pub fn new() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            rng: CryptoRandom::new(),
        }
    }

    /// Iteration count below [`MIN_HASH_ITERATIONS`] is rejected.
    pub fn with_iterations(iterations: u32) -> Result<Self, CryptoError> {
        if iterations < MIN_HASH_ITERATIONS {
            return Err(CryptoError::InvalidArgument(format!(
                "iteration count must be at least {MIN_HASH_ITERATIONS}, got {iterations}"
            )));
        }
        Ok(Self {
            iterations,
            rng: CryptoRandom::new(),
        })
    }

    pub fn hash_password(&self, password: &str) -> Result<Vec<u8>, CryptoError> {
        if password.trim().is_empty() {
            return Err(CryptoError::InvalidArgument(
                "password must not be empty or whitespace".to_string(),
            ));
        }
        let salt = self.rng.next_bytes(HASH_AND_SALT_LEN);
        let hash = derive(password, &salt, HASH_AND_SALT_LEN, self.iterations);

        let mut record = Vec::with_capacity(RECORD_LEN);
        record.extend_from_slice(&RECORD_MAGIC.to_le_bytes());
        record.extend_from_slice(&(HASH_AND_SALT_LEN as u32).to_le_bytes());
        record.extend_from_slice(&self.iterations.to_le_bytes());
        record.extend_from_slice(&salt);
        record.extend_from_slice(&hash);
        Ok(record)
    }

    pub fn hash_password_to_string(&self, password: &str) -> Result<String, CryptoError> {
        Ok(BASE64.encode(self.hash_password(password)?))
    }

    /// Malformed records validate as [`PasswordHashValidationResult::Invalid`]
    /// rather than erroring; a corrupted stored hash and a wrong password are
    /// indistinguishable to callers on purpose.
    pub fn validate_password(
        &self,
        password: &str,
        record: &[u8],
    ) -> PasswordHashValidationResult {
        let Ok(parsed) = parse_record(record) else {
            return PasswordHashValidationResult::Invalid;
        };
        if password.trim().is_empty() {
            return PasswordHashValidationResult::Invalid;
        }

        let candidate = derive(password, parsed.salt, parsed.salt.len(), parsed.iterations);
        if !ct_eq(&candidate, parsed.hash) {
            return PasswordHashValidationResult::Invalid;
        }
        if parsed.iterations < self.iterations || parsed.hash.len() < HASH_AND_SALT_LEN {
            return PasswordHashValidationResult::ValidShouldRehash;
        }
        PasswordHashValidationResult::Valid
    }

    pub fn validate_password_string(
        &self,
        password: &str,
        record: &str,
    ) -> PasswordHashValidationResult {
        match BASE64.decode(record) {
            Ok(raw) => self.validate_password(password, &raw),
            Err(_) => PasswordHashValidationResult::Invalid,
        }
    }
}

impl Default for PasswordHasherAndValidator {
    fn default() -> Self {
        Self::new()
    }
}

struct ParsedRecord<'a> {
    iterations: u32,
    salt: &'a [u8],
    hash: &'a [u8],
}

fn parse_record(record: &[u8]) -> Result<ParsedRecord<'_>, CryptoError> {
    if read_u32_le(record, 0)? != RECORD_MAGIC {
        return Err(CryptoError::InvalidMagicNumber);
    }
    let len = read_u32_le(record, 4)? as usize;
    let iterations = read_u32_le(record, 8)?;
    if len == 0 || iterations == 0 {
        return Err(CryptoError::DataIsTooShort);
    }
    let salt = record.get(12..12 + len).ok_or(CryptoError::DataIsTooShort)?;
    let hash = record
        .get(12 + len..12 + len * 2)
        .ok_or(CryptoError::DataIsTooShort)?;
    Ok(ParsedRecord {
        iterations,
        salt,
        hash,
    })
}

fn derive(password: &str, salt: &[u8], len: usize, iterations: u32) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}
