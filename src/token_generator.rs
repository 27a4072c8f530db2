//! Random string tokens for password resets, confirmation links and similar
//! out-of-band secrets.
//!
//! Token hashes are strings with a two-character version prefix. Version `00`
//! is the salted PBKDF2 record from [`PasswordHasherAndValidator`]; version
//! `01` is a single unsalted SHA-256, only appropriate for long random tokens
//! with a short expiry. `validate_token_hash` dispatches on the prefix, so
//! stored hashes survive a change of default.

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::password_hash::PasswordHasherAndValidator;
use crate::random::CryptoRandom;
use crate::util::ct_eq;

/// English letters and digits, the default token alphabet.
pub const DEFAULT_TOKEN_CHARS: &str =
    "qwertyuiopasdfghjklzxcvbnm1234567890QWERTYUIOPASDFGHJKLZXCVBNM";

const MIN_DISTINCT_CHARS: usize = 10;
const SLOW_HASH_VERSION: &str = "00";
const QUICK_HASH_VERSION: &str = "01";

pub struct TokenGenerator {
    allowed_chars: Vec<char>,
    rng: CryptoRandom,
    hasher: PasswordHasherAndValidator,
}

impl TokenGenerator {
    pub fn new() -> Self {
        Self {
            allowed_chars: DEFAULT_TOKEN_CHARS.chars().collect(),
            rng: CryptoRandom::new(),
            hasher: PasswordHasherAndValidator::new(),
        }
    }

    /// Generator over a custom alphabet. Whitespace characters and duplicates
    /// are dropped; at least ten distinct characters must remain.
    pub fn with_allowed_chars(allowed_chars: &str) -> Result<Self, CryptoError> {
        let mut chars: Vec<char> = Vec::new();
        for c in allowed_chars.chars().filter(|c| !c.is_whitespace()) {
            if !chars.contains(&c) {
                chars.push(c);
            }
        }
        if chars.len() < MIN_DISTINCT_CHARS {
            return Err(CryptoError::InvalidArgument(format!(
                "token alphabet needs at least {MIN_DISTINCT_CHARS} distinct characters, got {}",
                chars.len()
            )));
        }
        Ok(Self {
            allowed_chars: chars,
            rng: CryptoRandom::new(),
            hasher: PasswordHasherAndValidator::new(),
        })
    }

    pub fn generate_token(&self, length: usize) -> Result<String, CryptoError> {
        if length == 0 {
            return Err(CryptoError::InvalidArgument(
                "token length must be greater than zero".to_string(),
            ));
        }
        let mut token = String::with_capacity(length);
        for _ in 0..length {
            let index = self.rng.next_u32_below(self.allowed_chars.len() as u32) as usize;
            token.push(self.allowed_chars[index]);
        }
        Ok(token)
    }

    /// Hashes a token into a salted, self-validating string.
    pub fn hash_token(&self, token: &str) -> Result<String, CryptoError> {
        let record = self.hasher.hash_password(token)?;
        Ok(format!("{SLOW_HASH_VERSION}{}", BASE64_URL.encode(record)))
    }

    /// Unsalted SHA-256 hash. Cheap to verify, but only safe for tokens that
    /// are themselves long and random.
    pub fn quick_hash_token(&self, token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        format!("{QUICK_HASH_VERSION}{}", BASE64_URL.encode(digest))
    }

    /// Validates a token against a hash produced by [`TokenGenerator::hash_token`]
    /// or [`TokenGenerator::quick_hash_token`]. A hash with an unknown version
    /// prefix or broken base64 is an error, not a mismatch.
    pub fn validate_token_hash(&self, token: &str, hash: &str) -> Result<bool, CryptoError> {
        if let Some(encoded) = hash.strip_prefix(SLOW_HASH_VERSION) {
            let record = decode(encoded)?;
            return Ok(self.hasher.validate_password(token, &record).is_valid());
        }
        if let Some(encoded) = hash.strip_prefix(QUICK_HASH_VERSION) {
            let stored = decode(encoded)?;
            let computed = Sha256::digest(token.as_bytes());
            return Ok(ct_eq(computed.as_slice(), &stored));
        }
        Err(CryptoError::InvalidArgument(
            "unknown token hash version".to_string(),
        ))
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64_URL
        .decode(encoded)
        .map_err(|_| CryptoError::InvalidArgument("token hash is not valid base64".to_string()))
}
