//! Password-based key derivation (PBKDF2-HMAC-SHA-256).

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::random::CryptoRandom;

pub const DEFAULT_HASH_ITERATIONS: u32 = 25_000;

const ALLOWED_LENGTHS: [usize; 4] = [8, 16, 32, 64];

/// Deterministic PBKDF2 hasher with configurable hash and salt lengths.
///
/// Derivation parameters are not recorded in the output; both sides must
/// agree on them out of band. For a self-describing record see
/// [`PasswordHasherAndValidator`](crate::PasswordHasherAndValidator).
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    hash_len: usize,
    salt_len: usize,
    iterations: u32,
}

impl PasswordHasher {
    /// Hasher with 16-byte hash and salt at [`DEFAULT_HASH_ITERATIONS`].
    pub fn new() -> Self {
        Self {
            hash_len: 16,
            salt_len: 16,
            iterations: DEFAULT_HASH_ITERATIONS,
        }
    }

    /// Hash and salt lengths are restricted to 8, 16, 32 or 64 bytes.
    pub fn with_parameters(
        hash_len: usize,
        salt_len: usize,
        iterations: u32,
    ) -> Result<Self, CryptoError> {
        if !ALLOWED_LENGTHS.contains(&hash_len) {
            return Err(CryptoError::InvalidArgument(format!(
                "hash length must be one of {ALLOWED_LENGTHS:?}, got {hash_len}"
            )));
        }
        if !ALLOWED_LENGTHS.contains(&salt_len) {
            return Err(CryptoError::InvalidArgument(format!(
                "salt length must be one of {ALLOWED_LENGTHS:?}, got {salt_len}"
            )));
        }
        if iterations == 0 {
            return Err(CryptoError::InvalidArgument(
                "iteration count must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            hash_len,
            salt_len,
            iterations,
        })
    }

    pub fn hash_len(&self) -> usize {
        self.hash_len
    }

    pub fn salt_len(&self) -> usize {
        self.salt_len
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn generate_salt(&self, rng: &CryptoRandom) -> Vec<u8> {
        rng.next_bytes(self.salt_len)
    }

    /// Derives `hash_len` bytes from the password and salt. The password must
    /// contain at least one non-whitespace character and the salt must match
    /// the configured salt length.
    pub fn hash_password(
        &self,
        password: &str,
        salt: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if password.trim().is_empty() {
            return Err(CryptoError::InvalidArgument(
                "password must not be empty or whitespace".to_string(),
            ));
        }
        if salt.len() != self.salt_len {
            return Err(CryptoError::InvalidArgument(format!(
                "salt must be {} bytes, got {}",
                self.salt_len,
                salt.len()
            )));
        }
        let mut out = Zeroizing::new(vec![0u8; self.hash_len]);
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, self.iterations, &mut out);
        Ok(out)
    }
}

impl PasswordHasher {
    /// Fixed derivation parameters of the container format: 32-byte key and
    /// salt at the default iteration count.
    pub(crate) const fn container_format() -> Self {
        Self {
            hash_len: 32,
            salt_len: 32,
            iterations: DEFAULT_HASH_ITERATIONS,
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
