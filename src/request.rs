//! Per-operation state for a single encrypt, decrypt or validate call.

use zeroize::Zeroizing;

use crate::cipher::{self, IV_LEN, KEY_LEN};
use crate::container::SALT_LEN;
use crate::error::CryptoError;
use crate::kdf::PasswordHasher;
use crate::random::CryptoRandom;

/// Owned state for one operation. Never reused across calls; password-derived
/// key material is wiped on drop.
pub(crate) struct CryptoRequest {
    pub(crate) key: Zeroizing<Vec<u8>>,
    pub(crate) iv: [u8; IV_LEN],
    pub(crate) salt: [u8; SALT_LEN],
    pub(crate) password: Option<Zeroizing<String>>,
    /// Write the salt into the header (password-based encryption).
    pub(crate) embed_salt: bool,
    /// Sidecar and probe operations skip the KCV and MAC checks.
    pub(crate) skip_validations: bool,
}

impl CryptoRequest {
    pub(crate) fn with_key(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        cipher::check_key_and_iv(key, iv)?;
        let mut iv_arr = [0u8; IV_LEN];
        iv_arr.copy_from_slice(iv);
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
            iv: iv_arr,
            salt: [0u8; SALT_LEN],
            password: None,
            embed_salt: false,
            skip_validations: false,
        })
    }

    pub(crate) fn with_key_and_random_iv(
        key: &[u8],
        rng: &CryptoRandom,
    ) -> Result<Self, CryptoError> {
        let mut iv = [0u8; IV_LEN];
        rng.fill(&mut iv);
        Self::with_key(key, &iv)
    }

    /// Decryption path that relies entirely on the IV stored in the header.
    pub(crate) fn with_key_for_embedded_iv(key: &[u8]) -> Result<Self, CryptoError> {
        Self::with_key(key, &[0u8; IV_LEN])
    }

    /// Password-based encryption: random salt and IV, key derived immediately.
    pub(crate) fn with_new_password(
        password: &str,
        rng: &CryptoRandom,
    ) -> Result<Self, CryptoError> {
        let mut salt = [0u8; SALT_LEN];
        rng.fill(&mut salt);
        let mut iv = [0u8; IV_LEN];
        rng.fill(&mut iv);

        let key = password_hasher().hash_password(password, &salt)?;
        Ok(Self {
            key,
            iv,
            salt,
            password: Some(Zeroizing::new(password.to_string())),
            embed_salt: true,
            skip_validations: false,
        })
    }

    /// Password-based decryption: the key is derived once the salt has been
    /// read from the container header.
    pub(crate) fn for_password_decryption(password: &str) -> Self {
        Self {
            key: Zeroizing::new(Vec::new()),
            iv: [0u8; IV_LEN],
            salt: [0u8; SALT_LEN],
            password: Some(Zeroizing::new(password.to_string())),
            embed_salt: true,
            skip_validations: false,
        }
    }

    /// Dummy-key request for operations that only need the container parsed,
    /// not verified (sidecar reads and rewrites).
    pub(crate) fn format_probe() -> Self {
        Self {
            key: Zeroizing::new(vec![0u8; KEY_LEN]),
            iv: [0u8; IV_LEN],
            salt: [0u8; SALT_LEN],
            password: None,
            embed_salt: false,
            skip_validations: true,
        }
    }

    pub(crate) fn derive_key_from_salt(&mut self) -> Result<(), CryptoError> {
        let password = self.password.as_ref().ok_or_else(|| {
            CryptoError::InvalidArgument("password is required to derive a key".to_string())
        })?;
        self.key = password_hasher().hash_password(password, &self.salt)?;
        Ok(())
    }
}

/// Derivation parameters of the container format. The iteration count is not
/// recorded in the container; it is a fixed property of the format.
fn password_hasher() -> PasswordHasher {
    PasswordHasher::container_format()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_request_validates_lengths() {
        assert!(CryptoRequest::with_key(&[0u8; 32], &[0u8; 16]).is_ok());
        assert!(CryptoRequest::with_key(&[0u8; 31], &[0u8; 16]).is_err());
        assert!(CryptoRequest::with_key(&[0u8; 32], &[0u8; 15]).is_err());
    }

    #[test]
    fn password_request_derives_32_byte_key() {
        let rng = CryptoRandom::new();
        let request = CryptoRequest::with_new_password("secret phrase", &rng).unwrap();
        assert_eq!(request.key.len(), KEY_LEN);
        assert!(request.embed_salt);
        assert_ne!(request.salt, [0u8; SALT_LEN]);
    }

    #[test]
    fn salt_derivation_matches_encryption_side() {
        let rng = CryptoRandom::new();
        let encrypt_side = CryptoRequest::with_new_password("same password", &rng).unwrap();

        let mut decrypt_side = CryptoRequest::for_password_decryption("same password");
        decrypt_side.salt = encrypt_side.salt;
        decrypt_side.derive_key_from_salt().unwrap();
        assert_eq!(encrypt_side.key, decrypt_side.key);
    }

    #[test]
    fn blank_password_fails_derivation() {
        let mut request = CryptoRequest::for_password_decryption("   ");
        assert!(matches!(
            request.derive_key_from_salt(),
            Err(CryptoError::InvalidArgument(_))
        ));
    }
}
