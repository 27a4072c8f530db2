//! Validation report for encrypted containers.

use crate::error::CryptoError;

/// Which container check failed, when one did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataValidationErrorKind {
    DataIsTooShort,
    InvalidMagicNumber,
    UnsupportedDataVersion,
    KeyCheckValue,
    DataIntegrity,
}

/// Outcome of validating an encrypted container without decrypting it.
///
/// Checks run in order (format, version, key, integrity) and stop at the first
/// failure, so at most one flag past the failing one is meaningful. Version
/// exactness is informational and does not affect [`ValidationResult::is_valid`]:
/// data written by a newer-but-compatible writer still validates.
#[derive(Debug)]
pub struct ValidationResult {
    data_format_is_valid: bool,
    data_format_version_is_valid: bool,
    data_format_version_is_exact: bool,
    key_is_valid: bool,
    data_integrity_is_valid: bool,
    error: Option<CryptoError>,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            data_format_is_valid: false,
            data_format_version_is_valid: false,
            data_format_version_is_exact: false,
            key_is_valid: false,
            data_integrity_is_valid: false,
            error: None,
        }
    }

    pub(crate) fn pass_format(&mut self) {
        self.data_format_is_valid = true;
    }

    pub(crate) fn pass_version(&mut self, exact: bool) {
        self.data_format_version_is_valid = true;
        self.data_format_version_is_exact = exact;
    }

    pub(crate) fn pass_key(&mut self) {
        self.key_is_valid = true;
    }

    pub(crate) fn pass_integrity(&mut self) {
        self.data_integrity_is_valid = true;
    }

    pub(crate) fn fail(&mut self, error: CryptoError) {
        self.error = Some(error);
    }

    pub fn is_valid(&self) -> bool {
        self.data_format_is_valid
            && self.data_format_version_is_valid
            && self.key_is_valid
            && self.data_integrity_is_valid
    }

    pub fn data_format_is_valid(&self) -> bool {
        self.data_format_is_valid
    }

    pub fn data_format_version_is_valid(&self) -> bool {
        self.data_format_version_is_valid
    }

    /// True when the data was written by exactly this format version. A false
    /// value with [`ValidationResult::is_valid`] still true means a compatible
    /// newer writer.
    pub fn data_format_version_is_exact(&self) -> bool {
        self.data_format_version_is_exact
    }

    pub fn key_is_valid(&self) -> bool {
        self.key_is_valid
    }

    pub fn data_integrity_is_valid(&self) -> bool {
        self.data_integrity_is_valid
    }

    pub fn error(&self) -> Option<&CryptoError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<DataValidationErrorKind> {
        self.error.as_ref().and_then(|error| match error {
            CryptoError::DataIsTooShort => Some(DataValidationErrorKind::DataIsTooShort),
            CryptoError::InvalidMagicNumber => Some(DataValidationErrorKind::InvalidMagicNumber),
            CryptoError::UnsupportedDataVersion { .. } => {
                Some(DataValidationErrorKind::UnsupportedDataVersion)
            }
            CryptoError::KeyCheckValueValidation => Some(DataValidationErrorKind::KeyCheckValue),
            CryptoError::DataIntegrityValidation => Some(DataValidationErrorKind::DataIntegrity),
            _ => None,
        })
    }

    pub(crate) fn into_result(self) -> Result<(), CryptoError> {
        if self.is_valid() {
            return Ok(());
        }
        Err(self.error.unwrap_or(CryptoError::DataIntegrityValidation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_checks_must_pass() {
        let mut result = ValidationResult::new();
        assert!(!result.is_valid());
        result.pass_format();
        result.pass_version(true);
        result.pass_key();
        assert!(!result.is_valid());
        result.pass_integrity();
        assert!(result.is_valid());
    }

    #[test]
    fn exactness_is_informational() {
        let mut result = ValidationResult::new();
        result.pass_format();
        result.pass_version(false);
        result.pass_key();
        result.pass_integrity();
        assert!(result.is_valid());
        assert!(!result.data_format_version_is_exact());
    }

    #[test]
    fn error_kind_maps_validation_errors() {
        let mut result = ValidationResult::new();
        result.fail(CryptoError::UnsupportedDataVersion {
            required: 4,
            supported: 3,
        });
        assert_eq!(
            result.error_kind(),
            Some(DataValidationErrorKind::UnsupportedDataVersion)
        );
        assert!(result.into_result().is_err());
    }
}
