use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("data is too short to contain a valid encrypted container")]
    DataIsTooShort,
    #[error("magic number mismatch; data was not produced by this library or is corrupted")]
    InvalidMagicNumber,
    #[error("data requires format version {required}, this library supports version {supported}")]
    UnsupportedDataVersion { required: u16, supported: u16 },
    #[error("key check value mismatch; wrong key or password")]
    KeyCheckValueValidation,
    #[error("message authentication code mismatch; data is corrupted or tampered with")]
    DataIntegrityValidation,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("operation was canceled")]
    Canceled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
