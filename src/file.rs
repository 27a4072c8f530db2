//! File-to-file convenience wrappers over the stream API.

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::error::CryptoError;

pub fn encrypt_file(
    source: &Path,
    destination: &Path,
    key: &[u8],
    iv: &[u8],
    overwrite_existing: bool,
) -> Result<(), CryptoError> {
    let mut input = File::open(source)?;
    let mut output = open_destination(destination, overwrite_existing)?;
    crate::encrypt_stream(&mut input, key, iv, &mut output)
}

pub fn decrypt_file(
    source: &Path,
    destination: &Path,
    key: &[u8],
    iv: &[u8],
    overwrite_existing: bool,
) -> Result<(), CryptoError> {
    let mut input = File::open(source)?;
    let mut output = open_destination(destination, overwrite_existing)?;
    crate::decrypt_stream(&mut input, key, iv, &mut output)
}

pub fn encrypt_file_with_password(
    source: &Path,
    destination: &Path,
    password: &str,
    overwrite_existing: bool,
) -> Result<(), CryptoError> {
    let mut input = File::open(source)?;
    let mut output = open_destination(destination, overwrite_existing)?;
    crate::encrypt_stream_with_password(&mut input, password, &mut output)
}

pub fn decrypt_file_with_password(
    source: &Path,
    destination: &Path,
    password: &str,
    overwrite_existing: bool,
) -> Result<(), CryptoError> {
    let mut input = File::open(source)?;
    let mut output = open_destination(destination, overwrite_existing)?;
    crate::decrypt_stream_with_password(&mut input, password, &mut output)
}

/// Opened read+write: the encryption path seeks back over the written stream
/// to backfill the container header.
fn open_destination(path: &Path, overwrite_existing: bool) -> Result<File, CryptoError> {
    if !overwrite_existing && path.exists() {
        return Err(CryptoError::InvalidArgument(format!(
            "destination file already exists: {}",
            path.display()
        )));
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    Ok(file)
}
