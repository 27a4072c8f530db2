use cryptainer::{
    decrypt, decrypt_stream, decrypt_string_with_password, decrypt_with_embedded_iv,
    decrypt_with_password, encrypt, encrypt_and_embed_iv, encrypt_stream,
    encrypt_string_with_password, encrypt_with_password, CryptoError,
};
use std::io::Cursor;

const KEY: [u8; 32] = [0xC3; 32];
const IV: [u8; 16] = [0x3C; 16];

#[test]
fn roundtrip_with_explicit_key_and_iv() {
    let plaintext = b"the quick brown fox";
    let container = encrypt(plaintext, &KEY, &IV).expect("encrypt");
    assert_eq!(decrypt(&container, &KEY, &IV).expect("decrypt"), plaintext);
}

#[test]
fn roundtrip_with_externally_sourced_key_material() {
    // Key and IV as they would arrive from a key management system.
    let key = hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
        .expect("key hex");
    let iv = hex::decode("000102030405060708090a0b0c0d0e0f").expect("iv hex");
    let container = encrypt(b"hex sourced", &key, &iv).expect("encrypt");
    assert_eq!(decrypt(&container, &key, &iv).expect("decrypt"), b"hex sourced");
}

#[test]
fn known_vector_hello_under_zero_key() {
    let container = encrypt(b"hello", &[0u8; 32], &[0u8; 16]).expect("encrypt");
    // 127-byte header + one padded AES block.
    assert_eq!(container.len(), 143);
    assert_eq!(
        decrypt(&container, &[0u8; 32], &[0u8; 16]).expect("decrypt"),
        b"hello"
    );

    let mut wrong_key = [0u8; 32];
    wrong_key[31] = 1;
    let err = decrypt(&container, &wrong_key, &[0u8; 16]).expect_err("wrong key");
    assert!(matches!(err, CryptoError::KeyCheckValueValidation));
}

#[test]
fn roundtrip_with_embedded_iv() {
    let plaintext = vec![0xE7u8; 300];
    let container = encrypt_and_embed_iv(&plaintext, &KEY).expect("encrypt");
    assert_eq!(
        decrypt_with_embedded_iv(&container, &KEY).expect("decrypt"),
        plaintext
    );
}

#[test]
fn embedded_iv_containers_differ_per_call() {
    let a = encrypt_and_embed_iv(b"same input", &KEY).expect("encrypt a");
    let b = encrypt_and_embed_iv(b"same input", &KEY).expect("encrypt b");
    // Random IVs make the ciphertext differ even for identical plaintext.
    assert_ne!(a, b);
}

#[test]
fn roundtrip_with_password() {
    let plaintext = b"password protected payload";
    let container = encrypt_with_password(plaintext, "tr0ub4dor &3").expect("encrypt");
    assert_eq!(
        decrypt_with_password(&container, "tr0ub4dor &3").expect("decrypt"),
        plaintext
    );
}

#[test]
fn password_salt_is_embedded_and_random() {
    let a = encrypt_with_password(b"x", "pw pw pw").expect("encrypt a");
    let b = encrypt_with_password(b"x", "pw pw pw").expect("encrypt b");
    // Salt lives at header offset 24..56 and must differ between calls.
    assert_ne!(a[24..56], b[24..56]);
    assert_ne!(a[24..56], [0u8; 32]);
}

#[test]
fn roundtrip_string_with_password() {
    let encoded =
        encrypt_string_with_password("naučím tě šifrovat", "heslo heslo").expect("encrypt");
    // The container travels as base64 text.
    assert!(encoded.chars().all(|c| c.is_ascii()));
    assert_eq!(
        decrypt_string_with_password(&encoded, "heslo heslo").expect("decrypt"),
        "naučím tě šifrovat"
    );
}

#[test]
fn roundtrip_empty_plaintext() {
    let container = encrypt(b"", &KEY, &IV).expect("encrypt");
    assert_eq!(container.len(), 143);
    assert!(decrypt(&container, &KEY, &IV).expect("decrypt").is_empty());
}

#[test]
fn roundtrip_block_aligned_plaintext() {
    let plaintext = vec![0x11u8; 64];
    let container = encrypt(&plaintext, &KEY, &IV).expect("encrypt");
    assert_eq!(decrypt(&container, &KEY, &IV).expect("decrypt"), plaintext);
}

#[test]
fn roundtrip_multi_chunk_payload() {
    // Crosses several 4 KiB cipher chunks.
    let plaintext: Vec<u8> = (0..20_000).map(|i| (i % 251) as u8).collect();
    let container = encrypt(&plaintext, &KEY, &IV).expect("encrypt");
    assert_eq!(decrypt(&container, &KEY, &IV).expect("decrypt"), plaintext);
}

#[test]
fn stream_encrypt_slice_decrypt() {
    let plaintext = vec![0xABu8; 5000];
    let mut container = Cursor::new(Vec::new());
    encrypt_stream(&mut &plaintext[..], &KEY, &IV, &mut container).expect("encrypt stream");
    assert_eq!(
        decrypt(&container.into_inner(), &KEY, &IV).expect("decrypt"),
        plaintext
    );
}

#[test]
fn slice_encrypt_stream_decrypt() {
    let plaintext = vec![0xCDu8; 5000];
    let container = encrypt(&plaintext, &KEY, &IV).expect("encrypt");
    let mut out = Vec::new();
    decrypt_stream(&mut Cursor::new(container), &KEY, &IV, &mut out).expect("decrypt stream");
    assert_eq!(out, plaintext);
}

#[test]
fn wrong_password_reports_key_failure() {
    let container = encrypt_with_password(b"secret", "right password").expect("encrypt");
    let err = decrypt_with_password(&container, "wrong password").expect_err("wrong password");
    assert!(matches!(err, CryptoError::KeyCheckValueValidation));
}

#[test]
fn blank_password_is_invalid_argument() {
    let err = encrypt_with_password(b"data", "   ").expect_err("blank password");
    assert!(matches!(err, CryptoError::InvalidArgument(_)));
}

#[test]
fn wrong_key_length_is_invalid_argument() {
    let err = encrypt(b"data", &[0u8; 24], &IV).expect_err("short key");
    assert!(matches!(err, CryptoError::InvalidArgument(_)));
    let err = decrypt(b"data", &KEY, &[0u8; 12]).expect_err("short iv");
    assert!(matches!(err, CryptoError::InvalidArgument(_)));
}
