use cryptainer::{
    add_additional_data, add_additional_data_to_stream, decrypt, encrypt, read_additional_data,
    read_additional_data_from_stream, CryptoError,
};
use std::collections::BTreeMap;
use std::io::Cursor;

const KEY: [u8; 32] = [0x55; 32];
const IV: [u8; 16] = [0x66; 16];

fn sample_data() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("filename".to_string(), "budget-2026.xlsx".to_string());
    map.insert("owner".to_string(), "finance".to_string());
    map
}

#[test]
fn sidecar_roundtrip() {
    let container = encrypt(b"the payload", &KEY, &IV).expect("encrypt");
    let with_sidecar = add_additional_data(&container, &sample_data()).expect("attach");
    assert_eq!(read_additional_data(&with_sidecar).expect("read"), sample_data());
}

#[test]
fn container_without_sidecar_reads_empty() {
    let container = encrypt(b"plain container", &KEY, &IV).expect("encrypt");
    assert!(read_additional_data(&container).expect("read").is_empty());
}

#[test]
fn sidecar_needs_no_key_and_preserves_decryption() {
    let container = encrypt(b"still decryptable", &KEY, &IV).expect("encrypt");
    // Attaching happens without any key material.
    let with_sidecar = add_additional_data(&container, &sample_data()).expect("attach");
    assert_eq!(
        decrypt(&with_sidecar, &KEY, &IV).expect("decrypt"),
        b"still decryptable"
    );
}

#[test]
fn ciphertext_bytes_are_unchanged_by_sidecar_write() {
    let container = encrypt(b"byte identical", &KEY, &IV).expect("encrypt");
    let with_sidecar = add_additional_data(&container, &sample_data()).expect("attach");

    let sidecar_len = with_sidecar.len() - container.len();
    assert!(sidecar_len > 0);
    // Header before the length field is untouched, ciphertext is shifted but
    // byte identical.
    assert_eq!(&with_sidecar[..123], &container[..123]);
    assert_eq!(&with_sidecar[127 + sidecar_len..], &container[127..]);
}

#[test]
fn sidecar_can_be_replaced_with_different_size() {
    let container = encrypt(b"rewrite me", &KEY, &IV).expect("encrypt");
    let once = add_additional_data(&container, &sample_data()).expect("first attach");

    let mut bigger = sample_data();
    bigger.insert(
        "comment".to_string(),
        "a considerably longer value than before".repeat(4),
    );
    let twice = add_additional_data(&once, &bigger).expect("second attach");

    assert_eq!(read_additional_data(&twice).expect("read"), bigger);
    assert_eq!(decrypt(&twice, &KEY, &IV).expect("decrypt"), b"rewrite me");
}

#[test]
fn empty_map_sidecar_roundtrips() {
    let container = encrypt(b"empty map", &KEY, &IV).expect("encrypt");
    let with_sidecar = add_additional_data(&container, &BTreeMap::new()).expect("attach");
    assert!(read_additional_data(&with_sidecar).expect("read").is_empty());
    assert_eq!(decrypt(&with_sidecar, &KEY, &IV).expect("decrypt"), b"empty map");
}

#[test]
fn stream_forms_match_slice_forms() {
    let container = encrypt(b"stream sidecar", &KEY, &IV).expect("encrypt");
    let mut source = Cursor::new(container.clone());
    let mut rewritten = Vec::new();
    add_additional_data_to_stream(&mut source, &sample_data(), &mut rewritten).expect("attach");
    // Source position is restored.
    assert_eq!(source.position(), 0);

    assert_eq!(
        read_additional_data_from_stream(&mut Cursor::new(rewritten)).expect("read"),
        sample_data()
    );
}

#[test]
fn sidecar_on_garbage_is_rejected() {
    let err = read_additional_data(&[0u8; 64]).expect_err("too short");
    assert!(matches!(err, CryptoError::DataIsTooShort));

    let err = add_additional_data(&[0xAB; 256], &sample_data()).expect_err("bad magic");
    assert!(matches!(err, CryptoError::InvalidMagicNumber));
}
