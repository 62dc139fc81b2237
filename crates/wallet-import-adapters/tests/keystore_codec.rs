mod common;

use alloy::primitives::B256;
use wallet_import_adapters::Web3Keystore;
use wallet_import_core::{KeyObject, KeystorePort, PortError, Wallet};

use common::{dev_address, dev_private_key, fast_keystore};

/// pbkdf2 test vector from the Web3 secret storage definition.
const PBKDF2_VECTOR: &str = r#"{
    "crypto": {
        "cipher": "aes-128-ctr",
        "cipherparams": { "iv": "6087dab2f9fdbbfaddc31a909735c1e6" },
        "ciphertext": "5318b4d5bcd28de64ee5559e671353e16f075ecae9f99c7a79a38af5f869aa46",
        "kdf": "pbkdf2",
        "kdfparams": {
            "c": 262144,
            "dklen": 32,
            "prf": "hmac-sha256",
            "salt": "ae3cd4e7013836a3df6bd7241b12db061dbe2c6785853cce422d148a624ce0bd"
        },
        "mac": "517ead924a9d0dc3124507e3393d175ce3ff7c1e96529c6c555ce9e51205e9b2"
    },
    "id": "3198bc9c-6672-5ab3-d995-4942343ae5b6",
    "version": 3,
    "address": "008aeeda4d805471df9b2a5b0f38a0c3bcba786b"
}"#;

fn dev_wallet() -> Wallet {
    Wallet {
        address: dev_address(),
        private_key: Some(dev_private_key()),
    }
}

#[test]
fn pbkdf2_vector_decrypts_to_known_key() {
    let key_object: KeyObject = serde_json::from_str(PBKDF2_VECTOR).expect("parse vector");
    let wallet = Web3Keystore::default()
        .decrypt_blocking(&key_object, "testpassword")
        .expect("decrypt vector");
    let expected: B256 = "0x7a28b5ba57c53603b0b07b56bba752f7784bf506fa95edc395f5cf6c7514fe9d"
        .parse()
        .expect("expected key");
    assert_eq!(wallet.private_key, Some(expected));
}

#[test]
fn encrypted_document_has_v3_shape() {
    let key_object = fast_keystore()
        .encrypt_blocking(&dev_wallet(), "pw")
        .expect("encrypt");
    let json = serde_json::to_value(&key_object).expect("to json");

    assert_eq!(json["version"], 3);
    assert_eq!(json["address"], "f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    assert_eq!(json["crypto"]["cipher"], "aes-128-ctr");
    assert_eq!(json["crypto"]["kdf"], "scrypt");
    assert_eq!(json["crypto"]["kdfparams"]["n"], 16);
    assert_eq!(json["crypto"]["kdfparams"]["dklen"], 32);
    assert_eq!(
        json["crypto"]["cipherparams"]["iv"]
            .as_str()
            .expect("iv string")
            .len(),
        32
    );
}

#[test]
fn each_encryption_uses_fresh_salt_and_id() {
    let keystore = fast_keystore();
    let a = keystore.encrypt_blocking(&dev_wallet(), "pw").expect("encrypt a");
    let b = keystore.encrypt_blocking(&dev_wallet(), "pw").expect("encrypt b");
    assert_ne!(a.id, b.id);
    assert_ne!(a.crypto, b.crypto);
}

#[test]
fn wrong_password_is_a_mac_mismatch() {
    let keystore = fast_keystore();
    let key_object = keystore
        .encrypt_blocking(&dev_wallet(), "right")
        .expect("encrypt");
    let err = keystore
        .decrypt_blocking(&key_object, "wrong")
        .expect_err("wrong password");
    assert!(matches!(err, PortError::Crypto(_)));
    assert!(err.to_string().contains("mac mismatch"));
}

#[test]
fn watch_only_wallet_cannot_be_encrypted() {
    let err = fast_keystore()
        .encrypt_blocking(&Wallet::watch_only(dev_address()), "pw")
        .expect_err("no key");
    assert!(matches!(err, PortError::Validation(_)));
}

#[test]
fn unsupported_documents_are_rejected() {
    let mut key_object = fast_keystore()
        .encrypt_blocking(&dev_wallet(), "pw")
        .expect("encrypt");
    key_object.version = Some(1);
    assert!(fast_keystore().decrypt_blocking(&key_object, "pw").is_err());

    key_object.version = Some(3);
    if let Some(crypto) = key_object.crypto.as_mut() {
        crypto["cipher"] = "aes-256-gcm".into();
    }
    let err = fast_keystore()
        .decrypt_blocking(&key_object, "pw")
        .expect_err("cipher");
    assert!(err.to_string().contains("unsupported cipher"));

    let no_crypto = KeyObject {
        crypto: None,
        ..key_object
    };
    assert!(fast_keystore().decrypt_blocking(&no_crypto, "pw").is_err());
}

#[tokio::test]
async fn port_round_trip_runs_off_the_runtime_thread() {
    let keystore = fast_keystore();
    let key_object = keystore.encrypt(&dev_wallet(), "pw").await.expect("encrypt");
    let wallet = keystore.decrypt(&key_object, "pw").await.expect("decrypt");
    assert_eq!(wallet, dev_wallet());
}
