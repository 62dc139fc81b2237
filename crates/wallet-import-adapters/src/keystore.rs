//! Web3 secret storage (v3 keystore) codec.
//!
//! Encrypts with scrypt + aes-128-ctr; decrypts scrypt and pbkdf2 documents.

use aes::Aes128;
use alloy::primitives::{hex, keccak256, B256};
use alloy::signers::local::PrivateKeySigner;
use ctr::cipher::{KeyIvInit, StreamCipher};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;

use wallet_import_core::{KeyMeta, KeyObject, KeystorePort, PortError, Wallet};

use crate::ImportAdapterConfig;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

const KEYSTORE_VERSION: u8 = 3;
const CIPHER: &str = "aes-128-ctr";
const DK_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CryptoSection {
    cipher: String,
    ciphertext: String,
    cipherparams: CipherParams,
    kdf: String,
    kdfparams: Value,
    mac: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CipherParams {
    iv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScryptParams {
    dklen: usize,
    n: u64,
    r: u32,
    p: u32,
    salt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Pbkdf2Params {
    dklen: usize,
    c: u32,
    prf: String,
    salt: String,
}

#[derive(Debug, Clone)]
pub struct Web3Keystore {
    log_n: u8,
    r: u32,
    p: u32,
}

impl Default for Web3Keystore {
    fn default() -> Self {
        Self::with_config(&ImportAdapterConfig::default())
    }
}

impl Web3Keystore {
    pub fn with_config(config: &ImportAdapterConfig) -> Self {
        Self {
            log_n: config.keystore_scrypt_log_n,
            r: config.keystore_scrypt_r,
            p: config.keystore_scrypt_p,
        }
    }

    pub fn encrypt_blocking(
        &self,
        wallet: &Wallet,
        password: &str,
    ) -> Result<KeyObject, PortError> {
        let private_key = wallet.private_key.ok_or_else(|| {
            PortError::Validation("wallet has no private key to encrypt".to_owned())
        })?;

        let salt: [u8; 32] = random_bytes()?;
        let iv: [u8; 16] = random_bytes()?;
        let params = ScryptParams {
            dklen: DK_LEN,
            n: 1u64 << self.log_n,
            r: self.r,
            p: self.p,
            salt: hex::encode(salt),
        };
        let derived = scrypt_key(
            password.as_bytes(),
            &salt,
            self.log_n,
            self.r,
            self.p,
            DK_LEN,
        )?;

        let mut ciphertext = private_key.to_vec();
        apply_ctr(&derived[..16], &iv, &mut ciphertext)?;
        let mac = keystore_mac(&derived, &ciphertext);

        let crypto = CryptoSection {
            cipher: CIPHER.to_owned(),
            ciphertext: hex::encode(&ciphertext),
            cipherparams: CipherParams {
                iv: hex::encode(iv),
            },
            kdf: "scrypt".to_owned(),
            kdfparams: to_value(&params)?,
            mac: hex::encode(mac),
        };

        Ok(KeyObject {
            address: wallet.address,
            name: None,
            meta: KeyMeta::default(),
            id: Some(uuid::Uuid::new_v4().to_string()),
            version: Some(KEYSTORE_VERSION),
            crypto: Some(to_value(&crypto)?),
            extra: Map::new(),
        })
    }

    pub fn decrypt_blocking(
        &self,
        key_object: &KeyObject,
        password: &str,
    ) -> Result<Wallet, PortError> {
        if let Some(version) = key_object.version {
            if version != KEYSTORE_VERSION {
                return Err(PortError::Validation(format!(
                    "unsupported keystore version {version}"
                )));
            }
        }
        let crypto: CryptoSection = key_object
            .crypto
            .clone()
            .ok_or_else(|| PortError::Validation("keystore has no crypto section".to_owned()))
            .and_then(|v| {
                serde_json::from_value(v)
                    .map_err(|e| PortError::Validation(format!("malformed crypto section: {e}")))
            })?;
        if crypto.cipher != CIPHER {
            return Err(PortError::Validation(format!(
                "unsupported cipher {}",
                crypto.cipher
            )));
        }

        let derived = derive_key(&crypto, password.as_bytes())?;
        let mut data = decode_hex("ciphertext", &crypto.ciphertext)?;
        let expected_mac = decode_hex("mac", &crypto.mac)?;
        if keystore_mac(&derived, &data).as_slice() != expected_mac.as_slice() {
            return Err(PortError::Crypto(
                "keystore mac mismatch, wrong password?".to_owned(),
            ));
        }

        let iv = decode_hex("iv", &crypto.cipherparams.iv)?;
        apply_ctr(&derived[..16], &iv, &mut data)?;
        if data.len() != 32 {
            return Err(PortError::Validation(format!(
                "decrypted key has {} bytes",
                data.len()
            )));
        }

        let private_key = B256::from_slice(&data);
        let signer = PrivateKeySigner::from_bytes(&private_key)
            .map_err(|e| PortError::Crypto(format!("decrypted key is not a valid secret: {e}")))?;
        Ok(Wallet {
            address: signer.address(),
            private_key: Some(private_key),
        })
    }
}

impl KeystorePort for Web3Keystore {
    async fn encrypt(&self, wallet: &Wallet, password: &str) -> Result<KeyObject, PortError> {
        let keystore = self.clone();
        let wallet = wallet.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || keystore.encrypt_blocking(&wallet, &password))
            .await
            .map_err(|e| PortError::Crypto(format!("keystore worker failed: {e}")))?
    }

    async fn decrypt(&self, key_object: &KeyObject, password: &str) -> Result<Wallet, PortError> {
        let keystore = self.clone();
        let key_object = key_object.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || keystore.decrypt_blocking(&key_object, &password))
            .await
            .map_err(|e| PortError::Crypto(format!("keystore worker failed: {e}")))?
    }
}

fn derive_key(crypto: &CryptoSection, password: &[u8]) -> Result<Vec<u8>, PortError> {
    match crypto.kdf.as_str() {
        "scrypt" => {
            let params: ScryptParams = from_value(&crypto.kdfparams)?;
            check_dklen(params.dklen)?;
            if !params.n.is_power_of_two() || params.n < 2 {
                return Err(PortError::Validation(format!(
                    "scrypt n must be a power of two, got {}",
                    params.n
                )));
            }
            let salt = decode_hex("salt", &params.salt)?;
            let log_n = params.n.trailing_zeros() as u8;
            scrypt_key(password, &salt, log_n, params.r, params.p, params.dklen)
        }
        "pbkdf2" => {
            let params: Pbkdf2Params = from_value(&crypto.kdfparams)?;
            check_dklen(params.dklen)?;
            if params.prf != "hmac-sha256" {
                return Err(PortError::Validation(format!(
                    "unsupported prf {}",
                    params.prf
                )));
            }
            let salt = decode_hex("salt", &params.salt)?;
            let mut key = vec![0u8; params.dklen];
            pbkdf2_hmac::<Sha256>(password, &salt, params.c, &mut key);
            Ok(key)
        }
        other => Err(PortError::Validation(format!("unsupported kdf {other}"))),
    }
}

fn scrypt_key(
    password: &[u8],
    salt: &[u8],
    log_n: u8,
    r: u32,
    p: u32,
    dklen: usize,
) -> Result<Vec<u8>, PortError> {
    let params = scrypt::Params::new(log_n, r, p, DK_LEN)
        .map_err(|e| PortError::Validation(format!("invalid scrypt params: {e}")))?;
    let mut key = vec![0u8; dklen];
    scrypt::scrypt(password, salt, &params, &mut key)
        .map_err(|e| PortError::Crypto(format!("scrypt failed: {e}")))?;
    Ok(key)
}

fn check_dklen(dklen: usize) -> Result<(), PortError> {
    if dklen < DK_LEN {
        return Err(PortError::Validation(format!(
            "kdf dklen {dklen} is shorter than {DK_LEN}"
        )));
    }
    Ok(())
}

fn apply_ctr(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), PortError> {
    let mut cipher = Aes128Ctr::new_from_slices(key, iv)
        .map_err(|e| PortError::Validation(format!("aes-128-ctr init failed: {e}")))?;
    cipher.apply_keystream(data);
    Ok(())
}

fn keystore_mac(derived: &[u8], ciphertext: &[u8]) -> B256 {
    let mut preimage = Vec::with_capacity(16 + ciphertext.len());
    preimage.extend_from_slice(&derived[16..32]);
    preimage.extend_from_slice(ciphertext);
    keccak256(preimage)
}

fn random_bytes<const N: usize>() -> Result<[u8; N], PortError> {
    let mut out = [0u8; N];
    getrandom::getrandom(&mut out)
        .map_err(|e| PortError::Crypto(format!("random generation failed: {e}")))?;
    Ok(out)
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, PortError> {
    hex::decode(value).map_err(|e| PortError::Validation(format!("invalid {field} hex: {e}")))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, PortError> {
    serde_json::to_value(value)
        .map_err(|e| PortError::Validation(format!("keystore serialization failed: {e}")))
}

fn from_value<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, PortError> {
    T::deserialize(value).map_err(|e| PortError::Validation(format!("malformed kdf params: {e}")))
}
