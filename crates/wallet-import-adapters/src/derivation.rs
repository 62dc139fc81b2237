use alloy::primitives::keccak256;
use alloy::signers::local::coins_bip39::{English, Mnemonic};
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};

use wallet_import_core::hdpath::first_account_path;
use wallet_import_core::validation::is_private_key_invalid;
use wallet_import_core::{KeyDerivationPort, PortError, Wallet};

/// Rounds of keccak applied to a brain phrase before address grinding starts.
pub const BRAIN_PHRASE_ROUNDS: usize = 16_384;

/// Derives wallets in-process from phrases and raw keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalKeyDerivation;

impl LocalKeyDerivation {
    /// Derives the first account below `hd_path`.
    pub fn mnemonic_wallet(&self, phrase: &str, hd_path: &str) -> Result<Wallet, PortError> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.trim())
            .derivation_path(first_account_path(hd_path))
            .map_err(|e| PortError::Validation(format!("invalid derivation path: {e}")))?
            .build()
            .map_err(|e| PortError::Crypto(format!("mnemonic derivation failed: {e}")))?;
        Ok(wallet_from_signer(&signer))
    }

    /// Hashes the phrase, then keeps hashing until the address starts with a
    /// zero byte.
    pub fn brain_wallet(&self, phrase: &str) -> Wallet {
        let mut secret = keccak256(phrase.as_bytes());
        let mut round = 0usize;
        loop {
            secret = keccak256(secret);
            if round <= BRAIN_PHRASE_ROUNDS {
                round += 1;
                continue;
            }
            if let Ok(signer) = PrivateKeySigner::from_bytes(&secret) {
                if signer.address()[0] == 0 {
                    return wallet_from_signer(&signer);
                }
            }
        }
    }

    pub fn private_key_wallet(&self, private_key: &str) -> Result<Wallet, PortError> {
        if is_private_key_invalid(private_key) {
            return Err(PortError::Validation(
                "private key must be 0x followed by 64 hex digits".to_owned(),
            ));
        }
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| PortError::Crypto(format!("invalid private key: {e}")))?;
        Ok(wallet_from_signer(&signer))
    }
}

impl KeyDerivationPort for LocalKeyDerivation {
    fn is_mnemonic_valid(&self, phrase: &str) -> bool {
        Mnemonic::<English>::new_from_phrase(phrase.trim()).is_ok()
    }

    async fn wallet_from_mnemonic(
        &self,
        phrase: &str,
        hd_path: &str,
    ) -> Result<Wallet, PortError> {
        self.mnemonic_wallet(phrase, hd_path)
    }

    async fn wallet_from_phrase(&self, phrase: &str) -> Result<Wallet, PortError> {
        let this = *self;
        let phrase = phrase.to_owned();
        tokio::task::spawn_blocking(move || this.brain_wallet(&phrase))
            .await
            .map_err(|e| PortError::Crypto(format!("brain phrase worker failed: {e}")))
    }

    async fn wallet_from_private_key(&self, private_key: &str) -> Result<Wallet, PortError> {
        self.private_key_wallet(private_key)
    }

    async fn generate_wallet(&self) -> Result<Wallet, PortError> {
        Ok(wallet_from_signer(&PrivateKeySigner::random()))
    }
}

fn wallet_from_signer(signer: &PrivateKeySigner) -> Wallet {
    Wallet {
        address: signer.address(),
        private_key: Some(signer.to_bytes()),
    }
}
