// src/wallet.rs
use async_trait::async_trait;
use bs58;
use ed25519_dalek::{Signer, SigningKey};
use rand::{rngs::OsRng, Rng};
use std::sync::{Arc, Mutex};

/// In-memory wallet holding an ed25519 signing key.
///
/// Signing happens only in the trusted surface; the bridge reads nothing
/// from a wallet except its public key.
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    pub name: String,
}

impl Wallet {
    /// Generate a new random wallet
    pub fn new(name: String) -> Self {
        let mut csprng = OsRng;
        let secret_bytes: [u8; 32] = csprng.gen();
        let signing_key = SigningKey::from_bytes(&secret_bytes);
        Self { signing_key, name }
    }

    /// Reconstruct from a base58-encoded Solana keypair (32 or 64 bytes)
    pub fn from_keypair_base58(encoded: &str, name: String) -> Result<Self, String> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| format!("Decode error: {}", e))?;
        match bytes.len() {
            32 => {
                let mut key_bytes = [0u8; 32];
                key_bytes.copy_from_slice(&bytes);
                Ok(Self {
                    signing_key: SigningKey::from_bytes(&key_bytes),
                    name,
                })
            }
            64 => {
                let mut key_bytes = [0u8; 32];
                key_bytes.copy_from_slice(&bytes[..32]);
                let signing_key = SigningKey::from_bytes(&key_bytes);
                let verifying_key = signing_key.verifying_key();
                if verifying_key.as_bytes() != &bytes[32..] {
                    return Err("Public key does not match private key".into());
                }
                Ok(Self { signing_key, name })
            }
            len => Err(format!("Invalid key length: {} bytes", len)),
        }
    }

    /// Base58-encoded Solana-style public key
    pub fn public_key(&self) -> String {
        let vk = self.signing_key.verifying_key();
        bs58::encode(vk.as_bytes()).into_string()
    }

    /// Base58-encoded Solana-compatible keypair (64 bytes)
    pub fn keypair_base58(&self) -> String {
        let vk = self.signing_key.verifying_key();
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&self.signing_key.to_bytes());
        buf.extend_from_slice(vk.as_bytes());
        bs58::encode(buf).into_string()
    }

    /// Detached ed25519 signature over `message`
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

/// Source of truth for "is a wallet connected, and what is its public key".
///
/// The bridge consumes wallet state only through this seam.
#[async_trait]
pub trait WalletStateSource: Send + Sync {
    /// Public key of the connected wallet, or `None` when locked/absent
    async fn connected_public_key(&self) -> Option<String>;
}

/// The host application's currently-unlocked wallet slot
#[derive(Clone, Default)]
pub struct ActiveWallet {
    current: Arc<Mutex<Option<Wallet>>>,
}

impl ActiveWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, wallet: Wallet) {
        let mut current = self.current.lock().unwrap();
        *current = Some(wallet);
    }

    pub fn clear(&self) {
        let mut current = self.current.lock().unwrap();
        *current = None;
    }

    pub fn is_unlocked(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }
}

#[async_trait]
impl WalletStateSource for ActiveWallet {
    async fn connected_public_key(&self) -> Option<String> {
        let current = self.current.lock().unwrap();
        current.as_ref().map(|wallet| wallet.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    #[test]
    fn test_keypair_round_trip() {
        let wallet = Wallet::new("main".to_string());
        let encoded = wallet.keypair_base58();
        let restored = Wallet::from_keypair_base58(&encoded, "restored".to_string()).unwrap();
        assert_eq!(wallet.public_key(), restored.public_key());
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        let encoded = bs58::encode([1u8; 16]).into_string();
        let result = Wallet::from_keypair_base58(&encoded, "bad".to_string());
        assert!(result.unwrap_err().contains("Invalid key length"));
    }

    #[test]
    fn test_signature_verifies() {
        let wallet = Wallet::new("signer".to_string());
        let message = b"transfer 1 SOL";
        let sig_bytes = wallet.sign(message);

        let vk_bytes = bs58::decode(wallet.public_key()).into_vec().unwrap();
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&vk_bytes.try_into().unwrap()).unwrap();
        let signature = Signature::from_slice(&sig_bytes).unwrap();
        assert!(vk.verify(message, &signature).is_ok());
    }

    #[tokio::test]
    async fn test_active_wallet_state() {
        let active = ActiveWallet::new();
        assert!(!active.is_unlocked());
        assert_eq!(active.connected_public_key().await, None);

        let wallet = Wallet::new("main".to_string());
        let expected = wallet.public_key();
        active.set(wallet);
        assert!(active.is_unlocked());
        assert_eq!(active.connected_public_key().await, Some(expected));

        active.clear();
        assert_eq!(active.connected_public_key().await, None);
    }
}
