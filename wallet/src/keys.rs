//! Wallet key material.
//!
//! A [`Wallet`] owns an ed25519 keypair. The secret key never leaves it:
//! signing happens through [`Wallet::sign`], and the key bytes are zeroized
//! when the wallet is dropped.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::account::{Account, PUBLIC_KEY_LEN};
use crate::error::WalletError;

/// Length of a wallet seed.
pub const SEED_LEN: usize = 32;

/// Length of a detached signature.
pub const SIGNATURE_LEN: usize = 64;

pub struct Wallet {
    signing_key: SigningKey,
    // Cached so read paths never touch the secret half.
    public_key: [u8; PUBLIC_KEY_LEN],
}

impl Wallet {
    /// Deterministically derive the keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let public_key = signing_key.verifying_key().to_bytes();
        Self {
            signing_key,
            public_key,
        }
    }

    /// Generate a fresh wallet from the given randomness source.
    pub fn from_rng<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut seed = Zeroizing::new([0u8; SEED_LEN]);
        rng.fill_bytes(&mut *seed);
        Self::from_seed(&seed)
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.public_key
    }

    pub fn account(&self) -> Account {
        Account::from_public_key(self.public_key)
    }

    /// Sign an arbitrary message.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Wallet")
            .field("public_key", &hex::encode(self.public_key))
            .finish()
    }
}

/// Verify a detached signature against an account's public key.
pub fn verify(
    public_key: &[u8; PUBLIC_KEY_LEN],
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<(), WalletError> {
    let key = VerifyingKey::from_bytes(public_key)
        .map_err(|_| WalletError::InvalidKey("not a valid ed25519 public key"))?;
    key.verify(message, &Signature::from_bytes(signature))
        .map_err(|_| WalletError::InvalidKey("signature does not verify"))
}
