//! Account identity and on-chain account state.
//!
//! An [`Account`] is a 32-byte ed25519 public key. Its balance record lives
//! in the `System.Account` storage map; [`Account::storage_key`] derives the
//! exact byte address the node expects for it.

use std::hash::Hasher;

use blake2::digest::consts::U16;
use blake2::{Blake2b, Blake2b512, Digest};
use twox_hash::XxHash64;

use crate::error::WalletError;

/// Length of an account public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Network identifier used when rendering addresses (42 = generic Substrate).
pub const DEFAULT_SS58_NETWORK: u8 = 42;

const SS58_CHECKSUM_PREAMBLE: &[u8] = b"SS58PRE";
const SS58_CHECKSUM_LEN: usize = 2;

/// A chain account, identified by its public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Account {
    public_key: [u8; PUBLIC_KEY_LEN],
}

impl Account {
    pub fn from_public_key(public_key: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self { public_key }
    }

    /// Parse an SS58 address (single-byte network identifier formats).
    pub fn from_ss58(address: &str) -> Result<Self, WalletError> {
        let raw = bs58::decode(address)
            .into_vec()
            .map_err(|e| WalletError::AddressEncoding(e.to_string()))?;
        let expected = 1 + PUBLIC_KEY_LEN + SS58_CHECKSUM_LEN;
        if raw.len() != expected {
            return Err(WalletError::AddressEncoding(format!(
                "expected {expected} bytes, found {}",
                raw.len()
            )));
        }
        let (data, checksum) = raw.split_at(raw.len() - SS58_CHECKSUM_LEN);
        if ss58_checksum(data) != checksum[..] {
            return Err(WalletError::AddressEncoding("bad checksum".into()));
        }
        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&data[1..]);
        Ok(Self { public_key })
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// Render as an SS58 address on the default network.
    pub fn to_ss58(&self) -> String {
        self.to_ss58_with_network(DEFAULT_SS58_NETWORK)
    }

    pub fn to_ss58_with_network(&self, network: u8) -> String {
        let mut data = Vec::with_capacity(1 + PUBLIC_KEY_LEN + SS58_CHECKSUM_LEN);
        data.push(network);
        data.extend_from_slice(&self.public_key);
        let checksum = ss58_checksum(&data);
        data.extend_from_slice(&checksum);
        bs58::encode(data).into_string()
    }

    /// Storage key of this account's `System.Account` entry.
    ///
    /// Key format: `twox_128("System") ++ twox_128("Account") ++
    /// blake2_128(key) ++ key`. The raw key is appended after its hash so
    /// the chain can enumerate map entries while lookups stay
    /// collision-resistant.
    pub fn storage_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(16 + 16 + 16 + PUBLIC_KEY_LEN);
        key.extend_from_slice(&twox_128(b"System"));
        key.extend_from_slice(&twox_128(b"Account"));
        key.extend_from_slice(&blake2_128(&self.public_key));
        key.extend_from_slice(&self.public_key);
        key
    }
}

/// Balance record of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountData {
    pub free: u128,
    pub reserved: u128,
    pub misc_frozen: u128,
    pub fee_frozen: u128,
}

/// Decoded `System.Account` state.
///
/// Legacy records (metadata version < 12) carry a single reference counter,
/// surfaced here through `consumers` with `providers` left at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub nonce: u32,
    pub consumers: u32,
    pub providers: u32,
    pub data: AccountData,
}

/// xxHash 128-bit (two seeded rounds of xxHash64).
pub(crate) fn twox_128(data: &[u8]) -> [u8; 16] {
    let mut h0 = XxHash64::with_seed(0);
    let mut h1 = XxHash64::with_seed(1);
    h0.write(data);
    h1.write(data);

    let r0 = h0.finish();
    let r1 = h1.finish();

    let mut result = [0u8; 16];
    result[..8].copy_from_slice(&r0.to_le_bytes());
    result[8..].copy_from_slice(&r1.to_le_bytes());
    result
}

/// Blake2b-128 hash.
pub(crate) fn blake2_128(data: &[u8]) -> [u8; 16] {
    type Blake2b128 = Blake2b<U16>;
    let hash = Blake2b128::digest(data);
    let mut result = [0u8; 16];
    result.copy_from_slice(&hash);
    result
}

fn ss58_checksum(data: &[u8]) -> [u8; SS58_CHECKSUM_LEN] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_CHECKSUM_PREAMBLE);
    hasher.update(data);
    let hash = hasher.finalize();
    let mut checksum = [0u8; SS58_CHECKSUM_LEN];
    checksum.copy_from_slice(&hash[..SS58_CHECKSUM_LEN]);
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: [u8; 32] = [
        0xd4, 0x35, 0x93, 0xc7, 0x15, 0xfd, 0xd3, 0x1c, 0x61, 0x14, 0x1a, 0xbd, 0x04, 0xa9,
        0x9f, 0xd6, 0x82, 0x2c, 0x85, 0x58, 0x85, 0x4c, 0xcd, 0xe3, 0x9a, 0x56, 0x84, 0xe7,
        0xa5, 0x6d, 0xa2, 0x7d,
    ];

    #[test]
    fn twox_128_known_vectors() {
        assert_eq!(
            hex::encode(twox_128(b"System")),
            "26aa394eea5630e07c48ae0c9558cef7"
        );
        assert_eq!(
            hex::encode(twox_128(b"Account")),
            "b99d880ec681799c0cf30e8886371da9"
        );
    }

    #[test]
    fn storage_key_layout() {
        let account = Account::from_public_key(ALICE);
        let key = account.storage_key();
        assert_eq!(key.len(), 80);
        assert!(hex::encode(&key)
            .starts_with("26aa394eea5630e07c48ae0c9558cef7b99d880ec681799c0cf30e8886371da9"));
        // The raw public key is appended verbatim after the hashes.
        assert_eq!(&key[48..], &ALICE);
    }

    #[test]
    fn storage_key_is_deterministic() {
        let account = Account::from_public_key(ALICE);
        assert_eq!(account.storage_key(), account.storage_key());
    }

    #[test]
    fn ss58_alice_vector() {
        let account = Account::from_public_key(ALICE);
        assert_eq!(
            account.to_ss58(),
            "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"
        );
    }

    #[test]
    fn ss58_round_trip() {
        let account = Account::from_public_key([7u8; 32]);
        let parsed = Account::from_ss58(&account.to_ss58()).unwrap();
        assert_eq!(parsed, account);
    }

    #[test]
    fn ss58_rejects_corrupted_checksum() {
        let mut address = Account::from_public_key(ALICE).to_ss58();
        // Flip the final character to any other base58 digit.
        let last = address.pop().unwrap();
        address.push(if last == '2' { '3' } else { '2' });
        assert!(Account::from_ss58(&address).is_err());
    }
}
