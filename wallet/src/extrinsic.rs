//! Extrinsic construction: replay-protection eras, the signable payload, and
//! the signed wire envelope.
//!
//! The envelope format matches the node's `UncheckedExtrinsic` type:
//! - Address: MultiAddress<AccountId32, ()>
//! - Signature: MultiSignature (ed25519 variant)
//! - SignedExtra: (era, nonce, tip)
//! - Call: opaque encoded call
//!
//! The payload that gets signed additionally commits to the spec version,
//! transaction version, genesis hash, and checkpoint hash, none of which
//! travel in the envelope; the node reconstructs them when verifying.

use crate::account::Account;
use crate::error::WalletError;
use crate::keys::{Wallet, SIGNATURE_LEN};
use crate::scale::{self, ByteReader};

/// Extrinsic format version understood by the node.
pub const EXTRINSIC_FORMAT_VERSION: u8 = 4;

const SIGNED_BIT: u8 = 0b1000_0000;
const MULTI_ADDRESS_ID: u8 = 0x00;
const SIGNATURE_ED25519: u8 = 0x00;
const SIGNED_PAYLOAD_HASH_THRESHOLD: usize = 256;

/// Transaction mortality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Era {
    /// Never expires.
    Immortal,
    /// Valid for `period` blocks starting at the era phase.
    Mortal { period: u64, phase: u64 },
}

impl Era {
    /// Create a mortal era valid for `period` blocks around `current_block`.
    ///
    /// Period is rounded to a power of two in [4, 65536].
    pub fn mortal(period: u64, current_block: u64) -> Self {
        let period = period.clamp(4, 65536).next_power_of_two();
        let phase = current_block % period;
        Era::Mortal { period, phase }
    }

    /// SCALE encode the era.
    pub fn encode_to(&self, out: &mut Vec<u8>) {
        match self {
            Era::Immortal => out.push(0u8),
            Era::Mortal { period, phase } => {
                let quantize_factor = (*period >> 12).max(1);
                let encoded_period = (period.trailing_zeros() as u16)
                    .saturating_sub(1)
                    .clamp(1, 15);
                let quantized_phase = (*phase / quantize_factor) as u16;
                let encoded = encoded_period | (quantized_phase << 4);
                out.extend_from_slice(&encoded.to_le_bytes());
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2);
        self.encode_to(&mut out);
        out
    }

    pub(crate) fn decode(reader: &mut ByteReader<'_>) -> Result<Self, WalletError> {
        let first = reader.read_u8()?;
        if first == 0 {
            return Ok(Era::Immortal);
        }
        let second = reader.read_u8()?;
        let encoded = u16::from_le_bytes([first, second]);
        let period = 2u64 << (encoded & 0b1111);
        if period < 4 {
            return Err(WalletError::Parse(format!("invalid era period {period}")));
        }
        let quantize_factor = (period >> 12).max(1);
        let phase = (encoded >> 4) as u64 * quantize_factor;
        Ok(Era::Mortal { period, phase })
    }
}

/// An encoded runtime call, opaque to this crate beyond its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call(Vec<u8>);

impl Call {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Everything a signature must commit to.
///
/// Pure data: assembling one performs no I/O and no validation. The caller
/// supplies chain parameters and the freshest observed nonce. For immortal
/// eras the checkpoint hash is the genesis hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtrinsicPayload {
    pub call: Call,
    pub genesis_hash: [u8; 32],
    pub era: Era,
    pub checkpoint_hash: [u8; 32],
    pub nonce: u32,
    pub spec_version: u32,
    pub tip: u128,
    pub transaction_version: u32,
}

impl ExtrinsicPayload {
    pub fn new(
        call: Call,
        genesis_hash: [u8; 32],
        era: Era,
        checkpoint_hash: [u8; 32],
        nonce: u32,
        spec_version: u32,
        tip: u128,
        transaction_version: u32,
    ) -> Self {
        Self {
            call,
            genesis_hash,
            era,
            checkpoint_hash,
            nonce,
            spec_version,
            tip,
            transaction_version,
        }
    }

    /// Bytes fed to the signature primitive.
    ///
    /// Field order is fixed by the runtime: call, era, nonce, tip, then the
    /// additional-signed data (spec version, transaction version, genesis
    /// hash, checkpoint hash). Payloads longer than 256 bytes are
    /// blake2_256-hashed before signing, per Substrate convention.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(self.call.as_bytes());
        self.era.encode_to(&mut payload);
        scale::encode_compact(self.nonce as u128, &mut payload);
        scale::encode_compact(self.tip, &mut payload);
        payload.extend_from_slice(&self.spec_version.to_le_bytes());
        payload.extend_from_slice(&self.transaction_version.to_le_bytes());
        payload.extend_from_slice(&self.genesis_hash);
        payload.extend_from_slice(&self.checkpoint_hash);

        if payload.len() > SIGNED_PAYLOAD_HASH_THRESHOLD {
            sp_crypto_hashing::blake2_256(&payload).to_vec()
        } else {
            payload
        }
    }
}

/// Signature envelope of a signed extrinsic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtrinsicSignature {
    pub signer: Account,
    pub signature: [u8; SIGNATURE_LEN],
    pub era: Era,
    pub nonce: u32,
    pub tip: u128,
}

/// Sign a payload and package the envelope metadata with it.
pub fn sign_payload(wallet: &Wallet, payload: &ExtrinsicPayload) -> ExtrinsicSignature {
    let signature = wallet.sign(&payload.signing_bytes());
    ExtrinsicSignature {
        signer: wallet.account(),
        signature,
        era: payload.era,
        nonce: payload.nonce,
        tip: payload.tip,
    }
}

/// A chain-submittable transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extrinsic {
    pub signature: Option<ExtrinsicSignature>,
    pub call: Call,
}

impl Extrinsic {
    /// Sign `payload` with the wallet and assemble the submittable value.
    pub fn signed(wallet: &Wallet, payload: &ExtrinsicPayload) -> Self {
        let signature = sign_payload(wallet, payload);
        Self {
            signature: Some(signature),
            call: payload.call.clone(),
        }
    }

    pub fn unsigned(call: Call) -> Self {
        Self {
            signature: None,
            call,
        }
    }

    /// Encode for submission: a compact length prefix over the version byte,
    /// signature envelope (if any), and call.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        match &self.signature {
            Some(envelope) => {
                body.push(SIGNED_BIT | EXTRINSIC_FORMAT_VERSION);
                body.push(MULTI_ADDRESS_ID);
                body.extend_from_slice(envelope.signer.public_key());
                body.push(SIGNATURE_ED25519);
                body.extend_from_slice(&envelope.signature);
                envelope.era.encode_to(&mut body);
                scale::encode_compact(envelope.nonce as u128, &mut body);
                scale::encode_compact(envelope.tip, &mut body);
            }
            None => body.push(EXTRINSIC_FORMAT_VERSION),
        }
        body.extend_from_slice(self.call.as_bytes());

        let mut out = Vec::with_capacity(body.len() + 4);
        scale::encode_compact_len(body.len(), &mut out);
        out.extend_from_slice(&body);
        out
    }

    /// Decode a submission-encoded extrinsic back into its parts.
    pub fn decode(bytes: &[u8]) -> Result<Self, WalletError> {
        let mut reader = ByteReader::new(bytes);
        let body_len = reader.read_compact()? as usize;
        if reader.remaining() != body_len {
            return Err(WalletError::Parse(format!(
                "extrinsic length prefix says {body_len} bytes, found {}",
                reader.remaining()
            )));
        }
        let version = reader.read_u8()?;
        match version {
            v if v == (SIGNED_BIT | EXTRINSIC_FORMAT_VERSION) => {
                let address_kind = reader.read_u8()?;
                if address_kind != MULTI_ADDRESS_ID {
                    return Err(WalletError::Parse(format!(
                        "unsupported address variant {address_kind:#04x}"
                    )));
                }
                let signer = Account::from_public_key(reader.read_array::<32>()?);
                let signature_kind = reader.read_u8()?;
                if signature_kind != SIGNATURE_ED25519 {
                    return Err(WalletError::Parse(format!(
                        "unsupported signature variant {signature_kind:#04x}"
                    )));
                }
                let signature = reader.read_array::<SIGNATURE_LEN>()?;
                let era = Era::decode(&mut reader)?;
                let nonce = reader.read_compact()?;
                let nonce = u32::try_from(nonce)
                    .map_err(|_| WalletError::Parse(format!("nonce {nonce} exceeds u32")))?;
                let tip = reader.read_compact()?;
                let call = Call::from_bytes(reader.take(reader.remaining())?.to_vec());
                Ok(Self {
                    signature: Some(ExtrinsicSignature {
                        signer,
                        signature,
                        era,
                        nonce,
                        tip,
                    }),
                    call,
                })
            }
            v if v == EXTRINSIC_FORMAT_VERSION => {
                let call = Call::from_bytes(reader.take(reader.remaining())?.to_vec());
                Ok(Self {
                    signature: None,
                    call,
                })
            }
            other => Err(WalletError::Parse(format!(
                "unsupported extrinsic version byte {other:#04x}"
            ))),
        }
    }
}
