//! SCALE wire-format helpers.
//!
//! The extrinsic pipeline must control every byte it signs, so the
//! wire-critical encoders here are hand-rolled rather than derived: compact
//! integers, fixed-width little-endian primitives, and the versioned
//! `System.Account` record layouts.

use crate::account::{AccountData, AccountInfo};
use crate::error::WalletError;

/// Metadata versions at or above this use the current `AccountInfo` layout.
pub const CURRENT_ACCOUNT_LAYOUT_VERSION: u32 = 12;

const BALANCE_RECORD_LEN: usize = 16 * 4;
/// nonce(4) + refcount(1) + balances
const LEGACY_ACCOUNT_INFO_LEN: usize = 4 + 1 + BALANCE_RECORD_LEN;
/// nonce(4) + consumers(4) + providers(4) + balances
const CURRENT_ACCOUNT_INFO_LEN: usize = 4 + 4 + 4 + BALANCE_RECORD_LEN;

/// Append the SCALE compact encoding of `value`.
pub fn encode_compact(value: u128, out: &mut Vec<u8>) {
    if value < 0x40 {
        // Single byte mode
        out.push((value as u8) << 2);
    } else if value < 0x4000 {
        // Two byte mode
        let v = ((value as u16) << 2) | 0x01;
        out.extend_from_slice(&v.to_le_bytes());
    } else if value < 0x4000_0000 {
        // Four byte mode
        let v = ((value as u32) << 2) | 0x02;
        out.extend_from_slice(&v.to_le_bytes());
    } else {
        // Big integer mode
        let bytes_needed = ((128 - value.leading_zeros()).div_ceil(8)) as u8;
        out.push(((bytes_needed - 4) << 2) | 0x03);
        let value_bytes = value.to_le_bytes();
        out.extend_from_slice(&value_bytes[..bytes_needed as usize]);
    }
}

/// Append the compact encoding of a collection length.
pub fn encode_compact_len(len: usize, out: &mut Vec<u8>) {
    encode_compact(len as u128, out);
}

/// Compact encoding of `value` as an owned buffer.
pub fn compact(value: u128) -> Vec<u8> {
    let mut out = Vec::new();
    encode_compact(value, &mut out);
    out
}

/// Cursor over a raw byte slice.
///
/// Every read is bounds-checked; running past the end is a
/// `MalformedStorage` error carrying how many bytes the layout needed.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], WalletError> {
        if self.remaining() < len {
            return Err(WalletError::MalformedStorage {
                expected: self.pos + len,
                actual: self.data.len(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, WalletError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, WalletError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u128(&mut self) -> Result<u128, WalletError> {
        Ok(u128::from_le_bytes(self.read_array()?))
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WalletError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    /// Read a SCALE compact integer.
    pub fn read_compact(&mut self) -> Result<u128, WalletError> {
        let first = self.read_u8()?;
        match first & 0b11 {
            0 => Ok((first >> 2) as u128),
            1 => {
                let second = self.read_u8()?;
                Ok((u16::from_le_bytes([first, second]) >> 2) as u128)
            }
            2 => {
                let rest = self.take(3)?;
                let raw = u32::from_le_bytes([first, rest[0], rest[1], rest[2]]);
                Ok((raw >> 2) as u128)
            }
            _ => {
                let len = ((first >> 2) + 4) as usize;
                if len > 16 {
                    return Err(WalletError::Parse(format!(
                        "compact integer of {len} bytes exceeds u128"
                    )));
                }
                let bytes = self.take(len)?;
                let mut buf = [0u8; 16];
                buf[..len].copy_from_slice(bytes);
                Ok(u128::from_le_bytes(buf))
            }
        }
    }
}

/// Decode a raw `System.Account` storage value.
///
/// The layout is selected by the chain's metadata version, never inferred
/// from the bytes themselves. Trailing bytes are tolerated (newer runtimes
/// append fields); missing bytes are not.
pub fn decode_account_info(bytes: &[u8], metadata_version: u32) -> Result<AccountInfo, WalletError> {
    let mut reader = ByteReader::new(bytes);
    if metadata_version < CURRENT_ACCOUNT_LAYOUT_VERSION {
        if bytes.len() < LEGACY_ACCOUNT_INFO_LEN {
            return Err(WalletError::MalformedStorage {
                expected: LEGACY_ACCOUNT_INFO_LEN,
                actual: bytes.len(),
            });
        }
        let nonce = reader.read_u32()?;
        let refcount = reader.read_u8()?;
        let data = decode_account_data(&mut reader)?;
        Ok(AccountInfo {
            nonce,
            consumers: refcount as u32,
            providers: 0,
            data,
        })
    } else {
        if bytes.len() < CURRENT_ACCOUNT_INFO_LEN {
            return Err(WalletError::MalformedStorage {
                expected: CURRENT_ACCOUNT_INFO_LEN,
                actual: bytes.len(),
            });
        }
        let nonce = reader.read_u32()?;
        let consumers = reader.read_u32()?;
        let providers = reader.read_u32()?;
        let data = decode_account_data(&mut reader)?;
        Ok(AccountInfo {
            nonce,
            consumers,
            providers,
            data,
        })
    }
}

fn decode_account_data(reader: &mut ByteReader<'_>) -> Result<AccountData, WalletError> {
    Ok(AccountData {
        free: reader.read_u128()?,
        reserved: reader.read_u128()?,
        misc_frozen: reader.read_u128()?,
        fee_frozen: reader.read_u128()?,
    })
}

/// Encode an `AccountInfo` in the layout of the given metadata version.
///
/// Legacy records carry a single reference counter byte; `consumers` is
/// truncated to it, which is lossless for any value a legacy chain can hold.
pub fn encode_account_info(info: &AccountInfo, metadata_version: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(CURRENT_ACCOUNT_INFO_LEN);
    out.extend_from_slice(&info.nonce.to_le_bytes());
    if metadata_version < CURRENT_ACCOUNT_LAYOUT_VERSION {
        out.push(info.consumers as u8);
    } else {
        out.extend_from_slice(&info.consumers.to_le_bytes());
        out.extend_from_slice(&info.providers.to_le_bytes());
    }
    out.extend_from_slice(&info.data.free.to_le_bytes());
    out.extend_from_slice(&info.data.reserved.to_le_bytes());
    out.extend_from_slice(&info.data.misc_frozen.to_le_bytes());
    out.extend_from_slice(&info.data.fee_frozen.to_le_bytes());
    out
}
