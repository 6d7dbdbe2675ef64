//! Runtime metadata: schema version discovery and transfer-call construction.
//!
//! The account-state decoder only needs the metadata *version*, which sits in
//! the blob's five-byte prefix. Building a transfer call additionally needs
//! the Balances pallet/call indices, resolved from V14+ metadata by name; for
//! chains whose metadata predates V14 the indices can be supplied explicitly
//! (see [`crate::client::TransactionClient::with_transfer_indices`]).

use codec::Decode;
use frame_metadata::{RuntimeMetadata, RuntimeMetadataPrefixed};
use scale_info::{PortableRegistry, TypeDef};

use crate::account::Account;
use crate::error::WalletError;
use crate::extrinsic::Call;
use crate::scale;

const METADATA_MAGIC: [u8; 4] = *b"meta";
const BALANCES_PALLET: &str = "Balances";
// Newer runtimes renamed `transfer` to `transfer_allow_death`.
const TRANSFER_CALLS: [&str; 2] = ["transfer_allow_death", "transfer"];

/// Position of a call in the runtime's call enum tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallIndices {
    pub pallet_index: u8,
    pub call_index: u8,
}

/// Schema version of a raw `state_getMetadata` blob.
pub fn metadata_version(bytes: &[u8]) -> Result<u32, WalletError> {
    if bytes.len() < 5 || bytes[..4] != METADATA_MAGIC {
        return Err(WalletError::Parse(
            "metadata blob lacks the meta magic prefix".into(),
        ));
    }
    Ok(bytes[4] as u32)
}

/// Resolve the pallet/call indices of the balance-transfer call.
pub fn transfer_call_indices(metadata_bytes: &[u8]) -> Result<CallIndices, WalletError> {
    let prefixed = RuntimeMetadataPrefixed::decode(&mut &metadata_bytes[..])
        .map_err(|e| WalletError::Parse(format!("failed to decode runtime metadata: {e}")))?;
    lookup_call_index(&prefixed.1, BALANCES_PALLET, &TRANSFER_CALLS)
}

/// Find the first of `call_names` inside `pallet_name`'s call enum.
pub fn lookup_call_index(
    metadata: &RuntimeMetadata,
    pallet_name: &str,
    call_names: &[&str],
) -> Result<CallIndices, WalletError> {
    match metadata {
        RuntimeMetadata::V14(meta) => lookup_call_index_impl(
            &meta.pallets,
            &meta.types,
            pallet_name,
            call_names,
            |pallet| pallet.name.as_ref(),
            |pallet| pallet.index,
            |pallet| pallet.calls.as_ref().map(|calls| calls.ty.id),
        ),
        RuntimeMetadata::V15(meta) => lookup_call_index_impl(
            &meta.pallets,
            &meta.types,
            pallet_name,
            call_names,
            |pallet| pallet.name.as_ref(),
            |pallet| pallet.index,
            |pallet| pallet.calls.as_ref().map(|calls| calls.ty.id),
        ),
        RuntimeMetadata::V16(meta) => lookup_call_index_impl(
            &meta.pallets,
            &meta.types,
            pallet_name,
            call_names,
            |pallet| pallet.name.as_ref(),
            |pallet| pallet.index,
            |pallet| pallet.calls.as_ref().map(|calls| calls.ty.id),
        ),
        _ => Err(WalletError::Parse(format!(
            "unsupported runtime metadata version {}",
            metadata.version()
        ))),
    }
}

fn lookup_call_index_impl<Pallet, NameFn, IndexFn, CallTypeFn>(
    pallets: &[Pallet],
    registry: &PortableRegistry,
    pallet_name: &str,
    call_names: &[&str],
    name_fn: NameFn,
    index_fn: IndexFn,
    call_type_fn: CallTypeFn,
) -> Result<CallIndices, WalletError>
where
    NameFn: Fn(&Pallet) -> &str,
    IndexFn: Fn(&Pallet) -> u8,
    CallTypeFn: Fn(&Pallet) -> Option<u32>,
{
    let pallet = pallets
        .iter()
        .find(|pallet| name_fn(pallet) == pallet_name)
        .ok_or_else(|| {
            WalletError::Parse(format!("runtime metadata missing pallet {pallet_name}"))
        })?;
    let call_type_id = call_type_fn(pallet).ok_or_else(|| {
        WalletError::Parse(format!(
            "runtime metadata missing calls for pallet {pallet_name}"
        ))
    })?;
    let call_type = registry.resolve(call_type_id).ok_or_else(|| {
        WalletError::Parse(format!(
            "runtime metadata missing call type {call_type_id} for {pallet_name}"
        ))
    })?;

    let TypeDef::Variant(variant) = &call_type.type_def else {
        return Err(WalletError::Parse(format!(
            "runtime metadata call enum for {pallet_name} is not a variant"
        )));
    };

    let call_variant = call_names
        .iter()
        .find_map(|name| {
            variant
                .variants
                .iter()
                .find(|variant| variant.name.as_str() == *name)
        })
        .ok_or_else(|| {
            WalletError::Parse(format!(
                "runtime metadata missing call {pallet_name}::{}",
                call_names.join("/")
            ))
        })?;

    Ok(CallIndices {
        pallet_index: index_fn(pallet),
        call_index: call_variant.index,
    })
}

/// Encode a balance-transfer call.
///
/// Layout: pallet index, call index, `MultiAddress::Id` destination, compact
/// amount.
pub fn encode_transfer(indices: CallIndices, dest: &Account, amount: u128) -> Call {
    let mut encoded = Vec::with_capacity(2 + 1 + 32 + 6);
    encoded.push(indices.pallet_index);
    encoded.push(indices.call_index);
    // MultiAddress::Id(AccountId32)
    encoded.push(0u8);
    encoded.extend_from_slice(dest.public_key());
    scale::encode_compact(amount, &mut encoded);
    Call::from_bytes(encoded)
}
