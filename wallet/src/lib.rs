//! Client SDK for Substrate-style chains: query account state, then build,
//! sign, fee-estimate, and submit balance transfers over JSON-RPC.

pub mod account;
pub mod client;
pub mod error;
pub mod extrinsic;
pub mod keys;
pub mod metadata;
pub mod rpc;
pub mod scale;

pub use account::{Account, AccountData, AccountInfo};
pub use client::TransactionClient;
pub use error::WalletError;
pub use extrinsic::{Call, Era, Extrinsic, ExtrinsicPayload, ExtrinsicSignature};
pub use keys::Wallet;
pub use metadata::CallIndices;
pub use rpc::{RpcClient, RpcConfig};
