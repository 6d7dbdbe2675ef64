//! End-to-end transaction service.
//!
//! [`TransactionClient`] composes the storage-key deriver, codec, payload
//! builder, and signer over an [`RpcClient`]. Reads are stateless and hit the
//! node every time; there is no nonce cache and no staleness control, so the
//! nonce used for signing is always the one most recently observed on-chain.
//! Signing for a given wallet is serialized by a per-account lock, which
//! keeps two concurrent transfers from the same wallet from observing the
//! same nonce.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;

use crate::account::{Account, AccountInfo};
use crate::error::WalletError;
use crate::extrinsic::{Era, Extrinsic, ExtrinsicPayload};
use crate::keys::Wallet;
use crate::metadata::{self, CallIndices};
use crate::rpc::RpcClient;
use crate::scale;

pub struct TransactionClient {
    rpc: Arc<RpcClient>,
    /// Explicit transfer call indices; when unset they are resolved from the
    /// chain's metadata on every signing operation.
    transfer_indices: Option<CallIndices>,
    signing_locks: StdMutex<HashMap<[u8; 32], Arc<Mutex<()>>>>,
}

impl TransactionClient {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self {
            rpc,
            transfer_indices: None,
            signing_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Use fixed transfer call indices instead of resolving them from
    /// metadata (required for chains whose metadata predates V14).
    pub fn with_transfer_indices(mut self, indices: CallIndices) -> Self {
        self.transfer_indices = Some(indices);
        self
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Current on-chain state of `account`.
    ///
    /// An account the chain has never seen decodes as the zero state: nonce
    /// 0, all balances 0.
    pub async fn account_info(&self, account: &Account) -> Result<AccountInfo, WalletError> {
        let metadata = self.rpc.metadata_bytes().await?;
        let version = metadata::metadata_version(&metadata)?;
        match self.rpc.storage(&account.storage_key()).await? {
            Some(raw) => scale::decode_account_info(&raw, version),
            None => Ok(AccountInfo::default()),
        }
    }

    /// Free balance of `account`.
    pub async fn balance(&self, account: &Account) -> Result<u128, WalletError> {
        Ok(self.account_info(account).await?.data.free)
    }

    /// Build and sign a transfer of `amount` to `dest`.
    ///
    /// The transfer call, genesis hash, spec version, transaction version,
    /// and sender state are fetched concurrently; the first failure aborts
    /// the whole attempt. The signed extrinsic always carries a zero tip.
    pub async fn sign_transfer(
        &self,
        wallet: &Wallet,
        dest: &Account,
        amount: u128,
        era: Era,
    ) -> Result<Extrinsic, WalletError> {
        let lock = self.signing_lock(wallet.public_key());
        let _guard = lock.lock().await;

        let signer = wallet.account();
        let (call, genesis_hash, spec_version, transaction_version, info) = futures::try_join!(
            self.transfer_call(dest, amount),
            self.rpc.genesis_hash(),
            self.rpc.spec_version(),
            self.rpc.transaction_version(),
            self.account_info(&signer),
        )?;

        // The genesis hash doubles as the mortality checkpoint; callers
        // anchoring a mortal era elsewhere build the payload themselves.
        let payload = ExtrinsicPayload::new(
            call,
            genesis_hash,
            era,
            genesis_hash,
            info.nonce,
            spec_version,
            0,
            transaction_version,
        );
        Ok(Extrinsic::signed(wallet, &payload))
    }

    /// Fee the node would charge for `extrinsic`.
    pub async fn estimate_fee(&self, extrinsic: &Extrinsic) -> Result<u128, WalletError> {
        self.rpc.estimate_fee(&extrinsic.encode()).await
    }

    /// Submit `extrinsic`; returns the hash the node assigns.
    ///
    /// Single fire-and-forget call: no retry, no inclusion tracking. Callers
    /// that need confirmation poll chain state afterwards.
    pub async fn submit(&self, extrinsic: &Extrinsic) -> Result<[u8; 32], WalletError> {
        self.rpc.submit_extrinsic(&extrinsic.encode()).await
    }

    /// Sign a transfer and submit it.
    pub async fn sign_and_submit(
        &self,
        wallet: &Wallet,
        dest: &Account,
        amount: u128,
        era: Era,
    ) -> Result<[u8; 32], WalletError> {
        let extrinsic = self.sign_transfer(wallet, dest, amount, era).await?;
        self.submit(&extrinsic).await
    }

    async fn transfer_call(
        &self,
        dest: &Account,
        amount: u128,
    ) -> Result<crate::extrinsic::Call, WalletError> {
        let indices = match self.transfer_indices {
            Some(indices) => indices,
            None => metadata::transfer_call_indices(&self.rpc.metadata_bytes().await?)?,
        };
        Ok(metadata::encode_transfer(indices, dest, amount))
    }

    fn signing_lock(&self, signer: [u8; 32]) -> Arc<Mutex<()>> {
        let mut locks = self.signing_locks.lock().expect("signing lock map poisoned");
        Arc::clone(
            locks
                .entry(signer)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
