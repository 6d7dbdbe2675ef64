//! End-to-end transfer tests against an in-process mock node.
//!
//! The mock serves the six RPC methods the SDK touches, with canned chain
//! parameters and an injectable set of accounts, so the full
//! query → build → sign → estimate → submit pipeline runs without a real
//! node.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jsonrpsee::server::{RpcModule, ServerBuilder, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use sp_crypto_hashing::blake2_256;

use substrate_wallet::{
    keys, metadata, scale, Account, AccountData, AccountInfo, CallIndices, Era, Extrinsic,
    ExtrinsicPayload, RpcClient, TransactionClient, Wallet,
};

const GENESIS: [u8; 32] = [0x42; 32];
const SPEC_VERSION: u32 = 9180;
const TX_VERSION: u32 = 7;
const METADATA_VERSION: u8 = 14;
const PARTIAL_FEE: &str = "123456789012345";
const TRANSFER_INDICES: CallIndices = CallIndices {
    pallet_index: 5,
    call_index: 0,
};

struct MockChain {
    /// storage key hex -> value hex, both without the 0x prefix
    storage: HashMap<String, String>,
    submitted: Mutex<Vec<Vec<u8>>>,
}

struct TestNode {
    chain: Arc<MockChain>,
    url: String,
    // Stops the server when the test drops it.
    _handle: ServerHandle,
}

impl TestNode {
    async fn spawn(accounts: &[(Account, AccountInfo)]) -> Self {
        let storage = accounts
            .iter()
            .map(|(account, info)| {
                (
                    hex::encode(account.storage_key()),
                    hex::encode(scale::encode_account_info(info, METADATA_VERSION as u32)),
                )
            })
            .collect();
        let chain = Arc::new(MockChain {
            storage,
            submitted: Mutex::new(Vec::new()),
        });

        let server = ServerBuilder::default()
            .build("127.0.0.1:0")
            .await
            .expect("build mock server");
        let addr = server.local_addr().expect("mock server address");

        let mut module = RpcModule::new(Arc::clone(&chain));
        module
            .register_method("chain_getBlockHash", |params, _chain, _| {
                let number: u32 = params.one()?;
                let hash = (number == 0).then(|| format!("0x{}", hex::encode(GENESIS)));
                Ok::<_, ErrorObjectOwned>(hash)
            })
            .unwrap();
        module
            .register_method("state_getRuntimeVersion", |_params, _chain, _| {
                serde_json::json!({
                    "specName": "mock",
                    "specVersion": SPEC_VERSION,
                    "transactionVersion": TX_VERSION,
                })
            })
            .unwrap();
        module
            .register_method("state_getMetadata", |_params, _chain, _| {
                let mut blob = b"meta".to_vec();
                blob.push(METADATA_VERSION);
                format!("0x{}", hex::encode(blob))
            })
            .unwrap();
        module
            .register_method("state_getStorage", |params, chain, _| {
                let key: String = params.one()?;
                let key = key.trim_start_matches("0x").to_string();
                let value = chain.storage.get(&key).map(|v| format!("0x{v}"));
                Ok::<_, ErrorObjectOwned>(value)
            })
            .unwrap();
        module
            .register_method("payment_queryInfo", |params, _chain, _| {
                let _extrinsic: String = params.one()?;
                Ok::<_, ErrorObjectOwned>(serde_json::json!({
                    "weight": 195952000u64,
                    "class": "normal",
                    "partialFee": PARTIAL_FEE,
                }))
            })
            .unwrap();
        module
            .register_method("author_submitExtrinsic", |params, chain, _| {
                let extrinsic: String = params.one()?;
                let bytes = hex::decode(extrinsic.trim_start_matches("0x")).map_err(|e| {
                    ErrorObjectOwned::owned(-32602, format!("bad extrinsic hex: {e}"), None::<()>)
                })?;
                let hash = blake2_256(&bytes);
                chain.submitted.lock().unwrap().push(bytes);
                Ok::<_, ErrorObjectOwned>(format!("0x{}", hex::encode(hash)))
            })
            .unwrap();

        let handle = server.start(module);
        Self {
            chain,
            url: format!("ws://{addr}"),
            _handle: handle,
        }
    }

    async fn client(&self) -> TransactionClient {
        let rpc = RpcClient::connect(&self.url).await.expect("connect to mock");
        TransactionClient::new(Arc::new(rpc)).with_transfer_indices(TRANSFER_INDICES)
    }
}

fn funded(nonce: u32, free: u128) -> AccountInfo {
    AccountInfo {
        nonce,
        consumers: 0,
        providers: 1,
        data: AccountData {
            free,
            reserved: 0,
            misc_frozen: 0,
            fee_frozen: 0,
        },
    }
}

#[tokio::test]
async fn balance_reads_decoded_free_balance() {
    let wallet = Wallet::from_seed(&[1u8; 32]);
    let node = TestNode::spawn(&[(wallet.account(), funded(3, 5_000_000_000_000))]).await;
    let client = node.client().await;

    let info = client.account_info(&wallet.account()).await.unwrap();
    assert_eq!(info.nonce, 3);
    assert_eq!(
        client.balance(&wallet.account()).await.unwrap(),
        5_000_000_000_000
    );
}

#[tokio::test]
async fn missing_account_decodes_as_zero_state() {
    let node = TestNode::spawn(&[]).await;
    let client = node.client().await;

    let nobody = Account::from_public_key([0xee; 32]);
    let info = client.account_info(&nobody).await.unwrap();
    assert_eq!(info, AccountInfo::default());
    assert_eq!(client.balance(&nobody).await.unwrap(), 0);
}

#[tokio::test]
async fn sign_transfer_end_to_end() {
    let wallet = Wallet::from_seed(&[1u8; 32]);
    let dest = Account::from_public_key([9u8; 32]);
    let amount = 1_000_000_000_000u128;
    let node = TestNode::spawn(&[(wallet.account(), funded(5, 10_000_000_000_000))]).await;
    let client = node.client().await;

    let extrinsic = client
        .sign_transfer(&wallet, &dest, amount, Era::Immortal)
        .await
        .unwrap();

    // The wire bytes decode back into the same envelope.
    let decoded = Extrinsic::decode(&extrinsic.encode()).unwrap();
    assert_eq!(decoded, extrinsic);

    let envelope = decoded.signature.expect("signed extrinsic");
    assert_eq!(envelope.signer, wallet.account());
    assert_eq!(envelope.nonce, 5);
    assert_eq!(envelope.era, Era::Immortal);
    assert_eq!(envelope.tip, 0);

    // The call is exactly the transfer the metadata collaborator would build.
    let expected_call = metadata::encode_transfer(TRANSFER_INDICES, &dest, amount);
    assert_eq!(decoded.call, expected_call);

    // The signature covers the canonical payload for the mock's chain
    // parameters, with the genesis hash in both hash slots.
    let payload = ExtrinsicPayload::new(
        expected_call,
        GENESIS,
        Era::Immortal,
        GENESIS,
        5,
        SPEC_VERSION,
        0,
        TX_VERSION,
    );
    keys::verify(
        &wallet.public_key(),
        &payload.signing_bytes(),
        &envelope.signature,
    )
    .expect("signature verifies against the reconstructed payload");
}

#[tokio::test]
async fn estimate_fee_is_exact() {
    let wallet = Wallet::from_seed(&[1u8; 32]);
    let dest = Account::from_public_key([9u8; 32]);
    let node = TestNode::spawn(&[(wallet.account(), funded(0, 2_000_000_000_000))]).await;
    let client = node.client().await;

    let extrinsic = client
        .sign_transfer(&wallet, &dest, 1_000, Era::Immortal)
        .await
        .unwrap();
    assert_eq!(
        client.estimate_fee(&extrinsic).await.unwrap(),
        123_456_789_012_345
    );
}

#[tokio::test]
async fn sign_and_submit_round_trips_through_the_node() {
    let wallet = Wallet::from_seed(&[7u8; 32]);
    let dest = Account::from_public_key([8u8; 32]);
    let amount = 250_000_000u128;
    let node = TestNode::spawn(&[(wallet.account(), funded(12, 9_000_000_000_000))]).await;
    let client = node.client().await;

    let tx_hash = client
        .sign_and_submit(&wallet, &dest, amount, Era::Immortal)
        .await
        .unwrap();

    let submitted = node.chain.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(tx_hash, blake2_256(&submitted[0]));

    let on_wire = Extrinsic::decode(&submitted[0]).unwrap();
    let envelope = on_wire.signature.expect("signed extrinsic");
    assert_eq!(envelope.nonce, 12);
    assert_eq!(
        on_wire.call,
        metadata::encode_transfer(TRANSFER_INDICES, &dest, amount)
    );
}
