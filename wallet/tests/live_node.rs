//! Tests that require a running Substrate node at ws://127.0.0.1:9944.
//!
//! Run with `cargo test -- --ignored`.

use std::sync::Arc;

use substrate_wallet::{Account, RpcClient, TransactionClient};

const LOCAL_NODE: &str = "ws://127.0.0.1:9944";

#[tokio::test]
#[ignore]
async fn connects_to_local_node() {
    let rpc = RpcClient::connect(LOCAL_NODE).await.expect("connect");
    assert!(rpc.is_connected().await);
}

#[tokio::test]
#[ignore]
async fn reads_chain_parameters() {
    let rpc = RpcClient::connect(LOCAL_NODE).await.expect("connect");
    let version = rpc.runtime_version().await.expect("runtime version");
    assert!(version.spec_version > 0);
    rpc.genesis_hash().await.expect("genesis hash");
    let metadata = rpc.metadata_bytes().await.expect("metadata");
    substrate_wallet::metadata::metadata_version(&metadata).expect("metadata version");
}

#[tokio::test]
#[ignore]
async fn queries_dev_account_state() {
    let rpc = RpcClient::connect(LOCAL_NODE).await.expect("connect");
    let client = TransactionClient::new(Arc::new(rpc));
    // Alice on dev chains.
    let alice = Account::from_ss58("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY")
        .expect("well-known address");
    client.account_info(&alice).await.expect("account info");
}
