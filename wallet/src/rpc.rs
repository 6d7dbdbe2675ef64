//! WebSocket JSON-RPC client for Substrate nodes.
//!
//! Thin typed wrappers over the node's RPC surface. Every failure maps to
//! [`WalletError::Rpc`] except response-shape problems, which are
//! [`WalletError::Parse`]. Nothing here retries a failed request; the
//! connection itself is re-established (with bounded attempts) when a call
//! finds it dropped.

use std::sync::Arc;
use std::time::Duration;

use jsonrpsee::core::client::ClientT;
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::WalletError;

/// Configuration for the RPC client.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// WebSocket endpoint URL (e.g., "ws://127.0.0.1:9944")
    pub endpoint: String,
    /// Connection timeout
    pub connection_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
    /// Maximum number of reconnection attempts
    pub max_reconnect_attempts: u32,
    /// Delay between reconnection attempts
    pub reconnect_delay: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:9944".to_string(),
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

impl RpcConfig {
    /// Create config with custom endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }
}

/// Runtime version report from `state_getRuntimeVersion`.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_version: u32,
    pub transaction_version: u32,
}

/// WebSocket JSON-RPC client for a Substrate node.
pub struct RpcClient {
    client: Arc<RwLock<WsClient>>,
    config: RpcConfig,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("RpcClient")
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

impl RpcClient {
    /// Connect to a node.
    pub async fn connect(endpoint: &str) -> Result<Self, WalletError> {
        let config = RpcConfig::with_endpoint(endpoint);
        Self::connect_with_config(config).await
    }

    /// Connect with custom configuration.
    pub async fn connect_with_config(config: RpcConfig) -> Result<Self, WalletError> {
        let client = Self::build_client(&config).await?;
        Ok(Self {
            client: Arc::new(RwLock::new(client)),
            config,
        })
    }

    async fn build_client(config: &RpcConfig) -> Result<WsClient, WalletError> {
        WsClientBuilder::default()
            .connection_timeout(config.connection_timeout)
            .request_timeout(config.request_timeout)
            .build(&config.endpoint)
            .await
            .map_err(|e| {
                WalletError::Rpc(format!("failed to connect to {}: {}", config.endpoint, e))
            })
    }

    /// Ensure the connection is alive, reconnect if needed.
    async fn ensure_connected(&self) -> Result<(), WalletError> {
        let client = self.client.read().await;
        if client.is_connected() {
            return Ok(());
        }
        drop(client);

        let mut attempts = 0;
        loop {
            attempts += 1;
            match Self::build_client(&self.config).await {
                Ok(new_client) => {
                    let mut client = self.client.write().await;
                    *client = new_client;
                    tracing::debug!(endpoint = %self.config.endpoint, "reconnected");
                    return Ok(());
                }
                Err(e) => {
                    if attempts >= self.config.max_reconnect_attempts {
                        return Err(e);
                    }
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
            }
        }
    }

    /// Check if connected to the node.
    pub async fn is_connected(&self) -> bool {
        let client = self.client.read().await;
        client.is_connected()
    }

    /// Get the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Hash of the genesis block.
    pub async fn genesis_hash(&self) -> Result<[u8; 32], WalletError> {
        self.ensure_connected().await?;
        let client = self.client.read().await;
        let hash: Option<String> = client
            .request("chain_getBlockHash", rpc_params![0u32])
            .await
            .map_err(|e| WalletError::Rpc(format!("chain_getBlockHash(0) failed: {e}")))?;
        let hash = hash.ok_or_else(|| WalletError::Rpc("node reported no genesis block".into()))?;
        hex_to_hash(&hash)
    }

    /// Spec and transaction version of the runtime.
    pub async fn runtime_version(&self) -> Result<RuntimeVersion, WalletError> {
        self.ensure_connected().await?;
        let client = self.client.read().await;
        client
            .request("state_getRuntimeVersion", rpc_params![])
            .await
            .map_err(|e| WalletError::Rpc(format!("state_getRuntimeVersion failed: {e}")))
    }

    /// Runtime spec version.
    pub async fn spec_version(&self) -> Result<u32, WalletError> {
        Ok(self.runtime_version().await?.spec_version)
    }

    /// Runtime transaction version.
    pub async fn transaction_version(&self) -> Result<u32, WalletError> {
        Ok(self.runtime_version().await?.transaction_version)
    }

    /// Raw runtime metadata blob.
    pub async fn metadata_bytes(&self) -> Result<Vec<u8>, WalletError> {
        self.ensure_connected().await?;
        let client = self.client.read().await;
        let metadata: String = client
            .request("state_getMetadata", rpc_params![])
            .await
            .map_err(|e| WalletError::Rpc(format!("state_getMetadata failed: {e}")))?;
        hex_to_bytes(&metadata)
    }

    /// Raw storage bytes under `key`, or `None` if the entry does not exist.
    pub async fn storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>, WalletError> {
        self.ensure_connected().await?;
        let client = self.client.read().await;
        let key_hex = format!("0x{}", hex::encode(key));
        tracing::trace!(key = %key_hex, "querying storage");
        let value: Option<String> = client
            .request("state_getStorage", rpc_params![key_hex])
            .await
            .map_err(|e| WalletError::Rpc(format!("state_getStorage failed: {e}")))?;
        value.map(|v| hex_to_bytes(&v)).transpose()
    }

    /// Fee the node would charge for `extrinsic`, from `payment_queryInfo`.
    pub async fn estimate_fee(&self, extrinsic: &[u8]) -> Result<u128, WalletError> {
        self.ensure_connected().await?;
        let client = self.client.read().await;
        let extrinsic_hex = format!("0x{}", hex::encode(extrinsic));
        let info: serde_json::Value = client
            .request("payment_queryInfo", rpc_params![extrinsic_hex])
            .await
            .map_err(|e| WalletError::Rpc(format!("payment_queryInfo failed: {e}")))?;
        let fee = parse_partial_fee(&info)?;
        tracing::debug!(%fee, "fee estimated");
        Ok(fee)
    }

    /// Submit a SCALE-encoded signed extrinsic; returns the transaction hash
    /// the node assigns. Fire-and-forget: inclusion is not tracked.
    pub async fn submit_extrinsic(&self, extrinsic: &[u8]) -> Result<[u8; 32], WalletError> {
        self.ensure_connected().await?;
        let client = self.client.read().await;
        let extrinsic_hex = format!("0x{}", hex::encode(extrinsic));
        let tx_hash: String = client
            .request("author_submitExtrinsic", rpc_params![extrinsic_hex])
            .await
            .map_err(|e| WalletError::Rpc(format!("author_submitExtrinsic failed: {e}")))?;
        let tx_hash = hex_to_hash(&tx_hash)?;
        tracing::info!(tx_hash = %hex::encode(tx_hash), "extrinsic submitted");
        Ok(tx_hash)
    }
}

fn hex_to_bytes(value: &str) -> Result<Vec<u8>, WalletError> {
    Ok(hex::decode(value.trim_start_matches("0x"))?)
}

fn hex_to_hash(value: &str) -> Result<[u8; 32], WalletError> {
    hex_to_bytes(value)?
        .try_into()
        .map_err(|bytes: Vec<u8>| {
            WalletError::Parse(format!("expected 32-byte hash, found {}", bytes.len()))
        })
}

/// Extract `partialFee` from a `payment_queryInfo` response.
///
/// Nodes serialize it as a decimal string, a `0x`-prefixed hex string, or a
/// bare number depending on magnitude and version.
fn parse_partial_fee(info: &serde_json::Value) -> Result<u128, WalletError> {
    let fee = info
        .get("partialFee")
        .ok_or_else(|| WalletError::Parse("fee response missing partialFee".into()))?;
    match fee {
        serde_json::Value::String(s) => {
            if let Some(digits) = s.strip_prefix("0x") {
                u128::from_str_radix(digits, 16)
                    .map_err(|e| WalletError::Parse(format!("bad hex fee {s}: {e}")))
            } else {
                s.parse::<u128>()
                    .map_err(|e| WalletError::Parse(format!("bad fee {s}: {e}")))
            }
        }
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| WalletError::Parse(format!("bad numeric fee {n}"))),
        other => Err(WalletError::Parse(format!(
            "unexpected partialFee shape: {other}"
        ))),
    }
}
