//! Payload types carried on the dashboard topics.
//!
//! The backend serializes these with camelCase member names; every field the
//! frontend actually reads is kept, optional fields are `Option` so older
//! backends that omit them still parse.

use serde::{Deserialize, Serialize};

/// Host machine metrics, pushed on `/topic/machineInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfo {
    /// CPU usage in percent.
    pub cpu_usage: f64,
    /// Free physical memory in bytes.
    pub memory_free: u64,
    /// Total physical memory in bytes.
    pub memory_total: u64,
    /// Free disk space in bytes on the data partition.
    pub free_space: u64,
}

/// Sync progress, embedded in [`BlockchainInfo`] and [`NetworkInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Current sync stage name, e.g. `Complete` or `BlockBodies`.
    pub stage: String,
    /// Items processed in the current stage.
    #[serde(default)]
    pub cur_cnt: Option<u64>,
    /// Known total items in the current stage.
    #[serde(default)]
    pub known_cnt: Option<u64>,
}

/// Chain head summary, pushed on `/topic/blockchainInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainInfo {
    /// Best block number known to the network.
    pub highest_block_number: u64,
    /// Number of the last block imported locally.
    pub last_block_number: u64,
    /// Unix timestamp of the last imported block, in seconds.
    pub last_block_time: u64,
    /// Transaction count of the last imported block.
    pub last_block_transactions: u64,
    /// Difficulty of the last imported block.
    pub difficulty: u64,
    /// Unix timestamp of the last observed refork, if any.
    #[serde(default)]
    pub last_refork_time: Option<u64>,
    /// Estimated network hash rate in hashes per second.
    pub network_hash_rate: u64,
    /// Current gas price in wei.
    pub gas_price: u64,
    /// Sync progress, absent once the node is fully synced.
    #[serde(default)]
    pub sync_status: Option<SyncStatus>,
}

/// Node identity and static versions, pushed once on `/topic/initialInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialInfo {
    /// Dashboard application version.
    pub app_version: String,
    /// Version of the underlying node implementation.
    pub ethereum_j_version: String,
    /// Human-readable network name, e.g. `ropsten`.
    #[serde(default)]
    pub network_name: Option<String>,
    /// Genesis block hash identifying the chain.
    #[serde(default)]
    pub genesis_hash: Option<String>,
    /// Unix timestamp of node start, in milliseconds.
    pub server_start_time: u64,
    /// Public node id (enode key).
    pub node_id: String,
    /// Port the JSON-RPC server listens on, if enabled.
    #[serde(default)]
    pub rpc_port: Option<u16>,
    /// Whether the private key export feature is enabled.
    #[serde(default)]
    pub key_export_enabled: bool,
}

/// Announcement of one imported block, pushed on `/topic/newBlockInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    /// Block number.
    pub block_number: u64,
    /// Hash of this block.
    pub block_hash: String,
    /// Hash of the parent block.
    pub parent_hash: String,
    /// Block difficulty.
    pub difficulty: u64,
}

/// One connected peer, element of the `/topic/peers` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    /// Public node id of the peer.
    pub node_id: String,
    /// Remote IP address.
    pub ip: String,
    /// ISO 3166-1 alpha-3 country code derived from the IP.
    #[serde(default)]
    pub country3_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code derived from the IP.
    #[serde(default)]
    pub country2_code: Option<String>,
    /// Unix timestamp of the last ping, in milliseconds.
    pub last_ping: u64,
    /// Last measured round-trip latency in milliseconds.
    pub ping_latency: f64,
    /// Peer reputation score.
    pub reputation: i64,
    /// Whether the peer is currently connected.
    pub is_active: bool,
}

/// Network reachability summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    /// Count of currently connected peers.
    pub active_peers: u64,
    /// Sync progress, absent once fully synced.
    #[serde(default)]
    pub sync_status: Option<SyncStatus>,
    /// Devp2p listen port.
    pub eth_port: u16,
    /// Whether the listen port is reachable from outside.
    pub eth_accessible: bool,
}

/// One wallet address, element of [`WalletInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddress {
    /// User-assigned label.
    pub name: String,
    /// Hex-encoded public address.
    pub public_address: String,
    /// Balance in wei.
    pub amount: u64,
    /// Whether a keystore file exists for this address.
    pub has_keystore_key: bool,
}

/// Wallet balances, pushed on `/topic/getWalletInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    /// Sum of all tracked balances in wei.
    pub total_amount: u64,
    /// The tracked addresses.
    pub addresses: Vec<WalletAddress>,
}

/// Transaction confirmation event, pushed on `/topic/confirmTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedTransaction {
    /// Transaction hash.
    pub hash: String,
    /// Transferred amount in wei.
    pub amount: u64,
    /// True when a tracked address was the sender, false when receiver.
    pub sending: bool,
}
