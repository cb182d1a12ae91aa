//! Well-known STOMP destinations exposed by the node dashboard backend.

use std::fmt;

/// A subscribable server-push topic.
///
/// Each variant maps to exactly one `/topic/...` destination. The subscription
/// manager keys its handle table by `Topic`, which is what enforces the
/// at-most-one-subscription-per-topic rule at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Host machine metrics: CPU, memory, disk.
    MachineInfo,
    /// Chain head summary: best block, difficulty, sync stage.
    BlockchainInfo,
    /// One-shot node identity and version info sent on connect.
    InitialInfo,
    /// Announcement of each newly imported block.
    NewBlockInfo,
    /// Streaming log lines from the node.
    SystemLog,
    /// Current peer list with latency and reputation.
    Peers,
    /// Per-method JSON-RPC usage counters.
    RpcUsage,
    /// Wallet balances for the tracked addresses.
    WalletInfo,
    /// Confirmation events for transactions sent from the wallet.
    ConfirmTransaction,
}

impl Topic {
    /// The STOMP destination this topic is delivered on.
    pub fn destination(&self) -> &'static str {
        match self {
            Topic::MachineInfo => "/topic/machineInfo",
            Topic::BlockchainInfo => "/topic/blockchainInfo",
            Topic::InitialInfo => "/topic/initialInfo",
            Topic::NewBlockInfo => "/topic/newBlockInfo",
            Topic::SystemLog => "/topic/systemLog",
            Topic::Peers => "/topic/peers",
            Topic::RpcUsage => "/topic/rpcUsage",
            Topic::WalletInfo => "/topic/getWalletInfo",
            Topic::ConfirmTransaction => "/topic/confirmTransaction",
        }
    }

    /// Reverse lookup from a wire destination, for dispatching MESSAGE frames.
    pub fn from_destination(destination: &str) -> Option<Self> {
        Some(match destination {
            "/topic/machineInfo" => Topic::MachineInfo,
            "/topic/blockchainInfo" => Topic::BlockchainInfo,
            "/topic/initialInfo" => Topic::InitialInfo,
            "/topic/newBlockInfo" => Topic::NewBlockInfo,
            "/topic/systemLog" => Topic::SystemLog,
            "/topic/peers" => Topic::Peers,
            "/topic/rpcUsage" => Topic::RpcUsage,
            "/topic/getWalletInfo" => Topic::WalletInfo,
            "/topic/confirmTransaction" => Topic::ConfirmTransaction,
            _ => return None,
        })
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.destination())
    }
}

/// Application-bound destinations the dashboard SENDs to.
///
/// These are fire-and-forget pokes: the server replies on the matching topic,
/// not in-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppDestination {
    /// Request an immediate machine metrics snapshot.
    MachineInfo,
    /// Request the current system log tail.
    CurrentSystemLogs,
}

impl AppDestination {
    /// The STOMP destination this request is sent to.
    pub fn destination(&self) -> &'static str {
        match self {
            AppDestination::MachineInfo => "/app/machineInfo",
            AppDestination::CurrentSystemLogs => "/app/currentSystemLogs",
        }
    }
}

impl fmt::Display for AppDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.destination())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TOPICS: [Topic; 9] = [
        Topic::MachineInfo,
        Topic::BlockchainInfo,
        Topic::InitialInfo,
        Topic::NewBlockInfo,
        Topic::SystemLog,
        Topic::Peers,
        Topic::RpcUsage,
        Topic::WalletInfo,
        Topic::ConfirmTransaction,
    ];

    #[test]
    fn destinations_round_trip() {
        for topic in ALL_TOPICS {
            assert_eq!(Topic::from_destination(topic.destination()), Some(topic));
        }
    }

    #[test]
    fn unknown_destination_is_none() {
        assert_eq!(Topic::from_destination("/topic/unknownThing"), None);
        assert_eq!(Topic::from_destination("/app/machineInfo"), None);
    }

    #[test]
    fn wallet_topic_uses_get_prefixed_destination() {
        assert_eq!(Topic::WalletInfo.destination(), "/topic/getWalletInfo");
    }
}
