//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guestbook.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the guestbook service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuestbookConfig {
    /// Application settings (network selection, message limits, refresh timing).
    pub app: AppConfig,

    /// Per-network contract and API settings.
    pub networks: NetworksConfig,

    /// Stacks node client settings.
    pub node: NodeConfig,

    /// External wallet endpoint.
    pub wallet: WalletConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GuestbookConfig {
    /// Network settings for the network selected in `app.network`.
    pub fn current_network(&self) -> &NetworkConfig {
        match self.app.network {
            Network::Mainnet => &self.networks.mainnet,
            Network::Testnet => &self.networks.testnet,
        }
    }
}

/// Which Stacks network the app talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}

/// Application-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display name, used in page titles.
    pub name: String,

    /// One-line description shown on the about page.
    pub description: String,

    /// Active network.
    pub network: Network,

    /// Maximum message length in characters.
    pub message_max_length: usize,

    /// Auto-refresh interval for the message list in milliseconds.
    pub refresh_interval_ms: u64,

    /// Delay before re-fetching after a submitted transaction, in milliseconds.
    pub refresh_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Stacks Guestbook".to_string(),
            description: "A decentralized message board built on Stacks blockchain".to_string(),
            network: Network::Testnet,
            message_max_length: 280,
            refresh_interval_ms: 60_000,
            refresh_delay_ms: 5_000,
        }
    }
}

/// Settings for both networks.
///
/// A `[networks.*]` table is laid over that network's preset, so a file
/// only needs the fields it changes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "NetworksFile")]
pub struct NetworksConfig {
    pub testnet: NetworkConfig,
    pub mainnet: NetworkConfig,
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            testnet: NetworkConfig::testnet(),
            mainnet: NetworkConfig::mainnet(),
        }
    }
}

impl From<NetworksFile> for NetworksConfig {
    fn from(file: NetworksFile) -> Self {
        Self {
            testnet: file.testnet.apply(NetworkConfig::testnet()),
            mainnet: file.mainnet.apply(NetworkConfig::mainnet()),
        }
    }
}

/// `[networks]` as written in a config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NetworksFile {
    testnet: NetworkOverride,
    mainnet: NetworkOverride,
}

/// Fields set in a `[networks.*]` table; unset fields keep the preset.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NetworkOverride {
    contract_address: Option<String>,
    contract_name: Option<String>,
    tipping_contract_name: Option<String>,
    explorer_url: Option<String>,
    address_url: Option<String>,
    api_url: Option<String>,
    failover_urls: Option<Vec<String>>,
}

impl NetworkOverride {
    fn apply(self, mut preset: NetworkConfig) -> NetworkConfig {
        fn set<T>(field: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *field = value;
            }
        }
        set(&mut preset.contract_address, self.contract_address);
        set(&mut preset.contract_name, self.contract_name);
        set(&mut preset.tipping_contract_name, self.tipping_contract_name);
        set(&mut preset.explorer_url, self.explorer_url);
        set(&mut preset.address_url, self.address_url);
        set(&mut preset.api_url, self.api_url);
        set(&mut preset.failover_urls, self.failover_urls);
        preset
    }
}

/// Contract location and API endpoints for one network.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Deployer address of the guestbook and tipping contracts.
    pub contract_address: String,

    /// Guestbook contract name.
    pub contract_name: String,

    /// Tipping contract name (same deployer).
    pub tipping_contract_name: String,

    /// Explorer URL prefix for transaction ids.
    pub explorer_url: String,

    /// Explorer URL prefix for addresses.
    pub address_url: String,

    /// Node API base URL.
    pub api_url: String,

    /// Failover node API base URLs, tried in order.
    pub failover_urls: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            contract_name: "guestbook".to_string(),
            tipping_contract_name: "tipping".to_string(),
            explorer_url: String::new(),
            address_url: String::new(),
            api_url: String::new(),
            failover_urls: Vec::new(),
        }
    }
}

impl NetworkConfig {
    /// Testnet preset.
    pub fn testnet() -> Self {
        Self {
            contract_address: "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".to_string(),
            explorer_url: "https://explorer.stacks.co/sandbox/txid/".to_string(),
            address_url: "https://explorer.stacks.co/sandbox/address/".to_string(),
            api_url: "https://stacks-node-api.testnet.stacks.co".to_string(),
            ..Self::default()
        }
    }

    /// Mainnet preset. The contract address is left for the deployment to set.
    pub fn mainnet() -> Self {
        Self {
            explorer_url: "https://explorer.stacks.co/txid/".to_string(),
            address_url: "https://explorer.stacks.co/address/".to_string(),
            api_url: "https://stacks-node-api.stacks.co".to_string(),
            ..Self::default()
        }
    }

    /// Explorer link for a transaction.
    pub fn tx_explorer_link(&self, txid: &str) -> String {
        format!("{}{}", self.explorer_url, txid)
    }

    /// Explorer link for an address.
    pub fn address_explorer_link(&self, address: &str) -> String {
        format!("{}{}", self.address_url, address)
    }
}

/// Stacks node client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// External wallet endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Base URL of the wallet/signer service.
    pub signer_url: String,

    /// Per-request timeout in seconds. Connecting may wait on the user.
    pub timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            signer_url: "http://127.0.0.1:8899".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 150 }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,

    /// Default log filter when RUST_LOG is unset.
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
            log_filter: "stacks_guestbook=info,tower_http=info".to_string(),
        }
    }
}
