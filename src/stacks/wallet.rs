//! Wallet bridge.
//!
//! # Security
//! - Keys never enter this process; signing happens in the external wallet
//! - Sessions carry addresses and public keys only
//! - A write without a signed-in session fails before any network traffic

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use url::Url;

use crate::config::{Network, WalletConfig};
use crate::stacks::client::StacksClient;
use crate::stacks::contract::ContractCall;
use crate::stacks::types::{StacksError, StacksResult, TxId};

/// Addresses of the signed-in account on each network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StxAddresses {
    pub testnet: String,
    pub mainnet: String,
}

/// Identity provided by the wallet after the connect handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub stx_address: StxAddresses,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

impl UserSession {
    pub fn address_for(&self, network: Network) -> &str {
        match network {
            Network::Testnet => &self.stx_address.testnet,
            Network::Mainnet => &self.stx_address.mainnet,
        }
    }
}

/// App details shown by the wallet during connect.
#[derive(Debug, Clone, Serialize)]
pub struct AppDetails {
    pub name: String,
    pub icon: String,
}

/// The wallet: session handshake and transaction submission.
pub trait Wallet: Send + Sync {
    /// The persisted session, if the user is signed in.
    fn load_session(&self) -> impl Future<Output = StacksResult<Option<UserSession>>> + Send;

    /// Run the connect handshake.
    fn connect(&self) -> impl Future<Output = StacksResult<UserSession>> + Send;

    fn sign_out(&self) -> impl Future<Output = StacksResult<()>> + Send;

    /// Sign and broadcast a contract call, returning the transaction id.
    fn submit(&self, call: &ContractCall) -> impl Future<Output = StacksResult<TxId>> + Send;
}

#[derive(Debug, Serialize)]
struct ConnectRequest<'a> {
    app_details: &'a AppDetails,
    redirect_to: &'a str,
}

/// Wire form of a contract call sent to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCallRequest {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: String,
    /// Hex-serialized Clarity values.
    pub function_args: Vec<String>,
    pub network: Network,
    pub anchor_mode: String,
    pub validate_with_abi: bool,
}

impl ContractCallRequest {
    pub fn new(call: &ContractCall, network: Network) -> Self {
        Self {
            contract_address: call.contract_address.clone(),
            contract_name: call.contract_name.clone(),
            function_name: call.function_name.clone(),
            function_args: call.function_args.iter().map(|a| a.to_hex()).collect(),
            network,
            anchor_mode: "any".to_string(),
            validate_with_abi: true,
        }
    }
}

/// Wallet reply: either it broadcast the transaction itself, or it hands
/// back the signed bytes for us to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContractCallResponse {
    Broadcast { txid: String },
    Signed { tx_hex: String },
}

/// [`Wallet`] reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpWallet {
    http: reqwest::Client,
    base_url: Url,
    network: Network,
    app: AppDetails,
    node: StacksClient,
}

impl HttpWallet {
    pub fn new(
        config: &WalletConfig,
        network: Network,
        app: AppDetails,
        node: StacksClient,
    ) -> StacksResult<Self> {
        let mut base_url = Url::parse(&config.signer_url)
            .map_err(|e| StacksError::Wallet(format!("Invalid signer URL '{}': {}", config.signer_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StacksError::Wallet(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(signer_url = %base_url, network = %network, "Wallet bridge initialized");

        Ok(Self {
            http,
            base_url,
            network,
            app,
            node,
        })
    }

    fn url(&self, path: &str) -> StacksResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| StacksError::Wallet(e.to_string()))
    }

    async fn check(response: reqwest::Response) -> StacksResult<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(StacksError::NotAuthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StacksError::Wallet(format!("wallet returned {}: {}", status, body)));
        }
        Ok(response)
    }
}

fn wallet_err(e: reqwest::Error) -> StacksError {
    StacksError::Wallet(e.to_string())
}

impl Wallet for HttpWallet {
    async fn load_session(&self) -> StacksResult<Option<UserSession>> {
        let response = self
            .http
            .get(self.url("session")?)
            .send()
            .await
            .map_err(wallet_err)?;

        if matches!(response.status(), StatusCode::NO_CONTENT | StatusCode::NOT_FOUND) {
            return Ok(None);
        }
        let session = Self::check(response)
            .await?
            .json::<UserSession>()
            .await
            .map_err(wallet_err)?;
        Ok(Some(session))
    }

    async fn connect(&self) -> StacksResult<UserSession> {
        let request = ConnectRequest {
            app_details: &self.app,
            redirect_to: "/",
        };
        let response = self
            .http
            .post(self.url("connect")?)
            .json(&request)
            .send()
            .await
            .map_err(wallet_err)?;

        let session = Self::check(response)
            .await?
            .json::<UserSession>()
            .await
            .map_err(wallet_err)?;
        tracing::info!(address = session.address_for(self.network), "Wallet connected");
        Ok(session)
    }

    async fn sign_out(&self) -> StacksResult<()> {
        let response = self
            .http
            .post(self.url("sign-out")?)
            .send()
            .await
            .map_err(wallet_err)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn submit(&self, call: &ContractCall) -> StacksResult<TxId> {
        let request = ContractCallRequest::new(call, self.network);
        let response = self
            .http
            .post(self.url("contract-call")?)
            .json(&request)
            .send()
            .await
            .map_err(wallet_err)?;

        let reply = Self::check(response)
            .await?
            .json::<ContractCallResponse>()
            .await
            .map_err(wallet_err)?;

        match reply {
            ContractCallResponse::Broadcast { txid } => TxId::parse(&txid),
            ContractCallResponse::Signed { tx_hex } => {
                let raw = hex::decode(tx_hex.trim_start_matches("0x"))
                    .map_err(|e| StacksError::Wallet(format!("invalid signed transaction: {}", e)))?;
                self.node.broadcast_transaction(&raw).await
            }
        }
    }
}
