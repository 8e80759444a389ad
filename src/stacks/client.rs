//! Stacks node API client with timeout and failover handling.
//!
//! # Responsibilities
//! - Connect to the node's REST API (primary + failover URLs)
//! - Query chain state (transaction status, accounts, contract events)
//! - Run read-only contract calls and broadcast signed transactions
//! - Provide health check for node connectivity

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::clarity::ClarityValue;
use crate::config::{NetworkConfig, NodeConfig};
use crate::observability::metrics;
use crate::stacks::types::{
    AccountInfo, NodeInfo, Paginated, ReadOnlyRequest, ReadOnlyResponse, StacksError,
    StacksResult, TransactionStatus, TxId,
};

/// Default page size for account transactions.
pub const DEFAULT_TRANSACTIONS_LIMIT: u32 = 20;

/// Default page size for contract events.
pub const DEFAULT_EVENTS_LIMIT: u32 = 50;

/// Node API client wrapper with failover support.
#[derive(Clone)]
pub struct StacksClient {
    http: reqwest::Client,
    /// Primary URL first, then failovers. Each ends with `/`.
    base_urls: Vec<Url>,
    timeout_secs: u64,
}

impl StacksClient {
    /// Create a new client for the given network.
    ///
    /// The primary URL must parse; invalid failover URLs are skipped.
    pub fn new(network: &NetworkConfig, node: &NodeConfig) -> StacksResult<Self> {
        let mut base_urls = Vec::with_capacity(1 + network.failover_urls.len());
        base_urls.push(parse_base_url(&network.api_url).map_err(|e| {
            StacksError::Rpc(format!("Invalid API URL '{}': {}", network.api_url, e))
        })?);

        for url_str in &network.failover_urls {
            match parse_base_url(url_str) {
                Ok(url) => base_urls.push(url),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover API URL"),
            }
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(node.timeout_secs))
            .build()
            .map_err(|e| StacksError::Rpc(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(
            api_url = %base_urls[0],
            failovers = base_urls.len() - 1,
            timeout_secs = node.timeout_secs,
            "Stacks client initialized"
        );

        Ok(Self {
            http,
            base_urls,
            timeout_secs: node.timeout_secs,
        })
    }

    /// Try each provider in order until one answers without a 5xx.
    async fn execute<F>(&self, endpoint: &'static str, path: &str, build: F) -> StacksResult<Response>
    where
        F: Fn(&reqwest::Client, Url) -> RequestBuilder,
    {
        for (i, base) in self.base_urls.iter().enumerate() {
            let url = base
                .join(path)
                .map_err(|e| StacksError::Rpc(format!("Invalid request path '{}': {}", path, e)))?;

            match build(&self.http, url).send().await {
                Ok(response) if response.status().is_server_error() => {
                    metrics::record_node_request(endpoint, "server_error");
                    tracing::warn!(
                        provider_idx = i,
                        status = %response.status(),
                        endpoint,
                        "API server error, trying next provider"
                    );
                }
                Ok(response) => {
                    metrics::record_node_request(endpoint, "ok");
                    return Ok(response);
                }
                Err(e) if e.is_timeout() => {
                    metrics::record_node_request(endpoint, "timeout");
                    tracing::warn!(
                        provider_idx = i,
                        timeout_secs = self.timeout_secs,
                        endpoint,
                        "API timeout, trying next provider"
                    );
                }
                Err(e) => {
                    metrics::record_node_request(endpoint, "error");
                    tracing::warn!(provider_idx = i, error = %e, endpoint, "API error, trying next provider");
                }
            }
        }
        Err(StacksError::Rpc(format!("All API providers failed for {}", endpoint)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> StacksResult<T> {
        let response = self
            .execute(endpoint, path, |http, url| http.get(url).query(query))
            .await?;
        decode_json(ensure_success(response).await?).await
    }

    /// Get transaction status.
    pub async fn get_transaction_status(&self, txid: &TxId) -> StacksResult<TransactionStatus> {
        self.get_json("tx_status", &format!("extended/v1/tx/{}", txid), &[])
            .await
    }

    /// Get account info (balance, nonce).
    pub async fn get_account_info(&self, address: &str) -> StacksResult<AccountInfo> {
        self.get_json("account_info", &format!("v2/accounts/{}", address), &[])
            .await
    }

    /// Get the most recent transactions of an account.
    pub async fn get_account_transactions(
        &self,
        address: &str,
        limit: u32,
    ) -> StacksResult<Vec<serde_json::Value>> {
        let page: Paginated<serde_json::Value> = self
            .get_json(
                "account_transactions",
                &format!("extended/v1/address/{}/transactions", address),
                &[("limit", limit.to_string()), ("offset", "0".to_string())],
            )
            .await?;
        Ok(page.results)
    }

    /// Get the most recent events emitted by a contract.
    pub async fn get_contract_events(
        &self,
        contract_address: &str,
        contract_name: &str,
        limit: u32,
    ) -> StacksResult<Vec<serde_json::Value>> {
        let page: Paginated<serde_json::Value> = self
            .get_json(
                "contract_events",
                &format!("extended/v1/contract/{}.{}/events", contract_address, contract_name),
                &[("limit", limit.to_string()), ("offset", "0".to_string())],
            )
            .await?;
        Ok(page.results)
    }

    /// Call a read-only contract function.
    pub async fn call_read_only(
        &self,
        contract_address: &str,
        contract_name: &str,
        function_name: &str,
        args: &[ClarityValue],
        sender: &str,
    ) -> StacksResult<ClarityValue> {
        let body = ReadOnlyRequest {
            sender: sender.to_string(),
            arguments: args.iter().map(ClarityValue::to_hex).collect(),
        };
        let path = format!(
            "v2/contracts/call-read/{}/{}/{}",
            contract_address, contract_name, function_name
        );

        let response = self
            .execute("call_read", &path, |http, url| http.post(url).json(&body))
            .await?;
        let reply: ReadOnlyResponse = decode_json(ensure_success(response).await?).await?;

        if !reply.okay {
            let cause = reply.cause.unwrap_or_else(|| "unknown cause".to_string());
            tracing::debug!(function = function_name, cause = %cause, "Read-only call failed");
            return Err(StacksError::ReadOnly(cause));
        }
        let result = reply
            .result
            .ok_or_else(|| StacksError::Decode("read-only reply without result".to_string()))?;
        Ok(ClarityValue::from_hex(&result)?)
    }

    /// Broadcast a signed transaction and return its id.
    pub async fn broadcast_transaction(&self, raw_tx: &[u8]) -> StacksResult<TxId> {
        let body = raw_tx.to_vec();
        let response = self
            .execute("broadcast", "v2/transactions", |http, url| {
                http.post(url)
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(body.clone())
            })
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let reason = response.text().await.unwrap_or_default();
            tracing::warn!(reason = %reason, "Transaction rejected by node");
            return Err(StacksError::Rejected(reason));
        }
        let text = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(|e| StacksError::Decode(e.to_string()))?;
        let txid = TxId::parse(&text)?;
        tracing::info!(txid = %txid, "Transaction broadcast");
        Ok(txid)
    }

    /// Get node info.
    pub async fn get_info(&self) -> StacksResult<NodeInfo> {
        self.get_json("info", "v2/info", &[]).await
    }

    /// Check if the node is reachable and healthy.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_info().await.is_ok();
        metrics::record_node_health(healthy);
        healthy
    }
}

impl std::fmt::Debug for StacksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StacksClient")
            .field("api_url", &self.base_urls[0].as_str())
            .field("failovers", &(self.base_urls.len() - 1))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn ensure_success(response: Response) -> StacksResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(StacksError::Status {
        status: status.as_u16(),
        url,
        body,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> StacksResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| StacksError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_network(api_url: &str) -> NetworkConfig {
        NetworkConfig {
            contract_address: "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".to_string(),
            api_url: api_url.to_string(),
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(
            parse_base_url("http://node:3999").unwrap().join("v2/info").unwrap().as_str(),
            "http://node:3999/v2/info"
        );
        assert_eq!(
            parse_base_url("http://node/api").unwrap().join("v2/info").unwrap().as_str(),
            "http://node/api/v2/info"
        );
    }

    #[test]
    fn test_client_creation() {
        let mut network = test_network("http://localhost:3999");
        network.failover_urls.push("not a url".to_string());
        network.failover_urls.push("http://localhost:4000".to_string());

        let client = StacksClient::new(&network, &NodeConfig::default()).unwrap();
        assert_eq!(client.base_urls.len(), 2);
    }

    #[test]
    fn test_invalid_primary_url() {
        let result = StacksClient::new(&test_network("::"), &NodeConfig::default());
        assert!(matches!(result, Err(StacksError::Rpc(_))));
    }

    #[tokio::test]
    async fn test_api_failover_exhausted() {
        let mut network = test_network("http://127.0.0.1:1");
        network.failover_urls.push("http://127.0.0.1:2".to_string());

        let client = StacksClient::new(&network, &NodeConfig { timeout_secs: 2 }).unwrap();
        let result = client.get_info().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("All API providers failed"));
        assert!(!client.is_healthy().await);
    }
}
