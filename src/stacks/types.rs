//! Node API types and error definitions.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

use crate::clarity::ClarityError;

/// Errors that can occur while talking to the node or the wallet.
#[derive(Debug, Error)]
pub enum StacksError {
    /// Every API provider failed for a request.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The node answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },

    /// A read-only contract call returned `okay: false`.
    #[error("Read-only call failed: {0}")]
    ReadOnly(String),

    /// The node rejected a broadcast transaction.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// A response body could not be interpreted.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Clarity error: {0}")]
    Clarity(#[from] ClarityError),

    /// The wallet endpoint failed or refused.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// A write was attempted without a signed-in session.
    #[error("User not authenticated")]
    NotAuthenticated,
}

impl StacksError {
    /// Whether the node reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StacksError::Status { status: 404, .. })
    }
}

/// Result type for node operations.
pub type StacksResult<T> = Result<T, StacksError>;

/// Transaction id, stored as lowercase hex without the `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxId(String);

impl TxId {
    pub fn parse(raw: &str) -> StacksResult<Self> {
        let trimmed = raw.trim().trim_matches('"');
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StacksError::Decode(format!("invalid transaction id '{}'", raw)));
        }
        Ok(Self(hex_part.to_ascii_lowercase()))
    }

    /// Hex without prefix.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0)
    }
}

impl TryFrom<String> for TxId {
    type Error = StacksError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TxId::parse(&value)
    }
}

impl From<TxId> for String {
    fn from(id: TxId) -> Self {
        id.to_string()
    }
}

/// Status reported by the node for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TxStatus {
    Pending,
    Success,
    AbortByResponse,
    AbortByPostCondition,
    /// Any of the `dropped_*` statuses.
    Dropped(String),
    Other(String),
}

impl TxStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Success => "success",
            TxStatus::AbortByResponse => "abort_by_response",
            TxStatus::AbortByPostCondition => "abort_by_post_condition",
            TxStatus::Dropped(s) | TxStatus::Other(s) => s,
        }
    }

    /// The transaction was mined but its effects were rolled back.
    pub fn is_aborted(&self) -> bool {
        matches!(self, TxStatus::AbortByResponse | TxStatus::AbortByPostCondition)
    }
}

impl From<String> for TxStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => TxStatus::Pending,
            "success" => TxStatus::Success,
            "abort_by_response" => TxStatus::AbortByResponse,
            "abort_by_post_condition" => TxStatus::AbortByPostCondition,
            s if s.starts_with("dropped_") => TxStatus::Dropped(value),
            _ => TxStatus::Other(value),
        }
    }
}

impl From<TxStatus> for String {
    fn from(status: TxStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subset of `/extended/v1/tx/{txid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub tx_id: String,
    pub tx_status: TxStatus,
    #[serde(default)]
    pub tx_type: Option<String>,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub tx_result: Option<serde_json::Value>,
}

/// `/v2/accounts/{address}` with balances decoded from hex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountInfo {
    #[serde(deserialize_with = "hex_u128")]
    pub balance: u128,
    #[serde(deserialize_with = "hex_u128", default)]
    pub locked: u128,
    #[serde(default)]
    pub unlock_height: u64,
    pub nonce: u64,
}

fn hex_u128<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let digits = raw.strip_prefix("0x").unwrap_or(&raw);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(serde::de::Error::custom)
}

/// Body of `/v2/contracts/call-read/...` responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadOnlyResponse {
    pub okay: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
}

/// Body of `/v2/contracts/call-read/...` requests.
#[derive(Debug, Clone, Serialize)]
pub struct ReadOnlyRequest {
    pub sender: String,
    pub arguments: Vec<String>,
}

/// Paginated list from the extended API.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
}

/// Subset of `/v2/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub server_version: String,
    #[serde(default)]
    pub network_id: u32,
    pub stacks_tip_height: u64,
    #[serde(default)]
    pub burn_block_height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "0x8f1e2d3c4b5a69788f1e2d3c4b5a69788f1e2d3c4b5a69788f1e2d3c4b5a6978";

    #[test]
    fn test_txid_normalization() {
        let a = TxId::parse(TXID).unwrap();
        let b = TxId::parse(&TXID[2..].to_uppercase()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), TXID);

        // Broadcast responses are JSON strings.
        let quoted = TxId::parse(&format!("\"{}\"\n", &TXID[2..])).unwrap();
        assert_eq!(quoted, a);
    }

    #[test]
    fn test_txid_rejects_garbage() {
        assert!(TxId::parse("0x1234").is_err());
        assert!(TxId::parse(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_tx_status_parsing() {
        assert_eq!(TxStatus::from("success".to_string()), TxStatus::Success);
        assert!(TxStatus::from("abort_by_post_condition".to_string()).is_aborted());
        assert_eq!(
            TxStatus::from("dropped_replace_by_fee".to_string()),
            TxStatus::Dropped("dropped_replace_by_fee".to_string())
        );
        assert!(!TxStatus::Pending.is_aborted());
    }

    #[test]
    fn test_transaction_status_json() {
        let json = format!(
            r#"{{"tx_id":"{}","tx_status":"abort_by_response","tx_type":"contract_call","block_height":120}}"#,
            TXID
        );
        let status: TransactionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status.tx_status, TxStatus::AbortByResponse);
        assert_eq!(status.block_height, Some(120));
    }

    #[test]
    fn test_account_info_hex_balance() {
        let json = r#"{"balance":"0x0000000000000000000000000000f4240","locked":"0x00","unlock_height":0,"nonce":7,"balance_proof":"","nonce_proof":""}"#;
        let info: AccountInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.balance, 1_000_000);
        assert_eq!(info.locked, 0);
        assert_eq!(info.nonce, 7);
    }

    #[test]
    fn test_error_display() {
        let err = StacksError::Status {
            status: 404,
            url: "http://node/extended/v1/tx/abc".to_string(),
            body: "not found".to_string(),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("HTTP 404"));
        assert_eq!(StacksError::NotAuthenticated.to_string(), "User not authenticated");
    }
}
