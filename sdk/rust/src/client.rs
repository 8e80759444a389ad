use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Error from the guestbook API or the transport.
#[derive(Debug, Error)]
pub enum SdkError {
    /// The server answered with a non-success status and `{"error": ...}`.
    #[error("guestbook returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub version: String,
    pub network: String,
    pub contract: String,
    pub node_healthy: bool,
    pub authenticated: bool,
    pub pending_transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub author: String,
    pub content: String,
    pub timestamp: u64,
    pub likes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub loading: bool,
    pub error: Option<String>,
    pub user_likes: BTreeMap<u64, bool>,
    pub pending_transactions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub txid: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub tipper: String,
    pub amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tips {
    pub message_id: u64,
    pub tips: Vec<Tip>,
    pub total_amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    pub address: Option<String>,
    #[serde(default)]
    pub session: Option<Value>,
}

/// Thin typed wrapper over the `/api` routes.
pub struct GuestbookClient {
    client: Client,
    base_url: String,
}

impl GuestbookClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> SdkResult<T> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(SdkError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json::<T>().await?)
    }

    pub async fn status(&self) -> SdkResult<Status> {
        self.send(self.client.get(self.url("/status"))).await
    }

    /// The message list; `refresh` re-reads the chain first.
    pub async fn messages(&self, refresh: bool) -> SdkResult<MessageList> {
        self.send(
            self.client
                .get(self.url("/messages"))
                .query(&[("refresh", refresh)]),
        )
        .await
    }

    pub async fn post_message(&self, content: &str) -> SdkResult<TxReceipt> {
        self.send(
            self.client
                .post(self.url("/messages"))
                .json(&json!({ "content": content })),
        )
        .await
    }

    pub async fn like_message(&self, id: u64) -> SdkResult<TxReceipt> {
        self.send(self.client.post(self.url(&format!("/messages/{}/like", id))))
            .await
    }

    pub async fn tips(&self, id: u64) -> SdkResult<Tips> {
        self.send(self.client.get(self.url(&format!("/messages/{}/tips", id))))
            .await
    }

    /// Tip the author of message `id`, in micro-STX.
    pub async fn send_tip(&self, id: u64, amount: u64) -> SdkResult<TxReceipt> {
        self.send(
            self.client
                .post(self.url(&format!("/messages/{}/tips", id)))
                .json(&json!({ "amount": amount })),
        )
        .await
    }

    /// Pending transactions; `check` polls the node first.
    pub async fn pending(&self, check: bool) -> SdkResult<Vec<Value>> {
        self.send(self.client.get(self.url("/pending")).query(&[("check", check)]))
            .await
    }

    pub async fn session(&self) -> SdkResult<Session> {
        self.send(self.client.get(self.url("/session"))).await
    }

    pub async fn connect(&self) -> SdkResult<Session> {
        self.send(self.client.post(self.url("/session"))).await
    }

    pub async fn disconnect(&self) -> SdkResult<Session> {
        self.send(self.client.delete(self.url("/session"))).await
    }

    pub async fn account(&self, address: &str) -> SdkResult<Value> {
        self.send(self.client.get(self.url(&format!("/accounts/{}", address))))
            .await
    }

    pub async fn account_transactions(&self, address: &str, limit: Option<u32>) -> SdkResult<Vec<Value>> {
        let mut request = self
            .client
            .get(self.url(&format!("/accounts/{}/transactions", address)));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        self.send(request).await
    }

    pub async fn events(&self, limit: Option<u32>) -> SdkResult<Vec<Value>> {
        let mut request = self.client.get(self.url("/events"));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = GuestbookClient::new("http://localhost:8080/");
        assert_eq!(client.url("/messages"), "http://localhost:8080/api/messages");
    }

    #[test]
    fn test_message_list_decodes_string_keys() {
        let list: MessageList = serde_json::from_str(
            r#"{"messages":[],"loading":false,"error":null,"user_likes":{"3":true},"pending_transactions":[]}"#,
        )
        .unwrap();
        assert_eq!(list.user_likes.get(&3), Some(&true));
    }

    #[test]
    fn test_api_error_display() {
        let err = SdkError::Api {
            status: 401,
            message: "User not authenticated".to_string(),
        };
        assert_eq!(err.to_string(), "guestbook returned 401: User not authenticated");
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = GuestbookClient::new("http://127.0.0.1:1");
        assert!(matches!(client.status().await, Err(SdkError::Http(_))));
    }
}
