//! Typed bindings for the `guestbook` and `tipping` Clarity contracts.
//!
//! Reads go through the node's read-only endpoint. Writes are described as
//! [`ContractCall`]s and handed to the wallet, which signs and broadcasts.

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::clarity::{ClarityError, ClarityResult, ClarityValue, StacksAddress};
use crate::config::NetworkConfig;
use crate::stacks::client::StacksClient;
use crate::stacks::types::{StacksError, StacksResult, TransactionStatus, TxId};

/// Error codes returned by the guestbook contract in `(err uN)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractErrorCode {
    MessageNotFound = 1,
    AlreadyLiked = 2,
}

impl ContractErrorCode {
    pub fn from_code(code: u128) -> Option<Self> {
        match code {
            1 => Some(Self::MessageNotFound),
            2 => Some(Self::AlreadyLiked),
            _ => None,
        }
    }

    /// Decode the `tx_result` of an aborted transaction, `{"hex": "0x08.."}`.
    pub fn from_tx_result(result: &serde_json::Value) -> Option<Self> {
        let hex = result.get("hex")?.as_str()?;
        let code = ClarityValue::from_hex(hex).ok()?.into_response().ok()?.err()?;
        Self::from_code(code.as_u128().ok()?)
    }
}

/// A guestbook entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub author: String,
    pub content: String,
    /// Block height at which the message was posted.
    pub timestamp: u64,
    pub likes: u64,
}

impl Message {
    /// Decode the tuple stored under a message id.
    pub fn from_clarity(id: u64, value: &ClarityValue) -> ClarityResult<Self> {
        Ok(Self {
            id,
            author: value.tuple_field("author")?.as_principal()?,
            content: value.tuple_field("content")?.as_str()?.to_string(),
            timestamp: value.tuple_field("timestamp")?.as_u64()?,
            likes: value.tuple_field("likes")?.as_u64()?,
        })
    }
}

/// One tip recorded against a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTip {
    pub tipper: String,
    /// Amount in micro-STX.
    pub amount: u128,
}

/// Aggregate tips sent or received by a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipTotals {
    pub total_amount: u128,
    pub tip_count: u64,
}

/// A public contract function call, ready for the wallet to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: String,
    pub function_args: Vec<ClarityValue>,
}

/// Deployer address and contract names for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractIds {
    pub address: String,
    pub guestbook: String,
    pub tipping: String,
}

impl ContractIds {
    pub fn from_network(network: &NetworkConfig) -> Self {
        Self {
            address: network.contract_address.clone(),
            guestbook: network.contract_name.clone(),
            tipping: network.tipping_contract_name.clone(),
        }
    }

    fn call(&self, contract: &str, function: &str, args: Vec<ClarityValue>) -> ContractCall {
        ContractCall {
            contract_address: self.address.clone(),
            contract_name: contract.to_string(),
            function_name: function.to_string(),
            function_args: args,
        }
    }

    /// `(post-message (content (string-utf8 280)))`
    pub fn post_message(&self, content: &str) -> ContractCall {
        self.call(
            &self.guestbook,
            "post-message",
            vec![ClarityValue::string_utf8(content)],
        )
    }

    /// `(like-message (message-id uint))`
    pub fn like_message(&self, message_id: u64) -> ContractCall {
        self.call(&self.guestbook, "like-message", vec![ClarityValue::uint(message_id)])
    }

    /// `(send-tip (recipient principal) (amount uint) (message-id uint))`
    pub fn send_tip(
        &self,
        recipient: &str,
        amount: u128,
        message_id: u64,
    ) -> ClarityResult<ContractCall> {
        let recipient: StacksAddress = recipient.parse()?;
        Ok(self.call(
            &self.tipping,
            "send-tip",
            vec![
                ClarityValue::StandardPrincipal(recipient),
                ClarityValue::uint(amount),
                ClarityValue::uint(message_id),
            ],
        ))
    }
}

/// Chain reads the store depends on.
///
/// Implemented by [`StacksGuestbook`] against a node, and by in-memory fakes
/// in tests.
pub trait GuestbookChain: Send + Sync {
    fn get_last_message_id(&self) -> impl Future<Output = StacksResult<u64>> + Send;

    fn get_message(&self, id: u64) -> impl Future<Output = StacksResult<Option<Message>>> + Send;

    /// Whether `user` liked message `id`. Lookup failures read as `false`.
    fn has_user_liked(&self, user: &str, id: u64) -> impl Future<Output = bool> + Send;

    /// Tips for a message. Lookup failures read as an empty list.
    fn get_message_tips(&self, id: u64) -> impl Future<Output = Vec<MessageTip>> + Send;

    /// Lookup failures read as zero totals.
    fn get_user_tips_received(&self, user: &str) -> impl Future<Output = TipTotals> + Send;

    /// Lookup failures read as zero totals.
    fn get_user_tips_sent(&self, user: &str) -> impl Future<Output = TipTotals> + Send;

    fn get_transaction_status(
        &self,
        txid: &TxId,
    ) -> impl Future<Output = StacksResult<TransactionStatus>> + Send;

    /// All stored messages, newest first.
    ///
    /// Ids run from 1 to the last id; ids that read back as `none` are skipped.
    fn list_messages(&self) -> impl Future<Output = StacksResult<Vec<Message>>> + Send {
        async move {
            let last_id = self.get_last_message_id().await?;
            if last_id == 0 {
                return Ok(Vec::new());
            }

            let mut messages = Vec::with_capacity(last_id.min(1024) as usize);
            for id in 1..=last_id {
                if let Some(message) = self.get_message(id).await? {
                    messages.push(message);
                }
            }

            sort_newest_first(&mut messages);
            Ok(messages)
        }
    }
}

/// Order by timestamp descending; equal timestamps put the higher id first.
pub fn sort_newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

/// [`GuestbookChain`] backed by a Stacks node.
#[derive(Debug, Clone)]
pub struct StacksGuestbook {
    client: StacksClient,
    ids: ContractIds,
}

impl StacksGuestbook {
    pub fn new(client: StacksClient, ids: ContractIds) -> Self {
        Self { client, ids }
    }

    pub fn client(&self) -> &StacksClient {
        &self.client
    }

    pub fn ids(&self) -> &ContractIds {
        &self.ids
    }

    async fn read(
        &self,
        contract: &str,
        function: &str,
        args: &[ClarityValue],
        sender: &str,
    ) -> StacksResult<ClarityValue> {
        self.client
            .call_read_only(&self.ids.address, contract, function, args, sender)
            .await
    }
}

impl GuestbookChain for StacksGuestbook {
    async fn get_last_message_id(&self) -> StacksResult<u64> {
        let value = self
            .read(&self.ids.guestbook, "get-last-message-id", &[], &self.ids.address)
            .await?;
        Ok(unwrap_ok(value)?.as_u64()?)
    }

    async fn get_message(&self, id: u64) -> StacksResult<Option<Message>> {
        let value = self
            .read(
                &self.ids.guestbook,
                "get-message",
                &[ClarityValue::uint(id)],
                &self.ids.address,
            )
            .await?;
        match value.into_optional()? {
            Some(tuple) => Ok(Some(Message::from_clarity(id, &tuple)?)),
            None => Ok(None),
        }
    }

    async fn has_user_liked(&self, user: &str, id: u64) -> bool {
        let result = async {
            let principal = ClarityValue::principal(user)?;
            let value = self
                .read(
                    &self.ids.guestbook,
                    "has-user-liked",
                    &[principal, ClarityValue::uint(id)],
                    user,
                )
                .await?;
            Ok::<_, StacksError>(value.tuple_field("liked")?.as_bool()?)
        }
        .await;

        result.unwrap_or_else(|e| {
            tracing::error!(user, message_id = id, error = %e, "Error checking if user liked message");
            false
        })
    }

    async fn get_message_tips(&self, id: u64) -> Vec<MessageTip> {
        let result = async {
            let value = self
                .read(
                    &self.ids.tipping,
                    "get-message-tips",
                    &[ClarityValue::uint(id)],
                    &self.ids.address,
                )
                .await?;
            Ok::<_, StacksError>(decode_tips(value)?)
        }
        .await;

        result.unwrap_or_else(|e| {
            tracing::error!(message_id = id, error = %e, "Error fetching message tips");
            Vec::new()
        })
    }

    async fn get_user_tips_received(&self, user: &str) -> TipTotals {
        self.read_totals("get-user-tips-received", user).await
    }

    async fn get_user_tips_sent(&self, user: &str) -> TipTotals {
        self.read_totals("get-user-tips-sent", user).await
    }

    async fn get_transaction_status(&self, txid: &TxId) -> StacksResult<TransactionStatus> {
        self.client.get_transaction_status(txid).await
    }
}

impl StacksGuestbook {
    async fn read_totals(&self, function: &'static str, user: &str) -> TipTotals {
        let result = async {
            let principal = ClarityValue::principal(user)?;
            let value = self.read(&self.ids.tipping, function, &[principal], user).await?;
            Ok::<_, StacksError>(decode_totals(value)?)
        }
        .await;

        result.unwrap_or_else(|e| {
            tracing::error!(user, function, error = %e, "Error fetching user tip totals");
            TipTotals::default()
        })
    }
}

/// Read-only functions may answer `(ok v)` or a bare `v`.
fn unwrap_ok(value: ClarityValue) -> ClarityResult<ClarityValue> {
    match value {
        ClarityValue::ResponseOk(inner) => Ok(*inner),
        ClarityValue::ResponseErr(inner) => Err(ClarityError::TypeMismatch {
            expected: "ok response",
            actual: inner.type_name(),
        }),
        other => Ok(other),
    }
}

/// Accepts a list of `{tipper, amount}` tuples, optionally wrapped in
/// `some`/`ok` or in a `{tips: list}` tuple; `none` is an empty list.
pub fn decode_tips(value: ClarityValue) -> ClarityResult<Vec<MessageTip>> {
    let value = match unwrap_ok(value)? {
        ClarityValue::OptionalNone => return Ok(Vec::new()),
        ClarityValue::OptionalSome(inner) => *inner,
        other => other,
    };
    let list = match &value {
        ClarityValue::Tuple(_) => value.tuple_field("tips")?.as_list()?,
        _ => value.as_list()?,
    };

    list.iter()
        .map(|tip| {
            Ok(MessageTip {
                tipper: tip.tuple_field("tipper")?.as_principal()?,
                amount: tip.tuple_field("amount")?.as_u128()?,
            })
        })
        .collect()
}

/// Accepts a `{total-amount, tip-count}` tuple, optionally wrapped; missing
/// fields and `none` read as zero.
pub fn decode_totals(value: ClarityValue) -> ClarityResult<TipTotals> {
    let value = match unwrap_ok(value)? {
        ClarityValue::OptionalNone => return Ok(TipTotals::default()),
        ClarityValue::OptionalSome(inner) => *inner,
        other => other,
    };

    let total_amount = match value.tuple_field("total-amount") {
        Ok(v) => v.as_u128()?,
        Err(ClarityError::MissingField(_)) => 0,
        Err(e) => return Err(e),
    };
    let tip_count = match value.tuple_field("tip-count") {
        Ok(v) => v.as_u64()?,
        Err(ClarityError::MissingField(_)) => 0,
        Err(e) => return Err(e),
    };
    Ok(TipTotals {
        total_amount,
        tip_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";
    const WALLET_1: &str = "ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5";
    const WALLET_2: &str = "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG";

    fn ids() -> ContractIds {
        ContractIds {
            address: DEPLOYER.to_string(),
            guestbook: "guestbook".to_string(),
            tipping: "tipping".to_string(),
        }
    }

    fn message_tuple(author: &str, content: &str, timestamp: u64, likes: u64) -> ClarityValue {
        ClarityValue::tuple([
            ("author", ClarityValue::principal(author).unwrap()),
            ("content", ClarityValue::string_utf8(content)),
            ("timestamp", ClarityValue::uint(timestamp)),
            ("likes", ClarityValue::uint(likes)),
        ])
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ContractErrorCode::from_code(1), Some(ContractErrorCode::MessageNotFound));
        assert_eq!(ContractErrorCode::from_code(2), Some(ContractErrorCode::AlreadyLiked));
        assert_eq!(ContractErrorCode::from_code(3), None);

        let aborted = serde_json::json!({
            "hex": ClarityValue::err(ClarityValue::uint(2u64)).to_hex(),
            "repr": "(err u2)",
        });
        assert_eq!(
            ContractErrorCode::from_tx_result(&aborted),
            Some(ContractErrorCode::AlreadyLiked)
        );
        let ok = serde_json::json!({ "hex": ClarityValue::ok(ClarityValue::uint(2u64)).to_hex() });
        assert_eq!(ContractErrorCode::from_tx_result(&ok), None);
        assert_eq!(ContractErrorCode::from_tx_result(&serde_json::json!({"repr": "(err u1)"})), None);
    }

    #[test]
    fn test_message_from_clarity() {
        let tuple = message_tuple(WALLET_1, "Hello 🌍! 你好世界 🚀", 17, 2);
        let message = Message::from_clarity(1, &tuple).unwrap();
        assert_eq!(
            message,
            Message {
                id: 1,
                author: WALLET_1.to_string(),
                content: "Hello 🌍! 你好世界 🚀".to_string(),
                timestamp: 17,
                likes: 2,
            }
        );
    }

    #[test]
    fn test_call_builders() {
        let call = ids().like_message(7);
        assert_eq!(call.contract_name, "guestbook");
        assert_eq!(call.function_name, "like-message");
        assert_eq!(call.function_args, vec![ClarityValue::uint(7u64)]);

        let post = ids().post_message("hi");
        assert_eq!(post.function_args, vec![ClarityValue::string_utf8("hi")]);

        let tip = ids().send_tip(WALLET_2, 1_000, 3).unwrap();
        assert_eq!(tip.contract_name, "tipping");
        assert_eq!(tip.function_args.len(), 3);
        assert!(ids().send_tip("nobody", 1, 1).is_err());
    }

    #[test]
    fn test_decode_tips_shapes() {
        let tip = ClarityValue::tuple([
            ("tipper", ClarityValue::principal(WALLET_2).unwrap()),
            ("amount", ClarityValue::uint(500u64)),
        ]);
        let expected = vec![MessageTip {
            tipper: WALLET_2.to_string(),
            amount: 500,
        }];

        let bare = ClarityValue::List(vec![tip.clone()]);
        assert_eq!(decode_tips(bare.clone()).unwrap(), expected);
        assert_eq!(decode_tips(ClarityValue::some(bare.clone())).unwrap(), expected);
        assert_eq!(
            decode_tips(ClarityValue::tuple([("tips", bare)])).unwrap(),
            expected
        );
        assert!(decode_tips(ClarityValue::OptionalNone).unwrap().is_empty());
        assert!(decode_tips(ClarityValue::Bool(true)).is_err());
    }

    #[test]
    fn test_decode_totals_defaults_missing_fields() {
        let partial = ClarityValue::tuple([("total-amount", ClarityValue::uint(42u64))]);
        assert_eq!(
            decode_totals(ClarityValue::ok(partial)).unwrap(),
            TipTotals {
                total_amount: 42,
                tip_count: 0
            }
        );
        assert_eq!(decode_totals(ClarityValue::OptionalNone).unwrap(), TipTotals::default());
    }

    #[test]
    fn test_sort_newest_first() {
        let mk = |id, timestamp| Message {
            id,
            author: WALLET_1.to_string(),
            content: String::new(),
            timestamp,
            likes: 0,
        };
        let mut messages = vec![mk(1, 10), mk(2, 12), mk(3, 12), mk(4, 11)];
        sort_newest_first(&mut messages);
        let ids: Vec<u64> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }
}
