//! Store state types and errors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::clarity::ClarityError;
use crate::stacks::{Message, StacksError, TxId};

/// Shown when loading the message list fails.
pub const LOAD_MESSAGES_ERROR: &str = "Failed to load messages. Please try again.";
/// Shown when posting a message fails.
pub const POST_MESSAGE_ERROR: &str = "Failed to post message. Please try again.";
/// Shown when liking a message fails.
pub const LIKE_MESSAGE_ERROR: &str = "Failed to like message. Please try again.";
/// Shown when sending a tip fails.
pub const SEND_TIP_ERROR: &str = "Failed to send tip. Please try again.";

/// Errors surfaced by store actions.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("Message cannot be empty")]
    EmptyContent,

    #[error("Message is {length} characters; the limit is {max}")]
    ContentTooLong { length: usize, max: usize },

    #[error("Message {0} already liked")]
    AlreadyLiked(u64),

    #[error("Message {0} not found")]
    MessageNotFound(u64),

    #[error("Tip amount must be greater than zero")]
    InvalidAmount,

    #[error(transparent)]
    Stacks(#[from] StacksError),
}

impl From<ClarityError> for StoreError {
    fn from(e: ClarityError) -> Self {
        StoreError::Stacks(StacksError::Clarity(e))
    }
}

impl StoreError {
    /// Rejected before anything was sent to the wallet.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::EmptyContent
                | StoreError::ContentTooLong { .. }
                | StoreError::AlreadyLiked(_)
                | StoreError::InvalidAmount
        )
    }
}

/// Result type for store actions.
pub type StoreResult<T> = Result<T, StoreError>;

/// What a pending transaction does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingKind {
    Post { content: String },
    Like { message_id: u64 },
    /// `amount` in micro-STX.
    Tip { message_id: u64, recipient: String, amount: u64 },
}

impl PendingKind {
    pub fn label(&self) -> &'static str {
        match self {
            PendingKind::Post { .. } => "post",
            PendingKind::Like { .. } => "like",
            PendingKind::Tip { .. } => "tip",
        }
    }
}

/// A submitted write whose outcome is not yet known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: TxId,
    #[serde(flatten)]
    pub kind: PendingKind,
    /// Submission time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl PendingTransaction {
    pub fn new(id: TxId, kind: PendingKind) -> Self {
        Self {
            id,
            kind,
            timestamp_ms: now_ms(),
        }
    }
}

/// Point-in-time copy of the message store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub messages: Vec<Message>,
    pub loading: bool,
    pub error: Option<String>,
    pub user_likes: BTreeMap<u64, bool>,
    pub pending_transactions: Vec<PendingTransaction>,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
