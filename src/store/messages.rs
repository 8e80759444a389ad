//! Message list, likes and pending transactions.
//!
//! Writes go to the wallet and are recorded as pending entries. A refresh
//! scheduled after each write re-reads the chain and reconciles the entries.

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::observability::metrics;
use crate::stacks::{ContractIds, GuestbookChain, Message, TxId, Wallet};
use crate::store::auth::AuthStore;
use crate::store::reconcile::{self, Reconciliation};
use crate::store::types::{
    MessageSnapshot, PendingKind, PendingTransaction, StoreError, StoreResult,
    LIKE_MESSAGE_ERROR, LOAD_MESSAGES_ERROR, POST_MESSAGE_ERROR, SEND_TIP_ERROR,
};
use crate::store::LoadingGuard;

/// Limits and timing for store actions.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub message_max_length: usize,
    /// Wait before re-fetching after a submitted write.
    pub refresh_delay: Duration,
}

impl StoreSettings {
    pub fn from_config(app: &AppConfig) -> Self {
        Self {
            message_max_length: app.message_max_length,
            refresh_delay: Duration::from_millis(app.refresh_delay_ms),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Reject blank messages and messages over `max` characters.
pub fn validate_content(content: &str, max: usize) -> StoreResult<()> {
    if content.trim().is_empty() {
        return Err(StoreError::EmptyContent);
    }
    let length = content.chars().count();
    if length > max {
        return Err(StoreError::ContentTooLong { length, max });
    }
    Ok(())
}

#[derive(Debug, Default)]
struct MessageState {
    messages: Vec<Message>,
    error: Option<String>,
    pending_transactions: Vec<PendingTransaction>,
}

struct StoreInner<C, W> {
    chain: C,
    auth: AuthStore<W>,
    ids: ContractIds,
    settings: StoreSettings,
    state: RwLock<MessageState>,
    loading: AtomicBool,
    user_likes: DashMap<u64, bool>,
    /// Address the entries in `user_likes` belong to.
    likes_owner: ArcSwapOption<String>,
}

/// Message store, shared by cloning.
pub struct MessageStore<C, W> {
    inner: Arc<StoreInner<C, W>>,
}

impl<C, W> Clone for MessageStore<C, W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, W> MessageStore<C, W>
where
    C: GuestbookChain + 'static,
    W: Wallet + 'static,
{
    pub fn new(chain: C, auth: AuthStore<W>, ids: ContractIds, settings: StoreSettings) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                chain,
                auth,
                ids,
                settings,
                state: RwLock::new(MessageState::default()),
                loading: AtomicBool::new(false),
                user_likes: DashMap::new(),
                likes_owner: ArcSwapOption::empty(),
            }),
        }
    }

    pub fn chain(&self) -> &C {
        &self.inner.chain
    }

    pub fn auth(&self) -> &AuthStore<W> {
        &self.inner.auth
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.inner.settings
    }

    // ---- getters ----

    pub async fn snapshot(&self) -> MessageSnapshot {
        self.sync_likes_owner();
        let state = self.inner.state.read().await;
        MessageSnapshot {
            messages: state.messages.clone(),
            loading: self.is_loading(),
            error: state.error.clone(),
            user_likes: self
                .inner
                .user_likes
                .iter()
                .map(|entry| (*entry.key(), *entry.value()))
                .collect(),
            pending_transactions: state.pending_transactions.clone(),
        }
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.state.read().await.messages.clone()
    }

    pub async fn message(&self, id: u64) -> Option<Message> {
        self.inner
            .state
            .read()
            .await
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.state.read().await.error.clone()
    }

    pub fn has_user_liked(&self, message_id: u64) -> bool {
        self.sync_likes_owner();
        self.inner
            .user_likes
            .get(&message_id)
            .map(|liked| *liked)
            .unwrap_or(false)
    }

    pub async fn pending_transactions(&self) -> Vec<PendingTransaction> {
        self.inner.state.read().await.pending_transactions.clone()
    }

    // ---- actions ----

    /// Reload the message list and the signed-in user's likes, then
    /// reconcile pending transactions. Failures land in the error field.
    pub async fn fetch_messages(&self) {
        let _loading = LoadingGuard::start(&self.inner.loading);
        self.set_error(None).await;

        if let Err(e) = self.load_messages().await {
            tracing::error!(error = %e, "Error fetching messages");
            self.set_error(Some(LOAD_MESSAGES_ERROR.to_string())).await;
        }
    }

    async fn load_messages(&self) -> StoreResult<()> {
        let messages = self.inner.chain.list_messages().await?;
        metrics::record_messages_fetched(messages.len());
        tracing::debug!(count = messages.len(), "Messages fetched");
        self.set_messages(messages.clone()).await;

        self.sync_likes_owner();
        if let Some(user) = self.inner.auth.user_address() {
            for message in &messages {
                if self.inner.chain.has_user_liked(&user, message.id).await {
                    self.set_user_liked(message.id, true);
                }
            }
        }

        self.check_pending_transactions().await;
        Ok(())
    }

    /// Poll the status of every pending transaction once.
    pub async fn check_pending_transactions(&self) {
        let pending = self.pending_transactions().await;
        if pending.is_empty() {
            return;
        }

        for tx in &pending {
            let lookup = self.inner.chain.get_transaction_status(&tx.id).await;
            let outcome = reconcile::process_status(tx, &lookup);

            if !outcome.removes_entry() {
                continue;
            }
            match &outcome {
                Reconciliation::Failed { status, .. } => {
                    metrics::record_tx_outcome(tx.kind.label(), status.as_str())
                }
                _ => metrics::record_tx_outcome(tx.kind.label(), "success"),
            }

            self.remove_pending_transaction(&tx.id).await;
            if let Some(message) = outcome.error_message() {
                self.set_error(Some(message)).await;
            }
        }
    }

    /// Post a new message.
    pub async fn create_message(&self, content: &str) -> StoreResult<TxId> {
        let _loading = LoadingGuard::start(&self.inner.loading);
        self.set_error(None).await;

        match self.submit_post(content).await {
            Ok(txid) => Ok(txid),
            Err(e) => {
                tracing::error!(error = %e, "Error creating message");
                self.set_error(Some(POST_MESSAGE_ERROR.to_string())).await;
                Err(e)
            }
        }
    }

    async fn submit_post(&self, content: &str) -> StoreResult<TxId> {
        self.require_user()?;
        validate_content(content, self.inner.settings.message_max_length)?;

        let call = self.inner.ids.post_message(content);
        let txid = self.inner.auth.wallet().submit(&call).await?;
        tracing::info!(txid = %txid, "Message submitted");

        self.add_pending_transaction(PendingTransaction::new(
            txid.clone(),
            PendingKind::Post {
                content: content.to_string(),
            },
        ))
        .await;
        self.schedule_refresh();
        Ok(txid)
    }

    /// Like a message, updating the local count optimistically.
    pub async fn like_message(&self, message_id: u64) -> StoreResult<TxId> {
        let _loading = LoadingGuard::start(&self.inner.loading);
        self.set_error(None).await;

        match self.submit_like(message_id).await {
            Ok(txid) => Ok(txid),
            Err(e) => {
                tracing::error!(message_id, error = %e, "Error liking message");
                self.set_error(Some(LIKE_MESSAGE_ERROR.to_string())).await;
                Err(e)
            }
        }
    }

    async fn submit_like(&self, message_id: u64) -> StoreResult<TxId> {
        self.require_user()?;
        self.sync_likes_owner();

        // Reserved before the wallet call: one like per message in flight.
        let previous = self.inner.user_likes.insert(message_id, true);
        if previous == Some(true) {
            return Err(StoreError::AlreadyLiked(message_id));
        }

        let call = self.inner.ids.like_message(message_id);
        let txid = match self.inner.auth.wallet().submit(&call).await {
            Ok(txid) => txid,
            Err(e) => {
                match previous {
                    Some(liked) => self.set_user_liked(message_id, liked),
                    None => {
                        self.inner.user_likes.remove(&message_id);
                    }
                }
                return Err(e.into());
            }
        };
        tracing::info!(txid = %txid, message_id, "Like submitted");

        self.update_message_likes_by(message_id, 1).await;

        self.add_pending_transaction(PendingTransaction::new(
            txid.clone(),
            PendingKind::Like { message_id },
        ))
        .await;
        self.schedule_refresh();
        Ok(txid)
    }

    /// Tip the author of a message, in micro-STX.
    pub async fn send_tip(&self, message_id: u64, amount: u64) -> StoreResult<TxId> {
        let _loading = LoadingGuard::start(&self.inner.loading);
        self.set_error(None).await;

        match self.submit_tip(message_id, amount).await {
            Ok(txid) => Ok(txid),
            Err(e) => {
                tracing::error!(message_id, amount, error = %e, "Error sending tip");
                self.set_error(Some(SEND_TIP_ERROR.to_string())).await;
                Err(e)
            }
        }
    }

    async fn submit_tip(&self, message_id: u64, amount: u64) -> StoreResult<TxId> {
        self.require_user()?;
        if amount == 0 {
            return Err(StoreError::InvalidAmount);
        }

        let recipient = match self.message(message_id).await {
            Some(message) => message.author,
            None => self
                .inner
                .chain
                .get_message(message_id)
                .await?
                .ok_or(StoreError::MessageNotFound(message_id))?
                .author,
        };

        let call = self
            .inner
            .ids
            .send_tip(&recipient, u128::from(amount), message_id)?;
        let txid = self.inner.auth.wallet().submit(&call).await?;
        tracing::info!(txid = %txid, message_id, amount, recipient = %recipient, "Tip submitted");

        self.add_pending_transaction(PendingTransaction::new(
            txid.clone(),
            PendingKind::Tip {
                message_id,
                recipient,
                amount,
            },
        ))
        .await;
        self.schedule_refresh();
        Ok(txid)
    }

    /// Drop liked flags recorded for a different (or no longer signed-in)
    /// user.
    fn sync_likes_owner(&self) {
        let user = self.inner.auth.user_address();
        let owner = self.inner.likes_owner.load();
        if owner.as_deref().map(String::as_str) != user.as_deref() {
            if !self.inner.user_likes.is_empty() {
                tracing::debug!(user = ?user, "Session changed, clearing liked flags");
            }
            self.inner.user_likes.clear();
            self.inner.likes_owner.store(user.map(Arc::new));
        }
    }

    fn require_user(&self) -> StoreResult<String> {
        self.inner
            .auth
            .user_address()
            .ok_or(StoreError::NotAuthenticated)
    }

    /// Re-fetch after `refresh_delay`. Not cancelled by later writes.
    fn schedule_refresh(&self) {
        let store = self.clone();
        let delay = self.inner.settings.refresh_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.fetch_messages().await;
        });
    }

    // ---- mutations ----

    pub async fn set_messages(&self, messages: Vec<Message>) {
        self.inner.state.write().await.messages = messages;
    }

    /// Insert at the front of the list.
    pub async fn add_message(&self, message: Message) {
        self.inner.state.write().await.messages.insert(0, message);
    }

    async fn update_message_likes_by(&self, message_id: u64, delta: u64) {
        let mut state = self.inner.state.write().await;
        if let Some(message) = state.messages.iter_mut().find(|m| m.id == message_id) {
            message.likes += delta;
        }
    }

    pub async fn update_message_likes(&self, message_id: u64, likes: u64) {
        let mut state = self.inner.state.write().await;
        if let Some(message) = state.messages.iter_mut().find(|m| m.id == message_id) {
            message.likes = likes;
        }
    }

    pub fn set_user_liked(&self, message_id: u64, liked: bool) {
        self.inner.user_likes.insert(message_id, liked);
    }

    pub async fn set_error(&self, error: Option<String>) {
        self.inner.state.write().await.error = error;
    }

    pub async fn add_pending_transaction(&self, tx: PendingTransaction) {
        let mut state = self.inner.state.write().await;
        state.pending_transactions.push(tx);
        metrics::record_pending_transactions(state.pending_transactions.len());
    }

    pub async fn remove_pending_transaction(&self, id: &TxId) {
        let mut state = self.inner.state.write().await;
        state.pending_transactions.retain(|tx| &tx.id != id);
        metrics::record_pending_transactions(state.pending_transactions.len());
    }

    pub async fn clear_pending_transactions(&self) {
        self.inner.state.write().await.pending_transactions.clear();
        metrics::record_pending_transactions(0);
    }
}
