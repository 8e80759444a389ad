//! JSON API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::clarity::StacksAddress;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::stacks::client::{DEFAULT_EVENTS_LIMIT, DEFAULT_TRANSACTIONS_LIMIT};
use crate::stacks::types::AccountInfo;
use crate::stacks::{GuestbookChain, MessageTip, TipTotals, TxId, UserSession};
use crate::store::{MessageSnapshot, PendingTransaction};

/// Upper bound for `limit` query parameters.
const MAX_PAGE_LIMIT: u32 = 50;

type ApiResult<T> = Result<T, ApiError>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/messages", get(get_messages).post(post_message))
        .route("/messages/{id}/like", post(like_message))
        .route("/messages/{id}/tips", get(get_tips).post(send_tip))
        .route("/pending", get(get_pending))
        .route(
            "/session",
            get(get_session).post(connect_session).delete(disconnect_session),
        )
        .route("/accounts/{address}", get(get_account))
        .route("/accounts/{address}/transactions", get(get_account_transactions))
        .route("/events", get(get_events))
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub network: String,
    pub contract: String,
    pub node_healthy: bool,
    pub authenticated: bool,
    pub pending_transactions: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let network = state.network();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        network: state.config.app.network.to_string(),
        contract: format!("{}.{}", network.contract_address, network.contract_name),
        node_healthy: state.chain().client().is_healthy().await,
        authenticated: state.store.auth().is_authenticated(),
        pending_transactions: state.store.pending_transactions().await.len(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub refresh: bool,
}

pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Json<MessageSnapshot> {
    if query.refresh {
        state.store.fetch_messages().await;
    }
    Json(state.store.snapshot().await)
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

/// A submitted write.
#[derive(Debug, Serialize)]
pub struct TxResponse {
    pub txid: String,
    pub explorer_url: String,
}

fn tx_response(state: &AppState, txid: &TxId) -> (StatusCode, Json<TxResponse>) {
    let txid = txid.to_string();
    (
        StatusCode::ACCEPTED,
        Json(TxResponse {
            explorer_url: state.network().tx_explorer_link(&txid),
            txid,
        }),
    )
}

pub async fn post_message(
    State(state): State<AppState>,
    Json(body): Json<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<TxResponse>)> {
    let txid = state.store.create_message(&body.content).await?;
    Ok(tx_response(&state, &txid))
}

pub async fn like_message(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<(StatusCode, Json<TxResponse>)> {
    let txid = state.store.like_message(id).await?;
    Ok(tx_response(&state, &txid))
}

#[derive(Debug, Serialize)]
pub struct TipsResponse {
    pub message_id: u64,
    pub tips: Vec<MessageTip>,
    pub total_amount: u128,
}

pub async fn get_tips(State(state): State<AppState>, Path(id): Path<u64>) -> Json<TipsResponse> {
    let tips = state.chain().get_message_tips(id).await;
    let total_amount = tips.iter().map(|t| t.amount).sum();
    Json(TipsResponse {
        message_id: id,
        tips,
        total_amount,
    })
}

#[derive(Debug, Deserialize)]
pub struct SendTipRequest {
    /// Micro-STX.
    pub amount: u64,
}

pub async fn send_tip(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<SendTipRequest>,
) -> ApiResult<(StatusCode, Json<TxResponse>)> {
    let txid = state.store.send_tip(id, body.amount).await?;
    Ok(tx_response(&state, &txid))
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    /// Poll the node before answering.
    #[serde(default)]
    pub check: bool,
}

pub async fn get_pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Json<Vec<PendingTransaction>> {
    if query.check {
        state.store.check_pending_transactions().await;
    }
    Json(state.store.pending_transactions().await)
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub address: Option<String>,
    pub session: Option<UserSession>,
}

fn session_response(state: &AppState) -> Json<SessionResponse> {
    let auth = state.store.auth();
    Json(SessionResponse {
        authenticated: auth.is_authenticated(),
        address: auth.user_address(),
        session: auth.session().map(|s| (*s).clone()),
    })
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    session_response(&state)
}

pub async fn connect_session(State(state): State<AppState>) -> ApiResult<Json<SessionResponse>> {
    state.store.auth().connect_wallet().await?;
    Ok(session_response(&state))
}

pub async fn disconnect_session(State(state): State<AppState>) -> ApiResult<Json<SessionResponse>> {
    state.store.auth().disconnect_wallet().await?;
    Ok(session_response(&state))
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub address: String,
    pub explorer_url: String,
    #[serde(flatten)]
    pub info: AccountInfo,
    pub tips_received: TipTotals,
    pub tips_sent: TipTotals,
}

fn parse_address(raw: &str) -> ApiResult<String> {
    raw.parse::<StacksAddress>()
        .map(|a| a.to_string())
        .map_err(|e| ApiError::bad_request(format!("Invalid address '{}': {}", raw, e)))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<AccountResponse>> {
    let address = parse_address(&address)?;
    let chain = state.chain();

    let info = chain.client().get_account_info(&address).await?;
    let tips_received = chain.get_user_tips_received(&address).await;
    let tips_sent = chain.get_user_tips_sent(&address).await;

    Ok(Json(AccountResponse {
        explorer_url: state.network().address_explorer_link(&address),
        address,
        info,
        tips_received,
        tips_sent,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

fn clamp_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_PAGE_LIMIT)
}

pub async fn get_account_transactions(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<serde_json::Value>>> {
    let address = parse_address(&address)?;
    let limit = clamp_limit(query.limit, DEFAULT_TRANSACTIONS_LIMIT);
    let transactions = state
        .chain()
        .client()
        .get_account_transactions(&address, limit)
        .await?;
    Ok(Json(transactions))
}

pub async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<serde_json::Value>>> {
    let limit = clamp_limit(query.limit, DEFAULT_EVENTS_LIMIT);
    let ids = state.chain().ids();
    let events = state
        .chain()
        .client()
        .get_contract_events(&ids.address, &ids.guestbook, limit)
        .await?;
    Ok(Json(events))
}
