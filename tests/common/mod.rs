//! Mock Stacks node and wallet for integration tests.
//!
//! Both run on ephemeral ports and share one in-memory ledger that plays the
//! `guestbook` and `tipping` contracts: sequential message ids, `(err u1)`
//! for unknown messages and `(err u2)` for repeat likes.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use stacks_guestbook::clarity::ClarityValue;
use stacks_guestbook::config::{GuestbookConfig, Network};

pub const DEPLOYER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";
pub const USER: &str = "ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5";
pub const USER_MAINNET: &str = "SP1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5";
pub const OTHER: &str = "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG";

#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub author: String,
    pub content: String,
    pub timestamp: u64,
    pub likes: u64,
}

#[derive(Debug, Default)]
pub struct Ledger {
    pub messages: BTreeMap<u64, StoredMessage>,
    pub likes: HashSet<(String, u64)>,
    pub tips: HashMap<u64, Vec<(String, u128)>>,
    pub txs: HashMap<String, String>,
    pub block_height: u64,
    pub session: bool,
}

impl Ledger {
    pub fn last_id(&self) -> u64 {
        self.messages.keys().next_back().copied().unwrap_or(0)
    }

    pub fn add_message(&mut self, author: &str, content: &str) -> u64 {
        let id = self.last_id() + 1;
        self.block_height += 1;
        self.messages.insert(
            id,
            StoredMessage {
                author: author.to_string(),
                content: content.to_string(),
                timestamp: self.block_height,
                likes: 0,
            },
        );
        id
    }

    /// Contract logic for `like-message`; `Err(code)` mirrors `(err uN)`.
    pub fn like(&mut self, user: &str, id: u64) -> Result<(), u128> {
        if !self.messages.contains_key(&id) {
            return Err(1);
        }
        if !self.likes.insert((user.to_string(), id)) {
            return Err(2);
        }
        if let Some(message) = self.messages.get_mut(&id) {
            message.likes += 1;
        }
        Ok(())
    }

    fn totals(&self, user: &str, received: bool) -> (u128, u64) {
        let mut total = 0u128;
        let mut count = 0u64;
        for (id, tips) in &self.tips {
            let author = self.messages.get(id).map(|m| m.author.as_str());
            for (tipper, amount) in tips {
                let matches = if received {
                    author == Some(user)
                } else {
                    tipper == user
                };
                if matches {
                    total += amount;
                    count += 1;
                }
            }
        }
        (total, count)
    }
}

/// Shared handle on the mock services.
#[derive(Clone, Default)]
pub struct MockChain {
    pub ledger: Arc<Mutex<Ledger>>,
    /// Answer node requests with 500 while non-zero.
    pub node_failures: Arc<AtomicU32>,
    /// Wallet returns signed bytes instead of broadcasting.
    pub wallet_returns_signed: Arc<AtomicBool>,
    /// Newly submitted transactions start as `pending` instead of mined.
    pub hold_transactions: Arc<AtomicBool>,
    pub broadcasts: Arc<AtomicU32>,
}

impl MockChain {
    pub fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap()
    }

    pub fn set_tx_status(&self, txid: &str, status: &str) {
        self.ledger()
            .txs
            .insert(normalize_txid(txid), status.to_string());
    }

    pub fn tx_status(&self, txid: &str) -> Option<String> {
        self.ledger().txs.get(&normalize_txid(txid)).cloned()
    }
}

pub fn normalize_txid(raw: &str) -> String {
    raw.trim_start_matches("0x").to_ascii_lowercase()
}

pub struct MockServices {
    pub chain: MockChain,
    pub node_addr: SocketAddr,
    pub wallet_addr: SocketAddr,
}

impl MockServices {
    pub async fn start() -> Self {
        let chain = MockChain::default();
        let node_addr = serve(node_router(chain.clone())).await;
        let wallet_addr = serve(wallet_router(chain.clone())).await;
        Self {
            chain,
            node_addr,
            wallet_addr,
        }
    }

    pub fn node_url(&self) -> String {
        format!("http://{}", self.node_addr)
    }

    /// Config pointing at the mocks. Auto-refresh and the post-write refresh
    /// are pushed out so tests drive fetches explicitly.
    pub fn config(&self) -> GuestbookConfig {
        let mut config = GuestbookConfig::default();
        config.app.network = Network::Testnet;
        config.app.refresh_delay_ms = 3_600_000;
        config.networks.testnet.api_url = self.node_url();
        config.networks.testnet.contract_address = DEPLOYER.to_string();
        config.wallet.signer_url = format!("http://{}", self.wallet_addr);
        config.wallet.timeout_secs = 5;
        config.node.timeout_secs = 5;
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

fn random_txid() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

// ---- node ----

fn node_router(chain: MockChain) -> Router {
    Router::new()
        .route("/v2/info", get(node_info))
        .route("/v2/accounts/{address}", get(account))
        .route("/v2/transactions", post(broadcast))
        .route(
            "/v2/contracts/call-read/{address}/{contract}/{function}",
            post(call_read),
        )
        .route("/extended/v1/tx/{txid}", get(tx_status))
        .route("/extended/v1/address/{address}/transactions", get(address_transactions))
        .route("/extended/v1/contract/{contract_id}/events", get(contract_events))
        .with_state(chain)
}

fn injected_failure(chain: &MockChain) -> Option<Response> {
    let remaining = chain.node_failures.load(Ordering::SeqCst);
    if remaining > 0 {
        chain.node_failures.store(remaining - 1, Ordering::SeqCst);
        return Some((StatusCode::INTERNAL_SERVER_ERROR, "injected failure").into_response());
    }
    None
}

async fn node_info(State(chain): State<MockChain>) -> Response {
    if let Some(failure) = injected_failure(&chain) {
        return failure;
    }
    let height = chain.ledger().block_height;
    Json(json!({
        "server_version": "mock-node",
        "network_id": 2147483648u64,
        "stacks_tip_height": height,
        "burn_block_height": height + 100,
    }))
    .into_response()
}

async fn account(State(chain): State<MockChain>, Path(address): Path<String>) -> Response {
    if let Some(failure) = injected_failure(&chain) {
        return failure;
    }
    let nonce = chain
        .ledger()
        .messages
        .values()
        .filter(|m| m.author == address)
        .count();
    Json(json!({
        "balance": "0x000000000000000000000000000f4240",
        "locked": "0x00000000000000000000000000000000",
        "unlock_height": 0,
        "nonce": nonce,
        "balance_proof": "",
        "nonce_proof": "",
    }))
    .into_response()
}

async fn broadcast(State(chain): State<MockChain>, body: Bytes) -> Response {
    if body.len() < 32 {
        return (StatusCode::BAD_REQUEST, "transaction too short").into_response();
    }
    chain.broadcasts.fetch_add(1, Ordering::SeqCst);
    let txid = hex::encode(&body[..32]);
    Json(Value::String(txid)).into_response()
}

#[derive(Deserialize)]
struct ReadOnlyBody {
    #[allow(dead_code)]
    sender: String,
    arguments: Vec<String>,
}

async fn call_read(
    State(chain): State<MockChain>,
    Path((address, contract, function)): Path<(String, String, String)>,
    Json(body): Json<ReadOnlyBody>,
) -> Response {
    if let Some(failure) = injected_failure(&chain) {
        return failure;
    }
    if address != DEPLOYER {
        return Json(json!({"okay": false, "cause": "Unchecked(NoSuchContract)"})).into_response();
    }

    let args: Result<Vec<ClarityValue>, _> =
        body.arguments.iter().map(|a| ClarityValue::from_hex(a)).collect();
    let args = match args {
        Ok(args) => args,
        Err(e) => {
            return Json(json!({"okay": false, "cause": format!("bad argument: {}", e)}))
                .into_response()
        }
    };

    let ledger = chain.ledger();
    let result = match (contract.as_str(), function.as_str()) {
        ("guestbook", "get-last-message-id") => Some(ClarityValue::ok(ClarityValue::uint(ledger.last_id()))),
        ("guestbook", "get-message") => {
            let id = args.first().and_then(|a| a.as_u64().ok()).unwrap_or(0);
            Some(match ledger.messages.get(&id) {
                Some(m) => ClarityValue::some(ClarityValue::tuple([
                    ("author", ClarityValue::principal(&m.author).unwrap()),
                    ("content", ClarityValue::string_utf8(m.content.clone())),
                    ("timestamp", ClarityValue::uint(m.timestamp)),
                    ("likes", ClarityValue::uint(m.likes)),
                ])),
                None => ClarityValue::OptionalNone,
            })
        }
        ("guestbook", "has-user-liked") => {
            let user = args.first().and_then(|a| a.as_principal().ok()).unwrap_or_default();
            let id = args.get(1).and_then(|a| a.as_u64().ok()).unwrap_or(0);
            let liked = ledger.likes.contains(&(user, id));
            Some(ClarityValue::tuple([("liked", ClarityValue::Bool(liked))]))
        }
        ("tipping", "get-message-tips") => {
            let id = args.first().and_then(|a| a.as_u64().ok()).unwrap_or(0);
            let tips = ledger
                .tips
                .get(&id)
                .map(|tips| {
                    tips.iter()
                        .map(|(tipper, amount)| {
                            ClarityValue::tuple([
                                ("tipper", ClarityValue::principal(tipper).unwrap()),
                                ("amount", ClarityValue::uint(*amount)),
                            ])
                        })
                        .collect()
                })
                .unwrap_or_default();
            Some(ClarityValue::List(tips))
        }
        ("tipping", "get-user-tips-received") | ("tipping", "get-user-tips-sent") => {
            let user = args.first().and_then(|a| a.as_principal().ok()).unwrap_or_default();
            let (total, count) = ledger.totals(&user, function == "get-user-tips-received");
            Some(ClarityValue::tuple([
                ("total-amount", ClarityValue::uint(total)),
                ("tip-count", ClarityValue::uint(count)),
            ]))
        }
        _ => None,
    };

    match result {
        Some(value) => Json(json!({"okay": true, "result": value.to_hex()})).into_response(),
        None => Json(json!({"okay": false, "cause": format!("Unchecked(UndefinedFunction(\"{}\"))", function)}))
            .into_response(),
    }
}

async fn tx_status(State(chain): State<MockChain>, Path(txid): Path<String>) -> Response {
    if let Some(failure) = injected_failure(&chain) {
        return failure;
    }
    match chain.tx_status(&txid) {
        Some(status) => Json(json!({
            "tx_id": format!("0x{}", normalize_txid(&txid)),
            "tx_status": status,
            "tx_type": "contract_call",
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("could not find transaction by ID {}", txid)})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct PageQuery {
    limit: Option<u32>,
}

async fn address_transactions(
    State(chain): State<MockChain>,
    Path(address): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(20);
    let results: Vec<Value> = chain
        .ledger()
        .txs
        .iter()
        .take(limit as usize)
        .map(|(txid, status)| json!({"tx_id": format!("0x{}", txid), "tx_status": status, "sender_address": address}))
        .collect();
    Json(json!({"limit": limit, "offset": 0, "total": results.len(), "results": results})).into_response()
}

async fn contract_events(
    State(chain): State<MockChain>,
    Path(contract_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(50);
    let results: Vec<Value> = chain
        .ledger()
        .messages
        .iter()
        .rev()
        .take(limit as usize)
        .map(|(id, m)| {
            json!({
                "event_type": "smart_contract_log",
                "contract_log": {"contract_id": contract_id, "topic": "print", "value": {"repr": format!("(message-posted u{} {})", id, m.author)}},
            })
        })
        .collect();
    Json(json!({"limit": limit, "offset": 0, "results": results})).into_response()
}

// ---- wallet ----

#[derive(Clone)]
struct WalletState {
    chain: MockChain,
}

fn wallet_router(chain: MockChain) -> Router {
    Router::new()
        .route("/session", get(wallet_session))
        .route("/connect", post(wallet_connect))
        .route("/sign-out", post(wallet_sign_out))
        .route("/contract-call", post(wallet_contract_call))
        .with_state(WalletState { chain })
}

fn session_json() -> Value {
    json!({
        "stx_address": {"testnet": USER, "mainnet": USER_MAINNET},
        "public_key": "03a0f9818ea8c14a827bb144aec9cfbaeba225af22be18ed78a2f298106f4e281b",
    })
}

async fn wallet_session(State(state): State<WalletState>) -> Response {
    if state.chain.ledger().session {
        Json(session_json()).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn wallet_connect(State(state): State<WalletState>) -> Response {
    state.chain.ledger().session = true;
    Json(session_json()).into_response()
}

async fn wallet_sign_out(State(state): State<WalletState>) -> Response {
    state.chain.ledger().session = false;
    StatusCode::OK.into_response()
}

#[derive(Deserialize)]
struct ContractCallBody {
    contract_address: String,
    contract_name: String,
    function_name: String,
    function_args: Vec<String>,
    network: String,
}

/// Apply a contract call to the ledger; returns the mined status.
fn execute_call(ledger: &mut Ledger, call: &ContractCallBody) -> Result<String, String> {
    let args: Vec<ClarityValue> = call
        .function_args
        .iter()
        .map(|a| ClarityValue::from_hex(a))
        .collect::<Result<_, _>>()
        .map_err(|e| e.to_string())?;

    let status = match (call.contract_name.as_str(), call.function_name.as_str()) {
        ("guestbook", "post-message") => {
            let content = args.first().ok_or("missing content")?.as_str().map_err(|e| e.to_string())?;
            if content.chars().count() > 280 {
                "abort_by_response"
            } else {
                ledger.add_message(USER, content);
                "success"
            }
        }
        ("guestbook", "like-message") => {
            let id = args.first().ok_or("missing id")?.as_u64().map_err(|e| e.to_string())?;
            ledger.block_height += 1;
            match ledger.like(USER, id) {
                Ok(()) => "success",
                Err(_) => "abort_by_response",
            }
        }
        ("tipping", "send-tip") => {
            let amount = args.get(1).ok_or("missing amount")?.as_u128().map_err(|e| e.to_string())?;
            let id = args.get(2).ok_or("missing id")?.as_u64().map_err(|e| e.to_string())?;
            ledger.block_height += 1;
            ledger.tips.entry(id).or_default().push((USER.to_string(), amount));
            "success"
        }
        (contract, function) => return Err(format!("unknown function {}.{}", contract, function)),
    };
    Ok(status.to_string())
}

async fn wallet_contract_call(
    State(state): State<WalletState>,
    Json(call): Json<ContractCallBody>,
) -> Response {
    let chain = &state.chain;
    let mut ledger = chain.ledger();
    if !ledger.session {
        return (StatusCode::UNAUTHORIZED, "not signed in").into_response();
    }
    if call.contract_address != DEPLOYER || call.network != "testnet" {
        return (StatusCode::BAD_REQUEST, "unexpected contract").into_response();
    }

    let mined = match execute_call(&mut ledger, &call) {
        Ok(status) => status,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };
    let status = if chain.hold_transactions.load(Ordering::SeqCst) {
        "pending".to_string()
    } else {
        mined
    };

    let txid = random_txid();
    ledger.txs.insert(txid.clone(), status);
    drop(ledger);

    if chain.wallet_returns_signed.load(Ordering::SeqCst) {
        // The node derives the txid from the first 32 bytes.
        let tx_hex = format!("{}{}", txid, "00".repeat(16));
        Json(json!({ "tx_hex": tx_hex })).into_response()
    } else {
        Json(json!({ "txid": format!("0x{}", txid) })).into_response()
    }
}
