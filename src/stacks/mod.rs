//! Stacks blockchain integration.
//!
//! # Data Flow
//! ```text
//! Store
//!     → contract.rs (GuestbookChain reads, ContractCall builders)
//!         → client.rs (node REST API, failover)
//!     → wallet.rs (session handshake, sign + broadcast)
//!         → client.rs (broadcast when the wallet returns raw bytes)
//! ```

pub mod client;
pub mod contract;
pub mod types;
pub mod wallet;

pub use client::StacksClient;
pub use contract::{
    ContractCall, ContractErrorCode, ContractIds, GuestbookChain, Message, MessageTip,
    StacksGuestbook, TipTotals,
};
pub use types::{StacksError, StacksResult, TransactionStatus, TxId, TxStatus};
pub use wallet::{HttpWallet, UserSession, Wallet};
