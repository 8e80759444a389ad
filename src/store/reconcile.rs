//! Pending-transaction reconciliation.
//!
//! Maps a status lookup for one pending entry to what the store should do
//! with it. Retries are implicit: kept entries are looked up again on the
//! next refresh.

use crate::stacks::{ContractErrorCode, StacksResult, TransactionStatus, TxStatus};
use crate::store::types::PendingTransaction;

/// Decision for one pending entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Mined successfully; drop the entry.
    Confirmed,
    /// Mined but aborted; drop the entry and surface the status.
    Failed {
        status: TxStatus,
        /// The guestbook's `(err uN)`, when the node reports the result.
        contract_error: Option<ContractErrorCode>,
    },
    /// Still pending, dropped from the mempool, or the lookup failed.
    Keep,
}

impl Reconciliation {
    pub fn removes_entry(&self) -> bool {
        !matches!(self, Reconciliation::Keep)
    }

    /// Text for the store's error field, if any.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Reconciliation::Failed { status, .. } => Some(format!("Transaction failed: {}", status)),
            _ => None,
        }
    }
}

/// Decide what to do with `tx` given its status lookup.
pub fn process_status(
    tx: &PendingTransaction,
    lookup: &StacksResult<TransactionStatus>,
) -> Reconciliation {
    let lookup = match lookup {
        Ok(lookup) => lookup,
        Err(e) => {
            tracing::error!(txid = %tx.id, error = %e, "Error checking transaction status");
            return Reconciliation::Keep;
        }
    };

    match &lookup.tx_status {
        TxStatus::Success => {
            tracing::info!(txid = %tx.id, kind = tx.kind.label(), "Transaction confirmed");
            Reconciliation::Confirmed
        }
        s if s.is_aborted() => {
            let contract_error = lookup
                .tx_result
                .as_ref()
                .and_then(ContractErrorCode::from_tx_result);
            tracing::warn!(
                txid = %tx.id,
                kind = tx.kind.label(),
                status = %s,
                contract_error = ?contract_error,
                "Transaction failed"
            );
            Reconciliation::Failed {
                status: s.clone(),
                contract_error,
            }
        }
        other => {
            tracing::debug!(txid = %tx.id, status = %other, "Transaction still pending");
            Reconciliation::Keep
        }
    }
}
