//! Event stream over a transaction's submit and confirm lifecycle.
//!
//! Events arrive in order: at most one `TransactionHash`, at most one
//! `Receipt`, at most one `Confirmation`. An `Error` replaces whatever events
//! had not been emitted yet and ends the stream.

use alloy::primitives::B256;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::transaction::transaction::Transaction;
use crate::transaction::types::{
    ConfirmOptions, Receipt, TransactionError, TransactionResult, TxStatus,
};

#[derive(Debug)]
pub enum TxEvent {
    TransactionHash(B256),
    Receipt(Receipt),
    Confirmation(TxStatus),
    Error(TransactionError),
}

/// A transaction being sent and confirmed on a background task.
#[derive(Debug)]
pub struct ObservedTransaction {
    events: mpsc::UnboundedReceiver<TxEvent>,
    handle: JoinHandle<Transaction>,
}

impl ObservedTransaction {
    /// Next lifecycle event; `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<TxEvent> {
        self.events.recv().await
    }

    /// Wait for the background task and return the transaction in its final state.
    pub async fn finish(self) -> TransactionResult<Transaction> {
        self.handle
            .await
            .map_err(|e| TransactionError::Task(e.to_string()))
    }

    /// Stop polling. The transaction is lost with the task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

async fn drive(tx: &mut Transaction, options: ConfirmOptions, events: &mpsc::UnboundedSender<TxEvent>) {
    let hash = match (tx.status(), tx.id()) {
        (TxStatus::Pending, Some(hash)) => hash,
        _ => match tx.send_transaction().await {
            Ok(hash) => hash,
            Err(e) => {
                let _ = events.send(TxEvent::Error(e));
                return;
            }
        },
    };
    let _ = events.send(TxEvent::TransactionHash(hash));

    match tx.confirm(hash, options).await {
        Ok(status) => {
            if let Some(receipt) = tx.receipt() {
                let _ = events.send(TxEvent::Receipt(receipt.clone()));
            }
            let _ = events.send(TxEvent::Confirmation(status));
        }
        Err(e) => {
            let _ = events.send(TxEvent::Error(e));
        }
    }
}

impl Transaction {
    /// Send (unless already pending) and confirm on a spawned task,
    /// reporting progress as [`TxEvent`]s.
    ///
    /// A transaction that is already `Pending` is not sent again; its first
    /// event is `TransactionHash` carrying the hash from the earlier send.
    pub fn observed(self, options: ConfirmOptions) -> ObservedTransaction {
        let (sender, events) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut tx = self;
            drive(&mut tx, options, &sender).await;
            tx
        });
        ObservedTransaction { events, handle }
    }
}
