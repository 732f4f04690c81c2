//! Transaction engine.
//!
//! # Data Flow
//! ```text
//! TransactionParams
//!     → codec.rs (RLP signing payload, keccak256)
//!     → KeyProvider::sign_hash
//!     → codec.rs (signed raw payload)
//!     → transaction.rs (submit via Messenger, poll receipt per new block)
//!     → observer.rs (optional event stream on a spawned task)
//! ```

pub mod codec;
pub mod factory;
pub mod observer;
#[allow(clippy::module_inception)]
pub mod transaction;
pub mod types;

pub use factory::TransactionFactory;
pub use observer::{ObservedTransaction, TxEvent};
pub use transaction::Transaction;
pub use types::{
    ConfirmOptions, Receipt, TransactionError, TransactionParams, TransactionResult, TxSignature,
    TxStatus,
};
