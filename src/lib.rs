//! # Reconciliation Core
//!
//! A bank statement reconciliation library: tolerant statement parsing,
//! deduplicating rule-driven import, and exact/fuzzy matching of bank
//! transactions against double-entry ledger entries.
//!
//! ## Features
//!
//! - **Tolerant statement parsing**: stack-based parser for the loosely
//!   structured tag-soup statement format (case-insensitive tags, implicit
//!   closing, vendor quirks)
//! - **Idempotent import**: identity-key deduplication in-batch and against
//!   already-persisted rows, safe under re-import and concurrent imports
//! - **Label normalization**: ordered, pattern-based rules computing a
//!   canonical label per transaction
//! - **Match suggestions**: two-tier ranking of candidate ledger entries,
//!   exact amount/date matches first, trigram-similarity matches second
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::{ReconciliationEngine, utils::MemoryStorage};
//!
//! // This example shows basic usage - you need to implement the
//! // ReconciliationStorage trait for your backend, or use MemoryStorage:
//! // let storage = MemoryStorage::new();
//! // let mut engine = ReconciliationEngine::new(storage);
//! ```

pub mod engine;
pub mod rules;
pub mod statement;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use engine::*;
pub use rules::*;
pub use statement::*;
pub use traits::*;
pub use types::*;
