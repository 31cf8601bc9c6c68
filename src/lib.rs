//! Compute Budget Client
//!
//! Builds and updates Solana Compute Budget instructions and estimates the
//! compute unit limit of a transaction message by simulating it.

pub mod compat;
pub mod compute_budget;
pub mod config;
pub mod observability;
pub mod test_utils;

// Re-export commonly used types
pub use compute_budget::{
    ComputeBudgetError, ComputeUnitEstimator, EstimateOptions, ProvisoryComputeUnitLimitUpdater,
    TransactionMessage,
};
pub use observability::CorrelationId;
pub use solana_sdk::{message::VersionedMessage, pubkey::Pubkey, signature::Signature};
