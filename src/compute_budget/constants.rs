//! Well-known addresses and compute unit sentinels

use once_cell::sync::Lazy;
use solana_sdk::{hash::Hash, pubkey::Pubkey};

use super::message::LifetimeConstraint;

/// Address of the Compute Budget program
pub const COMPUTE_BUDGET_PROGRAM_ID: Pubkey = solana_sdk::compute_budget::ID;

/// Marks a limit as undecided: the message must be estimated before sending.
///
/// Zero makes the transaction fail on-chain unless it is replaced.
pub const PROVISORY_COMPUTE_UNIT_LIMIT: u32 = 0;

/// Network-wide ceiling for the compute unit limit of a transaction
pub const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// Placeholder blockhash lifetime for messages that are not ready to be sent.
///
/// The blockhash is `11111111111111111111111111111111` (all zero bytes). The
/// last valid block height is not part of compiled transactions.
pub static PROVISORY_BLOCKHASH_LIFETIME_CONSTRAINT: Lazy<LifetimeConstraint> =
    Lazy::new(|| LifetimeConstraint::Blockhash {
        blockhash: Hash::default(),
        last_valid_block_height: 0,
    });
