//! Compute budget instructions and compute unit estimation
//!
//! This module builds, finds and updates Compute Budget program
//! instructions inside immutable transaction messages, and estimates the
//! compute unit limit of a message by simulating it.
//!
//! ## Architecture
//!
//! - **codec**: byte layout of `RequestUnits`, `SetComputeUnitLimit` and
//!   `SetComputeUnitPrice`
//! - **message**: copy-on-write `TransactionMessage` and wire compilation
//! - **locate**: first-match lookup of budget instructions
//! - **patch**: update-or-append of limit and price
//! - **lifetime**: provisory blockhash and durable nonce lifetimes
//! - **simulate**: the `SimulationTransport` seam and its RPC implementation
//! - **estimate**: `ComputeUnitEstimator`
//! - **auto_update**: `ProvisoryComputeUnitLimitUpdater`
//!
//! ## Provisory limits
//!
//! A message can be built with `SetComputeUnitLimit(0)` (or the maximum,
//! `1_400_000`) to mark its limit as undecided. The updater replaces such a
//! limit with a simulated estimate and leaves any other value alone.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use compute_budget_client::compute_budget::{
//!     fill_provisory_set_compute_unit_limit, ComputeUnitEstimator, EstimateOptions,
//!     ProvisoryComputeUnitLimitUpdater, TransactionMessage,
//! };
//! use solana_client::nonblocking::rpc_client::RpcClient;
//!
//! # async fn example(message: TransactionMessage) -> anyhow::Result<()> {
//! let rpc = Arc::new(RpcClient::new("http://127.0.0.1:8899".to_string()));
//! let updater = ProvisoryComputeUnitLimitUpdater::new(ComputeUnitEstimator::new(rpc));
//!
//! let message = fill_provisory_set_compute_unit_limit(&message)?;
//! let message = updater
//!     .estimate_and_update(&message, &EstimateOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::ComputeBudgetError;

mod auto_update;
mod codec;
mod constants;
mod estimate;
mod lifetime;
mod locate;
mod message;
mod patch;
mod simulate;

pub use auto_update::{needs_compute_unit_estimate, ProvisoryComputeUnitLimitUpdater};
pub use codec::{
    decode_set_compute_unit_limit_units, decode_set_compute_unit_price_micro_lamports,
    get_request_units_instruction, get_set_compute_unit_limit_instruction,
    get_set_compute_unit_price_instruction, identify_compute_budget_instruction,
    ComputeBudgetInstruction, ComputeBudgetInstructionKind,
};
pub use constants::{
    COMPUTE_BUDGET_PROGRAM_ID, MAX_COMPUTE_UNIT_LIMIT, PROVISORY_BLOCKHASH_LIFETIME_CONSTRAINT,
    PROVISORY_COMPUTE_UNIT_LIMIT,
};
pub use estimate::{
    clamp_units_consumed, ComputeUnitEstimator, EstimateComputeUnitLimit, EstimateOptions,
};
pub use lifetime::{
    ensure_lifetime, fill_missing_lifetime_using_provisory_blockhash,
    is_advance_nonce_account_instruction, is_durable_nonce_transaction,
    set_lifetime_using_blockhash, set_lifetime_using_durable_nonce,
    set_lifetime_using_provisory_blockhash,
};
pub use locate::{
    find_first, find_set_compute_unit_limit_index, find_set_compute_unit_price_index,
    get_set_compute_unit_limit_index_and_units,
    get_set_compute_unit_price_index_and_micro_lamports, is_compute_budget_instruction_of_kind,
    is_set_compute_unit_limit_instruction, is_set_compute_unit_price_instruction,
    ComputeUnitLimitDetails, ComputeUnitPriceDetails,
};
pub use message::{
    decode_base64_wire, encode_base64_wire, LifetimeConstraint, MessageVersion,
    TransactionMessage,
};
pub use patch::{
    fill_provisory_set_compute_unit_limit, set_transaction_message_compute_unit_price,
    update_or_append_set_compute_unit_limit, update_or_append_set_compute_unit_price,
    UnitsUpdate,
};
pub use simulate::{SimulationConfig, SimulationResult, SimulationTransport};
