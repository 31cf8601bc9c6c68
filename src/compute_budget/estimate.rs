//! Compute unit estimation through transaction simulation
//!
//! The message is simulated with the maximum compute unit limit so the
//! node reports how many units the instructions actually consume. The
//! estimate is that number, saturated to `u32::MAX`; no margin is added.

use async_trait::async_trait;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_transaction_status::UiTransactionEncoding;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::constants::MAX_COMPUTE_UNIT_LIMIT;
use super::errors::ComputeBudgetError;
use super::lifetime::{ensure_lifetime, is_durable_nonce_transaction};
use super::message::TransactionMessage;
use super::patch::update_or_append_set_compute_unit_limit;
use super::simulate::{SimulationConfig, SimulationTransport};
use crate::observability::CorrelationId;

/// Per-call estimation options
#[derive(Debug, Clone, Default)]
pub struct EstimateOptions {
    pub commitment: Option<CommitmentConfig>,
    pub min_context_slot: Option<u64>,
    /// Cancels the in-flight simulation when fired
    pub cancellation: Option<CancellationToken>,
    /// Recorded on the estimation span
    pub correlation_id: CorrelationId,
}

impl EstimateOptions {
    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = Some(commitment);
        self
    }

    pub fn with_min_context_slot(mut self, slot: u64) -> Self {
        self.min_context_slot = Some(slot);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

/// Saturate a simulated unit count to the width of `SetComputeUnitLimit`
#[inline]
pub fn clamp_units_consumed(units_consumed: u64) -> u32 {
    u32::try_from(units_consumed).unwrap_or(u32::MAX)
}

/// Estimates the compute unit limit of a message
#[async_trait]
pub trait EstimateComputeUnitLimit: Send + Sync {
    async fn estimate_compute_unit_limit(
        &self,
        message: &TransactionMessage,
        options: &EstimateOptions,
    ) -> Result<u32, ComputeBudgetError>;
}

#[async_trait]
impl<E: EstimateComputeUnitLimit + ?Sized> EstimateComputeUnitLimit for std::sync::Arc<E> {
    async fn estimate_compute_unit_limit(
        &self,
        message: &TransactionMessage,
        options: &EstimateOptions,
    ) -> Result<u32, ComputeBudgetError> {
        (**self).estimate_compute_unit_limit(message, options).await
    }
}

/// Simulation-backed compute unit estimator
///
/// Holds no per-call state, so one estimator can serve concurrent tasks.
#[derive(Debug, Clone)]
pub struct ComputeUnitEstimator<T> {
    transport: T,
}

impl<T: SimulationTransport> ComputeUnitEstimator<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Simulate `message` and return the compute units it consumes
    ///
    /// The message given to the node is the input with a lifetime (the
    /// provisory blockhash if it has none) and `SetComputeUnitLimit` set to
    /// [`MAX_COMPUTE_UNIT_LIMIT`]. Durable nonce messages are simulated with
    /// their own nonce; all others let the node replace the blockhash.
    ///
    /// # Errors
    ///
    /// - `SimulationExecutionFailed` when the transaction itself fails,
    ///   carrying the units consumed up to the failure
    /// - `EstimationTransportFailed` for everything else, including
    ///   cancellation and a response without `unitsConsumed`
    /// - `DecodeOutOfRange` when an existing limit instruction is truncated
    #[instrument(skip_all, fields(correlation_id = %options.correlation_id))]
    pub async fn estimate(
        &self,
        message: &TransactionMessage,
        options: &EstimateOptions,
    ) -> Result<u32, ComputeBudgetError> {
        let replace_recent_blockhash = !is_durable_nonce_transaction(message);
        let simulation_message =
            update_or_append_set_compute_unit_limit(MAX_COMPUTE_UNIT_LIMIT, &ensure_lifetime(message))?;
        let wire_transaction = simulation_message
            .compile_to_base64_wire()
            .map_err(ComputeBudgetError::transport)?;

        let cancellation = options.cancellation.clone().unwrap_or_default();
        let config = SimulationConfig {
            encoding: UiTransactionEncoding::Base64,
            sig_verify: false,
            replace_recent_blockhash,
            commitment: options.commitment,
            min_context_slot: options.min_context_slot,
            cancellation: cancellation.clone(),
        };

        debug!(
            instructions = simulation_message.instructions().len(),
            replace_recent_blockhash,
            min_context_slot = ?options.min_context_slot,
            "Simulating transaction to estimate compute units"
        );

        let simulation = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                debug!("Compute unit estimation cancelled");
                return Err(ComputeBudgetError::transport(ComputeBudgetError::Cancelled));
            }
            result = self.transport.simulate_transaction(wire_transaction, config) => {
                result.map_err(ComputeBudgetError::transport)?
            }
        };

        let units_consumed = simulation
            .units_consumed
            .map(clamp_units_consumed)
            .ok_or_else(|| ComputeBudgetError::transport(ComputeBudgetError::EstimationUnsupported))?;

        if let Some(error) = simulation.err {
            warn!(
                units_consumed,
                error = %error,
                "Transaction failed during compute unit simulation"
            );
            return Err(ComputeBudgetError::SimulationExecutionFailed {
                error,
                units_consumed,
            });
        }

        debug!(units_consumed, "Compute unit estimate");
        Ok(units_consumed)
    }
}

#[async_trait]
impl<T: SimulationTransport> EstimateComputeUnitLimit for ComputeUnitEstimator<T> {
    async fn estimate_compute_unit_limit(
        &self,
        message: &TransactionMessage,
        options: &EstimateOptions,
    ) -> Result<u32, ComputeBudgetError> {
        self.estimate(message, options).await
    }
}
