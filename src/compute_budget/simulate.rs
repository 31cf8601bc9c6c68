//! Simulation transport
//!
//! The estimator talks to the network through [`SimulationTransport`] so it
//! can run against a real RPC node or a scripted mock.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSimulateTransactionConfig,
    rpc_request::RpcRequest,
    rpc_response::{Response, RpcSimulateTransactionResult},
};
use solana_sdk::{commitment_config::CommitmentConfig, transaction::TransactionError};
use solana_transaction_status::UiTransactionEncoding;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::errors::ComputeBudgetError;

/// Options forwarded with a `simulateTransaction` request
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub encoding: UiTransactionEncoding,
    pub sig_verify: bool,
    pub replace_recent_blockhash: bool,
    pub commitment: Option<CommitmentConfig>,
    pub min_context_slot: Option<u64>,
    /// Fires when the caller gives up on the request
    pub cancellation: CancellationToken,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            encoding: UiTransactionEncoding::Base64,
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: None,
            min_context_slot: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl SimulationConfig {
    fn to_rpc_config(&self) -> RpcSimulateTransactionConfig {
        RpcSimulateTransactionConfig {
            sig_verify: self.sig_verify,
            replace_recent_blockhash: self.replace_recent_blockhash,
            commitment: self.commitment,
            encoding: Some(self.encoding),
            min_context_slot: self.min_context_slot,
            ..Default::default()
        }
    }
}

/// The parts of a simulation response used for estimation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    pub err: Option<TransactionError>,
    pub units_consumed: Option<u64>,
}

impl SimulationResult {
    pub fn success(units_consumed: u64) -> Self {
        Self {
            err: None,
            units_consumed: Some(units_consumed),
        }
    }

    pub fn failure(err: TransactionError, units_consumed: u64) -> Self {
        Self {
            err: Some(err),
            units_consumed: Some(units_consumed),
        }
    }
}

/// Anything able to run `simulateTransaction` for a base64 wire transaction
#[async_trait]
pub trait SimulationTransport: Send + Sync {
    /// Simulate `wire_transaction`
    ///
    /// Implementations should stop work when `config.cancellation` fires.
    /// The estimator drops the returned future in that case either way.
    async fn simulate_transaction(
        &self,
        wire_transaction: String,
        config: SimulationConfig,
    ) -> Result<SimulationResult>;
}

#[async_trait]
impl<T: SimulationTransport + ?Sized> SimulationTransport for Arc<T> {
    async fn simulate_transaction(
        &self,
        wire_transaction: String,
        config: SimulationConfig,
    ) -> Result<SimulationResult> {
        T::simulate_transaction(self, wire_transaction, config).await
    }
}

#[async_trait]
impl SimulationTransport for RpcClient {
    async fn simulate_transaction(
        &self,
        wire_transaction: String,
        config: SimulationConfig,
    ) -> Result<SimulationResult> {
        let params = json!([wire_transaction, config.to_rpc_config()]);
        debug!(url = %self.url(), "Sending simulateTransaction");

        let request = self.send::<Response<RpcSimulateTransactionResult>>(
            RpcRequest::SimulateTransaction,
            params,
        );
        let response = tokio::select! {
            biased;
            _ = config.cancellation.cancelled() => {
                return Err(ComputeBudgetError::Cancelled.into());
            }
            response = request => response?,
        };

        debug!(
            slot = response.context.slot,
            units_consumed = ?response.value.units_consumed,
            "simulateTransaction response"
        );
        Ok(SimulationResult {
            err: response.value.err.map(Into::into),
            units_consumed: response.value.units_consumed,
        })
    }
}
