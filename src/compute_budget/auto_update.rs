//! Estimate-and-update for messages whose limit is still undecided

use tracing::{debug, info};

use super::constants::{MAX_COMPUTE_UNIT_LIMIT, PROVISORY_COMPUTE_UNIT_LIMIT};
use super::errors::ComputeBudgetError;
use super::estimate::{EstimateComputeUnitLimit, EstimateOptions};
use super::locate::get_set_compute_unit_limit_index_and_units;
use super::message::TransactionMessage;
use super::patch::update_or_append_set_compute_unit_limit;

/// Whether a limit must be replaced by an estimate
///
/// A missing instruction, the provisory value and the maximum all count as
/// "not chosen by the caller".
pub fn needs_compute_unit_estimate(units: Option<u32>) -> bool {
    match units {
        None => true,
        Some(units) => units == PROVISORY_COMPUTE_UNIT_LIMIT || units == MAX_COMPUTE_UNIT_LIMIT,
    }
}

/// Replaces provisory compute unit limits with simulated estimates
#[derive(Debug, Clone)]
pub struct ProvisoryComputeUnitLimitUpdater<E> {
    estimator: E,
}

impl<E: EstimateComputeUnitLimit> ProvisoryComputeUnitLimitUpdater<E> {
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Set the compute unit limit of `message` from a simulation when needed
    ///
    /// Messages with an explicit limit are returned unchanged without any
    /// network call. Otherwise the original message is estimated and its
    /// limit set to the estimate, appending the instruction if absent.
    pub async fn estimate_and_update(
        &self,
        message: &TransactionMessage,
        options: &EstimateOptions,
    ) -> Result<TransactionMessage, ComputeBudgetError> {
        let current = get_set_compute_unit_limit_index_and_units(message)?;
        let current_units = current.map(|details| details.units);

        if !needs_compute_unit_estimate(current_units) {
            debug!(
                correlation_id = %options.correlation_id,
                units = ?current_units,
                "Explicit compute unit limit, skipping estimation"
            );
            return Ok(message.clone());
        }

        let units = self
            .estimator
            .estimate_compute_unit_limit(message, options)
            .await?;

        info!(
            correlation_id = %options.correlation_id,
            previous = ?current_units,
            units,
            "Setting compute unit limit from simulation"
        );
        update_or_append_set_compute_unit_limit(units, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_compute_unit_estimate() {
        assert!(needs_compute_unit_estimate(None));
        assert!(needs_compute_unit_estimate(Some(0)));
        assert!(needs_compute_unit_estimate(Some(1_400_000)));
        assert!(!needs_compute_unit_estimate(Some(123_456)));
        assert!(!needs_compute_unit_estimate(Some(1)));
        assert!(!needs_compute_unit_estimate(Some(1_399_999)));
    }
}
