//! Error types for the compute budget component
//!
//! The taxonomy separates three situations callers handle differently:
//! - the simulation could not be obtained at all (transport failure)
//! - the simulation ran but the transaction itself would fail on-chain
//! - a budget instruction payload is malformed
//!
//! Locating and patching instructions never fails on well-formed input;
//! "not found" is reported as `None`.

use solana_sdk::{message::CompileError, transaction::TransactionError};
use thiserror::Error;

use super::codec::ComputeBudgetInstructionKind;

/// Error type for all compute budget operations
#[derive(Error, Debug)]
pub enum ComputeBudgetError {
    /// No usable simulation response could be obtained
    ///
    /// The cause is one of:
    /// - a transport/RPC error returned by the simulation transport
    /// - [`ComputeBudgetError::EstimationUnsupported`] when the response has no units
    /// - [`ComputeBudgetError::Cancelled`] when the cancellation token fired
    /// - a wire compilation failure of the simulation transaction
    #[error("Failed to estimate compute unit limit: {source}")]
    EstimationTransportFailed {
        #[source]
        source: anyhow::Error,
    },

    /// The simulation succeeded as a call but the transaction would fail
    ///
    /// `units_consumed` is the (clamped) number of units consumed up to the
    /// failure point, which callers may still want to use.
    #[error(
        "Transaction failed when simulating to estimate compute unit limit \
         (units consumed: {units_consumed}): {error}"
    )]
    SimulationExecutionFailed {
        error: TransactionError,
        units_consumed: u32,
    },

    /// The RPC response did not report `unitsConsumed`
    #[error("Simulation response did not include consumed compute units")]
    EstimationUnsupported,

    /// The estimation was cancelled before the simulation settled
    #[error("Compute unit estimation was cancelled")]
    Cancelled,

    /// Instruction data is shorter than the fixed width of its kind
    #[error("Instruction data too short for {kind:?}: expected {expected} bytes, got {actual}")]
    DecodeOutOfRange {
        kind: ComputeBudgetInstructionKind,
        expected: usize,
        actual: usize,
    },

    /// Instruction data does not start with a known discriminator
    #[error("Unknown compute budget instruction (discriminator={discriminator:?})")]
    UnknownInstruction { discriminator: Option<u8> },

    /// The message has no lifetime constraint and cannot be compiled
    #[error("Transaction message has no lifetime constraint")]
    MissingLifetime,

    /// The message cannot be compiled (e.g. too many accounts for u8 indexes)
    #[error("Message compile error: {0}")]
    MessageCompile(#[from] CompileError),

    /// Bincode (de)serialization of the wire transaction failed
    #[error("Wire transaction serialization error: {0}")]
    WireSerialization(#[from] bincode::Error),

    /// Wire transaction is not valid base64
    #[error("Invalid base64 wire transaction: {0}")]
    WireEncoding(#[from] base64::DecodeError),

    /// A compiled message cannot be turned back into instructions
    #[error("Message compile error: {0}")]
    Compile(String),
}

impl ComputeBudgetError {
    /// Wrap any error as a transport failure
    pub fn transport(source: impl Into<anyhow::Error>) -> Self {
        Self::EstimationTransportFailed {
            source: source.into(),
        }
    }

    /// Whether the simulation could not be obtained at all
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::EstimationTransportFailed { .. })
    }

    /// Units consumed before failure, when the simulation itself ran
    pub fn units_consumed(&self) -> Option<u32> {
        match self {
            Self::SimulationExecutionFailed { units_consumed, .. } => Some(*units_consumed),
            _ => None,
        }
    }

    /// The typed cause of a transport failure, when it originated in this crate
    pub fn transport_cause(&self) -> Option<&ComputeBudgetError> {
        match self {
            Self::EstimationTransportFailed { source } => source.downcast_ref::<ComputeBudgetError>(),
            _ => None,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::EstimationTransportFailed { .. } => "transport",
            Self::SimulationExecutionFailed { .. } => "simulation",
            Self::EstimationUnsupported => "unsupported",
            Self::Cancelled => "cancelled",
            Self::DecodeOutOfRange { .. } | Self::UnknownInstruction { .. } => "codec",
            Self::MissingLifetime
            | Self::MessageCompile(_)
            | Self::WireSerialization(_)
            | Self::WireEncoding(_)
            | Self::Compile(_) => "compile",
        }
    }
}
