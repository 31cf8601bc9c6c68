//! Test Utilities Module
//!
//! Mocks and fixtures for exercising estimation without a network. Only
//! compiled for tests or when the `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{hash::Hash, instruction::Instruction, pubkey::Pubkey};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::compute_budget::{
    decode_base64_wire, get_set_compute_unit_limit_instruction, ComputeBudgetError,
    MessageVersion, SimulationConfig, SimulationResult, SimulationTransport, TransactionMessage,
};

/// Scripted outcome of one simulation request
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Respond with this result
    Respond(SimulationResult),
    /// Fail the transport call with this message
    Fail(String),
    /// Never respond; resolves only once the request is cancelled
    Pending,
}

/// A simulation request as seen by the transport
#[derive(Debug, Clone)]
pub struct RecordedSimulation {
    pub wire_transaction: String,
    pub config: SimulationConfig,
}

impl RecordedSimulation {
    /// The simulated message, rebuilt from the wire bytes
    pub fn message(&self) -> TransactionMessage {
        let transaction =
            decode_base64_wire(&self.wire_transaction).expect("mock received invalid wire bytes");
        TransactionMessage::try_from_versioned_message(&transaction.message)
            .expect("mock received undecompilable message")
    }
}

/// Mock `SimulationTransport` for testing
///
/// Responses are consumed in order; once the queue is empty the default
/// response is used. Every request is recorded.
#[derive(Clone)]
pub struct MockSimulator {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    default_response: Arc<Mutex<MockResponse>>,
    requests: Arc<Mutex<Vec<RecordedSimulation>>>,
    in_flight: Arc<AtomicUsize>,
}

impl MockSimulator {
    /// Simulator answering every request with `units_consumed` and no error
    pub fn new(units_consumed: u64) -> Self {
        Self::with_default(MockResponse::Respond(SimulationResult::success(
            units_consumed,
        )))
    }

    pub fn with_default(response: MockResponse) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            default_response: Arc::new(Mutex::new(response)),
            requests: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulator whose requests never complete
    pub fn pending() -> Self {
        Self::with_default(MockResponse::Pending)
    }

    /// Simulator whose transport always errors
    pub fn failing(message: &str) -> Self {
        Self::with_default(MockResponse::Fail(message.to_string()))
    }

    /// Queue a response for the next request
    pub fn push_response(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock() = response;
    }

    pub fn requests(&self) -> Vec<RecordedSimulation> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<RecordedSimulation> {
        self.requests.lock().last().cloned()
    }

    /// Number of requests currently awaiting a response
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_response.lock().clone())
    }
}

/// Decrements the in-flight counter even when the request future is dropped
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SimulationTransport for MockSimulator {
    async fn simulate_transaction(
        &self,
        wire_transaction: String,
        config: SimulationConfig,
    ) -> Result<SimulationResult> {
        self.requests.lock().push(RecordedSimulation {
            wire_transaction,
            config: config.clone(),
        });
        let _guard = InFlightGuard::enter(&self.in_flight);
        tokio::task::yield_now().await;

        match self.next_response() {
            MockResponse::Respond(result) => Ok(result),
            MockResponse::Fail(message) => Err(anyhow!(message)),
            MockResponse::Pending => {
                config.cancellation.cancelled().await;
                Err(ComputeBudgetError::Cancelled.into())
            }
        }
    }
}

/// A system transfer from `payer`
#[allow(deprecated)]
pub fn transfer_instruction(payer: &Pubkey) -> Instruction {
    system_instruction::transfer(payer, &Pubkey::new_unique(), 1_000)
}

/// Message with one transfer and no lifetime
pub fn transfer_message(version: MessageVersion) -> TransactionMessage {
    let payer = Pubkey::new_unique();
    TransactionMessage::new_with_instructions(version, payer, [transfer_instruction(&payer)])
}

/// Transfer message carrying a `SetComputeUnitLimit(units)` instruction
pub fn message_with_compute_unit_limit(units: u32) -> TransactionMessage {
    transfer_message(MessageVersion::V0)
        .append_instruction(get_set_compute_unit_limit_instruction(units))
}

/// Random blockhash, for lifetimes that must not look provisory
pub fn random_blockhash() -> Hash {
    Hash::new_unique()
}
