//! Integration tests for simulation-backed compute unit estimation
//!
//! This test validates:
//! - What the simulation request contains (wire message, options)
//! - Clamping of simulated units
//! - Error classification (execution failure vs transport failure)
//! - Cancellation of an in-flight simulation
//! - Messages that cannot be compiled never reach the transport

use std::sync::Arc;

use compute_budget_client::compute_budget::{
    get_set_compute_unit_limit_index_and_units, set_lifetime_using_blockhash,
    set_lifetime_using_durable_nonce, ComputeBudgetError, ComputeUnitEstimator,
    ComputeUnitLimitDetails, EstimateOptions, MessageVersion, SimulationResult,
    COMPUTE_BUDGET_PROGRAM_ID, MAX_COMPUTE_UNIT_LIMIT,
};
use compute_budget_client::test_utils::{
    message_with_compute_unit_limit, random_blockhash, transfer_message, MockResponse,
    MockSimulator,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::{AccountMeta, Instruction, InstructionError},
    message::CompileError,
    pubkey::Pubkey,
    transaction::TransactionError,
};
use solana_transaction_status::UiTransactionEncoding;
use tokio_util::sync::CancellationToken;

fn estimator(mock: &Arc<MockSimulator>) -> ComputeUnitEstimator<Arc<MockSimulator>> {
    ComputeUnitEstimator::new(mock.clone())
}

#[tokio::test]
async fn test_returns_simulated_units() {
    let mock = Arc::new(MockSimulator::new(4_321));
    let units = estimator(&mock)
        .estimate(&transfer_message(MessageVersion::V0), &EstimateOptions::default())
        .await
        .unwrap();

    assert_eq!(units, 4_321);
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn test_simulates_with_max_limit_appended_and_provisory_blockhash() {
    let mock = Arc::new(MockSimulator::new(100));
    let message = transfer_message(MessageVersion::Legacy);

    estimator(&mock)
        .estimate(&message, &EstimateOptions::default())
        .await
        .unwrap();

    let simulated = mock.last_request().unwrap().message();
    assert_eq!(simulated.version(), MessageVersion::Legacy);
    assert_eq!(simulated.instructions().len(), 2);
    assert_eq!(
        get_set_compute_unit_limit_index_and_units(&simulated).unwrap(),
        Some(ComputeUnitLimitDetails {
            index: 1,
            units: MAX_COMPUTE_UNIT_LIMIT
        })
    );
    assert_eq!(
        *simulated.lifetime_constraint().unwrap().recent_blockhash(),
        Hash::default()
    );

    // The caller's message is not modified
    assert_eq!(message.instructions().len(), 1);
    assert!(message.lifetime_constraint().is_none());
}

#[tokio::test]
async fn test_simulates_with_existing_limit_replaced_in_place() {
    let mock = Arc::new(MockSimulator::new(100));
    let message = message_with_compute_unit_limit(5_000);
    let blockhash = random_blockhash();
    let message = set_lifetime_using_blockhash(blockhash, 300, &message);

    estimator(&mock)
        .estimate(&message, &EstimateOptions::default())
        .await
        .unwrap();

    let simulated = mock.last_request().unwrap().message();
    assert_eq!(simulated.instructions().len(), 2);
    assert_eq!(
        get_set_compute_unit_limit_index_and_units(&simulated).unwrap(),
        Some(ComputeUnitLimitDetails {
            index: 1,
            units: MAX_COMPUTE_UNIT_LIMIT
        })
    );
    // An existing lifetime is kept
    assert_eq!(
        *simulated.lifetime_constraint().unwrap().recent_blockhash(),
        blockhash
    );
    assert!(mock.last_request().unwrap().config.replace_recent_blockhash);
}

#[tokio::test]
async fn test_durable_nonce_is_simulated_without_blockhash_replacement() {
    let mock = Arc::new(MockSimulator::new(100));
    let base = transfer_message(MessageVersion::V0);
    let nonce = random_blockhash();
    let message =
        set_lifetime_using_durable_nonce(nonce, Pubkey::new_unique(), *base.fee_payer(), &base);

    estimator(&mock)
        .estimate(&message, &EstimateOptions::default())
        .await
        .unwrap();

    let request = mock.last_request().unwrap();
    assert!(!request.config.replace_recent_blockhash);
    let simulated = request.message();
    assert_eq!(*simulated.lifetime_constraint().unwrap().recent_blockhash(), nonce);
    assert!(simulated.lifetime_constraint().unwrap().is_durable_nonce());
}

#[tokio::test]
async fn test_forwards_request_options() {
    let mock = Arc::new(MockSimulator::new(100));
    let options = EstimateOptions::default()
        .with_commitment(CommitmentConfig::finalized())
        .with_min_context_slot(987_654);

    estimator(&mock)
        .estimate(&transfer_message(MessageVersion::V0), &options)
        .await
        .unwrap();

    let config = mock.last_request().unwrap().config;
    assert_eq!(config.encoding, UiTransactionEncoding::Base64);
    assert!(!config.sig_verify);
    assert!(config.replace_recent_blockhash);
    assert_eq!(config.commitment, Some(CommitmentConfig::finalized()));
    assert_eq!(config.min_context_slot, Some(987_654));
}

#[tokio::test]
async fn test_units_are_clamped_to_u32() {
    let mock = Arc::new(MockSimulator::new(MAX_COMPUTE_UNIT_LIMIT as u64));
    let message = transfer_message(MessageVersion::V0);
    let options = EstimateOptions::default();

    assert_eq!(
        estimator(&mock).estimate(&message, &options).await.unwrap(),
        MAX_COMPUTE_UNIT_LIMIT
    );

    mock.set_default_response(MockResponse::Respond(SimulationResult::success(
        u32::MAX as u64 + 10,
    )));
    assert_eq!(
        estimator(&mock).estimate(&message, &options).await.unwrap(),
        u32::MAX
    );
}

#[tokio::test]
async fn test_execution_failure_carries_units_consumed() {
    let mock = Arc::new(MockSimulator::with_default(MockResponse::Respond(
        SimulationResult::failure(
            TransactionError::InstructionError(0, InstructionError::Custom(6001)),
            2_500,
        ),
    )));

    let err = estimator(&mock)
        .estimate(&transfer_message(MessageVersion::V0), &EstimateOptions::default())
        .await
        .unwrap_err();

    assert!(!err.is_transport_failure());
    assert_eq!(err.units_consumed(), Some(2_500));
    assert!(matches!(
        err,
        ComputeBudgetError::SimulationExecutionFailed {
            error: TransactionError::InstructionError(0, InstructionError::Custom(6001)),
            units_consumed: 2_500,
        }
    ));
}

#[tokio::test]
async fn test_execution_failure_units_are_clamped() {
    let mock = Arc::new(MockSimulator::with_default(MockResponse::Respond(
        SimulationResult::failure(TransactionError::AccountNotFound, u64::MAX),
    )));

    let err = estimator(&mock)
        .estimate(&transfer_message(MessageVersion::V0), &EstimateOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.units_consumed(), Some(u32::MAX));
}

#[tokio::test]
async fn test_missing_units_is_a_transport_failure() {
    let mock = Arc::new(MockSimulator::with_default(MockResponse::Respond(
        SimulationResult::default(),
    )));

    let err = estimator(&mock)
        .estimate(&transfer_message(MessageVersion::V0), &EstimateOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_transport_failure());
    assert!(matches!(
        err.transport_cause(),
        Some(ComputeBudgetError::EstimationUnsupported)
    ));
}

#[tokio::test]
async fn test_transport_error_is_wrapped() {
    let mock = Arc::new(MockSimulator::failing("connection refused"));

    let err = estimator(&mock)
        .estimate(&transfer_message(MessageVersion::V0), &EstimateOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_transport_failure());
    assert_eq!(err.category(), "transport");
    assert!(err.to_string().contains("connection refused"));
    assert!(err.transport_cause().is_none());
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_simulation() {
    let mock = Arc::new(MockSimulator::pending());
    let estimator = Arc::new(estimator(&mock));
    let token = CancellationToken::new();
    let options = EstimateOptions::default().with_cancellation(token.clone());
    let message = transfer_message(MessageVersion::V0);

    let handle = tokio::spawn({
        let estimator = estimator.clone();
        async move { estimator.estimate(&message, &options).await }
    });

    while mock.request_count() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(mock.in_flight(), 1);

    token.cancel();
    let err = handle.await.unwrap().unwrap_err();

    assert!(err.is_transport_failure());
    assert!(matches!(
        err.transport_cause(),
        Some(ComputeBudgetError::Cancelled)
    ));
    assert!(mock.last_request().unwrap().config.cancellation.is_cancelled());
    assert_eq!(mock.in_flight(), 0);
}

#[tokio::test]
async fn test_already_cancelled_token_fails_fast() {
    let mock = Arc::new(MockSimulator::pending());
    let token = CancellationToken::new();
    token.cancel();

    let err = estimator(&mock)
        .estimate(
            &transfer_message(MessageVersion::V0),
            &EstimateOptions::default().with_cancellation(token),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err.transport_cause(),
        Some(ComputeBudgetError::Cancelled)
    ));
    assert_eq!(mock.in_flight(), 0);
}

#[tokio::test]
async fn test_truncated_limit_instruction_is_not_a_transport_failure() {
    let mock = Arc::new(MockSimulator::new(100));
    let truncated = Instruction::new_with_bytes(COMPUTE_BUDGET_PROGRAM_ID, &[2, 0xff], vec![]);
    let message = transfer_message(MessageVersion::V0).append_instruction(truncated);

    let err = estimator(&mock)
        .estimate(&message, &EstimateOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ComputeBudgetError::DecodeOutOfRange { .. }));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_uncompilable_message_is_a_transport_failure() {
    let mock = Arc::new(MockSimulator::new(100));
    let accounts = (0..300)
        .map(|_| AccountMeta::new_readonly(Pubkey::new_unique(), false))
        .collect();
    let wide = Instruction::new_with_bytes(Pubkey::new_unique(), &[], accounts);

    for version in [MessageVersion::Legacy, MessageVersion::V0] {
        let message = transfer_message(version).append_instruction(wide.clone());

        let err = estimator(&mock)
            .estimate(&message, &EstimateOptions::default())
            .await
            .unwrap_err();

        assert!(err.is_transport_failure(), "{:?}", version);
        assert!(matches!(
            err.transport_cause(),
            Some(ComputeBudgetError::MessageCompile(
                CompileError::AccountIndexOverflow
            ))
        ));
    }
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_estimator_is_shared_across_tasks() {
    let mock = Arc::new(MockSimulator::new(777));
    let estimator = Arc::new(estimator(&mock));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let estimator = estimator.clone();
            tokio::spawn(async move {
                estimator
                    .estimate(&transfer_message(MessageVersion::V0), &EstimateOptions::default())
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 777);
    }
    assert_eq!(mock.request_count(), 8);
}
