//! cu-estimate - compute unit limit estimation for Solana transactions
//!
//! Reads a base64 wire transaction, simulates it against an RPC node and
//! prints the estimated compute unit limit together with the updated
//! transaction. Transactions with an explicit limit are left untouched;
//! a missing limit, `0` or `1_400_000` is replaced by the estimate.
//!
//! The output transaction carries placeholder signatures and must be
//! signed before it is sent.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use compute_budget_client::compute_budget::{
    decode_base64_wire, get_set_compute_unit_limit_index_and_units,
    update_or_append_set_compute_unit_price, ComputeBudgetError, ComputeUnitEstimator,
    EstimateOptions, ProvisoryComputeUnitLimitUpdater, TransactionMessage,
};
use compute_budget_client::config::Config;
use compute_budget_client::CorrelationId;
use solana_client::nonblocking::rpc_client::RpcClient;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base64 wire transaction; read from stdin when omitted
    transaction: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "cu-estimate.toml")]
    config: String,

    /// RPC endpoint (overrides rpc.url)
    #[arg(long, env = "CU_ESTIMATE_RPC_URL")]
    rpc_url: Option<String>,

    /// Commitment level (overrides rpc.commitment)
    #[arg(long, env = "CU_ESTIMATE_COMMITMENT")]
    commitment: Option<String>,

    /// Estimation timeout in milliseconds (overrides rpc.timeout_ms)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Minimum context slot for the simulation
    #[arg(long)]
    min_context_slot: Option<u64>,

    /// Also set the compute unit price, in micro-lamports per unit
    #[arg(long)]
    compute_unit_price: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    init_logging(config.logging.verbose, config.logging.json)?;
    debug!(rpc_url = %config.rpc.url, timeout_ms = config.rpc.timeout_ms, "Configuration loaded");

    let wire = match &args.transaction {
        Some(wire) => wire.clone(),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read transaction from stdin")?;
            input
        }
    };
    let transaction = decode_base64_wire(&wire).context("Failed to decode transaction")?;
    let mut message = TransactionMessage::try_from_versioned_message(&transaction.message)
        .context("Failed to decompile transaction message")?;

    if let Some(price) = args.compute_unit_price {
        message = update_or_append_set_compute_unit_price(price, &message)?;
    }

    let commitment = config.rpc.commitment_config()?;
    let rpc = Arc::new(RpcClient::new_with_commitment(
        config.rpc.url.clone(),
        commitment,
    ));
    let updater = ProvisoryComputeUnitLimitUpdater::new(ComputeUnitEstimator::new(rpc));

    let cancellation = CancellationToken::new();
    let correlation_id = CorrelationId::new();
    let mut options = EstimateOptions::default()
        .with_commitment(commitment)
        .with_cancellation(cancellation.clone())
        .with_correlation_id(correlation_id.clone());
    if let Some(slot) = config.estimator.min_context_slot {
        options = options.with_min_context_slot(slot);
    }

    let timeout = Duration::from_millis(config.rpc.timeout_ms);
    let timer = tokio::spawn({
        let cancellation = cancellation.clone();
        async move {
            tokio::time::sleep(timeout).await;
            warn!(timeout_ms = timeout.as_millis() as u64, "Estimation timed out, cancelling");
            cancellation.cancel();
        }
    });

    let result = updater.estimate_and_update(&message, &options).await;
    timer.abort();

    let updated = match result {
        Ok(updated) => updated,
        Err(ComputeBudgetError::SimulationExecutionFailed {
            error,
            units_consumed,
        }) => {
            println!("units_consumed: {}", units_consumed);
            anyhow::bail!("Transaction would fail: {}", error);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Estimation failed ({})", correlation_id));
        }
    };

    let units = get_set_compute_unit_limit_index_and_units(&updated)?
        .map(|details| details.units)
        .unwrap_or_default();
    info!(%correlation_id, units, "Compute unit limit ready");

    println!("compute_unit_limit: {}", units);
    println!("transaction: {}", updated.compile_to_base64_wire()?);

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "compute_budget_client=debug,cu_estimate=debug,info"
    } else {
        "compute_budget_client=info,cu_estimate=info,warn"
    };

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        dotenvy::dotenv().ok();
        Ok(Config::default())
    }
}

/// Command line flags win over file values
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(url) = &args.rpc_url {
        config.rpc.url = url.clone();
    }
    if let Some(commitment) = &args.commitment {
        config.rpc.commitment = commitment.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.rpc.timeout_ms = timeout_ms;
    }
    if let Some(slot) = args.min_context_slot {
        config.estimator.min_context_slot = Some(slot);
    }
    config.logging.verbose |= args.verbose;
    config.logging.json |= args.json;
}
