//! Updating compute budget instructions of a message
//!
//! Updates follow copy-on-write rules:
//! 1. no matching instruction: a new one is appended
//! 2. the new value equals the current one: the input is returned as-is
//!    (same instruction list, no allocation)
//! 3. otherwise only the first matching slot is replaced
//!
//! All other instructions, including later budget instructions of the same
//! kind, are shared with the input message.

use solana_sdk::instruction::Instruction;

use super::codec::{get_set_compute_unit_limit_instruction, get_set_compute_unit_price_instruction};
use super::constants::PROVISORY_COMPUTE_UNIT_LIMIT;
use super::errors::ComputeBudgetError;
use super::locate::{
    get_set_compute_unit_limit_index_and_units, get_set_compute_unit_price_index_and_micro_lamports,
};
use super::message::TransactionMessage;

/// New value for a budget instruction: a literal, or derived from the current value
///
/// The update is consumed within the call it is passed to, so a derive
/// closure may borrow from the caller's stack.
pub enum UnitsUpdate<'a, T> {
    Literal(T),
    /// Receives `None` when the message has no such instruction yet
    Derive(Box<dyn FnOnce(Option<T>) -> T + Send + 'a>),
}

impl<'a, T> UnitsUpdate<'a, T> {
    pub fn derive<F>(f: F) -> Self
    where
        F: FnOnce(Option<T>) -> T + Send + 'a,
    {
        Self::Derive(Box::new(f))
    }

    fn resolve(self, previous: Option<T>) -> T {
        match self {
            Self::Literal(value) => value,
            Self::Derive(f) => f(previous),
        }
    }
}

impl<T> From<T> for UnitsUpdate<'_, T> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for UnitsUpdate<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

fn upsert<T: PartialEq + Copy>(
    message: &TransactionMessage,
    existing: Option<(usize, T)>,
    update: UnitsUpdate<'_, T>,
    build: impl FnOnce(T) -> Instruction,
) -> TransactionMessage {
    match existing {
        None => message.append_instruction(build(update.resolve(None))),
        Some((index, previous)) => {
            let value = update.resolve(Some(previous));
            if value == previous {
                return message.clone();
            }
            message.replace_instruction(index, build(value))
        }
    }
}

/// Update the first `SetComputeUnitLimit` instruction or append one
///
/// # Example
///
/// ```
/// use compute_budget_client::compute_budget::{
///     update_or_append_set_compute_unit_limit, MessageVersion, TransactionMessage,
///     UnitsUpdate, MAX_COMPUTE_UNIT_LIMIT,
/// };
/// use solana_sdk::pubkey::Pubkey;
///
/// let message = TransactionMessage::new(MessageVersion::V0, Pubkey::new_unique());
/// // Keep the current limit if it is set, otherwise use the maximum
/// let message = update_or_append_set_compute_unit_limit(
///     UnitsUpdate::derive(|current: Option<u32>| current.unwrap_or(MAX_COMPUTE_UNIT_LIMIT)),
///     &message,
/// )
/// .unwrap();
/// assert_eq!(message.instructions().len(), 1);
/// ```
pub fn update_or_append_set_compute_unit_limit<'a>(
    units: impl Into<UnitsUpdate<'a, u32>>,
    message: &TransactionMessage,
) -> Result<TransactionMessage, ComputeBudgetError> {
    let existing =
        get_set_compute_unit_limit_index_and_units(message)?.map(|d| (d.index, d.units));
    Ok(upsert(
        message,
        existing,
        units.into(),
        get_set_compute_unit_limit_instruction,
    ))
}

/// Update the first `SetComputeUnitPrice` instruction or append one
pub fn update_or_append_set_compute_unit_price<'a>(
    micro_lamports: impl Into<UnitsUpdate<'a, u64>>,
    message: &TransactionMessage,
) -> Result<TransactionMessage, ComputeBudgetError> {
    let existing = get_set_compute_unit_price_index_and_micro_lamports(message)?
        .map(|d| (d.index, d.micro_lamports));
    Ok(upsert(
        message,
        existing,
        micro_lamports.into(),
        get_set_compute_unit_price_instruction,
    ))
}

/// Append a provisory `SetComputeUnitLimit(0)` iff the message has none
///
/// Marks the message as needing an estimate before it is sent.
pub fn fill_provisory_set_compute_unit_limit(
    message: &TransactionMessage,
) -> Result<TransactionMessage, ComputeBudgetError> {
    update_or_append_set_compute_unit_limit(
        UnitsUpdate::derive(|previous: Option<u32>| {
            previous.unwrap_or(PROVISORY_COMPUTE_UNIT_LIMIT)
        }),
        message,
    )
}

/// Append a `SetComputeUnitPrice` instruction without looking for an existing one
pub fn set_transaction_message_compute_unit_price(
    micro_lamports: u64,
    message: &TransactionMessage,
) -> TransactionMessage {
    message.append_instruction(get_set_compute_unit_price_instruction(micro_lamports))
}
