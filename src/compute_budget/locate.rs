//! Locating compute budget instructions inside a message
//!
//! Only the first matching instruction counts. An instruction matches when
//! its program id is the Compute Budget program and its payload carries the
//! expected discriminator.

use solana_sdk::instruction::Instruction;

use super::codec::{
    decode_set_compute_unit_limit_units, decode_set_compute_unit_price_micro_lamports,
    identify_compute_budget_instruction, ComputeBudgetInstructionKind,
};
use super::constants::COMPUTE_BUDGET_PROGRAM_ID;
use super::errors::ComputeBudgetError;
use super::message::TransactionMessage;

/// Index of the first instruction satisfying `predicate`
pub fn find_first<P>(message: &TransactionMessage, mut predicate: P) -> Option<usize>
where
    P: FnMut(&Instruction) -> bool,
{
    message
        .instructions()
        .iter()
        .position(|ix| predicate(ix.as_ref()))
}

#[inline]
pub fn is_compute_budget_instruction_of_kind(
    ix: &Instruction,
    kind: ComputeBudgetInstructionKind,
) -> bool {
    ix.program_id == COMPUTE_BUDGET_PROGRAM_ID
        && identify_compute_budget_instruction(&ix.data) == Some(kind)
}

pub fn is_set_compute_unit_limit_instruction(ix: &Instruction) -> bool {
    is_compute_budget_instruction_of_kind(ix, ComputeBudgetInstructionKind::SetComputeUnitLimit)
}

pub fn is_set_compute_unit_price_instruction(ix: &Instruction) -> bool {
    is_compute_budget_instruction_of_kind(ix, ComputeBudgetInstructionKind::SetComputeUnitPrice)
}

pub fn find_set_compute_unit_limit_index(message: &TransactionMessage) -> Option<usize> {
    find_first(message, is_set_compute_unit_limit_instruction)
}

pub fn find_set_compute_unit_price_index(message: &TransactionMessage) -> Option<usize> {
    find_first(message, is_set_compute_unit_price_instruction)
}

/// Position and value of the first `SetComputeUnitLimit` instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeUnitLimitDetails {
    pub index: usize,
    pub units: u32,
}

/// Position and value of the first `SetComputeUnitPrice` instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeUnitPriceDetails {
    pub index: usize,
    pub micro_lamports: u64,
}

/// Index and decoded units of the first `SetComputeUnitLimit` instruction
///
/// `Ok(None)` when absent. A matching instruction whose payload is shorter
/// than 5 bytes is corrupt and yields `DecodeOutOfRange`.
pub fn get_set_compute_unit_limit_index_and_units(
    message: &TransactionMessage,
) -> Result<Option<ComputeUnitLimitDetails>, ComputeBudgetError> {
    let Some(index) = find_set_compute_unit_limit_index(message) else {
        return Ok(None);
    };
    let units = decode_set_compute_unit_limit_units(&message.instructions()[index].data)?;
    Ok(Some(ComputeUnitLimitDetails { index, units }))
}

/// Index and decoded price of the first `SetComputeUnitPrice` instruction
pub fn get_set_compute_unit_price_index_and_micro_lamports(
    message: &TransactionMessage,
) -> Result<Option<ComputeUnitPriceDetails>, ComputeBudgetError> {
    let Some(index) = find_set_compute_unit_price_index(message) else {
        return Ok(None);
    };
    let micro_lamports =
        decode_set_compute_unit_price_micro_lamports(&message.instructions()[index].data)?;
    Ok(Some(ComputeUnitPriceDetails {
        index,
        micro_lamports,
    }))
}
