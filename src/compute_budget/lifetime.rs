//! Lifetime constraint helpers
//!
//! Simulation needs a compilable message, which needs a lifetime. Messages
//! built ahead of fetching a blockhash get the provisory blockhash lifetime;
//! a lifetime the caller already chose, including a durable nonce, is kept.

use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    system_program,
};
#[allow(deprecated)]
use solana_sdk::system_instruction;

use super::constants::PROVISORY_BLOCKHASH_LIFETIME_CONSTRAINT;
use super::message::{LifetimeConstraint, TransactionMessage};

/// Attach the provisory blockhash lifetime iff the message has no lifetime
pub fn fill_missing_lifetime_using_provisory_blockhash(
    message: &TransactionMessage,
) -> TransactionMessage {
    if message.lifetime_constraint().is_some() {
        return message.clone();
    }
    set_lifetime_using_provisory_blockhash(message)
}

/// Short name for [`fill_missing_lifetime_using_provisory_blockhash`]
#[inline]
pub fn ensure_lifetime(message: &TransactionMessage) -> TransactionMessage {
    fill_missing_lifetime_using_provisory_blockhash(message)
}

pub fn set_lifetime_using_provisory_blockhash(message: &TransactionMessage) -> TransactionMessage {
    message.with_lifetime_constraint(PROVISORY_BLOCKHASH_LIFETIME_CONSTRAINT.clone())
}

pub fn set_lifetime_using_blockhash(
    blockhash: Hash,
    last_valid_block_height: u64,
    message: &TransactionMessage,
) -> TransactionMessage {
    message.with_lifetime_constraint(LifetimeConstraint::Blockhash {
        blockhash,
        last_valid_block_height,
    })
}

/// Use a durable nonce as lifetime
///
/// The `AdvanceNonceAccount` instruction must be the first instruction:
/// - an identical one already first is kept
/// - one for another nonce account or authority is replaced
/// - otherwise one is prepended
pub fn set_lifetime_using_durable_nonce(
    nonce: Hash,
    nonce_account: Pubkey,
    nonce_authority: Pubkey,
    message: &TransactionMessage,
) -> TransactionMessage {
    let advance_ix = system_instruction::advance_nonce_account(&nonce_account, &nonce_authority);
    let lifetime = LifetimeConstraint::DurableNonce {
        nonce,
        nonce_account,
        nonce_authority,
    };

    let updated = match message.instructions().first() {
        Some(first) if is_advance_nonce_account_instruction(first) => {
            if **first == advance_ix {
                message.clone()
            } else {
                message.replace_instruction(0, advance_ix)
            }
        }
        _ => message.prepend_instruction(advance_ix),
    };
    updated.with_lifetime_constraint(lifetime)
}

/// Whether the message uses a durable nonce lifetime
///
/// Simulation of such messages must not ask the node to replace the
/// blockhash, because the nonce value is what the runtime validates.
pub fn is_durable_nonce_transaction(message: &TransactionMessage) -> bool {
    message
        .lifetime_constraint()
        .is_some_and(LifetimeConstraint::is_durable_nonce)
}

/// System program `AdvanceNonceAccount`: discriminator 4 as u32 LE, three accounts
pub fn is_advance_nonce_account_instruction(ix: &Instruction) -> bool {
    ix.program_id == system_program::id()
        && ix.data.len() >= 4
        && ix.data[..4] == [4, 0, 0, 0]
        && ix.accounts.len() == 3
}
