//! Immutable transaction message model
//!
//! A `TransactionMessage` is a value: every transform returns a new message.
//! The instruction list is a shared `Arc<[Arc<Instruction>]>`, so a transform
//! that touches one slot allocates a new list of pointers and reuses every
//! other instruction as-is. Messages can be shared across tasks freely.
//!
//! The message can be compiled to a `VersionedTransaction` (legacy or v0
//! without lookup tables) once it carries a lifetime constraint, and rebuilt
//! from a compiled message through [`TransactionMessage::try_from_versioned_message`].

use std::{collections::HashSet, sync::Arc};

use base64::{prelude::BASE64_STANDARD, Engine};
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{v0, CompileError, Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};

use super::errors::ComputeBudgetError;
use super::lifetime::is_advance_nonce_account_instruction;
use crate::compat;

/// Compiled instructions address accounts with a `u8` index
const MAX_ACCOUNT_KEYS: usize = u8::MAX as usize + 1;

/// Wire format version of the compiled message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageVersion {
    Legacy,
    #[default]
    V0,
}

/// How long a transaction stays valid for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifetimeConstraint {
    /// Expires once the chain passes `last_valid_block_height`
    Blockhash {
        blockhash: Hash,
        last_valid_block_height: u64,
    },
    /// Valid until the nonce stored in `nonce_account` is advanced
    DurableNonce {
        nonce: Hash,
        nonce_account: Pubkey,
        nonce_authority: Pubkey,
    },
}

impl LifetimeConstraint {
    /// The value compiled into the message's `recent_blockhash` slot
    pub fn recent_blockhash(&self) -> &Hash {
        match self {
            Self::Blockhash { blockhash, .. } => blockhash,
            Self::DurableNonce { nonce, .. } => nonce,
        }
    }

    pub fn is_durable_nonce(&self) -> bool {
        matches!(self, Self::DurableNonce { .. })
    }

    /// Whether this is the placeholder used only to permit simulation
    pub fn is_provisory(&self) -> bool {
        matches!(
            self,
            Self::Blockhash { blockhash, last_valid_block_height: 0 } if *blockhash == Hash::default()
        )
    }
}

/// Ordered instructions, fee payer and optional lifetime of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMessage {
    version: MessageVersion,
    fee_payer: Pubkey,
    instructions: Arc<[Arc<Instruction>]>,
    lifetime_constraint: Option<LifetimeConstraint>,
}

impl TransactionMessage {
    /// Create an empty message without a lifetime constraint
    pub fn new(version: MessageVersion, fee_payer: Pubkey) -> Self {
        Self {
            version,
            fee_payer,
            instructions: Arc::from(Vec::new()),
            lifetime_constraint: None,
        }
    }

    pub fn new_with_instructions(
        version: MessageVersion,
        fee_payer: Pubkey,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> Self {
        Self {
            version,
            fee_payer,
            instructions: instructions.into_iter().map(Arc::new).collect(),
            lifetime_constraint: None,
        }
    }

    pub fn version(&self) -> MessageVersion {
        self.version
    }

    pub fn fee_payer(&self) -> &Pubkey {
        &self.fee_payer
    }

    /// Shared instruction list; compare with `Arc::ptr_eq` to detect no-op updates
    pub fn instructions(&self) -> &Arc<[Arc<Instruction>]> {
        &self.instructions
    }

    pub fn lifetime_constraint(&self) -> Option<&LifetimeConstraint> {
        self.lifetime_constraint.as_ref()
    }

    pub fn with_fee_payer(&self, fee_payer: Pubkey) -> Self {
        Self {
            fee_payer,
            ..self.clone()
        }
    }

    pub fn with_lifetime_constraint(&self, lifetime_constraint: LifetimeConstraint) -> Self {
        Self {
            lifetime_constraint: Some(lifetime_constraint),
            ..self.clone()
        }
    }

    pub fn append_instruction(&self, instruction: Instruction) -> Self {
        let mut instructions = Vec::with_capacity(self.instructions.len() + 1);
        instructions.extend(self.instructions.iter().cloned());
        instructions.push(Arc::new(instruction));
        self.with_instruction_list(instructions)
    }

    pub fn prepend_instruction(&self, instruction: Instruction) -> Self {
        let mut instructions = Vec::with_capacity(self.instructions.len() + 1);
        instructions.push(Arc::new(instruction));
        instructions.extend(self.instructions.iter().cloned());
        self.with_instruction_list(instructions)
    }

    /// Copy-on-write replacement of the instruction at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds. Callers obtain it from a lookup on
    /// the same message.
    pub(crate) fn replace_instruction(&self, index: usize, instruction: Instruction) -> Self {
        let mut instructions: Vec<Arc<Instruction>> = self.instructions.to_vec();
        instructions[index] = Arc::new(instruction);
        self.with_instruction_list(instructions)
    }

    fn with_instruction_list(&self, instructions: Vec<Arc<Instruction>>) -> Self {
        Self {
            instructions: Arc::from(instructions),
            ..self.clone()
        }
    }

    /// Compile into an unsigned transaction with placeholder signatures
    pub fn compile(&self) -> Result<VersionedTransaction, ComputeBudgetError> {
        let lifetime = self
            .lifetime_constraint
            .as_ref()
            .ok_or(ComputeBudgetError::MissingLifetime)?;
        let recent_blockhash = *lifetime.recent_blockhash();
        let instructions: Vec<Instruction> =
            self.instructions.iter().map(|ix| (**ix).clone()).collect();

        let message = match self.version {
            MessageVersion::Legacy => {
                // Legacy compilation panics instead of reporting index overflow
                if self.unique_account_keys() > MAX_ACCOUNT_KEYS {
                    return Err(CompileError::AccountIndexOverflow.into());
                }
                VersionedMessage::Legacy(Message::new_with_blockhash(
                    &instructions,
                    Some(&self.fee_payer),
                    &recent_blockhash,
                ))
            }
            MessageVersion::V0 => VersionedMessage::V0(v0::Message::try_compile(
                &self.fee_payer,
                &instructions,
                &[],
                recent_blockhash,
            )?),
        };

        let num_signatures = compat::get_num_required_signatures(&message) as usize;
        Ok(VersionedTransaction {
            signatures: vec![Signature::default(); num_signatures],
            message,
        })
    }

    /// Distinct keys the compiled message would carry
    fn unique_account_keys(&self) -> usize {
        let mut keys = HashSet::with_capacity(1 + self.instructions.len() * 4);
        keys.insert(self.fee_payer);
        for ix in self.instructions.iter() {
            keys.insert(ix.program_id);
            keys.extend(ix.accounts.iter().map(|meta| meta.pubkey));
        }
        keys.len()
    }

    /// Compile and encode as base64 wire bytes
    pub fn compile_to_base64_wire(&self) -> Result<String, ComputeBudgetError> {
        let transaction = self.compile()?;
        encode_base64_wire(&transaction)
    }

    /// Rebuild a message from its compiled form
    ///
    /// Messages using address lookup tables cannot be resolved offline and
    /// are rejected. A leading `AdvanceNonceAccount` instruction yields a
    /// durable nonce lifetime; otherwise the blockhash lifetime carries
    /// `u64::MAX` as its last valid block height since the compiled form
    /// does not record it.
    pub fn try_from_versioned_message(
        message: &VersionedMessage,
    ) -> Result<Self, ComputeBudgetError> {
        let version = match message {
            VersionedMessage::Legacy(_) => MessageVersion::Legacy,
            VersionedMessage::V0(v0_msg) => {
                if !v0_msg.address_table_lookups.is_empty() {
                    return Err(ComputeBudgetError::Compile(
                        "messages with address table lookups cannot be decompiled".to_string(),
                    ));
                }
                MessageVersion::V0
            }
        };

        let account_keys = compat::get_static_account_keys(message);
        let fee_payer = *account_keys
            .first()
            .ok_or_else(|| ComputeBudgetError::Compile("message has no accounts".to_string()))?;

        let key_at = |index: u8| {
            account_keys.get(index as usize).copied().ok_or_else(|| {
                ComputeBudgetError::Compile(format!("account index {} out of range", index))
            })
        };

        let mut instructions = Vec::with_capacity(message.instructions().len());
        for compiled in message.instructions() {
            let program_id = key_at(compiled.program_id_index)?;
            let accounts = compiled
                .accounts
                .iter()
                .map(|&index| {
                    Ok(AccountMeta {
                        pubkey: key_at(index)?,
                        is_signer: compat::is_signer_index(message, index as usize),
                        is_writable: compat::is_writable_index(message, index as usize),
                    })
                })
                .collect::<Result<Vec<_>, ComputeBudgetError>>()?;
            instructions.push(Instruction {
                program_id,
                accounts,
                data: compiled.data.clone(),
            });
        }

        let recent_blockhash = *message.recent_blockhash();
        let lifetime_constraint = match instructions.first() {
            Some(first) if is_advance_nonce_account_instruction(first) => {
                LifetimeConstraint::DurableNonce {
                    nonce: recent_blockhash,
                    nonce_account: first.accounts[0].pubkey,
                    nonce_authority: first.accounts[2].pubkey,
                }
            }
            _ => LifetimeConstraint::Blockhash {
                blockhash: recent_blockhash,
                last_valid_block_height: u64::MAX,
            },
        };

        Ok(Self::new_with_instructions(version, fee_payer, instructions)
            .with_lifetime_constraint(lifetime_constraint))
    }
}

/// Serialize a transaction with bincode and encode it as base64
pub fn encode_base64_wire(transaction: &VersionedTransaction) -> Result<String, ComputeBudgetError> {
    let bytes = bincode::serialize(transaction)?;
    Ok(BASE64_STANDARD.encode(bytes))
}

/// Decode base64 wire bytes into a transaction
pub fn decode_base64_wire(wire: &str) -> Result<VersionedTransaction, ComputeBudgetError> {
    let bytes = BASE64_STANDARD.decode(wire.trim())?;
    Ok(bincode::deserialize(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_budget::codec::get_set_compute_unit_limit_instruction;
    #[allow(deprecated)]
    use solana_sdk::system_instruction;

    fn transfer_ix(from: &Pubkey) -> Instruction {
        system_instruction::transfer(from, &Pubkey::new_unique(), 1_000)
    }

    #[test]
    fn test_append_shares_existing_instructions() {
        let payer = Pubkey::new_unique();
        let message =
            TransactionMessage::new_with_instructions(MessageVersion::V0, payer, [transfer_ix(&payer)]);
        let appended = message.append_instruction(get_set_compute_unit_limit_instruction(1));

        assert_eq!(message.instructions().len(), 1);
        assert_eq!(appended.instructions().len(), 2);
        assert!(Arc::ptr_eq(
            &message.instructions()[0],
            &appended.instructions()[0]
        ));
    }

    #[test]
    fn test_prepend_puts_instruction_first() {
        let payer = Pubkey::new_unique();
        let message =
            TransactionMessage::new_with_instructions(MessageVersion::V0, payer, [transfer_ix(&payer)]);
        let limit_ix = get_set_compute_unit_limit_instruction(5);
        let prepended = message.prepend_instruction(limit_ix.clone());

        assert_eq!(*prepended.instructions()[0], limit_ix);
        assert!(Arc::ptr_eq(
            &message.instructions()[0],
            &prepended.instructions()[1]
        ));
    }

    #[test]
    fn test_compile_requires_lifetime() {
        let message = TransactionMessage::new(MessageVersion::V0, Pubkey::new_unique());
        assert!(matches!(
            message.compile(),
            Err(ComputeBudgetError::MissingLifetime)
        ));
    }

    #[test]
    fn test_compile_rejects_account_index_overflow() {
        let payer = Pubkey::new_unique();
        let accounts = (0..300)
            .map(|_| AccountMeta::new_readonly(Pubkey::new_unique(), false))
            .collect();
        let wide = Instruction::new_with_bytes(Pubkey::new_unique(), &[], accounts);

        for version in [MessageVersion::Legacy, MessageVersion::V0] {
            let message = TransactionMessage::new_with_instructions(version, payer, [wide.clone()])
                .with_lifetime_constraint(LifetimeConstraint::Blockhash {
                    blockhash: Hash::new_unique(),
                    last_valid_block_height: 100,
                });

            assert!(
                matches!(
                    message.compile(),
                    Err(ComputeBudgetError::MessageCompile(
                        CompileError::AccountIndexOverflow
                    ))
                ),
                "{:?}",
                version
            );
            assert!(message.compile_to_base64_wire().is_err());
        }
    }

    #[test]
    fn test_compile_accepts_exactly_256_keys() {
        let payer = Pubkey::new_unique();
        // payer + program + 254 accounts
        let accounts = (0..254)
            .map(|_| AccountMeta::new_readonly(Pubkey::new_unique(), false))
            .collect();
        let wide = Instruction::new_with_bytes(Pubkey::new_unique(), &[], accounts);
        let message =
            TransactionMessage::new_with_instructions(MessageVersion::Legacy, payer, [wide])
                .with_lifetime_constraint(LifetimeConstraint::Blockhash {
                    blockhash: Hash::new_unique(),
                    last_valid_block_height: 100,
                });

        let tx = message.compile().unwrap();
        assert_eq!(compat::get_static_account_keys(&tx.message).len(), 256);
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        assert!(matches!(
            decode_base64_wire("not base64!"),
            Err(ComputeBudgetError::WireEncoding(_))
        ));
        assert!(matches!(
            decode_base64_wire("AAAA"),
            Err(ComputeBudgetError::WireSerialization(_))
        ));
    }

    #[test]
    fn test_compile_uses_lifetime_blockhash() {
        let payer = Pubkey::new_unique();
        let blockhash = Hash::new_unique();
        for version in [MessageVersion::Legacy, MessageVersion::V0] {
            let message =
                TransactionMessage::new_with_instructions(version, payer, [transfer_ix(&payer)])
                    .with_lifetime_constraint(LifetimeConstraint::Blockhash {
                        blockhash,
                        last_valid_block_height: 100,
                    });

            let tx = message.compile().unwrap();
            assert_eq!(*tx.message.recent_blockhash(), blockhash);
            assert_eq!(tx.signatures, vec![Signature::default()]);
            assert_eq!(compat::get_static_account_keys(&tx.message)[0], payer);
        }
    }

    #[test]
    fn test_base64_wire_roundtrip_and_decompile() {
        let payer = Pubkey::new_unique();
        let message = TransactionMessage::new_with_instructions(
            MessageVersion::Legacy,
            payer,
            [transfer_ix(&payer), get_set_compute_unit_limit_instruction(77)],
        )
        .with_lifetime_constraint(LifetimeConstraint::Blockhash {
            blockhash: Hash::new_unique(),
            last_valid_block_height: u64::MAX,
        });

        let wire = message.compile_to_base64_wire().unwrap();
        let tx = decode_base64_wire(&wire).unwrap();
        let rebuilt = TransactionMessage::try_from_versioned_message(&tx.message).unwrap();

        assert_eq!(rebuilt, message);
    }

    #[test]
    fn test_decompile_detects_durable_nonce() {
        let payer = Pubkey::new_unique();
        let nonce_account = Pubkey::new_unique();
        let nonce = Hash::new_unique();
        let lifetime = LifetimeConstraint::DurableNonce {
            nonce,
            nonce_account,
            nonce_authority: payer,
        };
        let message = TransactionMessage::new_with_instructions(
            MessageVersion::V0,
            payer,
            [
                system_instruction::advance_nonce_account(&nonce_account, &payer),
                transfer_ix(&payer),
            ],
        )
        .with_lifetime_constraint(lifetime.clone());

        let tx = message.compile().unwrap();
        let rebuilt = TransactionMessage::try_from_versioned_message(&tx.message).unwrap();
        assert_eq!(rebuilt.lifetime_constraint(), Some(&lifetime));
    }

    #[test]
    fn test_provisory_detection() {
        assert!(LifetimeConstraint::Blockhash {
            blockhash: Hash::default(),
            last_valid_block_height: 0,
        }
        .is_provisory());
        assert!(!LifetimeConstraint::Blockhash {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 0,
        }
        .is_provisory());
    }
}
