//! Compute Budget program instruction codec
//!
//! Payload layout is a one-byte discriminator followed by each field,
//! little-endian, at its natural width:
//!
//! | kind                  | discriminator | fields                              |
//! |-----------------------|---------------|-------------------------------------|
//! | `RequestUnits`        | 0             | `units: u32`, `additional_fee: u32` |
//! | `SetComputeUnitLimit` | 2             | `units: u32`                        |
//! | `SetComputeUnitPrice` | 3             | `micro_lamports: u64`               |
//!
//! Fields are read at fixed offsets starting at 1. Trailing bytes are ignored.

use solana_sdk::instruction::Instruction;

use super::constants::COMPUTE_BUDGET_PROGRAM_ID;
use super::errors::ComputeBudgetError;

/// Discriminator-level identity of a compute budget instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeBudgetInstructionKind {
    RequestUnits,
    SetComputeUnitLimit,
    SetComputeUnitPrice,
}

impl ComputeBudgetInstructionKind {
    pub const fn discriminator(self) -> u8 {
        match self {
            Self::RequestUnits => 0,
            Self::SetComputeUnitLimit => 2,
            Self::SetComputeUnitPrice => 3,
        }
    }

    /// Total encoded length: discriminator plus fixed-width fields
    pub const fn encoded_len(self) -> usize {
        match self {
            Self::RequestUnits => 1 + 4 + 4,
            Self::SetComputeUnitLimit => 1 + 4,
            Self::SetComputeUnitPrice => 1 + 8,
        }
    }

    pub const fn from_discriminator(discriminator: u8) -> Option<Self> {
        match discriminator {
            0 => Some(Self::RequestUnits),
            2 => Some(Self::SetComputeUnitLimit),
            3 => Some(Self::SetComputeUnitPrice),
            _ => None,
        }
    }
}

/// Decoded compute budget instruction payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeBudgetInstruction {
    /// Deprecated combined limit and fee request
    RequestUnits { units: u32, additional_fee: u32 },
    SetComputeUnitLimit { units: u32 },
    SetComputeUnitPrice { micro_lamports: u64 },
}

impl ComputeBudgetInstruction {
    pub fn kind(&self) -> ComputeBudgetInstructionKind {
        match self {
            Self::RequestUnits { .. } => ComputeBudgetInstructionKind::RequestUnits,
            Self::SetComputeUnitLimit { .. } => ComputeBudgetInstructionKind::SetComputeUnitLimit,
            Self::SetComputeUnitPrice { .. } => ComputeBudgetInstructionKind::SetComputeUnitPrice,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let kind = self.kind();
        let mut data = Vec::with_capacity(kind.encoded_len());
        data.push(kind.discriminator());
        match *self {
            Self::RequestUnits {
                units,
                additional_fee,
            } => {
                data.extend_from_slice(&units.to_le_bytes());
                data.extend_from_slice(&additional_fee.to_le_bytes());
            }
            Self::SetComputeUnitLimit { units } => data.extend_from_slice(&units.to_le_bytes()),
            Self::SetComputeUnitPrice { micro_lamports } => {
                data.extend_from_slice(&micro_lamports.to_le_bytes())
            }
        }
        data
    }

    pub fn decode(data: &[u8]) -> Result<Self, ComputeBudgetError> {
        let kind = identify_compute_budget_instruction(data).ok_or(
            ComputeBudgetError::UnknownInstruction {
                discriminator: data.first().copied(),
            },
        )?;
        check_len(data, kind)?;

        Ok(match kind {
            ComputeBudgetInstructionKind::RequestUnits => Self::RequestUnits {
                units: read_u32(data, 1),
                additional_fee: read_u32(data, 5),
            },
            ComputeBudgetInstructionKind::SetComputeUnitLimit => Self::SetComputeUnitLimit {
                units: read_u32(data, 1),
            },
            ComputeBudgetInstructionKind::SetComputeUnitPrice => Self::SetComputeUnitPrice {
                micro_lamports: read_u64(data, 1),
            },
        })
    }

    /// Build a full instruction targeting the Compute Budget program
    pub fn to_instruction(&self) -> Instruction {
        Instruction::new_with_bytes(COMPUTE_BUDGET_PROGRAM_ID, &self.encode(), vec![])
    }
}

/// Identify a payload by its leading discriminator byte
#[inline]
pub fn identify_compute_budget_instruction(data: &[u8]) -> Option<ComputeBudgetInstructionKind> {
    data.first()
        .copied()
        .and_then(ComputeBudgetInstructionKind::from_discriminator)
}

pub fn get_set_compute_unit_limit_instruction(units: u32) -> Instruction {
    ComputeBudgetInstruction::SetComputeUnitLimit { units }.to_instruction()
}

pub fn get_set_compute_unit_price_instruction(micro_lamports: u64) -> Instruction {
    ComputeBudgetInstruction::SetComputeUnitPrice { micro_lamports }.to_instruction()
}

pub fn get_request_units_instruction(units: u32, additional_fee: u32) -> Instruction {
    ComputeBudgetInstruction::RequestUnits {
        units,
        additional_fee,
    }
    .to_instruction()
}

/// Read the `units` field of a `SetComputeUnitLimit` payload
pub fn decode_set_compute_unit_limit_units(data: &[u8]) -> Result<u32, ComputeBudgetError> {
    check_len(data, ComputeBudgetInstructionKind::SetComputeUnitLimit)?;
    Ok(read_u32(data, 1))
}

/// Read the `micro_lamports` field of a `SetComputeUnitPrice` payload
pub fn decode_set_compute_unit_price_micro_lamports(data: &[u8]) -> Result<u64, ComputeBudgetError> {
    check_len(data, ComputeBudgetInstructionKind::SetComputeUnitPrice)?;
    Ok(read_u64(data, 1))
}

fn check_len(data: &[u8], kind: ComputeBudgetInstructionKind) -> Result<(), ComputeBudgetError> {
    let expected = kind.encoded_len();
    if data.len() < expected {
        return Err(ComputeBudgetError::DecodeOutOfRange {
            kind,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

// Callers check the length first.
fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}
