//! Compatibility layer for Solana SDK message types
//!
//! Legacy and V0 messages expose the same header and static key data
//! through different structs. These helpers give one API for both, which
//! the message compiler and decompiler rely on.
//!
//! ## Usage
//!
//! ```rust
//! use compute_budget_client::compat;
//! use solana_sdk::{message::{Message, VersionedMessage}, pubkey::Pubkey};
//!
//! let payer = Pubkey::new_unique();
//! let message = VersionedMessage::Legacy(Message::new(&[], Some(&payer)));
//!
//! assert_eq!(compat::get_num_required_signatures(&message), 1);
//! assert!(compat::is_signer_index(&message, 0));
//! assert!(compat::is_writable_index(&message, 0));
//! ```

use solana_sdk::{
    message::{MessageHeader, VersionedMessage},
    pubkey::Pubkey,
};

/// Get the message header from a `VersionedMessage`.
#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Get the static account keys from a `VersionedMessage`.
///
/// For V0 messages this excludes addresses loaded from lookup tables.
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

#[inline]
#[must_use]
pub fn get_num_required_signatures(message: &VersionedMessage) -> u8 {
    get_message_header(message).num_required_signatures
}

/// Whether the static key at `index` must sign.
///
/// Signers are always the first `num_required_signatures` keys.
#[inline]
#[must_use]
pub fn is_signer_index(message: &VersionedMessage, index: usize) -> bool {
    index < get_num_required_signatures(message) as usize
}

/// Whether the static key at `index` is writable according to the header.
///
/// Key order is: writable signers, readonly signers, writable non-signers,
/// readonly non-signers. Indexes past the static keys are never writable.
#[must_use]
pub fn is_writable_index(message: &VersionedMessage, index: usize) -> bool {
    let header = get_message_header(message);
    let num_keys = get_static_account_keys(message).len();
    let num_signers = header.num_required_signatures as usize;

    if index >= num_keys {
        return false;
    }
    if index < num_signers {
        index < num_signers.saturating_sub(header.num_readonly_signed_accounts as usize)
    } else {
        index < num_keys.saturating_sub(header.num_readonly_unsigned_accounts as usize)
    }
}
