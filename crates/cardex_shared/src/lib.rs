//! # CARDEX Shared
//!
//! Common types used by every ledger of the card economy.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER contain ledger mutations. It defines:
//! - identifiers (`CardNumber`, `PackId`, `OfferId`, `TicketId`)
//! - catalogue and pricing defaults
//! - the `LedgerEvent` stream and its bus

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod events;

pub use alloy_primitives::{Address, U256};

pub use constants::{
    ALBUM_CARD, BURN_MILESTONE, CARDS_PER_PACK, MAIN_ALBUM_PRIZE, PACK_PRICE, PRIZE_SHARE_BPS,
    SECONDARY_ALBUM_PRIZE, TOTAL_CARDS, WAD,
};
pub use events::{EventBus, EventReceiver, EventSender, LedgerEvent};

/// Number printed on a card. Card numbers are dense, starting at zero.
pub type CardNumber = u32;

/// Sequential identifier of a purchased pack (first pack is `0`).
pub type PackId = u64;

/// Caller-chosen identifier of a trade offer. `0` is reserved as "no offer".
pub type OfferId = u64;

/// Sequential identifier of a burn-milestone ticket (first ticket is `1`).
pub type TicketId = u64;
