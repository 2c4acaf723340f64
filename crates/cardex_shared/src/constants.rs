//! # Catalogue & Pricing Constants
//!
//! Default season parameters. Every value here can be overridden from
//! `data/economy.toml`; these are what an empty config falls back to.
//!
//! All amounts are in wad (18 decimals), matching the stablecoin.

use crate::CardNumber;

// =============================================================================
// CATALOGUE
// =============================================================================

/// One unit of the payment token (18 decimals).
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Distinct card numbers in a season, album card included (`0..=120`).
pub const TOTAL_CARDS: u32 = 121;

/// The distinguished album card. Holding it stands in for holding the
/// complete set when claiming the grand prize.
pub const ALBUM_CARD: CardNumber = 120;

/// Upper bound on the number of picks carried by one pack.
pub const CARDS_PER_PACK: usize = 12;

/// Cumulative burns that earn one secondary prize and one ticket.
pub const BURN_MILESTONE: u32 = 60;

// =============================================================================
// PRICING
// =============================================================================

/// Price of a single pack (1.2 tokens).
pub const PACK_PRICE: u128 = 12 * WAD / 10;

/// Share of pack revenue reserved for prizes, in basis points.
pub const PRIZE_SHARE_BPS: u16 = 2_500;

/// Grand prize paid on album completion.
pub const MAIN_ALBUM_PRIZE: u128 = 15 * WAD;

/// Prize paid each time a burn milestone is crossed.
pub const SECONDARY_ALBUM_PRIZE: u128 = WAD;

/// Basis point denominator.
pub const BPS_DENOMINATOR: u16 = 10_000;
