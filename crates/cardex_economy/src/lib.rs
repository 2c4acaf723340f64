//! # CARDEX Economy
//!
//! Ledger logic for the CARDEX collectible-card economy.
//!
//! ## Design Principles
//!
//! 1. **Zero floating point** - every amount is a `U256` wad
//! 2. **All-or-nothing** - each facade call snapshots the ledgers and the
//!    payment token, and restores both on any error
//! 3. **One source of truth** - the four offer views are maintained by a
//!    single `OfferBook`
//! 4. **External configuration** - season parameters live in TOML files
//!
//! ## Thread Safety
//!
//! `CardEconomy` is single-threaded. Share it through `SharedEconomy`, which
//! serializes callers behind one `parking_lot` mutex.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cardex_economy::{CardEconomy, EconomyConfig, TokenLedger};
//!
//! let config = EconomyConfig::from_file("data/economy.toml")?;
//! let mut economy = CardEconomy::new(deployer, vault, &config, TokenLedger::new())?;
//!
//! let packs = economy.buy_packs(buyer, 3)?;
//! economy.open_pack(buyer, packs[0], &pack_data, &signature)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod auth;
pub mod capability;
pub mod cards;
pub mod config;
pub mod economy;
pub mod error;
pub mod offers;
pub mod packs;
pub mod pool;
pub mod tickets;
pub mod token;

pub use auth::{PackAuthenticator, PackOpening};
pub use capability::{CapabilitySet, Role};
pub use cards::{BurnReceipt, CardAccount, CardLedger, CardsByUser, OFFER_BURN_RESERVE};
pub use config::{CatalogueConfig, EconomyConfig, PolicyConfig, PricingConfig};
pub use economy::{BurnOutcome, CardEconomy, Ledger, PackOpeningRequest, SharedEconomy};
pub use error::{EconomyError, EconomyResult, TokenError};
pub use offers::{ExchangeReceipt, Offer, OfferBook, OfferLedger};
pub use packs::PackLedger;
pub use pool::{Prize, PrizePool};
pub use tickets::{Ticket, TicketLedger};
pub use token::{PaymentToken, TokenLedger};
