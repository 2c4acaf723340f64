//! # CARDEX
//!
//! The collectible card economy, assembled.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              CARDEX                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌─────────────────┐   events   ┌─────────────────┐                 │
//! │  │  cardex_economy │ ─────────> │  cardex_shared  │                 │
//! │  │                 │            │                 │                 │
//! │  │  • Cards        │            │  • Ids          │                 │
//! │  │  • Packs        │            │  • Constants    │                 │
//! │  │  • Offers       │            │  • Event bus    │                 │
//! │  │  • Tickets      │            └─────────────────┘                 │
//! │  │  • Prize pool   │                                                │
//! │  └────────▲────────┘                                                │
//! │           │ PackAuthenticator / calldata                            │
//! │  ┌────────┴──────────┐                                              │
//! │  │ cardex_blockchain │                                              │
//! │  │                   │                                              │
//! │  │  • Signatures     │                                              │
//! │  │  • sol! ABI       │                                              │
//! │  │  • Pack backend   │                                              │
//! │  └───────────────────┘                                              │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `season`: scripted season simulation used by `cardex_sim`

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod season;

// Re-export the layers
pub use cardex_blockchain as blockchain;
pub use cardex_economy as economy;
pub use cardex_shared as shared;

pub use season::{run_season, SeasonConfig, SeasonError, SeasonReport, SimulationConfig};
