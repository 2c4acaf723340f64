//! # CARDEX Blockchain Bridge
//!
//! Everything between the pure ledgers of `cardex_economy` and the EVM world.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  signed pack   ┌─────────────────┐
//! │  Pack backend   │ ─────────────▶ │  Front-end /    │
//! │  (PackSigner)   │                │  wallet         │
//! └─────────────────┘                └────────┬────────┘
//!                                             │ calldata
//!                                             ▼
//! ┌─────────────────┐  recover       ┌─────────────────┐
//! │ EcdsaPack-      │ ◀───────────── │  dispatch()     │
//! │ Authenticator   │                │  (sol! ABI)     │
//! └─────────────────┘                └────────┬────────┘
//!                                             │
//!                                             ▼
//!                                    ┌─────────────────┐
//!                                    │  CardEconomy    │
//!                                    └─────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Signatures are byte-compatible with `ecrecover` over an EIP-191 digest
//! - No network I/O; callers bring their own transport

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod backend;
pub mod contracts;
pub mod error;
pub mod signature;

pub use backend::{MockPackBackend, PackDataRequest, PackDataResponse};
pub use contracts::dispatch;
pub use error::{BackendError, DispatchError, DispatchResult, SignatureError, SignatureResult};
pub use signature::{
    pack_signing_digest, recover_pack_signer, EcdsaPackAuthenticator, PackSigner,
};
