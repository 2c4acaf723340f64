//! # Bridge Error Types

use cardex_economy::EconomyError;
use thiserror::Error;

/// Errors from the signature protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Signatures are exactly 65 bytes (`r ‖ s ‖ v`).
    #[error("invalid signature length: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    /// `v` must be 0, 1, 27 or 28.
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// `r` or `s` is not a valid scalar.
    #[error("invalid signature format")]
    InvalidFormat,

    /// No public key matches the signature.
    #[error("public key recovery failed")]
    RecoveryFailed,

    /// The secret key is not a valid scalar.
    #[error("invalid signing key")]
    InvalidKey,

    /// The signer could not produce a signature.
    #[error("signing failed")]
    SigningFailed,
}

impl From<SignatureError> for EconomyError {
    fn from(_: SignatureError) -> Self {
        EconomyError::InvalidSignature
    }
}

/// Errors from ABI dispatch.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Calldata did not decode against the ledger's interface.
    #[error("calldata decode failed: {0}")]
    Decode(#[from] alloy_sol_types::Error),

    /// A numeric argument does not fit the ledger's integer type.
    #[error("argument {0} out of range")]
    OutOfRange(&'static str),

    /// Parallel array arguments differ in length.
    #[error("array arguments differ in length")]
    LengthMismatch,

    /// The ledger reverted.
    #[error("execution reverted: {0}")]
    Reverted(#[from] EconomyError),
}

/// Errors from the pack data backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Malformed request or response body.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend could not sign the pack.
    #[error("signing failed: {0}")]
    Signature(#[from] SignatureError),
}

/// Result type for signature operations.
pub type SignatureResult<T> = Result<T, SignatureError>;

/// Result type for ABI dispatch.
pub type DispatchResult<T> = Result<T, DispatchError>;
