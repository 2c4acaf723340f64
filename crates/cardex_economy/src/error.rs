//! # Economy Error Types
//!
//! Every way a ledger operation can abort. The `Display` text of each
//! variant is the revert reason shown to the caller.

use alloy_primitives::U256;
use cardex_shared::{CardNumber, OfferId, PackId};
use thiserror::Error;

use crate::capability::Role;

/// Errors raised by the payment token ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The debited account does not hold enough tokens.
    #[error("insufficient token balance: need {required}, have {available}")]
    InsufficientBalance {
        /// Amount requested.
        required: U256,
        /// Amount held.
        available: U256,
    },

    /// The spender was not approved for enough tokens.
    #[error("insufficient allowance: need {required}, approved {approved}")]
    InsufficientAllowance {
        /// Amount requested.
        required: U256,
        /// Amount approved.
        approved: U256,
    },

    /// Minting or crediting would overflow.
    #[error("token supply overflow")]
    Overflow,
}

/// Errors that can occur in the economy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    // =========================================================================
    // Capability sets
    // =========================================================================
    /// The zero address was supplied where a real account is required.
    #[error("Invalid address.")]
    InvalidAddress,

    /// The address is already in the capability set.
    #[error("Address is already {0}.")]
    AlreadyMember(Role),

    /// The address is not in the capability set.
    #[error("Address is not {0}.")]
    NotMember(Role),

    /// A member tried to remove itself.
    #[error("You cannot remove yourself as {0}.")]
    CannotRemoveSelf(Role),

    /// The caller lacks the capability required by the operation.
    #[error("Caller is not {0}.")]
    NotAuthorized(Role),

    // =========================================================================
    // Cards
    // =========================================================================
    /// The card number is outside the season catalogue.
    #[error("Invalid card number {0}.")]
    InvalidCardNumber(CardNumber),

    /// An operation that needs at least one card got none.
    #[error("Empty card list.")]
    EmptyCardList,

    /// Not enough copies of a card.
    #[error("You do not have that card: card {card_number} needs {required}, holds {available}.")]
    InsufficientCards {
        /// The card.
        card_number: CardNumber,
        /// Copies needed.
        required: u32,
        /// Copies held.
        available: u32,
    },

    /// The card is locked by an active offer.
    #[error("Card {0} is offered and cannot be moved.")]
    CardOffered(CardNumber),

    /// Burning would eat into the copies reserved by an active offer.
    #[error("cannot burn any more copies of this card")]
    BurnReserveViolated {
        /// The card.
        card_number: CardNumber,
    },

    /// The caller does not hold the album card.
    #[error("You must complete the album.")]
    AlbumNotCompleted,

    /// The prize pool cannot cover a payout.
    #[error("Insufficient prizes balance: need {required}, have {available}.")]
    InsufficientPrizePool {
        /// Prize owed.
        required: U256,
        /// Pool balance.
        available: U256,
    },

    /// The economy vault does not hold enough tokens for a payout.
    #[error("Insufficient contract balance: need {required}, have {available}.")]
    InsufficientVaultBalance {
        /// Prize owed.
        required: U256,
        /// Vault token balance.
        available: U256,
    },

    // =========================================================================
    // Packs
    // =========================================================================
    /// Pack count must be at least one.
    #[error("Invalid pack count.")]
    InvalidPackCount,

    /// No such pack exists (never minted or already opened).
    #[error("Pack {0} does not exist.")]
    PackNotFound(PackId),

    /// The caller does not own the pack.
    #[error("This pack {0} is not yours.")]
    NotPackOwner(PackId),

    /// Pack data is empty or longer than a pack can hold.
    #[error("Invalid pack data: {len} cards, at most {max} allowed.")]
    InvalidPackData {
        /// Picks supplied.
        len: usize,
        /// Maximum picks per pack.
        max: usize,
    },

    /// The opening signature is malformed or not from a registered signer.
    #[error("Invalid signature.")]
    InvalidSignature,

    /// Sender and recipient are the same account.
    #[error("You cannot transfer to yourself.")]
    SelfTransfer,

    // =========================================================================
    // Offers
    // =========================================================================
    /// Offer id `0` is reserved.
    #[error("Invalid offer id.")]
    InvalidOfferId,

    /// The id is held by another active offer.
    #[error("Offer id {0} is already in use.")]
    OfferIdTaken(OfferId),

    /// The offered card appears in its own wanted list.
    #[error("The cardNumber cannot be in wantedCardNumbers.")]
    CardInWantedList,

    /// An active offer already exists for this owner and card.
    #[error("An offer for this user and cardNumber already exists.")]
    OfferAlreadyExists,

    /// No active offer matches.
    #[error("Offer not found.")]
    OfferNotFound,

    /// The counterparty card is not among the wanted cards.
    #[error("The card is not in wantedCardNumbers.")]
    CardNotWanted,

    /// Open-ended offer, but the owner already holds the counterparty card.
    #[error("The user already has that card.")]
    AlreadyOwnsCard,

    /// Offer owner and counterparty are the same account.
    #[error("You cannot exchange cards with yourself.")]
    SelfExchange,

    // =========================================================================
    // Plumbing
    // =========================================================================
    /// The payment token rejected a movement.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Arithmetic overflow in a ledger calculation.
    #[error("arithmetic overflow in ledger calculation")]
    ArithmeticOverflow,

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
