//! # Contract Definitions
//!
//! Solidity ABI of the four ledgers, generated with alloy's `sol!` macro,
//! and the dispatcher that executes calldata against a [`CardEconomy`].
//!
//! ```text
//! calldata ──> I*Calls::abi_decode ──> CardEconomy op ──> abi_encode_returns
//! ```
//!
//! [`CardEconomy`]: cardex_economy::CardEconomy

// The sol! macro generates code that we can't document, so allow missing_docs
#![allow(missing_docs)]

mod dispatch;

pub use dispatch::dispatch;

use alloy_primitives::U256;
use alloy_sol_types::sol;

// One block per interface: the owner functions repeat across ledgers.

sol! {
    /// Cards, signers and prizes.
    #[derive(Debug)]
    interface ICardLedger {
        function addOwner(address account) external;
        function removeOwner(address account) external;
        function isOwner(address account) external view returns (bool);
        function addSigner(address account) external;
        function removeSigner(address account) external;
        function isSigner(address account) external view returns (bool);

        function openPack(uint256 packNumber, uint256[] packData, bytes signature) external;
        function openPacks(uint256[] packNumbers, uint256[][] packsData, bytes[] signatures) external;
        function testOpenPack(address user, uint256 packNumber, uint256[] packData) external;

        function transferCard(address to, uint256 cardNumber) external;
        function transferCards(address to, uint256[] cardNumbers) external;
        function mintCard(address user, uint256 cardNumber) external;
        function testAddCards(address user) external;
        function burnCards(uint256[] cardNumbers) external returns (uint256[]);
        function finishAlbum() external returns (uint256);

        function hasCard(address user, uint256 cardNumber) external view returns (bool);
        function cardQuantity(address user, uint256 cardNumber) external view returns (uint256);
        function getCardsByUser(address user) external view returns (uint256[], uint256[], bool[]);
        function burnedCards(address user) external view returns (uint256);
        function prizesBalance() external view returns (uint256);
        function mainAlbumPrize() external view returns (uint256);
        function secondaryAlbumPrize() external view returns (uint256);

        function changeRequireOpenPackSignerValidation(bool enabled) external;
        function changeRequireOfferValidationInMint(bool enabled) external;
        function changeRequireOfferValidationInTransfer(bool enabled) external;
    }
}

sol! {
    /// Pack sales and ownership.
    #[derive(Debug)]
    interface IPackLedger {
        function addOwner(address account) external;
        function removeOwner(address account) external;
        function isOwner(address account) external view returns (bool);

        function buyPack() external returns (uint256);
        function buyPacks(uint256 numberOfPacks) external returns (uint256[]);
        function buyPackByUser(address user) external returns (uint256);
        function buyPacksByUser(address user, uint256 numberOfPacks) external returns (uint256[]);
        function transferPack(address to, uint256 packNumber) external;
        function transferPacks(address to, uint256[] packNumbers) external;

        function getPacksByUser(address user) external view returns (uint256[]);
        function getPackOwner(uint256 packNumber) external view returns (address);
        function totalPacksMinted() external view returns (uint256);
        function packPrice() external view returns (uint256);

        function changeBalanceReceiver(address receiver) external;
        function changePackPrice(uint256 price) external;
        function changeTransferDaiFlag(bool enabled) external;
    }
}

sol! {
    /// A trade offer as returned by the offer ledger getters.
    #[derive(Debug, PartialEq, Eq)]
    struct Offer {
        uint256 offerId;
        address owner;
        uint256 cardNumber;
        uint256[] wantedCardNumbers;
    }

    /// Trade offers and their settlement.
    #[derive(Debug)]
    interface IOfferLedger {
        function addOwner(address account) external;
        function removeOwner(address account) external;
        function isOwner(address account) external view returns (bool);

        function createOffer(uint256 offerId, uint256 cardNumber, uint256[] wantedCardNumbers) external;
        function removeOfferByUserAndCardNumber(address user, uint256 cardNumber) external;
        function removeOfferByCardNumber(uint256 cardNumber) external;
        function confirmOfferExchange(
            address counterparty,
            uint256 counterpartyCardNumber,
            address offerOwner,
            uint256 offerCardNumber
        ) external;
        function deleteAllOffers() external;

        function getOffers() external view returns (Offer[]);
        function getOfferByIndex(uint256 index) external view returns (Offer);
        function getOfferByOfferId(uint256 offerId) external view returns (Offer);
        function getOfferByUserAndCardNumber(address user, uint256 cardNumber) external view returns (Offer);
        function getOffersByUser(address user) external view returns (Offer[]);
        function getOffersByCardNumber(uint256 cardNumber) external view returns (Offer[]);
        function getOffersCounter() external view returns (uint256);
        function getOffersByUserCounter(address user) external view returns (uint256);
        function getOffersByCardNumberCounter(uint256 cardNumber) external view returns (uint256);

        function changeRemoveCardInInventoryWhenOffer(bool enabled) external;
    }
}

sol! {
    /// A burn-milestone ticket.
    #[derive(Debug, PartialEq, Eq)]
    struct Ticket {
        uint256 ticketId;
        address user;
    }

    /// Burn-milestone tickets.
    #[derive(Debug)]
    interface ITicketLedger {
        function addOwner(address account) external;
        function removeOwner(address account) external;
        function isOwner(address account) external view returns (bool);

        function getTicketsByUser(address user) external view returns (uint256[]);
        function getTicket(uint256 ticketId) external view returns (Ticket);
        function getTickets() external view returns (Ticket[]);
        function getTicketsCounter() external view returns (uint256);
    }
}

impl From<&cardex_economy::Offer> for Offer {
    fn from(offer: &cardex_economy::Offer) -> Self {
        Self {
            offerId: U256::from(offer.offer_id),
            owner: offer.owner,
            cardNumber: U256::from(offer.card_number),
            wantedCardNumbers: offer
                .wanted_card_numbers
                .iter()
                .map(|&card_number| U256::from(card_number))
                .collect(),
        }
    }
}

impl From<&cardex_economy::Ticket> for Ticket {
    fn from(ticket: &cardex_economy::Ticket) -> Self {
        Self {
            ticketId: U256::from(ticket.ticket_id),
            user: ticket.owner,
        }
    }
}

impl Offer {
    /// The all-zero offer getters return when nothing matches.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            offerId: U256::ZERO,
            owner: alloy_primitives::Address::ZERO,
            cardNumber: U256::ZERO,
            wantedCardNumbers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use alloy_sol_types::{SolCall, SolType};
    use std::collections::BTreeSet;

    #[test]
    fn test_selectors_match_solidity_signatures() {
        assert_eq!(
            IPackLedger::buyPacksCall::SIGNATURE,
            "buyPacks(uint256)"
        );
        assert_eq!(
            ICardLedger::openPackCall::SIGNATURE,
            "openPack(uint256,uint256[],bytes)"
        );
        assert_eq!(
            IOfferLedger::getOffersCall::SIGNATURE,
            "getOffers()"
        );
    }

    #[test]
    fn test_offer_conversion() {
        let offer = cardex_economy::Offer {
            offer_id: 9,
            owner: Address::repeat_byte(1),
            card_number: 4,
            wanted_card_numbers: BTreeSet::from([7, 2]),
        };
        let sol = Offer::from(&offer);

        assert_eq!(sol.offerId, U256::from(9));
        assert_eq!(sol.wantedCardNumbers, vec![U256::from(2), U256::from(7)]);

        let encoded = <Offer as SolType>::abi_encode(&sol);
        assert_eq!(<Offer as SolType>::abi_decode(&encoded, true).unwrap(), sol);
    }

    #[test]
    fn test_empty_offer_is_zeroed() {
        let empty = Offer::empty();
        assert_eq!(empty.offerId, U256::ZERO);
        assert_eq!(empty.owner, Address::ZERO);
        assert!(empty.wantedCardNumbers.is_empty());
    }
}
