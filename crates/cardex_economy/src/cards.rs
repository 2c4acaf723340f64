//! # Card Ledger
//!
//! Per-account multiset of card quantities.
//!
//! ```text
//!  open pack ──mint_from_pack_data──┐
//!  admin ──────mint_card────────────┤
//!                                   ▼
//!                           ┌──────────────┐ ──transfer_cards──> other account
//!                           │ CardAccount  │ ──exchange (offers)──> counterparty
//!                           │ quantity[c]  │ ──burn_cards──> milestones
//!                           │ offered[c]   │ ──take_album_card──> grand prize
//!                           └──────────────┘
//! ```
//!
//! Accounts are created on first credit and never deleted; a quantity can
//! drop to zero while the record stays.
//!
//! This ledger only moves cards. Prizes, tickets and offers are settled by
//! `CardEconomy`, which wraps each call in a transaction.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::Address;
use cardex_shared::CardNumber;

use crate::capability::{CapabilitySet, Role};
use crate::config::{CatalogueConfig, PolicyConfig};
use crate::error::{EconomyError, EconomyResult};

/// Copies kept back from a burn while the card backs an active offer.
pub const OFFER_BURN_RESERVE: u32 = 2;

/// Holdings of one account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardAccount {
    quantity: BTreeMap<CardNumber, u32>,
    offered: BTreeSet<CardNumber>,
}

impl CardAccount {
    /// Copies of `card_number` held.
    #[inline]
    #[must_use]
    pub fn quantity(&self, card_number: CardNumber) -> u32 {
        self.quantity.get(&card_number).copied().unwrap_or(0)
    }

    /// True while `card_number` backs an active offer that hides it.
    #[inline]
    #[must_use]
    pub fn is_offered(&self, card_number: CardNumber) -> bool {
        self.offered.contains(&card_number)
    }

    fn credit(&mut self, card_number: CardNumber, count: u32) -> EconomyResult<()> {
        let quantity = self.quantity.entry(card_number).or_insert(0);
        *quantity = quantity
            .checked_add(count)
            .ok_or(EconomyError::ArithmeticOverflow)?;
        Ok(())
    }

    fn debit(&mut self, card_number: CardNumber, count: u32) -> EconomyResult<()> {
        let available = self.quantity(card_number);
        if available < count {
            return Err(EconomyError::InsufficientCards {
                card_number,
                required: count,
                available,
            });
        }
        self.quantity.insert(card_number, available - count);
        Ok(())
    }
}

/// Snapshot of an account as returned to callers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardsByUser {
    /// Card numbers held or still flagged offered, ascending. An offered
    /// card stays listed with a zero quantity after its last copy leaves.
    pub card_numbers: Vec<CardNumber>,
    /// Copies held, aligned with `card_numbers`.
    pub quantities: Vec<u32>,
    /// Offered flags, aligned with `card_numbers`.
    pub offered: Vec<bool>,
}

/// Result of a successful burn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurnReceipt {
    /// Cards burned in this batch.
    pub burned: u64,
    /// Cumulative burns of the user after this batch.
    pub total_burned: u64,
    /// Milestones crossed by this batch.
    pub milestones: u64,
}

/// The card ledger.
#[derive(Clone, Debug)]
pub struct CardLedger {
    owners: CapabilitySet,
    signers: CapabilitySet,
    catalogue: CatalogueConfig,
    accounts: BTreeMap<Address, CardAccount>,
    burned: BTreeMap<Address, u64>,
    require_open_pack_signer_validation: bool,
    require_offer_validation_in_mint: bool,
    require_offer_validation_in_transfer: bool,
}

impl CardLedger {
    /// Creates an empty ledger. `deployer` becomes the first owner and the
    /// first signer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for a zero deployer.
    pub fn new(
        deployer: Address,
        catalogue: CatalogueConfig,
        policy: &PolicyConfig,
    ) -> EconomyResult<Self> {
        Ok(Self {
            owners: CapabilitySet::with_founder(Role::Owner, deployer)?,
            signers: CapabilitySet::with_founder(Role::Signer, deployer)?,
            catalogue,
            accounts: BTreeMap::new(),
            burned: BTreeMap::new(),
            require_open_pack_signer_validation: policy.require_open_pack_signer_validation,
            require_offer_validation_in_mint: policy.require_offer_validation_in_mint,
            require_offer_validation_in_transfer: policy.require_offer_validation_in_transfer,
        })
    }

    // =========================================================================
    // Capabilities & policy
    // =========================================================================

    /// Owners of this ledger.
    #[must_use]
    pub fn owners(&self) -> &CapabilitySet {
        &self.owners
    }

    /// Owners of this ledger, for administration.
    pub fn owners_mut(&mut self) -> &mut CapabilitySet {
        &mut self.owners
    }

    /// Accounts allowed to sign pack openings.
    #[must_use]
    pub fn signers(&self) -> &CapabilitySet {
        &self.signers
    }

    /// Signers, for administration.
    pub fn signers_mut(&mut self) -> &mut CapabilitySet {
        &mut self.signers
    }

    /// The season catalogue.
    #[must_use]
    pub fn catalogue(&self) -> &CatalogueConfig {
        &self.catalogue
    }

    /// Whether pack openings need a signer's signature.
    #[must_use]
    pub fn require_open_pack_signer_validation(&self) -> bool {
        self.require_open_pack_signer_validation
    }

    /// Toggles signature checks on pack opening.
    pub fn set_require_open_pack_signer_validation(&mut self, enabled: bool) {
        self.require_open_pack_signer_validation = enabled;
    }

    /// Whether administrative mints refuse offered cards.
    #[must_use]
    pub fn require_offer_validation_in_mint(&self) -> bool {
        self.require_offer_validation_in_mint
    }

    /// Toggles the offered-card guard on mint.
    pub fn set_require_offer_validation_in_mint(&mut self, enabled: bool) {
        self.require_offer_validation_in_mint = enabled;
    }

    /// Whether transfers refuse offered cards.
    #[must_use]
    pub fn require_offer_validation_in_transfer(&self) -> bool {
        self.require_offer_validation_in_transfer
    }

    /// Toggles the offered-card guard on transfer.
    pub fn set_require_offer_validation_in_transfer(&mut self, enabled: bool) {
        self.require_offer_validation_in_transfer = enabled;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The account of `user`, if it was ever credited.
    #[must_use]
    pub fn account(&self, user: &Address) -> Option<&CardAccount> {
        self.accounts.get(user)
    }

    /// Copies of `card_number` held by `user`.
    #[must_use]
    pub fn card_quantity(&self, user: &Address, card_number: CardNumber) -> u32 {
        self.accounts
            .get(user)
            .map_or(0, |account| account.quantity(card_number))
    }

    /// Whether `card_number` is flagged offered for `user`.
    #[must_use]
    pub fn is_offered(&self, user: &Address, card_number: CardNumber) -> bool {
        self.accounts
            .get(user)
            .is_some_and(|account| account.is_offered(card_number))
    }

    /// True if `user` holds a copy of `card_number` not hidden by an offer.
    #[must_use]
    pub fn has_card(&self, user: &Address, card_number: CardNumber) -> bool {
        self.card_quantity(user, card_number) > 0 && !self.is_offered(user, card_number)
    }

    /// Cumulative cards burned by `user`.
    #[must_use]
    pub fn burned_count(&self, user: &Address) -> u64 {
        self.burned.get(user).copied().unwrap_or(0)
    }

    /// Holdings of `user`.
    #[must_use]
    pub fn cards_by_user(&self, user: &Address) -> CardsByUser {
        let mut cards = CardsByUser::default();
        if let Some(account) = self.accounts.get(user) {
            let listed: BTreeSet<CardNumber> = account
                .quantity
                .iter()
                .filter(|&(_, &quantity)| quantity > 0)
                .map(|(&card_number, _)| card_number)
                .chain(account.offered.iter().copied())
                .collect();
            for card_number in listed {
                cards.card_numbers.push(card_number);
                cards.quantities.push(account.quantity(card_number));
                cards.offered.push(account.is_offered(card_number));
            }
        }
        cards
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn ensure_in_catalogue(&self, card_numbers: &[CardNumber]) -> EconomyResult<()> {
        match card_numbers
            .iter()
            .find(|&&card_number| !self.catalogue.contains(card_number))
        {
            Some(&card_number) => Err(EconomyError::InvalidCardNumber(card_number)),
            None => Ok(()),
        }
    }

    /// Credits one copy per entry of `pack_data` to `user`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCardNumber` if any entry is outside the catalogue.
    /// Nothing is credited in that case.
    pub fn mint_from_pack_data(
        &mut self,
        user: Address,
        pack_data: &[CardNumber],
    ) -> EconomyResult<()> {
        self.ensure_in_catalogue(pack_data)?;
        let account = self.accounts.entry(user).or_default();
        for &card_number in pack_data {
            account.credit(card_number, 1)?;
        }
        tracing::debug!("Minted {} cards to {}", pack_data.len(), user);
        Ok(())
    }

    /// Credits one copy of `card_number` to `user` (administrative path).
    ///
    /// # Errors
    ///
    /// - `InvalidCardNumber` outside the catalogue
    /// - `CardOffered` when the card is offered and the mint guard is on
    pub fn mint_card(&mut self, user: Address, card_number: CardNumber) -> EconomyResult<()> {
        self.ensure_in_catalogue(&[card_number])?;
        if self.require_offer_validation_in_mint && self.is_offered(&user, card_number) {
            return Err(EconomyError::CardOffered(card_number));
        }
        self.accounts.entry(user).or_default().credit(card_number, 1)
    }

    /// Credits one copy of every card in the catalogue, album card included.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if a quantity would overflow.
    pub fn add_all_cards(&mut self, user: Address) -> EconomyResult<()> {
        let account = self.accounts.entry(user).or_default();
        for card_number in self.catalogue.card_numbers() {
            account.credit(card_number, 1)?;
        }
        Ok(())
    }

    /// Moves one copy per entry of `card_numbers` from `from` to `to`.
    ///
    /// Repeated entries move repeated copies.
    ///
    /// # Errors
    ///
    /// - `InvalidAddress` / `SelfTransfer` for a bad recipient
    /// - `EmptyCardList` for no cards
    /// - `InsufficientCards` if `from` lacks copies
    /// - `CardOffered` when a card is offered and the transfer guard is on
    pub fn transfer_cards(
        &mut self,
        from: Address,
        to: Address,
        card_numbers: &[CardNumber],
    ) -> EconomyResult<()> {
        if to == Address::ZERO {
            return Err(EconomyError::InvalidAddress);
        }
        if to == from {
            return Err(EconomyError::SelfTransfer);
        }
        if card_numbers.is_empty() {
            return Err(EconomyError::EmptyCardList);
        }
        self.ensure_in_catalogue(card_numbers)?;

        let counts = count_cards(card_numbers);
        for (&card_number, &count) in &counts {
            let available = self.card_quantity(&from, card_number);
            if available < count {
                return Err(EconomyError::InsufficientCards {
                    card_number,
                    required: count,
                    available,
                });
            }
            if self.require_offer_validation_in_transfer && self.is_offered(&from, card_number) {
                return Err(EconomyError::CardOffered(card_number));
            }
        }

        for (&card_number, &count) in &counts {
            self.debit(from, card_number, count)?;
            self.credit(to, card_number, count)?;
        }
        tracing::debug!("Transferred {} cards {} -> {}", card_numbers.len(), from, to);
        Ok(())
    }

    /// Burns one copy per entry of `card_numbers` and advances the burn
    /// counter of `user`.
    ///
    /// An offered card keeps [`OFFER_BURN_RESERVE`] copies back.
    ///
    /// # Errors
    ///
    /// - `EmptyCardList` for no cards
    /// - `InsufficientCards` if `user` lacks copies
    /// - `BurnReserveViolated` if the burn would eat into an offer's reserve
    pub fn burn_cards(
        &mut self,
        user: Address,
        card_numbers: &[CardNumber],
    ) -> EconomyResult<BurnReceipt> {
        if card_numbers.is_empty() {
            return Err(EconomyError::EmptyCardList);
        }
        self.ensure_in_catalogue(card_numbers)?;

        let counts = count_cards(card_numbers);
        for (&card_number, &count) in &counts {
            let available = self.card_quantity(&user, card_number);
            if available < count {
                return Err(EconomyError::InsufficientCards {
                    card_number,
                    required: count,
                    available,
                });
            }
            let reserve = if self.is_offered(&user, card_number) {
                OFFER_BURN_RESERVE
            } else {
                0
            };
            if available - count < reserve {
                return Err(EconomyError::BurnReserveViolated { card_number });
            }
        }

        for (&card_number, &count) in &counts {
            self.debit(user, card_number, count)?;
        }

        let burned = card_numbers.len() as u64;
        let previous = self.burned_count(&user);
        let total_burned = previous
            .checked_add(burned)
            .ok_or(EconomyError::ArithmeticOverflow)?;
        self.burned.insert(user, total_burned);

        let threshold = u64::from(self.catalogue.burn_milestone.max(1));
        let milestones = total_burned / threshold - previous / threshold;
        tracing::debug!(
            "{} burned {} cards ({} total, {} milestones)",
            user,
            burned,
            total_burned,
            milestones
        );
        Ok(BurnReceipt {
            burned,
            total_burned,
            milestones,
        })
    }

    /// Consumes one album card of `user`.
    ///
    /// # Errors
    ///
    /// Returns `AlbumNotCompleted` if `user` holds no album card.
    pub fn take_album_card(&mut self, user: Address) -> EconomyResult<()> {
        let album_card = self.catalogue.album_card;
        if self.card_quantity(&user, album_card) == 0 {
            return Err(EconomyError::AlbumNotCompleted);
        }
        self.debit(user, album_card, 1)
    }

    pub(crate) fn credit(
        &mut self,
        user: Address,
        card_number: CardNumber,
        count: u32,
    ) -> EconomyResult<()> {
        self.accounts.entry(user).or_default().credit(card_number, count)
    }

    pub(crate) fn debit(
        &mut self,
        user: Address,
        card_number: CardNumber,
        count: u32,
    ) -> EconomyResult<()> {
        match self.accounts.get_mut(&user) {
            Some(account) => account.debit(card_number, count),
            None => Err(EconomyError::InsufficientCards {
                card_number,
                required: count,
                available: 0,
            }),
        }
    }

    pub(crate) fn set_offered(&mut self, user: Address, card_number: CardNumber, offered: bool) {
        let account = self.accounts.entry(user).or_default();
        if offered {
            account.offered.insert(card_number);
        } else {
            account.offered.remove(&card_number);
        }
    }

    /// Every `(user, card)` currently flagged offered.
    pub(crate) fn offered_pairs(&self) -> impl Iterator<Item = (Address, CardNumber)> + '_ {
        self.accounts.iter().flat_map(|(&user, account)| {
            account
                .offered
                .iter()
                .map(move |&card_number| (user, card_number))
        })
    }
}

/// Multiset of card numbers as `card -> copies`.
fn count_cards(card_numbers: &[CardNumber]) -> BTreeMap<CardNumber, u32> {
    let mut counts = BTreeMap::new();
    for &card_number in card_numbers {
        *counts.entry(card_number).or_insert(0_u32) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> CardLedger {
        CardLedger::new(
            Address::repeat_byte(0xAA),
            CatalogueConfig::default(),
            &PolicyConfig::default(),
        )
        .unwrap()
    }

    fn alice() -> Address {
        Address::repeat_byte(1)
    }

    fn bob() -> Address {
        Address::repeat_byte(2)
    }

    #[test]
    fn test_mint_from_pack_data() {
        let mut cards = ledger();
        cards.mint_from_pack_data(alice(), &[3, 3, 90]).unwrap();

        assert_eq!(cards.card_quantity(&alice(), 3), 2);
        assert_eq!(cards.card_quantity(&alice(), 90), 1);
        assert!(cards.has_card(&alice(), 90));

        let view = cards.cards_by_user(&alice());
        assert_eq!(view.card_numbers, vec![3, 90]);
        assert_eq!(view.quantities, vec![2, 1]);
        assert_eq!(view.offered, vec![false, false]);
    }

    #[test]
    fn test_mint_rejects_unknown_card_atomically() {
        let mut cards = ledger();
        let err = cards.mint_from_pack_data(alice(), &[1, 121]).unwrap_err();

        assert_eq!(err, EconomyError::InvalidCardNumber(121));
        assert_eq!(cards.card_quantity(&alice(), 1), 0);
    }

    #[test]
    fn test_transfer_cards() {
        let mut cards = ledger();
        cards.mint_from_pack_data(alice(), &[5, 5, 6]).unwrap();

        cards.transfer_cards(alice(), bob(), &[5, 6]).unwrap();
        assert_eq!(cards.card_quantity(&alice(), 5), 1);
        assert_eq!(cards.card_quantity(&alice(), 6), 0);
        assert_eq!(cards.card_quantity(&bob(), 5), 1);
        assert_eq!(cards.card_quantity(&bob(), 6), 1);

        // Account record survives at zero
        assert!(cards.account(&alice()).is_some());
        assert_eq!(cards.cards_by_user(&alice()).card_numbers, vec![5]);
    }

    #[test]
    fn test_transfer_rejections() {
        let mut cards = ledger();
        cards.mint_from_pack_data(alice(), &[5]).unwrap();

        assert_eq!(
            cards.transfer_cards(alice(), Address::ZERO, &[5]),
            Err(EconomyError::InvalidAddress)
        );
        assert_eq!(
            cards.transfer_cards(alice(), alice(), &[5]),
            Err(EconomyError::SelfTransfer)
        );
        assert!(matches!(
            cards.transfer_cards(alice(), bob(), &[5, 5]),
            Err(EconomyError::InsufficientCards { card_number: 5, required: 2, available: 1 })
        ));
        assert_eq!(cards.card_quantity(&alice(), 5), 1);
    }

    #[test]
    fn test_offered_card_transfer_guard() {
        let mut cards = ledger();
        cards.mint_from_pack_data(alice(), &[5, 5]).unwrap();
        cards.set_offered(alice(), 5, true);

        assert_eq!(
            cards.transfer_cards(alice(), bob(), &[5]),
            Err(EconomyError::CardOffered(5))
        );
        assert!(!cards.has_card(&alice(), 5));

        cards.set_require_offer_validation_in_transfer(false);
        cards.transfer_cards(alice(), bob(), &[5]).unwrap();
    }

    #[test]
    fn test_offered_card_listed_after_last_copy_leaves() {
        let mut cards = ledger();
        cards.mint_from_pack_data(alice(), &[5, 8]).unwrap();
        cards.set_offered(alice(), 5, true);
        cards.set_require_offer_validation_in_transfer(false);
        cards.transfer_cards(alice(), bob(), &[5, 8]).unwrap();

        let view = cards.cards_by_user(&alice());
        assert_eq!(view.card_numbers, vec![5]);
        assert_eq!(view.quantities, vec![0]);
        assert_eq!(view.offered, vec![true]);

        assert_eq!(cards.cards_by_user(&bob()).card_numbers, vec![5, 8]);
    }

    #[test]
    fn test_mint_card_guard() {
        let mut cards = ledger();
        cards.mint_card(alice(), 7).unwrap();
        cards.set_offered(alice(), 7, true);

        assert_eq!(cards.mint_card(alice(), 7), Err(EconomyError::CardOffered(7)));
        cards.set_require_offer_validation_in_mint(false);
        cards.mint_card(alice(), 7).unwrap();
        assert_eq!(cards.card_quantity(&alice(), 7), 2);
    }

    #[test]
    fn test_burn_reserve_on_offered_card() {
        let mut cards = ledger();
        cards.mint_from_pack_data(alice(), &[9, 9, 9]).unwrap();
        cards.set_offered(alice(), 9, true);

        let err = cards.burn_cards(alice(), &[9, 9]).unwrap_err();
        assert_eq!(err.to_string(), "cannot burn any more copies of this card");
        assert_eq!(cards.card_quantity(&alice(), 9), 3);

        let receipt = cards.burn_cards(alice(), &[9]).unwrap();
        assert_eq!(receipt.burned, 1);
        assert_eq!(cards.card_quantity(&alice(), 9), 2);
    }

    #[test]
    fn test_burn_without_offer_can_empty_stack() {
        let mut cards = ledger();
        cards.mint_from_pack_data(alice(), &[9, 9]).unwrap();

        cards.burn_cards(alice(), &[9, 9]).unwrap();
        assert_eq!(cards.card_quantity(&alice(), 9), 0);
        assert!(matches!(
            cards.burn_cards(alice(), &[9]),
            Err(EconomyError::InsufficientCards { .. })
        ));
        assert_eq!(cards.burn_cards(alice(), &[]), Err(EconomyError::EmptyCardList));
    }

    #[test]
    fn test_burn_milestones() {
        let mut cards = ledger();
        let batch: Vec<CardNumber> = (0..50).collect();
        cards.mint_from_pack_data(alice(), &batch).unwrap();
        cards.mint_from_pack_data(alice(), &batch).unwrap();
        cards.mint_from_pack_data(alice(), &batch).unwrap();

        let first = cards.burn_cards(alice(), &batch).unwrap();
        assert_eq!(first.milestones, 0);

        let second = cards.burn_cards(alice(), &batch).unwrap();
        assert_eq!(second.total_burned, 100);
        assert_eq!(second.milestones, 1);

        let third = cards.burn_cards(alice(), &batch).unwrap();
        assert_eq!(third.total_burned, 150);
        assert_eq!(third.milestones, 1);
        assert_eq!(cards.burned_count(&alice()), 150);
    }

    #[test]
    fn test_take_album_card() {
        let mut cards = ledger();
        assert_eq!(cards.take_album_card(alice()), Err(EconomyError::AlbumNotCompleted));

        cards.add_all_cards(alice()).unwrap();
        assert_eq!(cards.cards_by_user(&alice()).card_numbers.len(), 121);
        cards.take_album_card(alice()).unwrap();
        assert_eq!(cards.card_quantity(&alice(), 120), 0);
    }
}
