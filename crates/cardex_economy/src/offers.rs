//! # Offer / Exchange Engine
//!
//! Standing trade offers and their bilateral settlement.
//!
//! ## Views
//!
//! ```text
//!                      ┌──────────────────────────┐
//!                      │ active: OfferId -> Offer │  source of truth
//!                      └────────────┬─────────────┘
//!         ┌──────────────┬──────────┴─────┬───────────────────────┐
//!         ▼              ▼                ▼                       ▼
//!   list: [Some|None]  by_user        by_card          by_user_card (owner, card)
//!   (tombstoned)       owner -> ids   card -> ids      -> id
//! ```
//!
//! Only [`OfferBook::insert`] and [`OfferBook::remove`] touch the views, and
//! each updates all of them plus the three counters in one step. Debug
//! builds re-check the whole book after every mutation.
//!
//! ## Settlement
//!
//! [`OfferLedger`] layers the trading rules over the book and the card
//! ledger. Every precondition is checked before the first card moves.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::Address;
use cardex_shared::{CardNumber, OfferId};

use crate::capability::{CapabilitySet, Role};
use crate::cards::CardLedger;
use crate::config::PolicyConfig;
use crate::error::{EconomyError, EconomyResult};

/// A standing proposal to trade one card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Offer {
    /// Caller-chosen identifier, never `0`.
    pub offer_id: OfferId,
    /// Who offers.
    pub owner: Address,
    /// Card offered.
    pub card_number: CardNumber,
    /// Cards accepted in return. Empty means any card the owner lacks.
    pub wanted_card_numbers: BTreeSet<CardNumber>,
}

impl Offer {
    /// True if `card_number` is acceptable, given whether the owner already
    /// holds it.
    #[must_use]
    pub fn accepts(&self, card_number: CardNumber, owner_holds: bool) -> bool {
        if self.wanted_card_numbers.is_empty() {
            !owner_holds
        } else {
            self.wanted_card_numbers.contains(&card_number)
        }
    }
}

// =============================================================================
// OFFER BOOK
// =============================================================================

/// The four consistent views over the active offers.
#[derive(Clone, Debug, Default)]
pub struct OfferBook {
    active: BTreeMap<OfferId, Offer>,
    list: Vec<Option<OfferId>>,
    slot_of: BTreeMap<OfferId, usize>,
    by_user: BTreeMap<Address, BTreeSet<OfferId>>,
    by_card: BTreeMap<CardNumber, BTreeSet<OfferId>>,
    by_user_card: BTreeMap<(Address, CardNumber), OfferId>,
    offers_counter: usize,
    user_counters: BTreeMap<Address, usize>,
    card_counters: BTreeMap<CardNumber, usize>,
}

impl OfferBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `offer` into every view.
    ///
    /// # Errors
    ///
    /// - `InvalidOfferId` for id `0`
    /// - `CardInWantedList` if the offered card is also wanted
    /// - `OfferAlreadyExists` for a second offer on `(owner, card)`
    /// - `OfferIdTaken` if the id is active
    pub fn insert(&mut self, offer: Offer) -> EconomyResult<()> {
        if offer.offer_id == 0 {
            return Err(EconomyError::InvalidOfferId);
        }
        if offer.wanted_card_numbers.contains(&offer.card_number) {
            return Err(EconomyError::CardInWantedList);
        }
        if self
            .by_user_card
            .contains_key(&(offer.owner, offer.card_number))
        {
            return Err(EconomyError::OfferAlreadyExists);
        }
        if self.active.contains_key(&offer.offer_id) {
            return Err(EconomyError::OfferIdTaken(offer.offer_id));
        }

        let id = offer.offer_id;
        self.slot_of.insert(id, self.list.len());
        self.list.push(Some(id));
        self.by_user.entry(offer.owner).or_default().insert(id);
        self.by_card.entry(offer.card_number).or_default().insert(id);
        self.by_user_card.insert((offer.owner, offer.card_number), id);
        self.offers_counter += 1;
        *self.user_counters.entry(offer.owner).or_insert(0) += 1;
        *self.card_counters.entry(offer.card_number).or_insert(0) += 1;
        self.active.insert(id, offer);

        debug_assert!(self.verify_consistency());
        Ok(())
    }

    /// Removes an offer from every view, tombstoning its list slot.
    pub fn remove(&mut self, offer_id: OfferId) -> Option<Offer> {
        let offer = self.active.remove(&offer_id)?;

        if let Some(slot) = self.slot_of.remove(&offer_id) {
            self.list[slot] = None;
        }
        remove_from_index(&mut self.by_user, &offer.owner, offer_id);
        remove_from_index(&mut self.by_card, &offer.card_number, offer_id);
        self.by_user_card.remove(&(offer.owner, offer.card_number));
        self.offers_counter -= 1;
        decrement_counter(&mut self.user_counters, &offer.owner);
        decrement_counter(&mut self.card_counters, &offer.card_number);

        debug_assert!(self.verify_consistency());
        Some(offer)
    }

    /// Active offer by id.
    #[must_use]
    pub fn get(&self, offer_id: OfferId) -> Option<&Offer> {
        self.active.get(&offer_id)
    }

    /// Active offer of `owner` on `card_number`.
    #[must_use]
    pub fn by_user_and_card_number(
        &self,
        owner: &Address,
        card_number: CardNumber,
    ) -> Option<&Offer> {
        self.by_user_card
            .get(&(*owner, card_number))
            .and_then(|id| self.active.get(id))
    }

    /// Active offers in creation order.
    pub fn offers(&self) -> impl Iterator<Item = &Offer> + '_ {
        self.list
            .iter()
            .flatten()
            .filter_map(|id| self.active.get(id))
    }

    /// Slot `index` of the global list; `None` when out of range or
    /// tombstoned.
    #[must_use]
    pub fn offer_at(&self, index: usize) -> Option<&Offer> {
        self.list
            .get(index)
            .copied()
            .flatten()
            .and_then(|id| self.active.get(&id))
    }

    /// Slots in the global list, tombstones included.
    #[must_use]
    pub fn list_len(&self) -> usize {
        self.list.len()
    }

    /// Active offers of `owner`, by id.
    #[must_use]
    pub fn offers_by_user(&self, owner: &Address) -> Vec<&Offer> {
        self.by_user
            .get(owner)
            .into_iter()
            .flatten()
            .filter_map(|id| self.active.get(id))
            .collect()
    }

    /// Active offers on `card_number`, by id.
    #[must_use]
    pub fn offers_by_card_number(&self, card_number: CardNumber) -> Vec<&Offer> {
        self.by_card
            .get(&card_number)
            .into_iter()
            .flatten()
            .filter_map(|id| self.active.get(id))
            .collect()
    }

    /// Active offers overall.
    #[inline]
    #[must_use]
    pub fn offers_counter(&self) -> usize {
        self.offers_counter
    }

    /// Active offers of `owner`.
    #[must_use]
    pub fn offers_by_user_counter(&self, owner: &Address) -> usize {
        self.user_counters.get(owner).copied().unwrap_or(0)
    }

    /// Active offers on `card_number`.
    #[must_use]
    pub fn offers_by_card_number_counter(&self, card_number: CardNumber) -> usize {
        self.card_counters.get(&card_number).copied().unwrap_or(0)
    }

    /// Checks every view and counter against the source of truth.
    #[must_use]
    pub fn verify_consistency(&self) -> bool {
        let live_slots = self.list.iter().flatten().count();
        if live_slots != self.active.len()
            || self.offers_counter != self.active.len()
            || self.slot_of.len() != self.active.len()
            || self.by_user_card.len() != self.active.len()
        {
            return false;
        }

        let mut per_user: BTreeMap<Address, usize> = BTreeMap::new();
        let mut per_card: BTreeMap<CardNumber, usize> = BTreeMap::new();
        for (id, offer) in &self.active {
            let slot_ok = self
                .slot_of
                .get(id)
                .is_some_and(|&slot| self.list.get(slot) == Some(&Some(*id)));
            let user_ok = self
                .by_user
                .get(&offer.owner)
                .is_some_and(|ids| ids.contains(id));
            let card_ok = self
                .by_card
                .get(&offer.card_number)
                .is_some_and(|ids| ids.contains(id));
            let pair_ok = self.by_user_card.get(&(offer.owner, offer.card_number)) == Some(id);
            if !(slot_ok && user_ok && card_ok && pair_ok) {
                return false;
            }
            *per_user.entry(offer.owner).or_insert(0) += 1;
            *per_card.entry(offer.card_number).or_insert(0) += 1;
        }

        let user_sizes: BTreeMap<Address, usize> = self
            .by_user
            .iter()
            .map(|(owner, ids)| (*owner, ids.len()))
            .collect();
        let card_sizes: BTreeMap<CardNumber, usize> = self
            .by_card
            .iter()
            .map(|(card, ids)| (*card, ids.len()))
            .collect();

        per_user == user_sizes
            && per_user == self.user_counters
            && per_card == card_sizes
            && per_card == self.card_counters
    }
}

fn remove_from_index<K: Ord>(index: &mut BTreeMap<K, BTreeSet<OfferId>>, key: &K, id: OfferId) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

fn decrement_counter<K: Ord>(counters: &mut BTreeMap<K, usize>, key: &K) {
    if let Some(count) = counters.get_mut(key) {
        *count -= 1;
        if *count == 0 {
            counters.remove(key);
        }
    }
}

// =============================================================================
// OFFER LEDGER
// =============================================================================

/// A settled exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeReceipt {
    /// The offer that was taken.
    pub offer: Offer,
    /// Who took it.
    pub counterparty: Address,
    /// Card the counterparty gave.
    pub counterparty_card_number: CardNumber,
    /// The counterparty's own offer that lost its last backing copy.
    pub cascaded: Option<Offer>,
}

/// Trading rules over an [`OfferBook`].
#[derive(Clone, Debug)]
pub struct OfferLedger {
    owners: CapabilitySet,
    book: OfferBook,
    remove_card_in_inventory_when_offer: bool,
}

impl OfferLedger {
    /// Creates an empty ledger administered by `deployer`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for a zero deployer.
    pub fn new(deployer: Address, policy: &PolicyConfig) -> EconomyResult<Self> {
        Ok(Self {
            owners: CapabilitySet::with_founder(Role::Owner, deployer)?,
            book: OfferBook::new(),
            remove_card_in_inventory_when_offer: policy.remove_card_in_inventory_when_offer,
        })
    }

    /// Owners of this ledger.
    #[must_use]
    pub fn owners(&self) -> &CapabilitySet {
        &self.owners
    }

    /// Owners of this ledger, for administration.
    pub fn owners_mut(&mut self) -> &mut CapabilitySet {
        &mut self.owners
    }

    /// Read access to the views.
    #[must_use]
    pub fn book(&self) -> &OfferBook {
        &self.book
    }

    /// Whether offering a card hides it.
    #[must_use]
    pub fn remove_card_in_inventory_when_offer(&self) -> bool {
        self.remove_card_in_inventory_when_offer
    }

    /// Toggles card hiding and brings every offered flag in line with it.
    pub fn set_remove_card_in_inventory_when_offer(
        &mut self,
        cards: &mut CardLedger,
        enabled: bool,
    ) {
        self.remove_card_in_inventory_when_offer = enabled;
        for offer in self.book.offers() {
            cards.set_offered(offer.owner, offer.card_number, enabled);
        }
    }

    /// Posts an offer of `card_number` by `caller`.
    ///
    /// # Errors
    ///
    /// - `InvalidCardNumber` for cards outside the catalogue
    /// - `InsufficientCards` if `caller` holds no copy
    /// - anything [`OfferBook::insert`] rejects
    pub fn create_offer(
        &mut self,
        cards: &mut CardLedger,
        caller: Address,
        offer_id: OfferId,
        card_number: CardNumber,
        wanted_card_numbers: &[CardNumber],
    ) -> EconomyResult<Offer> {
        let catalogue = cards.catalogue();
        if let Some(&bad) = std::iter::once(&card_number)
            .chain(wanted_card_numbers)
            .find(|&&c| !catalogue.contains(c))
        {
            return Err(EconomyError::InvalidCardNumber(bad));
        }
        if cards.card_quantity(&caller, card_number) == 0 {
            return Err(EconomyError::InsufficientCards {
                card_number,
                required: 1,
                available: 0,
            });
        }

        let offer = Offer {
            offer_id,
            owner: caller,
            card_number,
            wanted_card_numbers: wanted_card_numbers.iter().copied().collect(),
        };
        self.book.insert(offer.clone())?;
        if self.remove_card_in_inventory_when_offer {
            cards.set_offered(caller, card_number, true);
        }
        tracing::debug!("{} offered card {} (offer {})", caller, card_number, offer_id);
        Ok(offer)
    }

    /// Withdraws the offer of `user` on `card_number`. `caller` must be
    /// `user` or an owner.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` for third parties
    /// - `OfferNotFound` if there is no such offer
    pub fn remove_offer_by_user_and_card_number(
        &mut self,
        cards: &mut CardLedger,
        caller: Address,
        user: Address,
        card_number: CardNumber,
    ) -> EconomyResult<Offer> {
        if caller != user {
            self.owners.ensure(&caller)?;
        }
        let offer_id = self
            .book
            .by_user_and_card_number(&user, card_number)
            .map(|offer| offer.offer_id)
            .ok_or(EconomyError::OfferNotFound)?;
        self.delete(cards, offer_id)
    }

    /// Withdraws the caller's own offer on `card_number`.
    ///
    /// # Errors
    ///
    /// Returns `OfferNotFound` if there is no such offer.
    pub fn remove_offer_by_card_number(
        &mut self,
        cards: &mut CardLedger,
        caller: Address,
        card_number: CardNumber,
    ) -> EconomyResult<Offer> {
        self.remove_offer_by_user_and_card_number(cards, caller, caller, card_number)
    }

    /// Settles the offer of `offer_owner` on `offer_card_number` against
    /// `counterparty_card_number` from `counterparty`.
    ///
    /// `caller` must be the counterparty or an owner.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` for third parties
    /// - `InvalidCardNumber` outside the catalogue
    /// - `OfferNotFound` if the offer is not active
    /// - `SelfExchange` if both sides are the same account
    /// - `CardNotWanted` / `AlreadyOwnsCard` if the card is not acceptable
    /// - `InsufficientCards` if either side lacks its card
    pub fn confirm_offer_exchange(
        &mut self,
        cards: &mut CardLedger,
        caller: Address,
        counterparty: Address,
        counterparty_card_number: CardNumber,
        offer_owner: Address,
        offer_card_number: CardNumber,
    ) -> EconomyResult<ExchangeReceipt> {
        if caller != counterparty {
            self.owners.ensure(&caller)?;
        }
        if !cards.catalogue().contains(counterparty_card_number) {
            return Err(EconomyError::InvalidCardNumber(counterparty_card_number));
        }
        let offer = self
            .book
            .by_user_and_card_number(&offer_owner, offer_card_number)
            .ok_or(EconomyError::OfferNotFound)?;
        if counterparty == offer_owner {
            return Err(EconomyError::SelfExchange);
        }

        let owner_holds = cards.card_quantity(&offer_owner, counterparty_card_number) > 0;
        if !offer.accepts(counterparty_card_number, owner_holds) {
            return Err(if offer.wanted_card_numbers.is_empty() {
                EconomyError::AlreadyOwnsCard
            } else {
                EconomyError::CardNotWanted
            });
        }
        for (holder, card_number) in [
            (offer_owner, offer_card_number),
            (counterparty, counterparty_card_number),
        ] {
            let available = cards.card_quantity(&holder, card_number);
            if available == 0 {
                return Err(EconomyError::InsufficientCards {
                    card_number,
                    required: 1,
                    available,
                });
            }
        }

        let offer_id = offer.offer_id;
        let offer = self.delete(cards, offer_id)?;
        cards.debit(offer_owner, offer_card_number, 1)?;
        cards.credit(counterparty, offer_card_number, 1)?;
        cards.debit(counterparty, counterparty_card_number, 1)?;
        cards.credit(offer_owner, counterparty_card_number, 1)?;

        let cascaded = match self
            .book
            .by_user_and_card_number(&counterparty, counterparty_card_number)
        {
            Some(own) if cards.card_quantity(&counterparty, counterparty_card_number) == 0 => {
                let own_id = own.offer_id;
                Some(self.delete(cards, own_id)?)
            }
            _ => None,
        };

        tracing::info!(
            "Offer {} settled: {} gave card {}, {} gave card {}",
            offer.offer_id,
            offer_owner,
            offer_card_number,
            counterparty,
            counterparty_card_number
        );
        Ok(ExchangeReceipt {
            offer,
            counterparty,
            counterparty_card_number,
            cascaded,
        })
    }

    /// Removes every offer of `user`.
    pub(crate) fn remove_offers_of_user(
        &mut self,
        cards: &mut CardLedger,
        user: &Address,
    ) -> EconomyResult<Vec<Offer>> {
        let ids: Vec<OfferId> = self
            .book
            .offers_by_user(user)
            .iter()
            .map(|offer| offer.offer_id)
            .collect();
        ids.into_iter().map(|id| self.delete(cards, id)).collect()
    }

    /// Removes every offer in the book. Owner only.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` for non-owners.
    pub fn delete_all_offers(
        &mut self,
        cards: &mut CardLedger,
        caller: Address,
    ) -> EconomyResult<Vec<Offer>> {
        self.owners.ensure(&caller)?;
        let ids: Vec<OfferId> = self.book.offers().map(|offer| offer.offer_id).collect();
        let removed: Vec<Offer> = ids
            .into_iter()
            .map(|id| self.delete(cards, id))
            .collect::<EconomyResult<_>>()?;
        tracing::info!("{} deleted all {} offers", caller, removed.len());
        Ok(removed)
    }

    fn delete(&mut self, cards: &mut CardLedger, offer_id: OfferId) -> EconomyResult<Offer> {
        let offer = self
            .book
            .remove(offer_id)
            .ok_or(EconomyError::OfferNotFound)?;
        cards.set_offered(offer.owner, offer.card_number, false);
        Ok(offer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogueConfig;

    fn alice() -> Address {
        Address::repeat_byte(1)
    }

    fn bob() -> Address {
        Address::repeat_byte(2)
    }

    fn admin() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn setup() -> (OfferLedger, CardLedger) {
        let policy = PolicyConfig::default();
        let cards = CardLedger::new(admin(), CatalogueConfig::default(), &policy).unwrap();
        let offers = OfferLedger::new(admin(), &policy).unwrap();
        (offers, cards)
    }

    fn offer(offer_id: OfferId, owner: Address, card_number: CardNumber) -> Offer {
        Offer {
            offer_id,
            owner,
            card_number,
            wanted_card_numbers: BTreeSet::new(),
        }
    }

    #[test]
    fn test_book_views_agree() {
        let mut book = OfferBook::new();
        book.insert(offer(1, alice(), 3)).unwrap();
        book.insert(offer(2, alice(), 4)).unwrap();
        book.insert(offer(3, bob(), 3)).unwrap();

        assert_eq!(book.offers_counter(), 3);
        assert_eq!(book.offers_by_user_counter(&alice()), 2);
        assert_eq!(book.offers_by_card_number_counter(3), 2);
        assert_eq!(book.offers_by_card_number(3).len(), 2);

        book.remove(1).unwrap();
        assert!(book.verify_consistency());
        assert_eq!(book.offers_counter(), 2);
        assert_eq!(book.offers_by_user(&alice()).len(), 1);
        assert_eq!(book.offers_by_card_number_counter(3), 1);
        assert!(book.offer_at(0).is_none());
        assert_eq!(book.offer_at(1).map(|o| o.offer_id), Some(2));
        assert_eq!(book.list_len(), 3);
        assert!(book.remove(1).is_none());
    }

    #[test]
    fn test_book_rejections() {
        let mut book = OfferBook::new();
        assert_eq!(book.insert(offer(0, alice(), 3)), Err(EconomyError::InvalidOfferId));

        let mut selfish = offer(1, alice(), 3);
        selfish.wanted_card_numbers.insert(3);
        assert_eq!(book.insert(selfish), Err(EconomyError::CardInWantedList));

        book.insert(offer(1, alice(), 3)).unwrap();
        assert_eq!(
            book.insert(offer(2, alice(), 3)),
            Err(EconomyError::OfferAlreadyExists)
        );
        assert_eq!(book.insert(offer(1, bob(), 3)), Err(EconomyError::OfferIdTaken(1)));
        assert!(book.verify_consistency());
    }

    #[test]
    fn test_create_sets_offered_flag() {
        let (mut offers, mut cards) = setup();
        cards.mint_from_pack_data(alice(), &[3]).unwrap();

        offers.create_offer(&mut cards, alice(), 7, 3, &[90]).unwrap();
        assert!(cards.is_offered(&alice(), 3));
        assert!(!cards.has_card(&alice(), 3));

        offers
            .remove_offer_by_card_number(&mut cards, alice(), 3)
            .unwrap();
        assert!(!cards.is_offered(&alice(), 3));
        assert!(cards.has_card(&alice(), 3));
    }

    #[test]
    fn test_create_requires_card() {
        let (mut offers, mut cards) = setup();
        assert!(matches!(
            offers.create_offer(&mut cards, alice(), 1, 3, &[]),
            Err(EconomyError::InsufficientCards { .. })
        ));
        assert_eq!(
            offers.create_offer(&mut cards, alice(), 1, 500, &[]),
            Err(EconomyError::InvalidCardNumber(500))
        );
    }

    #[test]
    fn test_remove_by_third_party() {
        let (mut offers, mut cards) = setup();
        cards.mint_from_pack_data(alice(), &[3]).unwrap();
        offers.create_offer(&mut cards, alice(), 1, 3, &[]).unwrap();

        assert_eq!(
            offers.remove_offer_by_user_and_card_number(&mut cards, bob(), alice(), 3),
            Err(EconomyError::NotAuthorized(Role::Owner))
        );
        offers
            .remove_offer_by_user_and_card_number(&mut cards, admin(), alice(), 3)
            .unwrap();
        assert_eq!(
            offers.remove_offer_by_card_number(&mut cards, alice(), 3),
            Err(EconomyError::OfferNotFound)
        );
    }

    #[test]
    fn test_exchange_with_wanted_list() {
        let (mut offers, mut cards) = setup();
        cards.mint_from_pack_data(alice(), &[3]).unwrap();
        cards.mint_from_pack_data(bob(), &[90, 91]).unwrap();
        offers.create_offer(&mut cards, alice(), 1, 3, &[90]).unwrap();

        assert_eq!(
            offers.confirm_offer_exchange(&mut cards, bob(), bob(), 91, alice(), 3),
            Err(EconomyError::CardNotWanted)
        );

        let receipt = offers
            .confirm_offer_exchange(&mut cards, bob(), bob(), 90, alice(), 3)
            .unwrap();
        assert_eq!(receipt.offer.offer_id, 1);
        assert_eq!(cards.card_quantity(&alice(), 90), 1);
        assert_eq!(cards.card_quantity(&alice(), 3), 0);
        assert_eq!(cards.card_quantity(&bob(), 3), 1);
        assert_eq!(cards.card_quantity(&bob(), 90), 0);
        assert!(!cards.is_offered(&alice(), 3));
        assert_eq!(offers.book().offers_counter(), 0);
    }

    #[test]
    fn test_open_ended_offer() {
        let (mut offers, mut cards) = setup();
        cards.mint_from_pack_data(alice(), &[3, 50]).unwrap();
        cards.mint_from_pack_data(bob(), &[50, 51]).unwrap();
        offers.create_offer(&mut cards, alice(), 1, 3, &[]).unwrap();

        assert_eq!(
            offers.confirm_offer_exchange(&mut cards, bob(), bob(), 50, alice(), 3),
            Err(EconomyError::AlreadyOwnsCard)
        );
        offers
            .confirm_offer_exchange(&mut cards, bob(), bob(), 51, alice(), 3)
            .unwrap();
        assert_eq!(cards.card_quantity(&alice(), 51), 1);
    }

    #[test]
    fn test_exchange_guards() {
        let (mut offers, mut cards) = setup();
        cards.mint_from_pack_data(alice(), &[3, 90]).unwrap();
        offers.create_offer(&mut cards, alice(), 1, 3, &[90]).unwrap();

        assert_eq!(
            offers.confirm_offer_exchange(&mut cards, alice(), alice(), 90, alice(), 3),
            Err(EconomyError::SelfExchange)
        );
        assert_eq!(
            offers.confirm_offer_exchange(&mut cards, alice(), bob(), 90, alice(), 3),
            Err(EconomyError::NotAuthorized(Role::Owner))
        );
        assert!(matches!(
            offers.confirm_offer_exchange(&mut cards, bob(), bob(), 90, alice(), 3),
            Err(EconomyError::InsufficientCards { card_number: 90, .. })
        ));
        assert_eq!(
            offers.confirm_offer_exchange(&mut cards, bob(), bob(), 90, alice(), 4),
            Err(EconomyError::OfferNotFound)
        );
        assert_eq!(offers.book().offers_counter(), 1);
    }

    #[test]
    fn test_exchange_cascades_counterparty_offer() {
        let (mut offers, mut cards) = setup();
        cards.mint_from_pack_data(alice(), &[3]).unwrap();
        cards.mint_from_pack_data(bob(), &[90]).unwrap();
        offers.create_offer(&mut cards, alice(), 1, 3, &[90]).unwrap();
        offers.create_offer(&mut cards, bob(), 2, 90, &[]).unwrap();

        let receipt = offers
            .confirm_offer_exchange(&mut cards, admin(), bob(), 90, alice(), 3)
            .unwrap();
        assert_eq!(receipt.cascaded.map(|o| o.offer_id), Some(2));
        assert!(!cards.is_offered(&bob(), 90));
        assert_eq!(offers.book().offers_counter(), 0);
        assert!(offers.book().verify_consistency());
    }

    #[test]
    fn test_recreate_after_removal() {
        let (mut offers, mut cards) = setup();
        cards.mint_from_pack_data(alice(), &[3]).unwrap();
        offers.create_offer(&mut cards, alice(), 1, 3, &[]).unwrap();
        offers
            .remove_offer_by_card_number(&mut cards, alice(), 3)
            .unwrap();

        offers.create_offer(&mut cards, alice(), 1, 3, &[]).unwrap();
        assert_eq!(offers.book().offers_counter(), 1);
    }

    #[test]
    fn test_toggle_hiding_resyncs_flags() {
        let (mut offers, mut cards) = setup();
        cards.mint_from_pack_data(alice(), &[3]).unwrap();
        offers.create_offer(&mut cards, alice(), 1, 3, &[]).unwrap();

        offers.set_remove_card_in_inventory_when_offer(&mut cards, false);
        assert!(!cards.is_offered(&alice(), 3));

        offers.set_remove_card_in_inventory_when_offer(&mut cards, true);
        assert!(cards.is_offered(&alice(), 3));
    }

    #[test]
    fn test_delete_all_offers() {
        let (mut offers, mut cards) = setup();
        cards.mint_from_pack_data(alice(), &[3, 4]).unwrap();
        cards.mint_from_pack_data(bob(), &[5]).unwrap();
        offers.create_offer(&mut cards, alice(), 1, 3, &[]).unwrap();
        offers.create_offer(&mut cards, alice(), 2, 4, &[]).unwrap();
        offers.create_offer(&mut cards, bob(), 3, 5, &[]).unwrap();

        assert!(offers.delete_all_offers(&mut cards, alice()).is_err());
        assert_eq!(offers.delete_all_offers(&mut cards, admin()).unwrap().len(), 3);
        assert_eq!(offers.book().offers_counter(), 0);
        assert_eq!(cards.offered_pairs().count(), 0);
    }
}
