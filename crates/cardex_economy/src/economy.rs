//! # Card Economy
//!
//! The facade every caller goes through. It owns the four ledgers, the
//! prize pool and the payment token, and runs each public operation as a
//! transaction:
//!
//! ```text
//!   snapshot ──> operation ──ok──> commit (publish events)
//!                    │
//!                    └──err──> restore snapshot (drop events)
//! ```
//!
//! Nothing an aborted call did is observable afterwards, token movements
//! included.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use cardex_shared::{CardNumber, EventSender, LedgerEvent, OfferId, PackId, TicketId};
use parking_lot::Mutex;

use crate::auth::{PackAuthenticator, PackOpening};
use crate::capability::CapabilitySet;
use crate::cards::{BurnReceipt, CardLedger, CardsByUser};
use crate::config::EconomyConfig;
use crate::error::{EconomyError, EconomyResult};
use crate::offers::{ExchangeReceipt, Offer, OfferBook, OfferLedger};
use crate::packs::PackLedger;
use crate::pool::{Prize, PrizePool};
use crate::tickets::TicketLedger;
use crate::token::{PaymentToken, TokenLedger};

/// Selects which ledger's owner set an administrative call targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ledger {
    /// Card ledger (also gates signer administration and bypass paths).
    Cards,
    /// Pack ledger.
    Packs,
    /// Offer ledger.
    Offers,
    /// Ticket ledger.
    Tickets,
}

/// One pack of a batch opening.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackOpeningRequest {
    /// Pack to open.
    pub pack_id: PackId,
    /// Cards to mint.
    pub pack_data: Vec<CardNumber>,
    /// Signer's signature over the opening.
    pub signature: Vec<u8>,
}

/// What a burn paid out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnOutcome {
    /// Card ledger receipt.
    pub receipt: BurnReceipt,
    /// Tickets issued, one per milestone.
    pub tickets: Vec<TicketId>,
    /// Total prize paid.
    pub prize_paid: U256,
}

/// Everything restored when a transaction aborts.
struct Snapshot<T> {
    cards: CardLedger,
    packs: PackLedger,
    offers: OfferLedger,
    tickets: TicketLedger,
    pool: PrizePool,
    token: T,
}

/// The transactional facade over the card economy.
pub struct CardEconomy<T: PaymentToken + Clone = TokenLedger> {
    vault: Address,
    cards: CardLedger,
    packs: PackLedger,
    offers: OfferLedger,
    tickets: TicketLedger,
    pool: PrizePool,
    token: T,
    authenticator: Option<Box<dyn PackAuthenticator + Send + Sync>>,
    event_sender: Option<EventSender>,
    pending_events: Vec<LedgerEvent>,
    event_buffer: Vec<LedgerEvent>,
}

impl<T: PaymentToken + Clone> CardEconomy<T> {
    /// Creates an economy.
    ///
    /// `deployer` becomes the first owner of every ledger and the first
    /// signer. `vault` is the account holding the economy's tokens and the
    /// validator address signatures are bound to.
    ///
    /// # Errors
    ///
    /// - `InvalidAddress` if either address is zero
    /// - `InvalidConfig` if `config` does not validate
    pub fn new(
        deployer: Address,
        vault: Address,
        config: &EconomyConfig,
        token: T,
    ) -> EconomyResult<Self> {
        if vault == Address::ZERO {
            return Err(EconomyError::InvalidAddress);
        }
        config.validate()?;
        let pricing = &config.pricing;
        tracing::info!(
            "Card economy deployed by {} (vault {}, {} cards)",
            deployer,
            vault,
            config.catalogue.total_cards
        );
        Ok(Self {
            vault,
            cards: CardLedger::new(deployer, config.catalogue, &config.policy)?,
            packs: PackLedger::new(deployer, &config.policy)?,
            offers: OfferLedger::new(deployer, &config.policy)?,
            tickets: TicketLedger::new(deployer)?,
            pool: PrizePool::new(
                pricing.pack_price,
                pricing.prize_share_bps,
                pricing.main_album_prize,
                pricing.secondary_album_prize,
            ),
            token,
            authenticator: None,
            event_sender: None,
            pending_events: Vec::new(),
            event_buffer: Vec::new(),
        })
    }

    /// Installs the pack-opening authenticator.
    #[must_use]
    pub fn with_authenticator(
        mut self,
        authenticator: impl PackAuthenticator + Send + Sync + 'static,
    ) -> Self {
        self.authenticator = Some(Box::new(authenticator));
        self
    }

    /// Publishes committed events on `sender` instead of buffering them.
    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            cards: self.cards.clone(),
            packs: self.packs.clone(),
            offers: self.offers.clone(),
            tickets: self.tickets.clone(),
            pool: self.pool.clone(),
            token: self.token.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot<T>) {
        self.cards = snapshot.cards;
        self.packs = snapshot.packs;
        self.offers = snapshot.offers;
        self.tickets = snapshot.tickets;
        self.pool = snapshot.pool;
        self.token = snapshot.token;
    }

    fn transact<R>(
        &mut self,
        operation: &'static str,
        body: impl FnOnce(&mut Self) -> EconomyResult<R>,
    ) -> EconomyResult<R> {
        let snapshot = self.snapshot();
        self.pending_events.clear();
        match body(self) {
            Ok(value) => {
                self.commit();
                Ok(value)
            }
            Err(err) => {
                self.restore(snapshot);
                self.pending_events.clear();
                tracing::debug!("{} reverted: {}", operation, err);
                Err(err)
            }
        }
    }

    fn commit(&mut self) {
        for event in self.pending_events.drain(..) {
            match &self.event_sender {
                Some(sender) => {
                    if !sender.send(event) {
                        tracing::warn!("Event bus full, dropped ledger event");
                    }
                }
                None => self.event_buffer.push(event),
            }
        }
    }

    fn emit(&mut self, event: LedgerEvent) {
        self.pending_events.push(event);
    }

    /// Takes the committed events buffered since the last drain.
    ///
    /// Empty when an event sender is installed.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.event_buffer)
    }

    // =========================================================================
    // Capability administration
    // =========================================================================

    fn owner_set(&self, ledger: Ledger) -> &CapabilitySet {
        match ledger {
            Ledger::Cards => self.cards.owners(),
            Ledger::Packs => self.packs.owners(),
            Ledger::Offers => self.offers.owners(),
            Ledger::Tickets => self.tickets.owners(),
        }
    }

    fn owner_set_mut(&mut self, ledger: Ledger) -> &mut CapabilitySet {
        match ledger {
            Ledger::Cards => self.cards.owners_mut(),
            Ledger::Packs => self.packs.owners_mut(),
            Ledger::Offers => self.offers.owners_mut(),
            Ledger::Tickets => self.tickets.owners_mut(),
        }
    }

    fn ensure_owner(&self, ledger: Ledger, caller: &Address) -> EconomyResult<()> {
        self.owner_set(ledger).ensure(caller)
    }

    /// Whether `address` owns `ledger`.
    #[must_use]
    pub fn is_owner(&self, ledger: Ledger, address: &Address) -> bool {
        self.owner_set(ledger).contains(address)
    }

    /// Whether `address` may sign pack openings.
    #[must_use]
    pub fn is_signer(&self, address: &Address) -> bool {
        self.cards.signers().contains(address)
    }

    /// Adds an owner to `ledger`.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners, otherwise as [`CapabilitySet::add`].
    pub fn add_owner(&mut self, ledger: Ledger, caller: Address, owner: Address) -> EconomyResult<()> {
        self.ensure_owner(ledger, &caller)?;
        self.owner_set_mut(ledger).add(owner)
    }

    /// Removes an owner from `ledger`.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners, otherwise as [`CapabilitySet::remove`].
    pub fn remove_owner(
        &mut self,
        ledger: Ledger,
        caller: Address,
        owner: Address,
    ) -> EconomyResult<()> {
        self.ensure_owner(ledger, &caller)?;
        self.owner_set_mut(ledger).remove(caller, owner)
    }

    /// Registers a pack signer. Card ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners, otherwise as [`CapabilitySet::add`].
    pub fn add_signer(&mut self, caller: Address, signer: Address) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Cards, &caller)?;
        self.cards.signers_mut().add(signer)
    }

    /// Unregisters a pack signer. Card ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners, otherwise as [`CapabilitySet::remove`].
    pub fn remove_signer(&mut self, caller: Address, signer: Address) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Cards, &caller)?;
        self.cards.signers_mut().remove(caller, signer)
    }

    // =========================================================================
    // Policy administration
    // =========================================================================

    /// Sets the revenue receiver. Pack ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners, `InvalidAddress` for zero.
    pub fn change_balance_receiver(&mut self, caller: Address, receiver: Address) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Packs, &caller)?;
        self.packs.set_balance_receiver(receiver)
    }

    /// Reprices packs. Pack ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners.
    pub fn change_pack_price(&mut self, caller: Address, price: U256) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Packs, &caller)?;
        self.pool.set_pack_price(price);
        tracing::info!("Pack price changed to {} by {}", price, caller);
        Ok(())
    }

    /// Toggles revenue forwarding. Pack ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners.
    pub fn change_transfer_dai_flag(&mut self, caller: Address, enabled: bool) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Packs, &caller)?;
        self.packs.set_transfer_dai(enabled);
        Ok(())
    }

    /// Toggles signature checks on pack opening. Card ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners.
    pub fn change_require_open_pack_signer_validation(
        &mut self,
        caller: Address,
        enabled: bool,
    ) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Cards, &caller)?;
        self.cards.set_require_open_pack_signer_validation(enabled);
        Ok(())
    }

    /// Toggles the offered-card guard on mint. Card ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners.
    pub fn change_require_offer_validation_in_mint(
        &mut self,
        caller: Address,
        enabled: bool,
    ) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Cards, &caller)?;
        self.cards.set_require_offer_validation_in_mint(enabled);
        Ok(())
    }

    /// Toggles the offered-card guard on transfer. Card ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners.
    pub fn change_require_offer_validation_in_transfer(
        &mut self,
        caller: Address,
        enabled: bool,
    ) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Cards, &caller)?;
        self.cards.set_require_offer_validation_in_transfer(enabled);
        Ok(())
    }

    /// Toggles hiding offered cards. Offer ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners.
    pub fn change_remove_card_in_inventory_when_offer(
        &mut self,
        caller: Address,
        enabled: bool,
    ) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Offers, &caller)?;
        self.offers
            .set_remove_card_in_inventory_when_offer(&mut self.cards, enabled);
        Ok(())
    }

    // =========================================================================
    // Packs
    // =========================================================================

    /// Buys one pack.
    ///
    /// # Errors
    ///
    /// See [`Self::buy_packs`].
    pub fn buy_pack(&mut self, buyer: Address) -> EconomyResult<PackId> {
        let ids = self.buy_packs(buyer, 1)?;
        ids.first().copied().ok_or(EconomyError::InvalidPackCount)
    }

    /// Buys `count` packs, paid by `buyer` through its allowance to the vault.
    ///
    /// # Errors
    ///
    /// - `InvalidPackCount` for zero packs
    /// - `Token` if allowance or balance fall short
    pub fn buy_packs(&mut self, buyer: Address, count: u64) -> EconomyResult<Vec<PackId>> {
        self.transact("buy_packs", |economy| economy.sell_packs(buyer, count))
    }

    /// Buys `count` packs for `user`, paid from `user`'s allowance. Pack
    /// ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners, otherwise as [`Self::buy_packs`].
    pub fn buy_packs_for(
        &mut self,
        caller: Address,
        user: Address,
        count: u64,
    ) -> EconomyResult<Vec<PackId>> {
        self.ensure_owner(Ledger::Packs, &caller)?;
        self.transact("buy_packs_for", |economy| economy.sell_packs(user, count))
    }

    fn sell_packs(&mut self, buyer: Address, count: u64) -> EconomyResult<Vec<PackId>> {
        if count == 0 {
            return Err(EconomyError::InvalidPackCount);
        }
        let amount = self.pool.price_of(count)?;
        self.token
            .transfer_from(self.vault, buyer, self.vault, amount)?;
        let share = self.pool.credit_revenue(amount)?;
        if let Some(receiver) = self.packs.revenue_destination() {
            let remainder = amount - share;
            if remainder > U256::ZERO {
                self.token.transfer(self.vault, receiver, remainder)?;
            }
        }
        let pack_ids = self.packs.mint_packs(buyer, count)?;
        tracing::info!("{} bought {} packs for {}", buyer, count, amount);
        self.emit(LedgerEvent::PacksPurchased {
            buyer,
            pack_ids: pack_ids.clone(),
            amount,
        });
        Ok(pack_ids)
    }

    /// Gives one pack to `to`.
    ///
    /// # Errors
    ///
    /// See [`Self::transfer_packs`].
    pub fn transfer_pack(&mut self, caller: Address, to: Address, pack_id: PackId) -> EconomyResult<()> {
        self.transfer_packs(caller, to, &[pack_id])
    }

    /// Gives every pack in `pack_ids` to `to`.
    ///
    /// # Errors
    ///
    /// As [`PackLedger::transfer_packs`].
    pub fn transfer_packs(
        &mut self,
        caller: Address,
        to: Address,
        pack_ids: &[PackId],
    ) -> EconomyResult<()> {
        self.transact("transfer_packs", |economy| {
            economy.packs.transfer_packs(caller, to, pack_ids)?;
            for &pack_id in pack_ids {
                economy.emit(LedgerEvent::PackTransferred {
                    from: caller,
                    to,
                    pack_id,
                });
            }
            Ok(())
        })
    }

    /// Opens a pack owned by `caller` and mints `pack_data` into its account.
    ///
    /// # Errors
    ///
    /// - `InvalidPackData` for empty or oversized packs
    /// - `PackNotFound` / `NotPackOwner` if `caller` does not own the pack
    /// - `InvalidSignature` when validation is on and no registered signer
    ///   signed this exact opening
    /// - `InvalidCardNumber` for cards outside the catalogue
    pub fn open_pack(
        &mut self,
        caller: Address,
        pack_id: PackId,
        pack_data: &[CardNumber],
        signature: &[u8],
    ) -> EconomyResult<()> {
        self.transact("open_pack", |economy| {
            economy.open_one(caller, pack_id, pack_data, Some(signature))
        })
    }

    /// Opens several packs; all open or none do.
    ///
    /// # Errors
    ///
    /// The first failure of [`Self::open_pack`].
    pub fn open_packs(
        &mut self,
        caller: Address,
        openings: &[PackOpeningRequest],
    ) -> EconomyResult<()> {
        if openings.is_empty() {
            return Err(EconomyError::InvalidPackCount);
        }
        self.transact("open_packs", |economy| {
            for opening in openings {
                economy.open_one(
                    caller,
                    opening.pack_id,
                    &opening.pack_data,
                    Some(&opening.signature),
                )?;
            }
            Ok(())
        })
    }

    /// Opens `user`'s pack without a signature. Card ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners, otherwise as [`Self::open_pack`].
    pub fn open_pack_for(
        &mut self,
        caller: Address,
        user: Address,
        pack_id: PackId,
        pack_data: &[CardNumber],
    ) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Cards, &caller)?;
        self.transact("open_pack_for", |economy| {
            economy.open_one(user, pack_id, pack_data, None)
        })
    }

    fn open_one(
        &mut self,
        owner: Address,
        pack_id: PackId,
        pack_data: &[CardNumber],
        signature: Option<&[u8]>,
    ) -> EconomyResult<()> {
        let max = self.cards.catalogue().cards_per_pack;
        if pack_data.is_empty() || pack_data.len() > max {
            return Err(EconomyError::InvalidPackData {
                len: pack_data.len(),
                max,
            });
        }
        self.packs.ensure_owner(&owner, pack_id)?;

        if let Some(signature) = signature {
            if self.cards.require_open_pack_signer_validation() {
                let authenticator = self
                    .authenticator
                    .as_ref()
                    .ok_or(EconomyError::InvalidSignature)?;
                let opening = PackOpening {
                    buyer: owner,
                    pack_number: pack_id,
                    pack_data,
                    validator: self.vault,
                };
                authenticator.verify(&opening, signature, self.cards.signers())?;
            }
        }

        self.packs.consume(owner, pack_id)?;
        self.cards.mint_from_pack_data(owner, pack_data)?;
        tracing::debug!("{} opened pack {}", owner, pack_id);
        self.emit(LedgerEvent::PackOpened {
            owner,
            pack_id,
            pack_data: pack_data.to_vec(),
        });
        Ok(())
    }

    // =========================================================================
    // Cards
    // =========================================================================

    /// Gives one copy of `card_number` to `to`.
    ///
    /// # Errors
    ///
    /// See [`Self::transfer_cards`].
    pub fn transfer_card(
        &mut self,
        caller: Address,
        to: Address,
        card_number: CardNumber,
    ) -> EconomyResult<()> {
        self.transfer_cards(caller, to, &[card_number])
    }

    /// Gives one copy per entry of `card_numbers` to `to`.
    ///
    /// # Errors
    ///
    /// As [`CardLedger::transfer_cards`].
    pub fn transfer_cards(
        &mut self,
        caller: Address,
        to: Address,
        card_numbers: &[CardNumber],
    ) -> EconomyResult<()> {
        self.transact("transfer_cards", |economy| {
            economy.cards.transfer_cards(caller, to, card_numbers)?;
            for &card_number in card_numbers {
                economy.emit(LedgerEvent::CardTransferred {
                    from: caller,
                    to,
                    card_number,
                });
            }
            Ok(())
        })
    }

    /// Credits one copy of `card_number` to `user`. Card ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners, otherwise as [`CardLedger::mint_card`].
    pub fn mint_card(
        &mut self,
        caller: Address,
        user: Address,
        card_number: CardNumber,
    ) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Cards, &caller)?;
        self.transact("mint_card", |economy| economy.cards.mint_card(user, card_number))
    }

    /// Credits one copy of every card to `user`. Card ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners.
    pub fn test_add_cards(&mut self, caller: Address, user: Address) -> EconomyResult<()> {
        self.ensure_owner(Ledger::Cards, &caller)?;
        self.transact("test_add_cards", |economy| economy.cards.add_all_cards(user))
    }

    /// Burns cards and pays one secondary prize plus one ticket per burn
    /// milestone crossed.
    ///
    /// # Errors
    ///
    /// - anything [`CardLedger::burn_cards`] rejects
    /// - `InsufficientPrizePool` / `InsufficientVaultBalance` if a milestone
    ///   prize cannot be paid; the whole burn is reverted
    pub fn burn_cards(
        &mut self,
        caller: Address,
        card_numbers: &[CardNumber],
    ) -> EconomyResult<BurnOutcome> {
        self.transact("burn_cards", |economy| {
            let receipt = economy.cards.burn_cards(caller, card_numbers)?;
            economy.emit(LedgerEvent::CardsBurned {
                owner: caller,
                card_numbers: card_numbers.to_vec(),
            });

            let mut tickets = Vec::new();
            let mut prize_paid = U256::ZERO;
            for _ in 0..receipt.milestones {
                let amount = economy.pay_prize(Prize::Secondary, caller)?;
                let ticket_id = economy.tickets.issue_ticket(caller)?;
                prize_paid = prize_paid
                    .checked_add(amount)
                    .ok_or(EconomyError::ArithmeticOverflow)?;
                tickets.push(ticket_id);
                economy.emit(LedgerEvent::TicketIssued {
                    ticket_id,
                    owner: caller,
                });
                economy.emit(LedgerEvent::BurnPrizePaid {
                    owner: caller,
                    amount,
                    ticket_id,
                });
                tracing::info!("{} reached a burn milestone, ticket {}", caller, ticket_id);
            }
            Ok(BurnOutcome {
                receipt,
                tickets,
                prize_paid,
            })
        })
    }

    /// Claims the grand prize with the album card, consuming it, and purges
    /// every offer of `caller`.
    ///
    /// # Errors
    ///
    /// - `AlbumNotCompleted` without the album card
    /// - `InsufficientPrizePool` / `InsufficientVaultBalance` if the prize
    ///   cannot be paid
    pub fn finish_album(&mut self, caller: Address) -> EconomyResult<U256> {
        self.transact("finish_album", |economy| {
            economy.cards.take_album_card(caller)?;
            let amount = economy.pay_prize(Prize::MainAlbum, caller)?;
            let removed = economy
                .offers
                .remove_offers_of_user(&mut economy.cards, &caller)?;
            for offer in removed {
                economy.emit(LedgerEvent::OfferRemoved {
                    offer_id: offer.offer_id,
                    owner: offer.owner,
                    card_number: offer.card_number,
                });
            }
            economy.emit(LedgerEvent::AlbumCompleted {
                owner: caller,
                amount,
            });
            tracing::info!("{} completed the album and won {}", caller, amount);
            Ok(amount)
        })
    }

    /// Debits `prize` from the pool and pays it to `winner` from the vault.
    fn pay_prize(&mut self, prize: Prize, winner: Address) -> EconomyResult<U256> {
        let amount = self.pool.ensure_covers(prize)?;
        let available = self.token.balance_of(&self.vault);
        if available < amount {
            return Err(EconomyError::InsufficientVaultBalance {
                required: amount,
                available,
            });
        }
        self.pool.debit(prize)?;
        self.token.transfer(self.vault, winner, amount)?;
        Ok(amount)
    }

    // =========================================================================
    // Offers
    // =========================================================================

    /// Posts a trade offer.
    ///
    /// # Errors
    ///
    /// As [`OfferLedger::create_offer`].
    pub fn create_offer(
        &mut self,
        caller: Address,
        offer_id: OfferId,
        card_number: CardNumber,
        wanted_card_numbers: &[CardNumber],
    ) -> EconomyResult<Offer> {
        self.transact("create_offer", |economy| {
            let offer = economy.offers.create_offer(
                &mut economy.cards,
                caller,
                offer_id,
                card_number,
                wanted_card_numbers,
            )?;
            economy.emit(LedgerEvent::OfferCreated {
                offer_id,
                owner: caller,
                card_number,
                wanted_card_numbers: offer.wanted_card_numbers.iter().copied().collect(),
            });
            Ok(offer)
        })
    }

    /// Withdraws `user`'s offer on `card_number`.
    ///
    /// # Errors
    ///
    /// As [`OfferLedger::remove_offer_by_user_and_card_number`].
    pub fn remove_offer_by_user_and_card_number(
        &mut self,
        caller: Address,
        user: Address,
        card_number: CardNumber,
    ) -> EconomyResult<Offer> {
        self.transact("remove_offer", |economy| {
            let offer = economy.offers.remove_offer_by_user_and_card_number(
                &mut economy.cards,
                caller,
                user,
                card_number,
            )?;
            economy.emit_removed(&offer);
            Ok(offer)
        })
    }

    /// Withdraws the caller's offer on `card_number`.
    ///
    /// # Errors
    ///
    /// As [`OfferLedger::remove_offer_by_card_number`].
    pub fn remove_offer_by_card_number(
        &mut self,
        caller: Address,
        card_number: CardNumber,
    ) -> EconomyResult<Offer> {
        self.remove_offer_by_user_and_card_number(caller, caller, card_number)
    }

    /// Settles an offer.
    ///
    /// # Errors
    ///
    /// As [`OfferLedger::confirm_offer_exchange`].
    pub fn confirm_offer_exchange(
        &mut self,
        caller: Address,
        counterparty: Address,
        counterparty_card_number: CardNumber,
        offer_owner: Address,
        offer_card_number: CardNumber,
    ) -> EconomyResult<ExchangeReceipt> {
        self.transact("confirm_offer_exchange", |economy| {
            let receipt = economy.offers.confirm_offer_exchange(
                &mut economy.cards,
                caller,
                counterparty,
                counterparty_card_number,
                offer_owner,
                offer_card_number,
            )?;
            economy.emit(LedgerEvent::OfferExchanged {
                offer_id: receipt.offer.offer_id,
                offer_owner,
                offer_card_number,
                counterparty,
                counterparty_card_number,
            });
            if let Some(cascaded) = &receipt.cascaded {
                economy.emit_removed(cascaded);
            }
            Ok(receipt)
        })
    }

    /// Removes every offer. Offer ledger owners only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for non-owners.
    pub fn delete_all_offers(&mut self, caller: Address) -> EconomyResult<usize> {
        self.transact("delete_all_offers", |economy| {
            let removed = economy
                .offers
                .delete_all_offers(&mut economy.cards, caller)?;
            for offer in &removed {
                economy.emit_removed(offer);
            }
            Ok(removed.len())
        })
    }

    fn emit_removed(&mut self, offer: &Offer) {
        self.emit(LedgerEvent::OfferRemoved {
            offer_id: offer.offer_id,
            owner: offer.owner,
            card_number: offer.card_number,
        });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The vault / validator address.
    #[must_use]
    pub fn vault(&self) -> Address {
        self.vault
    }

    /// The card ledger.
    #[must_use]
    pub fn cards(&self) -> &CardLedger {
        &self.cards
    }

    /// The pack ledger.
    #[must_use]
    pub fn packs(&self) -> &PackLedger {
        &self.packs
    }

    /// The offer ledger.
    #[must_use]
    pub fn offers(&self) -> &OfferLedger {
        &self.offers
    }

    /// The offer views.
    #[must_use]
    pub fn offer_book(&self) -> &OfferBook {
        self.offers.book()
    }

    /// The ticket ledger.
    #[must_use]
    pub fn tickets(&self) -> &TicketLedger {
        &self.tickets
    }

    /// The prize pool.
    #[must_use]
    pub fn pool(&self) -> &PrizePool {
        &self.pool
    }

    /// The payment token.
    #[must_use]
    pub fn token(&self) -> &T {
        &self.token
    }

    /// The payment token, for funding and approvals outside the economy.
    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    /// Holdings of `user`.
    #[must_use]
    pub fn cards_by_user(&self, user: &Address) -> CardsByUser {
        self.cards.cards_by_user(user)
    }

    /// Unopened packs of `user`.
    #[must_use]
    pub fn packs_by_user(&self, user: &Address) -> Vec<PackId> {
        self.packs.packs_by_user(user)
    }

    /// Tickets of `user`.
    #[must_use]
    pub fn tickets_by_user(&self, user: &Address) -> &[TicketId] {
        self.tickets.tickets_by_user(user)
    }

    /// Checks the offer views and the offered flags against each other.
    #[must_use]
    pub fn verify_consistency(&self) -> bool {
        let book = self.offers.book();
        if !book.verify_consistency() {
            return false;
        }
        let flagged: std::collections::BTreeSet<(Address, CardNumber)> =
            self.cards.offered_pairs().collect();
        let expected: std::collections::BTreeSet<(Address, CardNumber)> =
            if self.offers.remove_card_in_inventory_when_offer() {
                book.offers()
                    .map(|offer| (offer.owner, offer.card_number))
                    .collect()
            } else {
                std::collections::BTreeSet::new()
            };
        flagged == expected
    }
}

// =============================================================================
// SHARED HANDLE
// =============================================================================

/// A cloneable handle serializing every call through one lock.
pub struct SharedEconomy<T: PaymentToken + Clone = TokenLedger> {
    inner: Arc<Mutex<CardEconomy<T>>>,
}

impl<T: PaymentToken + Clone> Clone for SharedEconomy<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PaymentToken + Clone> SharedEconomy<T> {
    /// Wraps an economy.
    #[must_use]
    pub fn new(economy: CardEconomy<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(economy)),
        }
    }

    /// Runs `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut CardEconomy<T>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Runs `f` with read access (still exclusive, calls are serialized).
    pub fn read<R>(&self, f: impl FnOnce(&CardEconomy<T>) -> R) -> R {
        f(&self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Role;
    use cardex_shared::{EventBus, WAD};

    fn admin() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn vault() -> Address {
        Address::repeat_byte(0xEE)
    }

    fn alice() -> Address {
        Address::repeat_byte(1)
    }

    fn economy() -> CardEconomy {
        let mut economy =
            CardEconomy::new(admin(), vault(), &EconomyConfig::default(), TokenLedger::new())
                .unwrap();
        economy
            .token_mut()
            .mint(alice(), U256::from(100 * WAD))
            .unwrap();
        economy
            .token_mut()
            .approve(alice(), vault(), U256::from(100 * WAD));
        economy
    }

    #[test]
    fn test_purchase_collects_payment() {
        let mut economy = economy();
        let ids = economy.buy_packs(alice(), 10).unwrap();

        assert_eq!(ids, (0..10).collect::<Vec<_>>());
        assert_eq!(economy.token().balance_of(&vault()), U256::from(12 * WAD));
        assert_eq!(economy.pool().prizes_balance(), U256::from(3 * WAD));
    }

    #[test]
    fn test_failed_purchase_rolls_back() {
        let mut economy = economy();
        economy
            .token_mut()
            .approve(alice(), vault(), U256::from(WAD));

        assert!(matches!(
            economy.buy_packs(alice(), 2),
            Err(EconomyError::Token(_))
        ));
        assert!(economy.packs_by_user(&alice()).is_empty());
        assert_eq!(economy.pool().prizes_balance(), U256::ZERO);
        assert!(economy.drain_events().is_empty());
    }

    #[test]
    fn test_revenue_forwarding() {
        let mut economy = economy();
        let receiver = Address::repeat_byte(0x42);
        economy.change_balance_receiver(admin(), receiver).unwrap();
        economy.change_transfer_dai_flag(admin(), true).unwrap();

        economy.buy_packs(alice(), 10).unwrap();
        assert_eq!(economy.token().balance_of(&receiver), U256::from(9 * WAD));
        assert_eq!(economy.token().balance_of(&vault()), U256::from(3 * WAD));
    }

    #[test]
    fn test_admin_requires_owner() {
        let mut economy = economy();
        assert_eq!(
            economy.change_pack_price(alice(), U256::ZERO),
            Err(EconomyError::NotAuthorized(Role::Owner))
        );
        assert_eq!(
            economy.add_signer(alice(), alice()),
            Err(EconomyError::NotAuthorized(Role::Owner))
        );

        economy.add_owner(Ledger::Offers, admin(), alice()).unwrap();
        assert!(economy.is_owner(Ledger::Offers, &alice()));
        assert!(!economy.is_owner(Ledger::Cards, &alice()));
    }

    #[test]
    fn test_events_published_on_commit() {
        let (sender, receiver) = EventBus::create_pair(16);
        let mut economy = economy().with_event_sender(sender);

        economy.buy_pack(alice()).unwrap();
        assert!(economy.buy_packs(alice(), 0).is_err());

        let events = receiver.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LedgerEvent::PacksPurchased { .. }));
    }

    #[test]
    fn test_shared_economy_serializes_calls() {
        let shared = SharedEconomy::new(economy());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.with(|economy| economy.buy_pack(alice())))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let packs = shared.read(|economy| economy.packs_by_user(&alice()));
        assert_eq!(packs, vec![0, 1, 2, 3]);
    }
}
