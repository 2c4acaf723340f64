//! Calldata dispatcher.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, SolInterface};
use cardex_economy::{CardEconomy, Ledger, PackOpeningRequest, PaymentToken, Prize};
use cardex_shared::CardNumber;

use super::{
    ICardLedger as C, IOfferLedger as O, IPackLedger as P, ITicketLedger as T, Offer, Ticket,
};
use crate::error::{DispatchError, DispatchResult};

/// Executes `calldata` from `caller` against the ledger selected by
/// `ledger` and returns the ABI-encoded return values.
///
/// # Errors
///
/// - `Decode` when the calldata does not match the ledger's interface
/// - `OutOfRange` for ids or card numbers wider than the ledger stores
/// - `Reverted` with the ledger's error otherwise
pub fn dispatch<Tk: PaymentToken + Clone>(
    economy: &mut CardEconomy<Tk>,
    ledger: Ledger,
    caller: Address,
    calldata: &[u8],
) -> DispatchResult<Vec<u8>> {
    let result = match ledger {
        Ledger::Cards => dispatch_cards(economy, caller, calldata),
        Ledger::Packs => dispatch_packs(economy, caller, calldata),
        Ledger::Offers => dispatch_offers(economy, caller, calldata),
        Ledger::Tickets => dispatch_tickets(economy, caller, calldata),
    };
    if let Err(err) = &result {
        tracing::debug!("Call from {} to {:?} ledger failed: {}", caller, ledger, err);
    }
    result
}

// =============================================================================
// Argument conversion
// =============================================================================

fn card_number(value: U256) -> DispatchResult<CardNumber> {
    u32::try_from(value).map_err(|_| DispatchError::OutOfRange("cardNumber"))
}

fn card_numbers(values: &[U256]) -> DispatchResult<Vec<CardNumber>> {
    values.iter().map(|&value| card_number(value)).collect()
}

fn id(value: U256, name: &'static str) -> DispatchResult<u64> {
    u64::try_from(value).map_err(|_| DispatchError::OutOfRange(name))
}

fn words<I>(values: I) -> Vec<U256>
where
    I: IntoIterator,
    I::Item: Into<u64>,
{
    values.into_iter().map(|value| U256::from(value.into())).collect()
}

fn count(value: usize) -> U256 {
    U256::from(value)
}

// =============================================================================
// Ledgers
// =============================================================================

fn dispatch_cards<Tk: PaymentToken + Clone>(
    economy: &mut CardEconomy<Tk>,
    caller: Address,
    calldata: &[u8],
) -> DispatchResult<Vec<u8>> {
    use C::ICardLedgerCalls as Call;

    Ok(match Call::abi_decode(calldata, true)? {
        Call::addOwner(call) => {
            economy.add_owner(Ledger::Cards, caller, call.account)?;
            C::addOwnerCall::abi_encode_returns(&())
        }
        Call::removeOwner(call) => {
            economy.remove_owner(Ledger::Cards, caller, call.account)?;
            C::removeOwnerCall::abi_encode_returns(&())
        }
        Call::isOwner(call) => {
            C::isOwnerCall::abi_encode_returns(&(economy.is_owner(Ledger::Cards, &call.account),))
        }
        Call::addSigner(call) => {
            economy.add_signer(caller, call.account)?;
            C::addSignerCall::abi_encode_returns(&())
        }
        Call::removeSigner(call) => {
            economy.remove_signer(caller, call.account)?;
            C::removeSignerCall::abi_encode_returns(&())
        }
        Call::isSigner(call) => {
            C::isSignerCall::abi_encode_returns(&(economy.is_signer(&call.account),))
        }
        Call::openPack(call) => {
            let pack_data = card_numbers(&call.packData)?;
            economy.open_pack(
                caller,
                id(call.packNumber, "packNumber")?,
                &pack_data,
                &call.signature,
            )?;
            C::openPackCall::abi_encode_returns(&())
        }
        Call::openPacks(call) => {
            if call.packNumbers.len() != call.packsData.len()
                || call.packNumbers.len() != call.signatures.len()
            {
                return Err(DispatchError::LengthMismatch);
            }
            let openings = call
                .packNumbers
                .iter()
                .zip(&call.packsData)
                .zip(&call.signatures)
                .map(|((&pack_number, pack_data), signature)| {
                    Ok(PackOpeningRequest {
                        pack_id: id(pack_number, "packNumber")?,
                        pack_data: card_numbers(pack_data)?,
                        signature: signature.to_vec(),
                    })
                })
                .collect::<DispatchResult<Vec<_>>>()?;
            economy.open_packs(caller, &openings)?;
            C::openPacksCall::abi_encode_returns(&())
        }
        Call::testOpenPack(call) => {
            let pack_data = card_numbers(&call.packData)?;
            economy.open_pack_for(caller, call.user, id(call.packNumber, "packNumber")?, &pack_data)?;
            C::testOpenPackCall::abi_encode_returns(&())
        }
        Call::transferCard(call) => {
            economy.transfer_card(caller, call.to, card_number(call.cardNumber)?)?;
            C::transferCardCall::abi_encode_returns(&())
        }
        Call::transferCards(call) => {
            economy.transfer_cards(caller, call.to, &card_numbers(&call.cardNumbers)?)?;
            C::transferCardsCall::abi_encode_returns(&())
        }
        Call::mintCard(call) => {
            economy.mint_card(caller, call.user, card_number(call.cardNumber)?)?;
            C::mintCardCall::abi_encode_returns(&())
        }
        Call::testAddCards(call) => {
            economy.test_add_cards(caller, call.user)?;
            C::testAddCardsCall::abi_encode_returns(&())
        }
        Call::burnCards(call) => {
            let outcome = economy.burn_cards(caller, &card_numbers(&call.cardNumbers)?)?;
            C::burnCardsCall::abi_encode_returns(&(words(outcome.tickets),))
        }
        Call::finishAlbum(_) => {
            let amount = economy.finish_album(caller)?;
            C::finishAlbumCall::abi_encode_returns(&(amount,))
        }
        Call::hasCard(call) => {
            let held = economy
                .cards()
                .has_card(&call.user, card_number(call.cardNumber)?);
            C::hasCardCall::abi_encode_returns(&(held,))
        }
        Call::cardQuantity(call) => {
            let quantity = economy
                .cards()
                .card_quantity(&call.user, card_number(call.cardNumber)?);
            C::cardQuantityCall::abi_encode_returns(&(U256::from(quantity),))
        }
        Call::getCardsByUser(call) => {
            let cards = economy.cards_by_user(&call.user);
            C::getCardsByUserCall::abi_encode_returns(&(
                words(cards.card_numbers),
                words(cards.quantities),
                cards.offered,
            ))
        }
        Call::burnedCards(call) => {
            let burned = economy.cards().burned_count(&call.user);
            C::burnedCardsCall::abi_encode_returns(&(U256::from(burned),))
        }
        Call::prizesBalance(_) => {
            C::prizesBalanceCall::abi_encode_returns(&(economy.pool().prizes_balance(),))
        }
        Call::mainAlbumPrize(_) => {
            let amount = economy.pool().prize_amount(Prize::MainAlbum);
            C::mainAlbumPrizeCall::abi_encode_returns(&(amount,))
        }
        Call::secondaryAlbumPrize(_) => {
            let amount = economy.pool().prize_amount(Prize::Secondary);
            C::secondaryAlbumPrizeCall::abi_encode_returns(&(amount,))
        }
        Call::changeRequireOpenPackSignerValidation(call) => {
            economy.change_require_open_pack_signer_validation(caller, call.enabled)?;
            C::changeRequireOpenPackSignerValidationCall::abi_encode_returns(&())
        }
        Call::changeRequireOfferValidationInMint(call) => {
            economy.change_require_offer_validation_in_mint(caller, call.enabled)?;
            C::changeRequireOfferValidationInMintCall::abi_encode_returns(&())
        }
        Call::changeRequireOfferValidationInTransfer(call) => {
            economy.change_require_offer_validation_in_transfer(caller, call.enabled)?;
            C::changeRequireOfferValidationInTransferCall::abi_encode_returns(&())
        }
    })
}

fn dispatch_packs<Tk: PaymentToken + Clone>(
    economy: &mut CardEconomy<Tk>,
    caller: Address,
    calldata: &[u8],
) -> DispatchResult<Vec<u8>> {
    use P::IPackLedgerCalls as Call;

    Ok(match Call::abi_decode(calldata, true)? {
        Call::addOwner(call) => {
            economy.add_owner(Ledger::Packs, caller, call.account)?;
            P::addOwnerCall::abi_encode_returns(&())
        }
        Call::removeOwner(call) => {
            economy.remove_owner(Ledger::Packs, caller, call.account)?;
            P::removeOwnerCall::abi_encode_returns(&())
        }
        Call::isOwner(call) => {
            P::isOwnerCall::abi_encode_returns(&(economy.is_owner(Ledger::Packs, &call.account),))
        }
        Call::buyPack(_) => {
            let pack_id = economy.buy_pack(caller)?;
            P::buyPackCall::abi_encode_returns(&(U256::from(pack_id),))
        }
        Call::buyPacks(call) => {
            let pack_ids = economy.buy_packs(caller, id(call.numberOfPacks, "numberOfPacks")?)?;
            P::buyPacksCall::abi_encode_returns(&(words(pack_ids),))
        }
        Call::buyPackByUser(call) => {
            let pack_ids = economy.buy_packs_for(caller, call.user, 1)?;
            let pack_id = pack_ids.first().copied().unwrap_or_default();
            P::buyPackByUserCall::abi_encode_returns(&(U256::from(pack_id),))
        }
        Call::buyPacksByUser(call) => {
            let pack_ids = economy.buy_packs_for(
                caller,
                call.user,
                id(call.numberOfPacks, "numberOfPacks")?,
            )?;
            P::buyPacksByUserCall::abi_encode_returns(&(words(pack_ids),))
        }
        Call::transferPack(call) => {
            economy.transfer_pack(caller, call.to, id(call.packNumber, "packNumber")?)?;
            P::transferPackCall::abi_encode_returns(&())
        }
        Call::transferPacks(call) => {
            let pack_ids = call
                .packNumbers
                .iter()
                .map(|&pack_number| id(pack_number, "packNumbers"))
                .collect::<DispatchResult<Vec<_>>>()?;
            economy.transfer_packs(caller, call.to, &pack_ids)?;
            P::transferPacksCall::abi_encode_returns(&())
        }
        Call::getPacksByUser(call) => {
            P::getPacksByUserCall::abi_encode_returns(&(words(economy.packs_by_user(&call.user)),))
        }
        Call::getPackOwner(call) => {
            let owner = economy
                .packs()
                .pack_owner(id(call.packNumber, "packNumber")?)
                .unwrap_or(Address::ZERO);
            P::getPackOwnerCall::abi_encode_returns(&(owner,))
        }
        Call::totalPacksMinted(_) => {
            let minted = economy.packs().total_packs_minted();
            P::totalPacksMintedCall::abi_encode_returns(&(U256::from(minted),))
        }
        Call::packPrice(_) => P::packPriceCall::abi_encode_returns(&(economy.pool().pack_price(),)),
        Call::changeBalanceReceiver(call) => {
            economy.change_balance_receiver(caller, call.receiver)?;
            P::changeBalanceReceiverCall::abi_encode_returns(&())
        }
        Call::changePackPrice(call) => {
            economy.change_pack_price(caller, call.price)?;
            P::changePackPriceCall::abi_encode_returns(&())
        }
        Call::changeTransferDaiFlag(call) => {
            economy.change_transfer_dai_flag(caller, call.enabled)?;
            P::changeTransferDaiFlagCall::abi_encode_returns(&())
        }
    })
}

fn dispatch_offers<Tk: PaymentToken + Clone>(
    economy: &mut CardEconomy<Tk>,
    caller: Address,
    calldata: &[u8],
) -> DispatchResult<Vec<u8>> {
    use O::IOfferLedgerCalls as Call;

    fn one(offer: Option<&cardex_economy::Offer>) -> Offer {
        offer.map_or_else(Offer::empty, Offer::from)
    }

    fn all<'a>(offers: impl IntoIterator<Item = &'a cardex_economy::Offer>) -> Vec<Offer> {
        offers.into_iter().map(Offer::from).collect()
    }

    Ok(match Call::abi_decode(calldata, true)? {
        Call::addOwner(call) => {
            economy.add_owner(Ledger::Offers, caller, call.account)?;
            O::addOwnerCall::abi_encode_returns(&())
        }
        Call::removeOwner(call) => {
            economy.remove_owner(Ledger::Offers, caller, call.account)?;
            O::removeOwnerCall::abi_encode_returns(&())
        }
        Call::isOwner(call) => {
            O::isOwnerCall::abi_encode_returns(&(economy.is_owner(Ledger::Offers, &call.account),))
        }
        Call::createOffer(call) => {
            economy.create_offer(
                caller,
                id(call.offerId, "offerId")?,
                card_number(call.cardNumber)?,
                &card_numbers(&call.wantedCardNumbers)?,
            )?;
            O::createOfferCall::abi_encode_returns(&())
        }
        Call::removeOfferByUserAndCardNumber(call) => {
            economy.remove_offer_by_user_and_card_number(
                caller,
                call.user,
                card_number(call.cardNumber)?,
            )?;
            O::removeOfferByUserAndCardNumberCall::abi_encode_returns(&())
        }
        Call::removeOfferByCardNumber(call) => {
            economy.remove_offer_by_card_number(caller, card_number(call.cardNumber)?)?;
            O::removeOfferByCardNumberCall::abi_encode_returns(&())
        }
        Call::confirmOfferExchange(call) => {
            economy.confirm_offer_exchange(
                caller,
                call.counterparty,
                card_number(call.counterpartyCardNumber)?,
                call.offerOwner,
                card_number(call.offerCardNumber)?,
            )?;
            O::confirmOfferExchangeCall::abi_encode_returns(&())
        }
        Call::deleteAllOffers(_) => {
            economy.delete_all_offers(caller)?;
            O::deleteAllOffersCall::abi_encode_returns(&())
        }
        Call::getOffers(_) => {
            O::getOffersCall::abi_encode_returns(&(all(economy.offer_book().offers()),))
        }
        Call::getOfferByIndex(call) => {
            let offer = usize::try_from(id(call.index, "index")?)
                .ok()
                .and_then(|index| economy.offer_book().offer_at(index));
            O::getOfferByIndexCall::abi_encode_returns(&(one(offer),))
        }
        Call::getOfferByOfferId(call) => {
            let offer = economy.offer_book().get(id(call.offerId, "offerId")?);
            O::getOfferByOfferIdCall::abi_encode_returns(&(one(offer),))
        }
        Call::getOfferByUserAndCardNumber(call) => {
            let offer = economy
                .offer_book()
                .by_user_and_card_number(&call.user, card_number(call.cardNumber)?);
            O::getOfferByUserAndCardNumberCall::abi_encode_returns(&(one(offer),))
        }
        Call::getOffersByUser(call) => {
            let offers = all(economy.offer_book().offers_by_user(&call.user));
            O::getOffersByUserCall::abi_encode_returns(&(offers,))
        }
        Call::getOffersByCardNumber(call) => {
            let offers = all(
                economy
                    .offer_book()
                    .offers_by_card_number(card_number(call.cardNumber)?),
            );
            O::getOffersByCardNumberCall::abi_encode_returns(&(offers,))
        }
        Call::getOffersCounter(_) => {
            O::getOffersCounterCall::abi_encode_returns(&(count(economy.offer_book().offers_counter()),))
        }
        Call::getOffersByUserCounter(call) => {
            let counter = economy.offer_book().offers_by_user_counter(&call.user);
            O::getOffersByUserCounterCall::abi_encode_returns(&(count(counter),))
        }
        Call::getOffersByCardNumberCounter(call) => {
            let counter = economy
                .offer_book()
                .offers_by_card_number_counter(card_number(call.cardNumber)?);
            O::getOffersByCardNumberCounterCall::abi_encode_returns(&(count(counter),))
        }
        Call::changeRemoveCardInInventoryWhenOffer(call) => {
            economy.change_remove_card_in_inventory_when_offer(caller, call.enabled)?;
            O::changeRemoveCardInInventoryWhenOfferCall::abi_encode_returns(&())
        }
    })
}

fn dispatch_tickets<Tk: PaymentToken + Clone>(
    economy: &mut CardEconomy<Tk>,
    caller: Address,
    calldata: &[u8],
) -> DispatchResult<Vec<u8>> {
    use T::ITicketLedgerCalls as Call;

    Ok(match Call::abi_decode(calldata, true)? {
        Call::addOwner(call) => {
            economy.add_owner(Ledger::Tickets, caller, call.account)?;
            T::addOwnerCall::abi_encode_returns(&())
        }
        Call::removeOwner(call) => {
            economy.remove_owner(Ledger::Tickets, caller, call.account)?;
            T::removeOwnerCall::abi_encode_returns(&())
        }
        Call::isOwner(call) => {
            T::isOwnerCall::abi_encode_returns(&(economy.is_owner(Ledger::Tickets, &call.account),))
        }
        Call::getTicketsByUser(call) => {
            let tickets = words(economy.tickets_by_user(&call.user).iter().copied());
            T::getTicketsByUserCall::abi_encode_returns(&(tickets,))
        }
        Call::getTicket(call) => {
            let ticket = economy
                .tickets()
                .ticket(id(call.ticketId, "ticketId")?)
                .map_or(
                    Ticket {
                        ticketId: U256::ZERO,
                        user: Address::ZERO,
                    },
                    Ticket::from,
                );
            T::getTicketCall::abi_encode_returns(&(ticket,))
        }
        Call::getTickets(_) => {
            let tickets: Vec<Ticket> = economy.tickets().tickets().iter().map(Ticket::from).collect();
            T::getTicketsCall::abi_encode_returns(&(tickets,))
        }
        Call::getTicketsCounter(_) => {
            T::getTicketsCounterCall::abi_encode_returns(&(count(economy.tickets().tickets_count()),))
        }
    })
}
