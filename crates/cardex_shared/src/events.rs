//! # Ledger Events
//!
//! Everything observable that a committed transaction did.
//!
//! ```text
//! ┌─────────────┐  commit   ┌─────────────┐  drain   ┌─────────────┐
//! │ CardEconomy │─────────> │  Event Bus  │────────> │  Indexers / │
//! │ transaction │           │ (crossbeam) │          │  front-end  │
//! └─────────────┘           └─────────────┘          └─────────────┘
//! ```
//!
//! Events are only published after the transaction that produced them
//! committed. A rolled back transaction publishes nothing.

use alloy_primitives::{Address, U256};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::{CardNumber, OfferId, PackId, TicketId};

/// Events emitted by the card economy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // =========================================================================
    // Packs
    // =========================================================================
    /// Packs were bought and paid for.
    PacksPurchased {
        /// Owner of the new packs.
        buyer: Address,
        /// Identifiers of the minted packs.
        pack_ids: Vec<PackId>,
        /// Total amount collected.
        amount: U256,
    },
    /// A pack changed hands.
    PackTransferred {
        /// Previous owner.
        from: Address,
        /// New owner.
        to: Address,
        /// The pack.
        pack_id: PackId,
    },
    /// A pack was opened and its cards minted.
    PackOpened {
        /// Who received the cards.
        owner: Address,
        /// The consumed pack.
        pack_id: PackId,
        /// Card numbers minted.
        pack_data: Vec<CardNumber>,
    },

    // =========================================================================
    // Cards
    // =========================================================================
    /// A single card copy changed hands.
    CardTransferred {
        /// Sender.
        from: Address,
        /// Recipient.
        to: Address,
        /// Card moved.
        card_number: CardNumber,
    },
    /// A user burned a batch of cards.
    CardsBurned {
        /// Burner.
        owner: Address,
        /// Burned card numbers (multiset).
        card_numbers: Vec<CardNumber>,
    },
    /// A burn milestone paid the secondary prize.
    BurnPrizePaid {
        /// Winner.
        owner: Address,
        /// Prize amount.
        amount: U256,
        /// Ticket issued with the prize.
        ticket_id: TicketId,
    },
    /// The grand prize was claimed.
    AlbumCompleted {
        /// Winner.
        owner: Address,
        /// Prize amount.
        amount: U256,
    },

    // =========================================================================
    // Offers
    // =========================================================================
    /// A trade offer was posted.
    OfferCreated {
        /// Offer identifier.
        offer_id: OfferId,
        /// Offer owner.
        owner: Address,
        /// Card offered.
        card_number: CardNumber,
        /// Cards accepted in exchange (empty means any missing card).
        wanted_card_numbers: Vec<CardNumber>,
    },
    /// A trade offer was withdrawn without settlement.
    OfferRemoved {
        /// Offer identifier.
        offer_id: OfferId,
        /// Offer owner.
        owner: Address,
        /// Card that was offered.
        card_number: CardNumber,
    },
    /// A trade offer was settled.
    OfferExchanged {
        /// Offer identifier.
        offer_id: OfferId,
        /// Offer owner.
        offer_owner: Address,
        /// Card the offer owner gave.
        offer_card_number: CardNumber,
        /// Counterparty.
        counterparty: Address,
        /// Card the counterparty gave.
        counterparty_card_number: CardNumber,
    },

    // =========================================================================
    // Tickets
    // =========================================================================
    /// A ticket was appended to the ticket ledger.
    TicketIssued {
        /// Ticket identifier.
        ticket_id: TicketId,
        /// Ticket holder.
        owner: Address,
    },
}

/// Bounded event channel.
///
/// Producers get an [`EventSender`], consumers an [`EventReceiver`].
pub struct EventBus {
    sender: Sender<LedgerEvent>,
    receiver: Receiver<LedgerEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Returns a producer handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Returns a consumer handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a connected sender/receiver pair.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (EventSender, EventReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Producer side of the bus.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<LedgerEvent>,
}

impl EventSender {
    /// Publishes without blocking. Returns `false` when the event was dropped
    /// because the channel is full or the receiver is gone.
    #[inline]
    pub fn send(&self, event: LedgerEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consumer side of the bus.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<LedgerEvent>,
}

impl EventReceiver {
    /// Takes every pending event.
    #[must_use]
    pub fn drain(&self) -> Vec<LedgerEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Takes one pending event, if any.
    #[inline]
    #[must_use]
    pub fn try_recv(&self) -> Option<LedgerEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of events waiting.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_drain() {
        let (tx, rx) = EventBus::create_pair(8);
        assert!(tx.send(LedgerEvent::TicketIssued {
            ticket_id: 1,
            owner: Address::repeat_byte(1),
        }));
        assert_eq!(rx.pending_count(), 1);

        let events = rx.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(rx.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let (tx, rx) = EventBus::create_pair(1);
        let event = LedgerEvent::CardTransferred {
            from: Address::repeat_byte(1),
            to: Address::repeat_byte(2),
            card_number: 7,
        };
        assert!(tx.send(event.clone()));
        assert!(!tx.send(event));
        assert_eq!(rx.drain().len(), 1);
    }
}
