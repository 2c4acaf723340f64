//! # Ticket Ledger
//!
//! Append-only record of burn-milestone rewards. Ids start at `1` and are
//! never reused; there is no removal.

use std::collections::BTreeMap;

use alloy_primitives::Address;
use cardex_shared::TicketId;

use crate::capability::{CapabilitySet, Role};
use crate::error::{EconomyError, EconomyResult};

/// One issued ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    /// Identifier.
    pub ticket_id: TicketId,
    /// Holder.
    pub owner: Address,
}

/// Tickets by id and by holder.
#[derive(Clone, Debug)]
pub struct TicketLedger {
    owners: CapabilitySet,
    tickets: Vec<Ticket>,
    by_user: BTreeMap<Address, Vec<TicketId>>,
}

impl TicketLedger {
    /// Creates an empty ledger administered by `deployer`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for a zero deployer.
    pub fn new(deployer: Address) -> EconomyResult<Self> {
        Ok(Self {
            owners: CapabilitySet::with_founder(Role::Owner, deployer)?,
            tickets: Vec::new(),
            by_user: BTreeMap::new(),
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

    /// Appends a ticket for `user`. Only the burn path calls this.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` once ids run out.
    pub(crate) fn issue_ticket(&mut self, user: Address) -> EconomyResult<TicketId> {
        let ticket_id = next_ticket_id(self.tickets.len())?;
        self.tickets.push(Ticket {
            ticket_id,
            owner: user,
        });
        self.by_user.entry(user).or_default().push(ticket_id);
        tracing::debug!("Issued ticket {} to {}", ticket_id, user);
        Ok(ticket_id)
    }

    /// Ticket ids held by `user`, in issue order.
    #[must_use]
    pub fn tickets_by_user(&self, user: &Address) -> &[TicketId] {
        self.by_user.get(user).map_or(&[], Vec::as_slice)
    }

    /// Looks up a ticket.
    #[must_use]
    pub fn ticket(&self, ticket_id: TicketId) -> Option<&Ticket> {
        let index = usize::try_from(ticket_id.checked_sub(1)?).ok()?;
        self.tickets.get(index)
    }

    /// Every ticket, in issue order.
    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Tickets issued so far.
    #[inline]
    #[must_use]
    pub fn tickets_count(&self) -> usize {
        self.tickets.len()
    }
}

/// Id of the ticket following `issued` tickets.
fn next_ticket_id(issued: usize) -> EconomyResult<TicketId> {
    TicketId::try_from(issued)
        .ok()
        .and_then(|issued| issued.checked_add(1))
        .ok_or(EconomyError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one() {
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);
        let mut ledger = TicketLedger::new(Address::repeat_byte(9)).unwrap();

        assert_eq!(ledger.issue_ticket(alice), Ok(1));
        assert_eq!(ledger.issue_ticket(bob), Ok(2));
        assert_eq!(ledger.issue_ticket(alice), Ok(3));

        assert_eq!(ledger.tickets_by_user(&alice), &[1, 3]);
        assert_eq!(ledger.tickets_by_user(&Address::repeat_byte(5)), &[] as &[TicketId]);
        assert_eq!(ledger.ticket(2).map(|t| t.owner), Some(bob));
        assert!(ledger.ticket(0).is_none());
        assert!(ledger.ticket(4).is_none());
        assert_eq!(ledger.tickets_count(), 3);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_ticket_ids_do_not_wrap() {
        assert_eq!(next_ticket_id(0), Ok(1));
        assert_eq!(next_ticket_id(usize::MAX), Err(EconomyError::ArithmeticOverflow));
    }
}
