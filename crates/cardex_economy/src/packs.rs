//! # Pack Ledger
//!
//! Unopened packs and who owns them. Ids are sequential from `0`; an opened
//! pack is removed from the ledger, not flagged.
//!
//! Payment and the card mint on opening are orchestrated by `CardEconomy`;
//! this ledger only tracks ownership and the revenue routing settings.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::Address;
use cardex_shared::PackId;

use crate::capability::{CapabilitySet, Role};
use crate::config::PolicyConfig;
use crate::error::{EconomyError, EconomyResult};

/// The pack ledger.
#[derive(Clone, Debug)]
pub struct PackLedger {
    owners: CapabilitySet,
    packs: BTreeMap<PackId, Address>,
    by_user: BTreeMap<Address, BTreeSet<PackId>>,
    next_pack_id: PackId,
    balance_receiver: Option<Address>,
    transfer_dai: bool,
}

impl PackLedger {
    /// Creates an empty ledger administered by `deployer`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for a zero deployer.
    pub fn new(deployer: Address, policy: &PolicyConfig) -> EconomyResult<Self> {
        Ok(Self {
            owners: CapabilitySet::with_founder(Role::Owner, deployer)?,
            packs: BTreeMap::new(),
            by_user: BTreeMap::new(),
            next_pack_id: 0,
            balance_receiver: policy.balance_receiver,
            transfer_dai: policy.transfer_dai,
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

    // =========================================================================
    // Revenue routing
    // =========================================================================

    /// Account receiving forwarded revenue, if configured.
    #[must_use]
    pub fn balance_receiver(&self) -> Option<Address> {
        self.balance_receiver
    }

    /// Sets the revenue receiver.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for the zero address.
    pub fn set_balance_receiver(&mut self, receiver: Address) -> EconomyResult<()> {
        if receiver == Address::ZERO {
            return Err(EconomyError::InvalidAddress);
        }
        self.balance_receiver = Some(receiver);
        Ok(())
    }

    /// Whether non-prize revenue is forwarded on purchase.
    #[must_use]
    pub fn transfer_dai(&self) -> bool {
        self.transfer_dai
    }

    /// Toggles revenue forwarding.
    pub fn set_transfer_dai(&mut self, enabled: bool) {
        self.transfer_dai = enabled;
    }

    /// Where revenue goes right now: the receiver when forwarding is on and
    /// one is set, otherwise nowhere (kept in the vault).
    #[must_use]
    pub fn revenue_destination(&self) -> Option<Address> {
        self.balance_receiver.filter(|_| self.transfer_dai)
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    /// Creates `count` packs owned by `owner` and returns their ids.
    ///
    /// # Errors
    ///
    /// - `InvalidPackCount` for zero packs
    /// - `ArithmeticOverflow` if ids run out
    pub fn mint_packs(&mut self, owner: Address, count: u64) -> EconomyResult<Vec<PackId>> {
        if count == 0 {
            return Err(EconomyError::InvalidPackCount);
        }
        let first = self.next_pack_id;
        let end = first
            .checked_add(count)
            .ok_or(EconomyError::ArithmeticOverflow)?;
        let ids: Vec<PackId> = (first..end).collect();

        let owned = self.by_user.entry(owner).or_default();
        for &pack_id in &ids {
            self.packs.insert(pack_id, owner);
            owned.insert(pack_id);
        }
        self.next_pack_id = end;
        tracing::debug!("Minted packs {}..{} to {}", first, end, owner);
        Ok(ids)
    }

    /// Fails unless `caller` owns `pack_id`.
    ///
    /// # Errors
    ///
    /// - `PackNotFound` for unknown or opened packs
    /// - `NotPackOwner` if someone else owns it
    pub fn ensure_owner(&self, caller: &Address, pack_id: PackId) -> EconomyResult<()> {
        match self.packs.get(&pack_id) {
            None => Err(EconomyError::PackNotFound(pack_id)),
            Some(owner) if owner != caller => Err(EconomyError::NotPackOwner(pack_id)),
            Some(_) => Ok(()),
        }
    }

    /// Moves every pack in `pack_ids` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - `InvalidAddress` / `SelfTransfer` for a bad recipient
    /// - `InvalidPackCount` for an empty list
    /// - `PackNotFound` / `NotPackOwner` if `from` does not own every pack
    pub fn transfer_packs(
        &mut self,
        from: Address,
        to: Address,
        pack_ids: &[PackId],
    ) -> EconomyResult<()> {
        if to == Address::ZERO {
            return Err(EconomyError::InvalidAddress);
        }
        if to == from {
            return Err(EconomyError::SelfTransfer);
        }
        if pack_ids.is_empty() {
            return Err(EconomyError::InvalidPackCount);
        }
        for &pack_id in pack_ids {
            self.ensure_owner(&from, pack_id)?;
        }

        for &pack_id in pack_ids {
            self.packs.insert(pack_id, to);
            if let Some(owned) = self.by_user.get_mut(&from) {
                owned.remove(&pack_id);
            }
            self.by_user.entry(to).or_default().insert(pack_id);
        }
        tracing::debug!("Transferred {} packs {} -> {}", pack_ids.len(), from, to);
        Ok(())
    }

    /// Deletes `pack_id` after checking `owner` holds it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::ensure_owner`].
    pub fn consume(&mut self, owner: Address, pack_id: PackId) -> EconomyResult<()> {
        self.ensure_owner(&owner, pack_id)?;
        self.packs.remove(&pack_id);
        if let Some(owned) = self.by_user.get_mut(&owner) {
            owned.remove(&pack_id);
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Unopened packs of `user`, ascending.
    #[must_use]
    pub fn packs_by_user(&self, user: &Address) -> Vec<PackId> {
        self.by_user
            .get(user)
            .map(|owned| owned.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Owner of an unopened pack.
    #[must_use]
    pub fn pack_owner(&self, pack_id: PackId) -> Option<Address> {
        self.packs.get(&pack_id).copied()
    }

    /// Packs ever minted (opened ones included).
    #[must_use]
    pub fn total_packs_minted(&self) -> u64 {
        self.next_pack_id
    }

    /// Packs not yet opened.
    #[must_use]
    pub fn unopened_count(&self) -> usize {
        self.packs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> PackLedger {
        PackLedger::new(Address::repeat_byte(0xAA), &PolicyConfig::default()).unwrap()
    }

    #[test]
    fn test_sequential_ids() {
        let alice = Address::repeat_byte(1);
        let mut packs = ledger();

        assert_eq!(packs.mint_packs(alice, 2).unwrap(), vec![0, 1]);
        assert_eq!(packs.mint_packs(alice, 1).unwrap(), vec![2]);
        assert_eq!(packs.total_packs_minted(), 3);
        assert_eq!(packs.mint_packs(alice, 0), Err(EconomyError::InvalidPackCount));
    }

    #[test]
    fn test_transfer_all_or_nothing() {
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);
        let mut packs = ledger();
        packs.mint_packs(alice, 2).unwrap();
        packs.mint_packs(bob, 1).unwrap();

        assert_eq!(
            packs.transfer_packs(alice, bob, &[0, 2]),
            Err(EconomyError::NotPackOwner(2))
        );
        assert_eq!(packs.packs_by_user(&alice), vec![0, 1]);

        packs.transfer_packs(alice, bob, &[0, 1]).unwrap();
        assert!(packs.packs_by_user(&alice).is_empty());
        assert_eq!(packs.packs_by_user(&bob), vec![0, 1, 2]);
        assert_eq!(packs.pack_owner(1), Some(bob));
    }

    #[test]
    fn test_consume_removes_pack() {
        let alice = Address::repeat_byte(1);
        let mut packs = ledger();
        packs.mint_packs(alice, 1).unwrap();

        assert_eq!(
            packs.consume(Address::repeat_byte(2), 0),
            Err(EconomyError::NotPackOwner(0))
        );
        packs.consume(alice, 0).unwrap();
        assert_eq!(packs.pack_owner(0), None);
        assert_eq!(packs.consume(alice, 0), Err(EconomyError::PackNotFound(0)));
        assert_eq!(packs.unopened_count(), 0);
    }

    #[test]
    fn test_revenue_destination() {
        let mut packs = ledger();
        assert_eq!(packs.revenue_destination(), None);

        packs.set_balance_receiver(Address::repeat_byte(5)).unwrap();
        assert_eq!(packs.revenue_destination(), None);

        packs.set_transfer_dai(true);
        assert_eq!(packs.revenue_destination(), Some(Address::repeat_byte(5)));
        assert_eq!(
            packs.set_balance_receiver(Address::ZERO),
            Err(EconomyError::InvalidAddress)
        );
    }
}
