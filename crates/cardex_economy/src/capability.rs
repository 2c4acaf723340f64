//! # Capability Sets
//!
//! Membership sets gating privileged operations.
//!
//! Every ledger composes its own [`CapabilitySet`] by value. The card ledger
//! carries two independent sets (owners and signers); being in one confers
//! nothing in the other.
//!
//! ## Invariants
//!
//! - The zero address is never a member.
//! - An address appears at most once.
//! - A caller can never remove itself, so the acting member always survives
//!   its own call. Nothing stops members removing each other down to one.

use std::collections::BTreeSet;
use std::fmt;

use alloy_primitives::Address;

use crate::error::{EconomyError, EconomyResult};

/// Privilege conferred by a capability set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// May administer the ledger (flags, membership, bypass paths).
    Owner,
    /// May sign pack openings.
    Signer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => f.write_str("an owner"),
            Self::Signer => f.write_str("a signer"),
        }
    }
}

/// A set of addresses holding one [`Role`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilitySet {
    role: Role,
    members: BTreeSet<Address>,
}

impl CapabilitySet {
    /// Creates an empty set for `role`.
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            members: BTreeSet::new(),
        }
    }

    /// Creates a set seeded with `founder`, the usual deployer bootstrap.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if `founder` is zero.
    pub fn with_founder(role: Role, founder: Address) -> EconomyResult<Self> {
        let mut set = Self::new(role);
        set.add(founder)?;
        Ok(set)
    }

    /// Role of this set.
    #[inline]
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Adds a member.
    ///
    /// # Errors
    ///
    /// - `InvalidAddress` for the zero address
    /// - `AlreadyMember` if present
    pub fn add(&mut self, address: Address) -> EconomyResult<()> {
        if address == Address::ZERO {
            return Err(EconomyError::InvalidAddress);
        }
        if !self.members.insert(address) {
            return Err(EconomyError::AlreadyMember(self.role));
        }
        tracing::debug!("Added {} as {}", address, self.role);
        Ok(())
    }

    /// Removes `address` on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// - `InvalidAddress` for the zero address
    /// - `CannotRemoveSelf` if `address == caller`
    /// - `NotMember` if absent
    pub fn remove(&mut self, caller: Address, address: Address) -> EconomyResult<()> {
        if address == Address::ZERO {
            return Err(EconomyError::InvalidAddress);
        }
        if address == caller {
            return Err(EconomyError::CannotRemoveSelf(self.role));
        }
        if !self.members.remove(&address) {
            return Err(EconomyError::NotMember(self.role));
        }
        tracing::debug!("Removed {} as {}", address, self.role);
        Ok(())
    }

    /// Membership test.
    #[inline]
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    /// Fails unless `caller` is a member.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` for non-members.
    pub fn ensure(&self, caller: &Address) -> EconomyResult<()> {
        if self.contains(caller) {
            Ok(())
        } else {
            tracing::warn!("Rejected privileged call from {}: not {}", caller, self.role);
            Err(EconomyError::NotAuthorized(self.role))
        }
    }

    /// Members in address order.
    pub fn members(&self) -> impl Iterator<Item = &Address> + '_ {
        self.members.iter()
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when nobody holds the role.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_add_and_contains() {
        let mut owners = CapabilitySet::new(Role::Owner);
        owners.add(addr(1)).unwrap();

        assert!(owners.contains(&addr(1)));
        assert!(!owners.contains(&addr(2)));
        assert_eq!(owners.len(), 1);
    }

    #[test]
    fn test_rejects_zero_and_duplicates() {
        let mut owners = CapabilitySet::new(Role::Owner);
        assert_eq!(owners.add(Address::ZERO), Err(EconomyError::InvalidAddress));

        owners.add(addr(1)).unwrap();
        let err = owners.add(addr(1)).unwrap_err();
        assert_eq!(err, EconomyError::AlreadyMember(Role::Owner));
        assert_eq!(err.to_string(), "Address is already an owner.");
    }

    #[test]
    fn test_self_removal_always_fails() {
        let mut owners = CapabilitySet::with_founder(Role::Owner, addr(1)).unwrap();

        // Alone
        let err = owners.remove(addr(1), addr(1)).unwrap_err();
        assert_eq!(err.to_string(), "You cannot remove yourself as an owner.");

        // With company
        owners.add(addr(2)).unwrap();
        owners.add(addr(3)).unwrap();
        assert_eq!(
            owners.remove(addr(1), addr(1)),
            Err(EconomyError::CannotRemoveSelf(Role::Owner))
        );
        assert!(owners.contains(&addr(1)));
    }

    #[test]
    fn test_remove_other_member() {
        let mut signers = CapabilitySet::with_founder(Role::Signer, addr(1)).unwrap();
        signers.add(addr(2)).unwrap();

        signers.remove(addr(1), addr(2)).unwrap();
        assert!(!signers.contains(&addr(2)));
        assert_eq!(
            signers.remove(addr(1), addr(2)),
            Err(EconomyError::NotMember(Role::Signer))
        );
        assert_eq!(
            signers.remove(addr(1), Address::ZERO),
            Err(EconomyError::InvalidAddress)
        );
    }

    #[test]
    fn test_ensure() {
        let owners = CapabilitySet::with_founder(Role::Owner, addr(1)).unwrap();
        assert!(owners.ensure(&addr(1)).is_ok());
        assert_eq!(
            owners.ensure(&addr(9)),
            Err(EconomyError::NotAuthorized(Role::Owner))
        );
    }
}
