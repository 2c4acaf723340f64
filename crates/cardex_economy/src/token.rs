//! # Payment Token
//!
//! The stablecoin the economy is paid in lives outside the core. The ledgers
//! only see it through [`PaymentToken`], a plain fungible-balance interface
//! with allowance semantics.
//!
//! [`TokenLedger`] is an in-memory implementation used by the simulator and
//! the tests.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::error::TokenError;

/// A fungible token with `approve` / `transferFrom` semantics.
///
/// The acting account is always passed explicitly, there is no implicit
/// message sender.
pub trait PaymentToken {
    /// Balance held by `owner`.
    fn balance_of(&self, owner: &Address) -> U256;

    /// Amount `spender` may still move out of `owner`.
    fn allowance(&self, owner: &Address, spender: &Address) -> U256;

    /// Sets the allowance of `spender` over `owner`'s balance.
    fn approve(&mut self, owner: Address, spender: Address, amount: U256);

    /// Moves `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Fails when `from` cannot cover `amount`.
    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError>;

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    ///
    /// # Errors
    ///
    /// Fails on missing allowance or balance.
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError>;
}

/// In-memory [`PaymentToken`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: BTreeMap<Address, U256>,
    allowances: BTreeMap<(Address, Address), U256>,
    total_supply: U256,
}

impl TokenLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `amount` new tokens for `to`.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` if the supply would exceed `U256::MAX`.
    pub fn mint(&mut self, to: Address, amount: U256) -> Result<(), TokenError> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = self.balances.entry(to).or_default();
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }

    /// Total tokens in existence.
    #[inline]
    #[must_use]
    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    fn debit(&mut self, from: Address, amount: U256) -> Result<(), TokenError> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        self.balances.insert(from, available - amount);
        Ok(())
    }

    fn credit(&mut self, to: Address, amount: U256) -> Result<(), TokenError> {
        let balance = self.balances.entry(to).or_default();
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }
}

impl PaymentToken for TokenLedger {
    fn balance_of(&self, owner: &Address) -> U256 {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        let approved = self.allowance(&from, &spender);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                required: amount,
                approved,
            });
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        self.allowances.insert((from, spender), approved - amount);
        Ok(())
    }
}
