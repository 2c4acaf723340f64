//! # Prize Pool
//!
//! Accounting for the funds reserved for prizes.
//!
//! ```text
//!   pack sale ──credit_revenue()──> prizes_balance ──debit()──> winner
//!                (share in bps)                    (album / milestone)
//! ```
//!
//! `prizes_balance` has exactly one credit path and one debit path. It is a
//! book entry: the tokens backing it sit in the economy vault on the
//! payment token ledger.

use alloy_primitives::U256;
use cardex_shared::constants::BPS_DENOMINATOR;

use crate::error::{EconomyError, EconomyResult};

/// The two prizes the pool pays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prize {
    /// Grand prize for completing the album.
    MainAlbum,
    /// Paid each time a burn milestone is crossed.
    Secondary,
}

/// Pool balance plus the price list it is funded and drained by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrizePool {
    prizes_balance: U256,
    pack_price: U256,
    prize_share_bps: u16,
    main_album_prize: U256,
    secondary_album_prize: U256,
}

impl PrizePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(
        pack_price: U256,
        prize_share_bps: u16,
        main_album_prize: U256,
        secondary_album_prize: U256,
    ) -> Self {
        Self {
            prizes_balance: U256::ZERO,
            pack_price,
            prize_share_bps: prize_share_bps.min(BPS_DENOMINATOR),
            main_album_prize,
            secondary_album_prize,
        }
    }

    /// Funds currently reserved for prizes.
    #[inline]
    #[must_use]
    pub fn prizes_balance(&self) -> U256 {
        self.prizes_balance
    }

    /// Price of one pack.
    #[inline]
    #[must_use]
    pub fn pack_price(&self) -> U256 {
        self.pack_price
    }

    /// Share of revenue reserved for prizes, in basis points.
    #[inline]
    #[must_use]
    pub fn prize_share_bps(&self) -> u16 {
        self.prize_share_bps
    }

    /// Amount paid for `prize`.
    #[inline]
    #[must_use]
    pub fn prize_amount(&self, prize: Prize) -> U256 {
        match prize {
            Prize::MainAlbum => self.main_album_prize,
            Prize::Secondary => self.secondary_album_prize,
        }
    }

    /// Reprices packs. Already purchased packs are unaffected.
    pub fn set_pack_price(&mut self, price: U256) {
        self.pack_price = price;
    }

    /// Cost of `count` packs.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the product does not fit.
    pub fn price_of(&self, count: u64) -> EconomyResult<U256> {
        self.pack_price
            .checked_mul(U256::from(count))
            .ok_or(EconomyError::ArithmeticOverflow)
    }

    /// Credits the prize share of `revenue` and returns it.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the pool would overflow.
    pub fn credit_revenue(&mut self, revenue: U256) -> EconomyResult<U256> {
        let share = revenue
            .checked_mul(U256::from(self.prize_share_bps))
            .ok_or(EconomyError::ArithmeticOverflow)?
            / U256::from(BPS_DENOMINATOR);
        self.prizes_balance = self
            .prizes_balance
            .checked_add(share)
            .ok_or(EconomyError::ArithmeticOverflow)?;
        Ok(share)
    }

    /// Checks the pool can pay `prize` without touching it.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientPrizePool` when it cannot.
    pub fn ensure_covers(&self, prize: Prize) -> EconomyResult<U256> {
        let required = self.prize_amount(prize);
        if self.prizes_balance < required {
            return Err(EconomyError::InsufficientPrizePool {
                required,
                available: self.prizes_balance,
            });
        }
        Ok(required)
    }

    /// Debits `prize` from the pool and returns the amount to pay out.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientPrizePool` when the pool cannot cover it.
    pub fn debit(&mut self, prize: Prize) -> EconomyResult<U256> {
        let amount = self.ensure_covers(prize)?;
        self.prizes_balance -= amount;
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> PrizePool {
        PrizePool::new(U256::from(120), 2_500, U256::from(1_500), U256::from(100))
    }

    #[test]
    fn test_revenue_share() {
        let mut pool = pool();
        let share = pool.credit_revenue(pool.price_of(10).unwrap()).unwrap();

        assert_eq!(share, U256::from(300));
        assert_eq!(pool.prizes_balance(), U256::from(300));
    }

    #[test]
    fn test_debit_requires_balance() {
        let mut pool = pool();
        pool.credit_revenue(U256::from(800)).unwrap();

        assert_eq!(pool.debit(Prize::Secondary).unwrap(), U256::from(100));
        assert_eq!(pool.prizes_balance(), U256::from(100));

        let err = pool.debit(Prize::MainAlbum).unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientPrizePool { .. }));
        assert_eq!(pool.prizes_balance(), U256::from(100));
    }

    #[test]
    fn test_share_is_capped() {
        let pool = PrizePool::new(U256::from(1), 20_000, U256::ZERO, U256::ZERO);
        assert_eq!(pool.prize_share_bps(), BPS_DENOMINATOR);
    }
}
