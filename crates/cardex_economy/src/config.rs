//! # Economy Configuration
//!
//! Season parameters loaded from an external TOML file:
//!
//! ```toml
//! [catalogue]
//! total_cards = 121
//! album_card = 120
//! cards_per_pack = 12
//! burn_milestone = 60
//!
//! [pricing]
//! pack_price = "1200000000000000000"
//! prize_share_bps = 2500
//! main_album_prize = "15000000000000000000"
//! secondary_album_prize = "1000000000000000000"
//!
//! [policy]
//! require_open_pack_signer_validation = true
//! transfer_dai = false
//! ```
//!
//! Amounts are wad integers written as strings, since TOML integers stop at
//! `i64`. Missing keys fall back to `cardex_shared::constants`.

use std::path::Path;

use alloy_primitives::{Address, U256};
use cardex_shared::constants::BPS_DENOMINATOR;
use cardex_shared::{
    CardNumber, ALBUM_CARD, BURN_MILESTONE, CARDS_PER_PACK, MAIN_ALBUM_PRIZE, PACK_PRICE,
    PRIZE_SHARE_BPS, SECONDARY_ALBUM_PRIZE, TOTAL_CARDS,
};
use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};

/// Complete season configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EconomyConfig {
    /// Card catalogue.
    pub catalogue: CatalogueConfig,
    /// Prices and prizes.
    pub pricing: PricingConfig,
    /// Policy flags.
    pub policy: PolicyConfig,
}

/// Which card numbers exist and how they are dealt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogueConfig {
    /// Distinct card numbers, album card included (`0..total_cards`).
    pub total_cards: u32,
    /// The distinguished album card.
    pub album_card: CardNumber,
    /// Maximum picks per pack.
    pub cards_per_pack: usize,
    /// Cumulative burns per secondary prize.
    pub burn_milestone: u32,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            total_cards: TOTAL_CARDS,
            album_card: ALBUM_CARD,
            cards_per_pack: CARDS_PER_PACK,
            burn_milestone: BURN_MILESTONE,
        }
    }
}

impl CatalogueConfig {
    /// True if `card_number` is printed this season.
    #[inline]
    #[must_use]
    pub const fn contains(&self, card_number: CardNumber) -> bool {
        card_number < self.total_cards
    }

    /// Every card number of the season, album card included.
    pub fn card_numbers(&self) -> impl Iterator<Item = CardNumber> {
        0..self.total_cards
    }
}

/// Prices and prizes, in wad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    /// Price of one pack.
    #[serde(with = "wad")]
    pub pack_price: U256,
    /// Share of revenue credited to the prize pool.
    pub prize_share_bps: u16,
    /// Album completion prize.
    #[serde(with = "wad")]
    pub main_album_prize: U256,
    /// Burn milestone prize.
    #[serde(with = "wad")]
    pub secondary_album_prize: U256,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            pack_price: U256::from(PACK_PRICE),
            prize_share_bps: PRIZE_SHARE_BPS,
            main_album_prize: U256::from(MAIN_ALBUM_PRIZE),
            secondary_album_prize: U256::from(SECONDARY_ALBUM_PRIZE),
        }
    }
}

/// Policy flags, all toggleable at runtime by owners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct PolicyConfig {
    /// Pack openings need a registered signer's signature.
    pub require_open_pack_signer_validation: bool,
    /// Administrative mints refuse offered cards.
    pub require_offer_validation_in_mint: bool,
    /// Transfers refuse offered cards.
    pub require_offer_validation_in_transfer: bool,
    /// Offering a card hides it from transfers and `has_card`.
    pub remove_card_in_inventory_when_offer: bool,
    /// Forward non-prize revenue to the balance receiver.
    pub transfer_dai: bool,
    /// Where forwarded revenue goes.
    pub balance_receiver: Option<Address>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            require_open_pack_signer_validation: true,
            require_offer_validation_in_mint: true,
            require_offer_validation_in_transfer: true,
            remove_card_in_inventory_when_offer: true,
            transfer_dai: false,
            balance_receiver: None,
        }
    }
}

impl EconomyConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML or inconsistent values.
    pub fn from_toml_str(source: &str) -> EconomyResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EconomyError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!("Loaded economy config from {}", path.display());
        Ok(config)
    }

    /// Checks the values are mutually consistent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending value.
    pub fn validate(&self) -> EconomyResult<()> {
        let catalogue = &self.catalogue;
        if catalogue.total_cards == 0 {
            return Err(invalid("catalogue.total_cards must be positive"));
        }
        if !catalogue.contains(catalogue.album_card) {
            return Err(invalid("catalogue.album_card must be below total_cards"));
        }
        if catalogue.cards_per_pack == 0 {
            return Err(invalid("catalogue.cards_per_pack must be positive"));
        }
        if catalogue.burn_milestone == 0 {
            return Err(invalid("catalogue.burn_milestone must be positive"));
        }
        if self.pricing.prize_share_bps > BPS_DENOMINATOR {
            return Err(invalid("pricing.prize_share_bps must not exceed 10000"));
        }
        if self.policy.balance_receiver == Some(Address::ZERO) {
            return Err(invalid("policy.balance_receiver must not be the zero address"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> EconomyError {
    EconomyError::InvalidConfig(reason.to_owned())
}

/// Serde adapter for wad amounts written as decimal (or `0x` hex) strings.
///
/// TOML integers stop at `i64`, well short of a 15-token prize in wad.
pub mod wad {
    use std::str::FromStr;

    use alloy_primitives::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    /// Writes `amount` in decimal.
    ///
    /// # Errors
    ///
    /// Whatever the serializer reports.
    pub fn serialize<S: Serializer>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    /// Reads a decimal or `0x` hex string.
    ///
    /// # Errors
    ///
    /// Fails on anything `U256::from_str` rejects.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str(raw.trim()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EconomyConfig::from_toml_str("").unwrap();
        assert_eq!(config, EconomyConfig::default());
        assert_eq!(config.catalogue.total_cards, 121);
        assert!(config.policy.remove_card_in_inventory_when_offer);
    }

    #[test]
    fn test_shipped_file_matches_defaults() {
        let config = EconomyConfig::from_toml_str(include_str!("../../../data/economy.toml"))
            .unwrap();
        assert_eq!(config, EconomyConfig::default());
    }

    #[test]
    fn test_parse_overrides() {
        let config = EconomyConfig::from_toml_str(
            r#"
            [catalogue]
            total_cards = 10
            album_card = 9
            burn_milestone = 5

            [pricing]
            pack_price = "2000000000000000000"
            prize_share_bps = 5000

            [policy]
            transfer_dai = true
            balance_receiver = "0x0101010101010101010101010101010101010101"
            "#,
        )
        .unwrap();

        assert_eq!(config.catalogue.total_cards, 10);
        assert_eq!(config.catalogue.cards_per_pack, CARDS_PER_PACK);
        assert_eq!(
            config.pricing.pack_price,
            U256::from(2_000_000_000_000_000_000_u128)
        );
        assert_eq!(config.policy.balance_receiver, Some(Address::repeat_byte(1)));
    }

    #[test]
    fn test_rejects_inconsistent_catalogue() {
        let err = EconomyConfig::from_toml_str(
            r"
            [catalogue]
            total_cards = 10
            album_card = 10
            ",
        )
        .unwrap_err();
        assert!(matches!(err, EconomyError::InvalidConfig(_)));

        assert!(EconomyConfig::from_toml_str("[catalogue]\nburn_milestone = 0").is_err());
        assert!(EconomyConfig::from_toml_str("[pricing]\nprize_share_bps = 10001").is_err());
        assert!(EconomyConfig::from_toml_str("[pricing]\npack_price = \"lots\"").is_err());
        assert!(EconomyConfig::from_toml_str("[bogus]\nx = 1").is_err());
    }
}
