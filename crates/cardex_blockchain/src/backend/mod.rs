//! # Pack Data Backend
//!
//! Wire format of the off-chain service that decides what a pack contains
//! and signs it, plus a deterministic in-process stand-in.
//!
//! ```text
//! POST { "address": "0x..", "packet_number": 7 }
//!   ──> { "pack_data": [3, 90, ..], "signature": "0x..(65 bytes)" }
//! ```
//!
//! ## Dealing
//!
//! `MockPackBackend` derives each pack from
//! `keccak256(server_seed ‖ address ‖ packet_number)`, so the same request
//! always yields the same cards and signature. Knowing the address and pack
//! number is not enough to predict a pack without the server seed.

use alloy_primitives::{keccak256, Address, Bytes, B256};
use cardex_economy::{CatalogueConfig, PackOpening, PackOpeningRequest};
use cardex_shared::{CardNumber, PackId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::signature::PackSigner;

/// Default odds of an album card, one in this many picks.
pub const DEFAULT_ALBUM_ODDS: u32 = 400;

/// Request for the contents of one pack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackDataRequest {
    /// Pack owner, the `buyer` of the signed opening.
    pub address: Address,
    /// Pack to open.
    #[serde(alias = "packetNumber")]
    pub packet_number: PackId,
}

/// Contents of a pack and the signature authorizing the opening.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackDataResponse {
    /// Card numbers to mint.
    #[serde(alias = "packData")]
    pub pack_data: Vec<CardNumber>,
    /// `r ‖ s ‖ v` over the opening.
    pub signature: Bytes,
}

impl PackDataResponse {
    /// Turns the response into a batch opening entry for `pack_id`.
    #[must_use]
    pub fn into_opening(self, pack_id: PackId) -> PackOpeningRequest {
        PackOpeningRequest {
            pack_id,
            pack_data: self.pack_data,
            signature: self.signature.to_vec(),
        }
    }
}

/// Deterministic pack dealer and signer.
#[derive(Clone, Debug)]
pub struct MockPackBackend {
    signer: PackSigner,
    validator: Address,
    catalogue: CatalogueConfig,
    server_seed: B256,
    album_odds: u32,
}

impl MockPackBackend {
    /// Creates a backend signing with `signer` for openings validated
    /// against `validator` (the economy's vault address).
    #[must_use]
    pub fn new(signer: PackSigner, validator: Address, catalogue: CatalogueConfig) -> Self {
        Self {
            signer,
            validator,
            catalogue,
            server_seed: B256::ZERO,
            album_odds: DEFAULT_ALBUM_ODDS,
        }
    }

    /// Replaces the server seed.
    #[must_use]
    pub fn with_server_seed(mut self, server_seed: B256) -> Self {
        self.server_seed = server_seed;
        self
    }

    /// Sets the album card odds to one in `odds` picks. `0` never deals it.
    #[must_use]
    pub fn with_album_odds(mut self, odds: u32) -> Self {
        self.album_odds = odds;
        self
    }

    /// Address of the signing key.
    #[inline]
    #[must_use]
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    /// Cards of `packet_number` for `address`.
    #[must_use]
    pub fn deal(&self, address: Address, packet_number: PackId) -> Vec<CardNumber> {
        let mut seed = [0u8; 32 + 20 + 8];
        seed[..32].copy_from_slice(self.server_seed.as_slice());
        seed[32..52].copy_from_slice(address.as_slice());
        seed[52..].copy_from_slice(&packet_number.to_be_bytes());
        let mut rng = ChaCha20Rng::from_seed(keccak256(seed).0);

        let regular_cards = self.catalogue.total_cards.saturating_sub(1);
        (0..self.catalogue.cards_per_pack)
            .map(|_| {
                let album = regular_cards == 0
                    || (self.album_odds > 0 && rng.gen_range(0..self.album_odds) == 0);
                if album {
                    return self.catalogue.album_card;
                }
                let pick = rng.gen_range(0..regular_cards);
                if pick >= self.catalogue.album_card {
                    pick + 1
                } else {
                    pick
                }
            })
            .collect()
    }

    /// Deals and signs one pack.
    ///
    /// # Errors
    ///
    /// Returns `Signature` if signing fails.
    pub fn handle(&self, request: &PackDataRequest) -> Result<PackDataResponse, BackendError> {
        let pack_data = self.deal(request.address, request.packet_number);
        let opening = PackOpening {
            buyer: request.address,
            pack_number: request.packet_number,
            pack_data: &pack_data,
            validator: self.validator,
        };
        let signature = self.signer.sign_opening(&opening)?;
        tracing::debug!(
            "Dealt pack {} for {}: {:?}",
            request.packet_number,
            request.address,
            pack_data
        );
        Ok(PackDataResponse {
            pack_data,
            signature: Bytes::copy_from_slice(&signature),
        })
    }

    /// [`Self::handle`] over JSON bodies.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed requests, otherwise as [`Self::handle`].
    pub fn handle_json(&self, body: &str) -> Result<String, BackendError> {
        let request: PackDataRequest = serde_json::from_str(body)?;
        let response = self.handle(&request)?;
        Ok(serde_json::to_string(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::recover_pack_signer;

    fn backend() -> MockPackBackend {
        let mut secret = [0u8; 32];
        secret[31] = 7;
        let signer = PackSigner::from_bytes(&B256::from(secret)).unwrap();
        MockPackBackend::new(signer, Address::repeat_byte(0xEE), CatalogueConfig::default())
    }

    #[test]
    fn test_deal_is_deterministic() {
        let backend = backend();
        let user = Address::repeat_byte(1);

        let first = backend.deal(user, 3);
        assert_eq!(first, backend.deal(user, 3));
        assert_eq!(first.len(), CatalogueConfig::default().cards_per_pack);
        assert_ne!(first, backend.deal(user, 4));

        let reseeded = backend.clone().with_server_seed(B256::repeat_byte(5));
        assert_ne!(first, reseeded.deal(user, 3));
    }

    #[test]
    fn test_deal_stays_in_catalogue() {
        let backend = backend().with_album_odds(0);
        let catalogue = CatalogueConfig::default();
        for pack in 0..50 {
            for card in backend.deal(Address::repeat_byte(2), pack) {
                assert!(catalogue.contains(card));
                assert_ne!(card, catalogue.album_card);
            }
        }
    }

    #[test]
    fn test_album_odds_of_one_deals_only_album_cards() {
        let backend = backend().with_album_odds(1);
        let album = CatalogueConfig::default().album_card;
        assert!(backend
            .deal(Address::repeat_byte(2), 0)
            .iter()
            .all(|&card| card == album));
    }

    #[test]
    fn test_response_is_signed_by_backend() {
        let backend = backend();
        let request = PackDataRequest {
            address: Address::repeat_byte(1),
            packet_number: 9,
        };
        let response = backend.handle(&request).unwrap();

        let opening = PackOpening {
            buyer: request.address,
            pack_number: 9,
            pack_data: &response.pack_data,
            validator: Address::repeat_byte(0xEE),
        };
        assert_eq!(
            recover_pack_signer(&opening, &response.signature),
            Ok(backend.signer_address())
        );
    }

    #[test]
    fn test_json_wire_format() {
        let backend = backend();
        let body = r#"{"address":"0x0101010101010101010101010101010101010101","packet_number":2}"#;

        let reply: serde_json::Value =
            serde_json::from_str(&backend.handle_json(body).unwrap()).unwrap();
        assert_eq!(reply["pack_data"].as_array().unwrap().len(), 12);
        assert_eq!(reply["signature"].as_str().unwrap().len(), 2 + 65 * 2);

        let camel: PackDataResponse =
            serde_json::from_str(r#"{"packData":[1,2],"signature":"0x00"}"#).unwrap();
        assert_eq!(camel.pack_data, vec![1, 2]);

        assert!(matches!(
            backend.handle_json("{\"address\":1}"),
            Err(BackendError::Json(_))
        ));
    }
}
