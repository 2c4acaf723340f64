//! # Pack Opening Signatures
//!
//! The digest a signer commits to, byte-compatible with a Solidity verifier:
//!
//! ```text
//! message = abi.encode(address buyer, uint256 packNumber,
//!                      uint256[] packData, address validator)
//! hash    = keccak256(message)
//! digest  = keccak256("\x19Ethereum Signed Message:\n32" ‖ hash)
//! ```
//!
//! Signatures are 65 bytes `r ‖ s ‖ v` with `v` in `{0, 1, 27, 28}`, the
//! shape `ecrecover` and wallet `personal_sign` agree on.

mod signer;

pub use signer::{address_from_verifying_key, EcdsaPackAuthenticator, PackSigner};

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use cardex_economy::PackOpening;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::error::{SignatureError, SignatureResult};

/// EIP-191 prefix for a 32-byte message.
pub const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Length of an `r ‖ s ‖ v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// ABI encoding of the opening tuple.
#[must_use]
pub fn encode_pack_opening(opening: &PackOpening<'_>) -> Vec<u8> {
    let pack_data: Vec<U256> = opening
        .pack_data
        .iter()
        .map(|&card_number| U256::from(card_number))
        .collect();
    (
        opening.buyer,
        U256::from(opening.pack_number),
        pack_data,
        opening.validator,
    )
        .abi_encode_params()
}

/// `keccak256` of the ABI-encoded opening.
#[must_use]
pub fn pack_message_hash(opening: &PackOpening<'_>) -> B256 {
    keccak256(encode_pack_opening(opening))
}

/// Applies the EIP-191 prefix to a 32-byte hash and hashes again.
#[must_use]
pub fn eth_signed_hash(hash: &B256) -> B256 {
    let mut message = Vec::with_capacity(ETH_SIGNED_MESSAGE_PREFIX.len() + 32);
    message.extend_from_slice(ETH_SIGNED_MESSAGE_PREFIX);
    message.extend_from_slice(hash.as_slice());
    keccak256(message)
}

/// The digest actually signed for `opening`.
#[must_use]
pub fn pack_signing_digest(opening: &PackOpening<'_>) -> B256 {
    eth_signed_hash(&pack_message_hash(opening))
}

/// Maps `v` onto a k256 recovery id.
///
/// # Errors
///
/// Returns `InvalidRecoveryId` unless `v` is 0, 1, 27 or 28.
pub fn parse_recovery_id(v: u8) -> SignatureResult<RecoveryId> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    RecoveryId::from_byte(id).ok_or(SignatureError::InvalidRecoveryId(v))
}

/// Recovers the address that signed `digest`.
///
/// # Errors
///
/// Fails on a malformed signature or when no key matches.
pub fn recover_signer(digest: &B256, signature: &[u8]) -> SignatureResult<Address> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::InvalidLength(signature.len()));
    }
    let recovery_id = parse_recovery_id(signature[64])?;
    let signature =
        Signature::from_slice(&signature[..64]).map_err(|_| SignatureError::InvalidFormat)?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(address_from_verifying_key(&key))
}

/// Recovers the signer of a pack opening.
///
/// # Errors
///
/// As [`recover_signer`].
pub fn recover_pack_signer(
    opening: &PackOpening<'_>,
    signature: &[u8],
) -> SignatureResult<Address> {
    recover_signer(&pack_signing_digest(opening), signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opening(pack_data: &[u32]) -> PackOpening<'_> {
        PackOpening {
            buyer: Address::repeat_byte(1),
            pack_number: 7,
            pack_data,
            validator: Address::repeat_byte(9),
        }
    }

    #[test]
    fn test_encoding_layout() {
        let encoded = encode_pack_opening(&opening(&[3, 90]));

        // 4 head words + array length + 2 elements
        assert_eq!(encoded.len(), 7 * 32);
        assert_eq!(&encoded[12..32], Address::repeat_byte(1).as_slice());
        assert_eq!(encoded[63], 7);
        // Offset of the dynamic array: right after the 4-word head
        assert_eq!(encoded[95], 128);
        assert_eq!(&encoded[108..128], Address::repeat_byte(9).as_slice());
        assert_eq!(encoded[159], 2);
        assert_eq!(encoded[191], 3);
        assert_eq!(encoded[223], 90);
    }

    #[test]
    fn test_digest_binds_every_field() {
        let base = pack_signing_digest(&opening(&[3, 90]));
        assert_ne!(base, pack_signing_digest(&opening(&[90, 3])));

        let mut other = opening(&[3, 90]);
        other.validator = Address::repeat_byte(8);
        assert_ne!(base, pack_signing_digest(&other));
    }

    #[test]
    fn test_eth_signed_hash_prefix() {
        let hash = B256::repeat_byte(0x11);
        let mut expected = ETH_SIGNED_MESSAGE_PREFIX.to_vec();
        expected.extend_from_slice(hash.as_slice());
        assert_eq!(eth_signed_hash(&hash), keccak256(expected));
    }

    #[test]
    fn test_parse_recovery_id() {
        assert_eq!(parse_recovery_id(27).unwrap().to_byte(), 0);
        assert_eq!(parse_recovery_id(1).unwrap().to_byte(), 1);
        assert_eq!(
            parse_recovery_id(29),
            Err(SignatureError::InvalidRecoveryId(29))
        );
    }

    #[test]
    fn test_recover_rejects_bad_lengths() {
        let digest = B256::ZERO;
        assert_eq!(
            recover_signer(&digest, &[0u8; 64]),
            Err(SignatureError::InvalidLength(64))
        );
        assert_eq!(
            recover_signer(&digest, &[0u8; 65]),
            Err(SignatureError::InvalidFormat)
        );
    }
}
