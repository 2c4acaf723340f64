//! Signing keys and the authenticator plugged into the card economy.

use alloy_primitives::{keccak256, Address, B256};
use cardex_economy::{EconomyResult, PackAuthenticator, PackOpening};
use k256::ecdsa::{SigningKey, VerifyingKey};
use rand::{CryptoRng, RngCore};

use super::{pack_signing_digest, recover_pack_signer, SIGNATURE_LENGTH};
use crate::error::{SignatureError, SignatureResult};

/// Ethereum address of a secp256k1 public key.
#[must_use]
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// A backend or wallet key that signs pack openings.
#[derive(Clone)]
pub struct PackSigner {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for PackSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl PackSigner {
    /// Loads a signer from a 32-byte secret.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for zero or out-of-range secrets.
    pub fn from_bytes(secret: &B256) -> SignatureResult<Self> {
        let key = SigningKey::from_slice(secret.as_slice()).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self::from_key(key))
    }

    /// Generates a fresh signer.
    pub fn random(rng: &mut (impl CryptoRng + RngCore)) -> Self {
        Self::from_key(SigningKey::random(rng))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    /// Address to register in the signer set.
    #[inline]
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a 32-byte digest, returning `r ‖ s ‖ v` with `v` in `{27, 28}`.
    ///
    /// # Errors
    ///
    /// Returns `SigningFailed` if the key cannot sign the digest.
    pub fn sign_digest(&self, digest: &B256) -> SignatureResult<[u8; SIGNATURE_LENGTH]> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|_| SignatureError::SigningFailed)?;
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte() + 27;
        Ok(bytes)
    }

    /// Signs a pack opening.
    ///
    /// # Errors
    ///
    /// As [`Self::sign_digest`].
    pub fn sign_opening(&self, opening: &PackOpening<'_>) -> SignatureResult<[u8; SIGNATURE_LENGTH]> {
        self.sign_digest(&pack_signing_digest(opening))
    }
}

/// [`PackAuthenticator`] backed by secp256k1 recovery.
#[derive(Clone, Copy, Debug, Default)]
pub struct EcdsaPackAuthenticator;

impl PackAuthenticator for EcdsaPackAuthenticator {
    fn recover_signer(
        &self,
        opening: &PackOpening<'_>,
        signature: &[u8],
    ) -> EconomyResult<Address> {
        recover_pack_signer(opening, signature).map_err(|err| {
            tracing::debug!("Rejected pack {} signature: {}", opening.pack_number, err);
            err.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardex_economy::{CapabilitySet, EconomyError, Role};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn signer() -> PackSigner {
        PackSigner::random(&mut ChaCha20Rng::seed_from_u64(42))
    }

    fn opening(pack_data: &[u32]) -> PackOpening<'_> {
        PackOpening {
            buyer: Address::repeat_byte(1),
            pack_number: 3,
            pack_data,
            validator: Address::repeat_byte(9),
        }
    }

    #[test]
    fn test_known_key_address() {
        // Secret 1 is the generator point
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let signer = PackSigner::from_bytes(&B256::from(secret)).unwrap();
        assert_eq!(
            signer.address(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
                .parse::<Address>()
                .unwrap()
        );
        assert_eq!(
            PackSigner::from_bytes(&B256::ZERO).unwrap_err(),
            SignatureError::InvalidKey
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let signer = signer();
        let signature = signer.sign_opening(&opening(&[1, 2, 3])).unwrap();

        assert!(signature[64] == 27 || signature[64] == 28);
        assert_eq!(
            recover_pack_signer(&opening(&[1, 2, 3]), &signature),
            Ok(signer.address())
        );

        // Same signature over different data recovers someone else
        let other = recover_pack_signer(&opening(&[1, 2, 4]), &signature);
        assert_ne!(other, Ok(signer.address()));
    }

    #[test]
    fn test_raw_recovery_id_accepted() {
        let signer = signer();
        let mut signature = signer.sign_opening(&opening(&[5])).unwrap();
        signature[64] -= 27;
        assert_eq!(
            recover_pack_signer(&opening(&[5]), &signature),
            Ok(signer.address())
        );
    }

    #[test]
    fn test_authenticator_checks_membership() {
        let signer = signer();
        let signers = CapabilitySet::with_founder(Role::Signer, signer.address()).unwrap();
        let signature = signer.sign_opening(&opening(&[7, 7])).unwrap();

        assert_eq!(
            EcdsaPackAuthenticator.verify(&opening(&[7, 7]), &signature, &signers),
            Ok(signer.address())
        );
        assert_eq!(
            EcdsaPackAuthenticator.verify(&opening(&[7, 8]), &signature, &signers),
            Err(EconomyError::InvalidSignature)
        );
        assert_eq!(
            EcdsaPackAuthenticator.verify(&opening(&[7, 7]), &signature[..64], &signers),
            Err(EconomyError::InvalidSignature)
        );
    }
}
