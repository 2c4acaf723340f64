//! # Pack Authentication
//!
//! Pack contents are dealt off-chain. The ledger accepts them only when a
//! registered signer vouched for the exact tuple being opened:
//!
//! ```text
//! (buyer, pack_number, pack_data, validator)  +  signature
//!                       │
//!                       ▼
//!          PackAuthenticator::recover_signer
//!                       │
//!                       ▼
//!            signer ∈ card ledger signers ?
//! ```
//!
//! The concrete secp256k1 scheme lives in `cardex_blockchain`; this crate
//! only knows the seam.

use alloy_primitives::Address;
use cardex_shared::{CardNumber, PackId};

use crate::capability::CapabilitySet;
use crate::error::{EconomyError, EconomyResult};

/// The tuple a signer vouches for when authorizing a pack opening.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackOpening<'a> {
    /// Account opening the pack.
    pub buyer: Address,
    /// Pack being opened.
    pub pack_number: PackId,
    /// Card numbers to mint.
    pub pack_data: &'a [CardNumber],
    /// Address of the economy the signature is bound to.
    pub validator: Address,
}

/// Recovers who signed a pack opening.
pub trait PackAuthenticator {
    /// Recovers the signer of `signature` over `opening`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` for malformed or unrecoverable signatures.
    fn recover_signer(&self, opening: &PackOpening<'_>, signature: &[u8])
        -> EconomyResult<Address>;

    /// Recovers the signer and checks it holds the signer role.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` unless a registered signer signed `opening`.
    fn verify(
        &self,
        opening: &PackOpening<'_>,
        signature: &[u8],
        signers: &CapabilitySet,
    ) -> EconomyResult<Address> {
        let signer = self.recover_signer(opening, signature)?;
        if signers.contains(&signer) {
            Ok(signer)
        } else {
            tracing::warn!(
                "Pack {} opening signed by unregistered {}",
                opening.pack_number,
                signer
            );
            Err(EconomyError::InvalidSignature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Role;

    /// Treats the signature bytes as the raw signer address.
    struct AddressEcho;

    impl PackAuthenticator for AddressEcho {
        fn recover_signer(
            &self,
            _opening: &PackOpening<'_>,
            signature: &[u8],
        ) -> EconomyResult<Address> {
            if signature.len() == 20 {
                Ok(Address::from_slice(signature))
            } else {
                Err(EconomyError::InvalidSignature)
            }
        }
    }

    #[test]
    fn test_verify_requires_registered_signer() {
        let signer = Address::repeat_byte(7);
        let signers = CapabilitySet::with_founder(Role::Signer, signer).unwrap();
        let opening = PackOpening {
            buyer: Address::repeat_byte(1),
            pack_number: 0,
            pack_data: &[1, 2, 3],
            validator: Address::repeat_byte(9),
        };

        assert_eq!(
            AddressEcho.verify(&opening, signer.as_slice(), &signers),
            Ok(signer)
        );
        assert_eq!(
            AddressEcho.verify(&opening, Address::repeat_byte(8).as_slice(), &signers),
            Err(EconomyError::InvalidSignature)
        );
        assert_eq!(
            AddressEcho.verify(&opening, &[0u8; 3], &signers),
            Err(EconomyError::InvalidSignature)
        );
    }
}
