//! Deposit Commitments
//!
//! ```text
//! Commitment = keccak256( pad12 || recipient(20) || secret(32) )
//! ```

use obscura_account::Address;

use crate::error::CommitmentError;
use crate::hash::{address_word, keccak256};
use crate::secret::Secret;
use crate::{HASH_LEN, hash32_newtype};

/// A deposit commitment (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Commitment(pub [u8; HASH_LEN]);

hash32_newtype!(Commitment);

/// Commit to `(recipient, secret)` in the ledger's `(address, bytes32)` layout.
pub fn commit(recipient: &Address, secret: &Secret) -> Commitment {
    let mut preimage = [0u8; 2 * HASH_LEN];
    preimage[..HASH_LEN].copy_from_slice(&address_word(recipient));
    preimage[HASH_LEN..].copy_from_slice(secret.as_bytes());
    Commitment(keccak256(&preimage))
}

/// Parse `recipient`, draw a fresh secret and commit to both.
pub fn generate_commitment(recipient: &str) -> Result<(Commitment, Secret), CommitmentError> {
    let recipient = Address::parse(recipient)?;
    generate_commitment_for(&recipient)
}

/// Same as [`generate_commitment`] for an already parsed recipient.
pub fn generate_commitment_for(
    recipient: &Address,
) -> Result<(Commitment, Secret), CommitmentError> {
    let secret = Secret::random()?;
    Ok((commit(recipient, &secret), secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> Address {
        Address::parse("0xabcd000000000000000000000000000000001234").unwrap()
    }

    #[test]
    fn test_commitment_deterministic() {
        let secret = Secret::from_bytes([42u8; 32]);
        assert_eq!(commit(&recipient(), &secret), commit(&recipient(), &secret));
    }

    #[test]
    fn test_commitment_hiding() {
        let c1 = commit(&recipient(), &Secret::from_bytes([1u8; 32]));
        let c2 = commit(&recipient(), &Secret::from_bytes([2u8; 32]));
        assert_ne!(c1, c2, "different secrets should produce different commitments");
    }

    #[test]
    fn test_commitment_binds_recipient() {
        let secret = Secret::from_bytes([9u8; 32]);
        let other = Address::from_bytes([0x11; 20]);
        assert_ne!(commit(&recipient(), &secret), commit(&other, &secret));
    }

    #[test]
    fn generated_commitment_matches_returned_secret() {
        let (commitment, secret) = generate_commitment_for(&recipient()).unwrap();
        assert_eq!(commitment, commit(&recipient(), &secret));
    }

    #[test]
    fn malformed_recipient_is_rejected() {
        let err = generate_commitment("0xnot-an-address").unwrap_err();
        assert!(matches!(err, CommitmentError::InvalidAddress(_)));
    }

    #[test]
    fn parse_and_display() {
        let c = Commitment([0xab; 32]);
        let text = c.to_string();
        assert!(text.starts_with("0xabab"));
        assert_eq!(text.parse::<Commitment>().unwrap(), c);
        assert!("0x1234".parse::<Commitment>().is_err());
    }
}
