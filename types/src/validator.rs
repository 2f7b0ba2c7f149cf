//! Validators and the ordered roster they form.

use crate::utils::sha256;
use bytes::{BufMut, Bytes};
use commonware_codec::{Encode, EncodeSize, Write};
use commonware_cryptography::ed25519::PublicKey;
use commonware_utils::hex;
use std::fmt;

/// Length of a validator [Address] in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Address of a validator: the first 20 bytes of the SHA-256 of its public key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Derives the address of `public_key`.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let key: &[u8] = public_key.as_ref();
        let digest = sha256([key]);
        let mut address = [0u8; ADDRESS_LENGTH];
        address.copy_from_slice(&digest[..ADDRESS_LENGTH]);
        Self(address)
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(value: [u8; ADDRESS_LENGTH]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl Write for Address {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl EncodeSize for Address {
    fn encode_size(&self) -> usize {
        ADDRESS_LENGTH
    }
}

/// A participant in consensus, weighted by voting power.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    pub address: Address,
    pub public_key: PublicKey,
    pub voting_power: u64,
}

impl Validator {
    /// Creates a validator, deriving its address from `public_key`.
    pub fn new(public_key: PublicKey, voting_power: u64) -> Self {
        Self {
            address: Address::from_public_key(&public_key),
            public_key,
            voting_power,
        }
    }
}

impl Write for Validator {
    fn write(&self, writer: &mut impl BufMut) {
        self.address.write(writer);
        self.public_key.write(writer);
        self.voting_power.write(writer);
    }
}

impl EncodeSize for Validator {
    fn encode_size(&self) -> usize {
        self.address.encode_size() + self.public_key.encode_size() + self.voting_power.encode_size()
    }
}

/// An ordered roster of [Validator]s.
///
/// The position of a validator in the set is its validator index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
    total_voting_power: u128,
}

impl ValidatorSet {
    /// Creates a set that preserves the order of `validators`.
    ///
    /// The total is kept as a `u128`, so it cannot overflow for any roster of `u64` powers.
    pub fn new(validators: Vec<Validator>) -> Self {
        let total_voting_power = validators.iter().map(|v| v.voting_power as u128).sum();
        Self {
            validators,
            total_voting_power,
        }
    }

    /// Returns the validator at `index`, if any.
    pub fn get_by_index(&self, index: u32) -> Option<&Validator> {
        self.validators.get(index as usize)
    }

    /// Returns the index and validator with `address`, if any.
    pub fn get_by_address(&self, address: &Address) -> Option<(u32, &Validator)> {
        self.validators
            .iter()
            .enumerate()
            .find(|(_, v)| &v.address == address)
            .map(|(i, v)| (i as u32, v))
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn total_voting_power(&self) -> u128 {
        self.total_voting_power
    }

    pub fn iter(&self) -> impl Iterator<Item = &Validator> {
        self.validators.iter()
    }

    /// Hash of the encoded roster, in order.
    pub fn hash(&self) -> Bytes {
        let encoded: Vec<_> = self.validators.iter().map(|v| v.encode()).collect();
        sha256(encoded.iter().map(|e| &e[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_cryptography::{ed25519::PrivateKey, PrivateKeyExt, Signer};

    fn validator(seed: u64, power: u64) -> Validator {
        Validator::new(PrivateKey::from_seed(seed).public_key(), power)
    }

    #[test]
    fn test_address_derivation() {
        let public_key = PrivateKey::from_seed(0).public_key();
        let address = Address::from_public_key(&public_key);
        let key: &[u8] = public_key.as_ref();
        let digest = sha256([key]);
        assert_eq!(address.as_ref(), &digest[..ADDRESS_LENGTH]);
        assert_eq!(address.to_string().len(), ADDRESS_LENGTH * 2);
    }

    #[test]
    fn test_validator_set_order() {
        let validators = vec![validator(3, 10), validator(1, 20), validator(2, 30)];
        let set = ValidatorSet::new(validators.clone());
        assert_eq!(set.len(), 3);
        assert_eq!(set.total_voting_power(), 60);
        for (i, v) in validators.iter().enumerate() {
            assert_eq!(set.get_by_index(i as u32), Some(v));
            assert_eq!(set.get_by_address(&v.address), Some((i as u32, v)));
        }
        assert!(set.get_by_index(3).is_none());
        assert!(set.iter().eq(validators.iter()));
    }

    #[test]
    fn test_total_voting_power_does_not_overflow() {
        let power = u64::MAX / 2 + 1;
        let set = ValidatorSet::new(vec![validator(0, power), validator(1, power)]);
        assert_eq!(set.total_voting_power(), power as u128 * 2);
        assert!(set.total_voting_power() > u64::MAX as u128);
    }

    #[test]
    fn test_validator_set_hash() {
        let a = ValidatorSet::new(vec![validator(0, 1), validator(1, 1)]);
        let b = ValidatorSet::new(vec![validator(1, 1), validator(0, 1)]);
        assert_eq!(a.hash(), a.clone().hash());
        assert_ne!(a.hash(), b.hash());
        assert!(ValidatorSet::default().is_empty());
    }
}
