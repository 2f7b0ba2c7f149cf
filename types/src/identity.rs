//! In-memory [Identity] backed by an ed25519 key.

use crate::{Identity, Validator, ValidatorSet};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey, Signature},
    PrivateKeyExt, Signer,
};
use std::convert::Infallible;

/// Signs with a private key held in memory. Never fails.
#[derive(Clone)]
pub struct Ed25519Identity {
    key: PrivateKey,
}

impl Ed25519Identity {
    pub fn new(key: PrivateKey) -> Self {
        Self { key }
    }

    /// Creates an identity from a seed.
    ///
    /// # Warning
    ///
    /// Keys derived from a seed are predictable and must only be used in tests.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(PrivateKey::from_seed(seed))
    }
}

impl Identity for Ed25519Identity {
    type Error = Infallible;

    fn public_key(&self) -> Result<PublicKey, Self::Error> {
        Ok(self.key.public_key())
    }

    fn sign(&self, namespace: &[u8], message: &[u8]) -> Result<Signature, Self::Error> {
        Ok(self.key.sign(Some(namespace), message))
    }
}

/// Creates `n` identities (seeded `0..n`) and the matching [ValidatorSet],
/// each validator holding `voting_power`.
///
/// The identity at position `i` signs for validator index `i`.
pub fn deterministic_roster(n: u32, voting_power: u64) -> (ValidatorSet, Vec<Ed25519Identity>) {
    let identities: Vec<_> = (0..n as u64).map(Ed25519Identity::from_seed).collect();
    let validators = identities
        .iter()
        .map(|identity| Validator::new(identity.key.public_key(), voting_power))
        .collect();
    (ValidatorSet::new(validators), identities)
}
