//! Fabricate the inputs a BFT consensus engine would produce: signed votes, extended commits,
//! and blocks whose transaction list carries a data square trailer.
//!
//! # Overview
//!
//! Tests construct a roster of [Identity]s and a [Collector] (usually a [VoteSet]) and hand both
//! to [make_ext_commit], which has every identity precommit the same block and returns the
//! resulting [ExtendedCommit]. Blocks are built with [make_block] from a [TxsWithTrailer], whose
//! last two elements hold the data hash and the (big-endian) square size.
//!
//! Nothing here runs consensus: there is no round progression, networking, or leader election.
//!
//! # Status
//!
//! `sunrise-types` is **ALPHA** software and is only meant for building test fixtures.

pub mod block;
pub use block::{make_block, Block, Data, Header};
pub mod commit;
pub use commit::{AbciParams, BlockIdFlag, Commit, CommitSig, ExtendedCommit, ExtendedCommitSig};
mod error;
pub use error::{Error, IdentityError};
pub mod fixtures;
pub use fixtures::{make_ext_commit, make_vote, sign_add_vote};
mod identity;
pub use identity::{deterministic_roster, Ed25519Identity};
pub mod trailer;
pub use trailer::{decode_trailer, encode_trailer, Trailer, TxsWithTrailer};
mod utils;
pub mod validator;
pub use validator::{Address, Validator, ValidatorSet};
pub mod vote;
pub use vote::{sign_and_check_vote, BlockId, PartSetHeader, SignedMsgType, Vote};
pub mod vote_set;
pub use vote_set::VoteSet;

use commonware_cryptography::ed25519::{PublicKey, Signature};

/// A validator's signing capability.
///
/// Retrieving the key or signing may fail (for example, if a remote key store is unavailable).
pub trait Identity {
    /// Error returned when the key is unavailable or signing fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the public key of this identity.
    fn public_key(&self) -> Result<PublicKey, Self::Error>;

    /// Signs `message` under `namespace`.
    ///
    /// The namespace is used for domain separation and must be provided again on verification.
    fn sign(&self, namespace: &[u8], message: &[u8]) -> Result<Signature, Self::Error>;
}

/// Tallies votes of one phase at a single height and round toward a two-thirds majority.
///
/// Adding a vote requires exclusive access. Callers that sign in parallel must still
/// serialize calls to [Collector::add_vote].
pub trait Collector {
    /// Chain the collected votes are signed for.
    fn chain_id(&self) -> &str;

    /// Phase of the votes this collector accepts.
    fn msg_type(&self) -> SignedMsgType;

    /// Whether precommits added to this collector must carry signed vote extensions.
    fn extensions_enabled(&self) -> bool;

    /// Validates and records `vote`.
    ///
    /// Returns true if this vote caused the collector to reach a two-thirds majority.
    fn add_vote(&mut self, vote: Vote) -> Result<bool, Error>;

    /// Builds the [ExtendedCommit] for the block with a two-thirds majority.
    fn make_extended_commit(&self, params: AbciParams) -> Result<ExtendedCommit, Error>;
}
