//! Commits: the quorum certificates produced by precommit vote sets.

use crate::{
    utils::{epoch_millis, sha256},
    Address, BlockId, Error, SignedMsgType, Vote,
};
use bytes::{BufMut, Bytes};
use commonware_codec::{Encode, EncodeSize, Write};
use commonware_cryptography::ed25519::Signature;
use std::time::{SystemTime, UNIX_EPOCH};

/// Consensus parameters owned by the application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AbciParams {
    /// First height at which precommits must carry vote extensions. Zero disables extensions.
    pub vote_extensions_enable_height: u64,
}

impl AbciParams {
    /// Returns true if vote extensions are required at `height`.
    pub fn vote_extensions_enabled(&self, height: u64) -> bool {
        self.vote_extensions_enable_height > 0 && height >= self.vote_extensions_enable_height
    }
}

/// What a validator's commit signature attests to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockIdFlag {
    /// No vote was received from the validator.
    Absent,
    /// The validator voted for the committed block.
    Commit,
    /// The validator voted for nil.
    Nil,
}

impl BlockIdFlag {
    fn tag(&self) -> u8 {
        match self {
            BlockIdFlag::Absent => 1,
            BlockIdFlag::Commit => 2,
            BlockIdFlag::Nil => 3,
        }
    }
}

/// A single validator's entry in a [Commit].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSig {
    pub block_id_flag: BlockIdFlag,
    pub validator_address: Address,
    pub timestamp: SystemTime,
    pub signature: Option<Signature>,
}

impl CommitSig {
    /// Entry for a validator that did not vote.
    pub fn absent() -> Self {
        Self {
            block_id_flag: BlockIdFlag::Absent,
            validator_address: Address::default(),
            timestamp: UNIX_EPOCH,
            signature: None,
        }
    }

    /// Entry recorded for `vote`, relative to the committed block `commit_block_id`.
    pub fn from_vote(vote: &Vote, commit_block_id: &BlockId) -> Self {
        let block_id_flag = if vote.block_id.is_nil() {
            BlockIdFlag::Nil
        } else if &vote.block_id == commit_block_id {
            BlockIdFlag::Commit
        } else {
            return Self::absent();
        };
        Self {
            block_id_flag,
            validator_address: vote.validator_address,
            timestamp: vote.timestamp,
            signature: vote.signature.clone(),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.block_id_flag == BlockIdFlag::Absent
    }

    /// Block this entry voted for, given the committed block.
    fn block_id(&self, commit_block_id: &BlockId) -> BlockId {
        match self.block_id_flag {
            BlockIdFlag::Commit => commit_block_id.clone(),
            BlockIdFlag::Absent | BlockIdFlag::Nil => BlockId::default(),
        }
    }
}

impl Write for CommitSig {
    fn write(&self, writer: &mut impl BufMut) {
        self.block_id_flag.tag().write(writer);
        self.validator_address.write(writer);
        epoch_millis(&self.timestamp).write(writer);
        self.signature.write(writer);
    }
}

impl EncodeSize for CommitSig {
    fn encode_size(&self) -> usize {
        self.block_id_flag.tag().encode_size()
            + self.validator_address.encode_size()
            + epoch_millis(&self.timestamp).encode_size()
            + self.signature.encode_size()
    }
}

/// A [CommitSig] with the vote extension that accompanied the precommit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedCommitSig {
    pub commit_sig: CommitSig,
    pub extension: Bytes,
    pub extension_signature: Option<Signature>,
}

impl ExtendedCommitSig {
    pub fn absent() -> Self {
        Self {
            commit_sig: CommitSig::absent(),
            extension: Bytes::new(),
            extension_signature: None,
        }
    }

    /// Checks that an extension is present exactly when `extensions_enabled`.
    ///
    /// Only entries for the committed block carry extensions.
    fn ensure_extension(&self, index: u32, extensions_enabled: bool) -> Result<(), Error> {
        if self.commit_sig.block_id_flag != BlockIdFlag::Commit {
            return Ok(());
        }
        match (extensions_enabled, &self.extension_signature) {
            (true, None) => Err(Error::MissingExtension(index)),
            (false, Some(_)) => Err(Error::UnexpectedExtension(index)),
            (false, None) if !self.extension.is_empty() => Err(Error::UnexpectedExtension(index)),
            _ => Ok(()),
        }
    }
}

/// Precommit signatures for a block, one per validator in set order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub height: u64,
    pub round: u32,
    pub block_id: BlockId,
    pub signatures: Vec<CommitSig>,
}

impl Commit {
    pub fn size(&self) -> usize {
        self.signatures.len()
    }

    /// Reconstructs the precommit cast by the validator at `index`, if it voted.
    ///
    /// Vote extensions are not part of a [Commit] and are left empty.
    pub fn get_vote(&self, index: u32) -> Option<Vote> {
        let sig = self.signatures.get(index as usize)?;
        if sig.is_absent() {
            return None;
        }
        let mut vote = Vote::new(
            SignedMsgType::Precommit,
            self.height,
            self.round,
            sig.block_id(&self.block_id),
            sig.timestamp,
            sig.validator_address,
            index,
        );
        vote.signature = sig.signature.clone();
        Some(vote)
    }

    /// Hash over every commit signature in order.
    pub fn hash(&self) -> Bytes {
        let encoded: Vec<_> = self.signatures.iter().map(|s| s.encode()).collect();
        sha256(encoded.iter().map(|e| &e[..]))
    }
}

/// A [Commit] that also carries the vote extensions of each precommit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedCommit {
    pub height: u64,
    pub round: u32,
    pub block_id: BlockId,
    pub extended_signatures: Vec<ExtendedCommitSig>,
    /// Height from which extensions are mandatory: this commit's height, or zero if disabled.
    pub extensions_enable_height: u64,
}

impl ExtendedCommit {
    pub fn size(&self) -> usize {
        self.extended_signatures.len()
    }

    /// Returns true if this commit was built with vote extensions.
    pub fn vote_extensions_enabled(&self) -> bool {
        AbciParams {
            vote_extensions_enable_height: self.extensions_enable_height,
        }
        .vote_extensions_enabled(self.height)
    }

    /// Checks every committed entry carries an extension signature if `extensions_enabled`,
    /// and that none does otherwise.
    pub fn ensure_extensions(&self, extensions_enabled: bool) -> Result<(), Error> {
        self.extended_signatures
            .iter()
            .enumerate()
            .try_for_each(|(i, sig)| sig.ensure_extension(i as u32, extensions_enabled))
    }

    /// Drops the extensions.
    pub fn to_commit(&self) -> Commit {
        Commit {
            height: self.height,
            round: self.round,
            block_id: self.block_id.clone(),
            signatures: self
                .extended_signatures
                .iter()
                .map(|s| s.commit_sig.clone())
                .collect(),
        }
    }

    /// Reconstructs the precommit (with its extension) cast by the validator at `index`.
    pub fn get_extended_vote(&self, index: u32) -> Option<Vote> {
        let sig = self.extended_signatures.get(index as usize)?;
        let commit_sig = &sig.commit_sig;
        if commit_sig.is_absent() {
            return None;
        }
        let mut vote = Vote::new(
            SignedMsgType::Precommit,
            self.height,
            self.round,
            commit_sig.block_id(&self.block_id),
            commit_sig.timestamp,
            commit_sig.validator_address,
            index,
        );
        vote.signature = commit_sig.signature.clone();
        vote.extension = sig.extension.clone();
        vote.extension_signature = sig.extension_signature.clone();
        Some(vote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sign_and_check_vote, Ed25519Identity, Identity, PartSetHeader};
    use std::time::Duration;

    const CHAIN_ID: &str = "test-chain";

    fn block_id() -> BlockId {
        BlockId::new(
            Bytes::from_static(&[9; 32]),
            PartSetHeader {
                total: 2,
                hash: Bytes::from_static(&[8; 32]),
            },
        )
    }

    fn signed_precommit(seed: u64, index: u32, block_id: BlockId, extensions: bool) -> Vote {
        let identity = Ed25519Identity::from_seed(seed);
        let mut vote = Vote::new(
            SignedMsgType::Precommit,
            5,
            1,
            block_id,
            UNIX_EPOCH + Duration::from_secs(60),
            Address::from_public_key(&identity.public_key().unwrap()),
            index,
        );
        if extensions {
            vote.extension = Bytes::from(format!("ext-{index}"));
        }
        sign_and_check_vote(&mut vote, &identity, CHAIN_ID, extensions).unwrap();
        vote
    }

    fn extended_sig(vote: &Vote) -> ExtendedCommitSig {
        ExtendedCommitSig {
            commit_sig: CommitSig::from_vote(vote, &block_id()),
            extension: vote.extension.clone(),
            extension_signature: vote.extension_signature.clone(),
        }
    }

    #[test]
    fn test_abci_params() {
        let disabled = AbciParams::default();
        assert!(!disabled.vote_extensions_enabled(1));
        let params = AbciParams {
            vote_extensions_enable_height: 10,
        };
        assert!(!params.vote_extensions_enabled(9));
        assert!(params.vote_extensions_enabled(10));
        assert!(params.vote_extensions_enabled(11));
    }

    #[test]
    fn test_commit_sig_flags() {
        let commit = signed_precommit(0, 0, block_id(), false);
        assert_eq!(
            CommitSig::from_vote(&commit, &block_id()).block_id_flag,
            BlockIdFlag::Commit
        );
        let nil = signed_precommit(1, 1, BlockId::default(), false);
        assert_eq!(
            CommitSig::from_vote(&nil, &block_id()).block_id_flag,
            BlockIdFlag::Nil
        );
        let elsewhere = BlockId::new(Bytes::from_static(b"x"), PartSetHeader::default());
        let other = signed_precommit(2, 2, elsewhere, false);
        assert!(CommitSig::from_vote(&other, &block_id()).is_absent());
    }

    #[test]
    fn test_extended_commit_round_trip_votes() {
        let votes: Vec<_> = (0..3)
            .map(|i| signed_precommit(i, i as u32, block_id(), true))
            .collect();
        let mut extended_signatures: Vec<_> = votes.iter().map(extended_sig).collect();
        extended_signatures.push(ExtendedCommitSig::absent());
        let commit = ExtendedCommit {
            height: 5,
            round: 1,
            block_id: block_id(),
            extended_signatures,
            extensions_enable_height: 5,
        };
        assert!(commit.vote_extensions_enabled());
        commit.ensure_extensions(true).unwrap();
        assert!(matches!(
            commit.ensure_extensions(false),
            Err(Error::UnexpectedExtension(0))
        ));

        for (i, vote) in votes.iter().enumerate() {
            assert_eq!(commit.get_extended_vote(i as u32).as_ref(), Some(vote));
        }
        assert!(commit.get_extended_vote(3).is_none());
        assert!(commit.get_extended_vote(4).is_none());

        // Converting to a plain commit keeps the vote signatures but drops extensions
        let plain = commit.to_commit();
        assert_eq!(plain.size(), 4);
        let vote = plain.get_vote(1).unwrap();
        assert_eq!(vote.signature, votes[1].signature);
        assert!(vote.extension.is_empty());
        assert!(vote.extension_signature.is_none());
    }

    #[test]
    fn test_ensure_extensions_missing() {
        let vote = signed_precommit(0, 0, block_id(), false);
        let commit = ExtendedCommit {
            height: 5,
            round: 1,
            block_id: block_id(),
            extended_signatures: vec![extended_sig(&vote)],
            extensions_enable_height: 0,
        };
        assert!(!commit.vote_extensions_enabled());
        commit.ensure_extensions(false).unwrap();
        assert!(matches!(
            commit.ensure_extensions(true),
            Err(Error::MissingExtension(0))
        ));
    }

    #[test]
    fn test_commit_hash() {
        let a = signed_precommit(0, 0, block_id(), false);
        let b = signed_precommit(1, 1, block_id(), false);
        let commit = Commit {
            height: 5,
            round: 1,
            block_id: block_id(),
            signatures: vec![
                CommitSig::from_vote(&a, &block_id()),
                CommitSig::from_vote(&b, &block_id()),
            ],
        };
        let mut reordered = commit.clone();
        reordered.signatures.reverse();
        assert_eq!(commit.hash(), commit.clone().hash());
        assert_ne!(commit.hash(), reordered.hash());
    }
}
