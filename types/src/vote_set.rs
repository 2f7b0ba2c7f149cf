//! In-memory [Collector] that tallies votes for a single height, round, and phase.

use crate::{
    AbciParams, BlockId, Collector, CommitSig, Error, ExtendedCommit, ExtendedCommitSig,
    SignedMsgType, ValidatorSet, Vote,
};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Configuration for a [VoteSet].
pub struct Config {
    /// Chain the votes are scoped to.
    pub chain_id: String,

    /// Height being voted on.
    pub height: u64,

    /// Round being voted on.
    pub round: u32,

    /// Phase of the votes collected.
    pub msg_type: SignedMsgType,

    /// Validators allowed to vote, in index order.
    pub validators: ValidatorSet,

    /// Whether precommits must carry signed vote extensions.
    ///
    /// Only valid for [SignedMsgType::Precommit].
    pub extensions_enabled: bool,
}

impl Config {
    /// Assert enforces that all configuration values are valid.
    pub fn assert(&self) {
        assert!(!self.chain_id.is_empty(), "chain id must not be empty");
        assert!(self.height > 0, "height must be greater than zero");
        assert!(
            !self.validators.is_empty(),
            "validator set must not be empty"
        );
        assert!(
            self.validators.total_voting_power() > 0,
            "total voting power must be greater than zero"
        );
        assert!(
            !self.extensions_enabled || self.msg_type == SignedMsgType::Precommit,
            "vote extensions are only valid for precommits"
        );
    }
}

/// Collects votes from a [ValidatorSet] and tracks whether some block (or nil)
/// has received more than two-thirds of the voting power.
pub struct VoteSet {
    chain_id: String,
    height: u64,
    round: u32,
    msg_type: SignedMsgType,
    validators: ValidatorSet,
    extensions_enabled: bool,

    votes: Vec<Option<Vote>>,
    sum: u128,
    votes_by_block: HashMap<BlockId, u128>,
    maj23: Option<BlockId>,
}

impl VoteSet {
    /// Creates an empty vote set.
    ///
    /// # Panics
    ///
    /// Panics if `cfg` is invalid (see [Config::assert]).
    pub fn new(cfg: Config) -> Self {
        cfg.assert();
        let votes = vec![None; cfg.validators.len()];
        Self {
            chain_id: cfg.chain_id,
            height: cfg.height,
            round: cfg.round,
            msg_type: cfg.msg_type,
            validators: cfg.validators,
            extensions_enabled: cfg.extensions_enabled,
            votes,
            sum: 0,
            votes_by_block: HashMap::new(),
            maj23: None,
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Number of validators in the set.
    pub fn size(&self) -> usize {
        self.validators.len()
    }

    /// Voting power of all votes added so far.
    pub fn sum(&self) -> u128 {
        self.sum
    }

    /// Returns the vote added for the validator at `index`, if any.
    pub fn get_by_index(&self, index: u32) -> Option<&Vote> {
        self.votes.get(index as usize)?.as_ref()
    }

    /// Block (or nil) that received more than two-thirds of the voting power, if any.
    pub fn two_thirds_majority(&self) -> Option<&BlockId> {
        self.maj23.as_ref()
    }

    pub fn has_two_thirds_majority(&self) -> bool {
        self.maj23.is_some()
    }

    /// Returns true if votes from more than two-thirds of the voting power were added,
    /// regardless of the block they are for.
    pub fn has_two_thirds_any(&self) -> bool {
        self.exceeds_two_thirds(self.sum)
    }

    fn exceeds_two_thirds(&self, power: u128) -> bool {
        power * 3 > self.validators.total_voting_power() * 2
    }

    /// Checks `vote` can be added without modifying the set.
    fn check(&self, vote: &Vote) -> Result<(), Error> {
        let index = vote.validator_index;
        if vote.height != self.height || vote.round != self.round || vote.msg_type != self.msg_type
        {
            return Err(Error::UnexpectedStep {
                expected_height: self.height,
                expected_round: self.round,
                expected_type: self.msg_type,
                height: vote.height,
                round: vote.round,
                msg_type: vote.msg_type,
            });
        }
        let validator = self
            .validators
            .get_by_index(index)
            .ok_or(Error::InvalidValidatorIndex(index))?;
        if validator.address != vote.validator_address {
            return Err(Error::InvalidValidatorAddress(index));
        }
        if let Some(existing) = self.get_by_index(index) {
            if existing.block_id == vote.block_id {
                return Err(Error::DuplicateVote(index));
            }
            return Err(Error::ConflictingVote(index));
        }

        if self.extensions_enabled {
            vote.verify_with_extension(&self.chain_id, &validator.public_key)
        } else {
            if !vote.extension.is_empty() || vote.extension_signature.is_some() {
                return Err(Error::UnexpectedExtension(index));
            }
            vote.verify(&self.chain_id, &validator.public_key)
        }
    }
}

impl Collector for VoteSet {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn msg_type(&self) -> SignedMsgType {
        self.msg_type
    }

    fn extensions_enabled(&self) -> bool {
        self.extensions_enabled
    }

    fn add_vote(&mut self, vote: Vote) -> Result<bool, Error> {
        self.check(&vote)?;

        let index = vote.validator_index;
        let power = self
            .validators
            .get_by_index(index)
            .map(|v| v.voting_power)
            .ok_or(Error::InvalidValidatorIndex(index))?;
        self.sum += power as u128;
        let block_power = self.votes_by_block.entry(vote.block_id.clone()).or_default();
        *block_power += power as u128;
        let block_power = *block_power;
        debug!(
            height = self.height,
            round = self.round,
            index,
            power,
            sum = self.sum,
            "added vote"
        );

        let reached = self.maj23.is_none() && self.exceeds_two_thirds(block_power);
        if reached {
            trace!(
                height = self.height,
                round = self.round,
                nil = vote.block_id.is_nil(),
                "two-thirds majority reached"
            );
            self.maj23 = Some(vote.block_id.clone());
        }
        self.votes[index as usize] = Some(vote);
        Ok(reached)
    }

    fn make_extended_commit(&self, params: AbciParams) -> Result<ExtendedCommit, Error> {
        if self.msg_type != SignedMsgType::Precommit {
            return Err(Error::PhaseMismatch {
                vote: SignedMsgType::Precommit,
                collector: self.msg_type,
            });
        }
        let block_id = match &self.maj23 {
            Some(block_id) if !block_id.is_nil() => block_id.clone(),
            _ => return Err(Error::NoMajority),
        };

        let extended_signatures = self
            .votes
            .iter()
            .map(|vote| match vote {
                Some(vote) => {
                    let commit_sig = CommitSig::from_vote(vote, &block_id);
                    if commit_sig.is_absent() {
                        return ExtendedCommitSig::absent();
                    }
                    ExtendedCommitSig {
                        commit_sig,
                        extension: vote.extension.clone(),
                        extension_signature: vote.extension_signature.clone(),
                    }
                }
                None => ExtendedCommitSig::absent(),
            })
            .collect();
        let commit = ExtendedCommit {
            height: self.height,
            round: self.round,
            block_id,
            extended_signatures,
            extensions_enable_height: params.vote_extensions_enable_height,
        };
        commit.ensure_extensions(params.vote_extensions_enabled(self.height))?;
        Ok(commit)
    }
}
