//! Fabricate signed votes and extended commits for tests.
//!
//! Every helper assumes an honest roster: all validators sign the same block, none abstain, and
//! the first failure aborts the whole operation.

use crate::{
    sign_and_check_vote, AbciParams, Address, BlockId, Collector, Error, ExtendedCommit, Identity,
    SignedMsgType, Vote,
};
use std::time::SystemTime;
use tracing::debug;

/// Builds and signs a vote from `identity` at `index`.
///
/// Precommits are signed with vote extensions, so the extension (empty) of a non-nil precommit
/// carries a signature.
#[allow(clippy::too_many_arguments)]
pub fn make_vote<I: Identity>(
    identity: &I,
    chain_id: &str,
    index: u32,
    height: u64,
    round: u32,
    msg_type: SignedMsgType,
    block_id: BlockId,
    timestamp: SystemTime,
) -> Result<Vote, Error> {
    let public_key = identity
        .public_key()
        .map_err(|err| Error::UnknownSigner(Box::new(err)))?;
    let mut vote = Vote::new(
        msg_type,
        height,
        round,
        block_id,
        timestamp,
        Address::from_public_key(&public_key),
        index,
    );
    let extensions_enabled = msg_type == SignedMsgType::Precommit;
    sign_and_check_vote(&mut vote, identity, chain_id, extensions_enabled)?;
    Ok(vote)
}

/// Signs `vote` for `collector`'s chain and adds it, returning whether the collector
/// reached a two-thirds majority.
///
/// The vote must be of the phase the collector was created for.
pub fn sign_add_vote<I: Identity, C: Collector>(
    identity: &I,
    mut vote: Vote,
    collector: &mut C,
) -> Result<bool, Error> {
    if vote.msg_type != collector.msg_type() {
        return Err(Error::PhaseMismatch {
            vote: vote.msg_type,
            collector: collector.msg_type(),
        });
    }
    sign_and_check_vote(
        &mut vote,
        identity,
        collector.chain_id(),
        collector.extensions_enabled(),
    )?;
    collector.add_vote(vote)
}

/// Has every identity in `identities` precommit `block_id` (validator index = position) into
/// `collector`, then builds the resulting [ExtendedCommit].
///
/// If `extensions_enabled`, extensions are mandatory from `height` on; otherwise the enable
/// height is zero.
pub fn make_ext_commit<I: Identity, C: Collector>(
    block_id: BlockId,
    height: u64,
    round: u32,
    collector: &mut C,
    identities: &[I],
    now: SystemTime,
    extensions_enabled: bool,
) -> Result<ExtendedCommit, Error> {
    for (index, identity) in identities.iter().enumerate() {
        let public_key = identity
            .public_key()
            .map_err(|err| Error::UnknownSigner(Box::new(err)))?;
        let vote = Vote::new(
            SignedMsgType::Precommit,
            height,
            round,
            block_id.clone(),
            now,
            Address::from_public_key(&public_key),
            index as u32,
        );
        sign_add_vote(identity, vote, collector)?;
    }

    let vote_extensions_enable_height = if extensions_enabled { height } else { 0 };
    let commit = collector.make_extended_commit(AbciParams {
        vote_extensions_enable_height,
    })?;
    debug!(
        height,
        round,
        signers = identities.len(),
        extensions_enabled,
        "built extended commit"
    );
    Ok(commit)
}
