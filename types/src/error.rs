//! Errors returned while building votes, commits, and blocks.

use crate::vote::SignedMsgType;
use thiserror::Error;

/// Boxed error raised by an [crate::Identity] implementation.
pub type IdentityError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while fabricating consensus inputs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot identify signer: {0}")]
    UnknownSigner(#[source] IdentityError),
    #[error("Signing failed: {0}")]
    SigningFailed(#[source] IdentityError),
    #[error("Invalid vote signature")]
    InvalidSignature,
    #[error("Invalid vote extension signature")]
    InvalidExtensionSignature,
    #[error("Vote extensions are only valid on non-nil precommits (got {0})")]
    InvalidExtension(SignedMsgType),
    #[error("Vote/collector phase mismatch: vote={vote}, collector={collector}")]
    PhaseMismatch {
        vote: SignedMsgType,
        collector: SignedMsgType,
    },
    #[error("Unexpected step: expected {expected_height}/{expected_round}/{expected_type}, got {height}/{round}/{msg_type}")]
    UnexpectedStep {
        expected_height: u64,
        expected_round: u32,
        expected_type: SignedMsgType,
        height: u64,
        round: u32,
        msg_type: SignedMsgType,
    },
    #[error("Invalid validator index: {0}")]
    InvalidValidatorIndex(u32),
    #[error("Validator address does not match index {0}")]
    InvalidValidatorAddress(u32),
    #[error("Duplicate vote from validator {0}")]
    DuplicateVote(u32),
    #[error("Conflicting vote from validator {0}")]
    ConflictingVote(u32),
    #[error("Missing vote extension from validator {0}")]
    MissingExtension(u32),
    #[error("Unexpected vote extension from validator {0}")]
    UnexpectedExtension(u32),
    #[error("No two-thirds majority")]
    NoMajority,
    #[error("Trailer requires at least a digest and a size element; got an incomplete trailer")]
    IncompleteTrailer,
    #[error("Invalid square size: {0}")]
    InvalidSquareSize(#[source] commonware_codec::Error),
}
