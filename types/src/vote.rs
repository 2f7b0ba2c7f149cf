//! Votes and the canonical bytes validators sign over.

use crate::{
    utils::{bytes_encode_size, epoch_millis, write_bytes},
    Address, Error, Identity,
};
use bytes::{BufMut, Bytes};
use commonware_codec::{varint::UInt, Encode, EncodeSize, Write};
use commonware_cryptography::{
    ed25519::{PublicKey, Signature},
    Verifier,
};
use commonware_utils::union;
use std::{fmt, time::SystemTime};

// Domain separation between votes and vote extensions signed for the same chain.
const VOTE_SUFFIX: &[u8] = b"_VOTE";
const EXTENSION_SUFFIX: &[u8] = b"_EXTENSION";

/// Namespace for vote signatures on `chain_id`.
#[inline]
pub fn vote_namespace(chain_id: &str) -> Vec<u8> {
    union(chain_id.as_bytes(), VOTE_SUFFIX)
}

/// Namespace for vote extension signatures on `chain_id`.
#[inline]
pub fn extension_namespace(chain_id: &str) -> Vec<u8> {
    union(chain_id.as_bytes(), EXTENSION_SUFFIX)
}

/// Phase of consensus a vote belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignedMsgType {
    Prevote,
    Precommit,
}

impl SignedMsgType {
    fn tag(&self) -> u8 {
        match self {
            SignedMsgType::Prevote => 1,
            SignedMsgType::Precommit => 2,
        }
    }
}

impl fmt::Display for SignedMsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignedMsgType::Prevote => write!(f, "prevote"),
            SignedMsgType::Precommit => write!(f, "precommit"),
        }
    }
}

/// Header of the parts a block is split into for gossip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartSetHeader {
    pub total: u32,
    pub hash: Bytes,
}

impl PartSetHeader {
    pub fn is_zero(&self) -> bool {
        self.total == 0 && self.hash.is_empty()
    }
}

impl Write for PartSetHeader {
    fn write(&self, writer: &mut impl BufMut) {
        UInt(self.total).write(writer);
        write_bytes(&self.hash, writer);
    }
}

impl EncodeSize for PartSetHeader {
    fn encode_size(&self) -> usize {
        UInt(self.total).encode_size() + bytes_encode_size(&self.hash)
    }
}

/// Identifies a block by its hash and part set header.
///
/// The default (empty) identifier is a vote for nil.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub hash: Bytes,
    pub part_set_header: PartSetHeader,
}

impl BlockId {
    pub fn new(hash: Bytes, part_set_header: PartSetHeader) -> Self {
        Self {
            hash,
            part_set_header,
        }
    }

    /// Returns true if this identifier refers to no block.
    pub fn is_nil(&self) -> bool {
        self.hash.is_empty() && self.part_set_header.is_zero()
    }
}

impl Write for BlockId {
    fn write(&self, writer: &mut impl BufMut) {
        write_bytes(&self.hash, writer);
        self.part_set_header.write(writer);
    }
}

impl EncodeSize for BlockId {
    fn encode_size(&self) -> usize {
        bytes_encode_size(&self.hash) + self.part_set_header.encode_size()
    }
}

/// A validator's vote for a block (or nil) at a given height, round, and phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub msg_type: SignedMsgType,
    pub height: u64,
    pub round: u32,
    pub block_id: BlockId,
    pub timestamp: SystemTime,
    pub validator_address: Address,
    pub validator_index: u32,
    pub signature: Option<Signature>,
    /// Application data attached to a precommit. Only signed when vote extensions are enabled.
    pub extension: Bytes,
    pub extension_signature: Option<Signature>,
}

impl Vote {
    /// Creates an unsigned vote.
    pub fn new(
        msg_type: SignedMsgType,
        height: u64,
        round: u32,
        block_id: BlockId,
        timestamp: SystemTime,
        validator_address: Address,
        validator_index: u32,
    ) -> Self {
        Self {
            msg_type,
            height,
            round,
            block_id,
            timestamp,
            validator_address,
            validator_index,
            signature: None,
            extension: Bytes::new(),
            extension_signature: None,
        }
    }

    /// Canonical bytes covered by the vote signature.
    pub fn sign_bytes(&self) -> Bytes {
        CanonicalVote::from(self).encode().freeze()
    }

    /// Canonical bytes covered by the extension signature.
    pub fn extension_sign_bytes(&self) -> Bytes {
        CanonicalExtension::from(self).encode().freeze()
    }

    /// Verifies the vote signature against `public_key` on `chain_id`.
    pub fn verify(&self, chain_id: &str, public_key: &PublicKey) -> Result<(), Error> {
        if Address::from_public_key(public_key) != self.validator_address {
            return Err(Error::InvalidValidatorAddress(self.validator_index));
        }
        let signature = self.signature.as_ref().ok_or(Error::InvalidSignature)?;
        let namespace = vote_namespace(chain_id);
        if !public_key.verify(Some(&namespace[..]), &self.sign_bytes(), signature) {
            return Err(Error::InvalidSignature);
        }
        Ok(())
    }

    /// Verifies the extension signature against `public_key` on `chain_id`.
    ///
    /// Only non-nil precommits carry extensions, so any other vote passes trivially.
    pub fn verify_extension(&self, chain_id: &str, public_key: &PublicKey) -> Result<(), Error> {
        if self.msg_type != SignedMsgType::Precommit || self.block_id.is_nil() {
            return Ok(());
        }
        let signature = self
            .extension_signature
            .as_ref()
            .ok_or(Error::MissingExtension(self.validator_index))?;
        let namespace = extension_namespace(chain_id);
        if !public_key.verify(Some(&namespace[..]), &self.extension_sign_bytes(), signature) {
            return Err(Error::InvalidExtensionSignature);
        }
        Ok(())
    }

    /// Verifies both the vote and the extension signature.
    pub fn verify_with_extension(
        &self,
        chain_id: &str,
        public_key: &PublicKey,
    ) -> Result<(), Error> {
        self.verify(chain_id, public_key)?;
        self.verify_extension(chain_id, public_key)
    }
}

/// Fields of a [Vote] that are signed (excludes the signer and any signatures).
struct CanonicalVote<'a> {
    msg_type: SignedMsgType,
    height: u64,
    round: u32,
    block_id: &'a BlockId,
    timestamp: u64,
}

impl<'a> From<&'a Vote> for CanonicalVote<'a> {
    fn from(vote: &'a Vote) -> Self {
        Self {
            msg_type: vote.msg_type,
            height: vote.height,
            round: vote.round,
            block_id: &vote.block_id,
            timestamp: epoch_millis(&vote.timestamp),
        }
    }
}

impl Write for CanonicalVote<'_> {
    fn write(&self, writer: &mut impl BufMut) {
        self.msg_type.tag().write(writer);
        self.height.write(writer);
        self.round.write(writer);
        self.block_id.write(writer);
        self.timestamp.write(writer);
    }
}

impl EncodeSize for CanonicalVote<'_> {
    fn encode_size(&self) -> usize {
        self.msg_type.tag().encode_size()
            + self.height.encode_size()
            + self.round.encode_size()
            + self.block_id.encode_size()
            + self.timestamp.encode_size()
    }
}

/// Fields covered by an extension signature.
struct CanonicalExtension<'a> {
    extension: &'a [u8],
    height: u64,
    round: u32,
}

impl<'a> From<&'a Vote> for CanonicalExtension<'a> {
    fn from(vote: &'a Vote) -> Self {
        Self {
            extension: &vote.extension,
            height: vote.height,
            round: vote.round,
        }
    }
}

impl Write for CanonicalExtension<'_> {
    fn write(&self, writer: &mut impl BufMut) {
        write_bytes(self.extension, writer);
        self.height.write(writer);
        self.round.write(writer);
    }
}

impl EncodeSize for CanonicalExtension<'_> {
    fn encode_size(&self) -> usize {
        bytes_encode_size(self.extension) + self.height.encode_size() + self.round.encode_size()
    }
}

/// Signs `vote` with `identity` and verifies the result before accepting it.
///
/// When `extensions_enabled` is set, the vote must be a precommit and, unless it is for nil,
/// its extension is signed as well. Without extensions, any extension signature is cleared.
/// On failure the vote is left unsigned.
pub fn sign_and_check_vote<I: Identity>(
    vote: &mut Vote,
    identity: &I,
    chain_id: &str,
    extensions_enabled: bool,
) -> Result<(), Error> {
    if extensions_enabled && vote.msg_type != SignedMsgType::Precommit {
        return Err(Error::InvalidExtension(vote.msg_type));
    }
    let public_key = identity
        .public_key()
        .map_err(|err| Error::UnknownSigner(Box::new(err)))?;

    let namespace = vote_namespace(chain_id);
    let signature = identity
        .sign(&namespace, &vote.sign_bytes())
        .map_err(|err| Error::SigningFailed(Box::new(err)))?;
    let extension_signature = if extensions_enabled && !vote.block_id.is_nil() {
        let namespace = extension_namespace(chain_id);
        let signature = identity
            .sign(&namespace, &vote.extension_sign_bytes())
            .map_err(|err| Error::SigningFailed(Box::new(err)))?;
        Some(signature)
    } else {
        None
    };

    let mut signed = vote.clone();
    signed.signature = Some(signature);
    signed.extension_signature = extension_signature;
    signed.verify(chain_id, &public_key)?;
    if extensions_enabled {
        signed.verify_extension(chain_id, &public_key)?;
    }
    *vote = signed;
    Ok(())
}
