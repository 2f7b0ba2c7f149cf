//! Blocks assembled from a trailer-encoded transaction list.

use crate::{
    trailer::{Decoded, Trailer, Tx, TxsWithTrailer},
    utils::{bytes_encode_size, epoch_millis, sha256, write_bytes},
    BlockId, Commit, Error,
};
use bytes::{BufMut, Bytes};
use commonware_codec::{Encode, EncodeSize, Write};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Version of the block protocol produced by [make_block].
pub const BLOCK_PROTOCOL: u64 = 11;

/// Protocol versions a block was produced under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Version {
    pub block: u64,
    pub app: u64,
}

/// Block header. Hashes are empty until filled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: Version,
    pub chain_id: String,
    pub height: u64,
    pub time: SystemTime,
    pub last_block_id: BlockId,
    pub last_commit_hash: Bytes,
    pub data_hash: Bytes,
    pub validators_hash: Bytes,
}

impl Header {
    fn new(height: u64) -> Self {
        Self {
            version: Version {
                block: BLOCK_PROTOCOL,
                app: 0,
            },
            chain_id: String::new(),
            height,
            time: UNIX_EPOCH,
            last_block_id: BlockId::default(),
            last_commit_hash: Bytes::new(),
            data_hash: Bytes::new(),
            validators_hash: Bytes::new(),
        }
    }

    /// Hash of the encoded header.
    pub fn hash(&self) -> Bytes {
        sha256([&self.encode()[..]])
    }
}

impl Write for Header {
    fn write(&self, writer: &mut impl BufMut) {
        self.version.block.write(writer);
        self.version.app.write(writer);
        write_bytes(self.chain_id.as_bytes(), writer);
        self.height.write(writer);
        epoch_millis(&self.time).write(writer);
        self.last_block_id.write(writer);
        write_bytes(&self.last_commit_hash, writer);
        write_bytes(&self.data_hash, writer);
        write_bytes(&self.validators_hash, writer);
    }
}

impl EncodeSize for Header {
    fn encode_size(&self) -> usize {
        self.version.block.encode_size()
            + self.version.app.encode_size()
            + bytes_encode_size(self.chain_id.as_bytes())
            + self.height.encode_size()
            + epoch_millis(&self.time).encode_size()
            + self.last_block_id.encode_size()
            + bytes_encode_size(&self.last_commit_hash)
            + bytes_encode_size(&self.data_hash)
            + bytes_encode_size(&self.validators_hash)
    }
}

/// Transactions of a block with the data square metadata recovered from the trailer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Data {
    pub txs: Vec<Tx>,
    pub square_size: u64,
    hash: Bytes,
}

impl Data {
    /// Decodes `txs` into block data.
    pub fn from_txs(txs: &TxsWithTrailer) -> Result<Self, Error> {
        let Decoded { txs, trailer } = txs.decode()?;
        Ok(Self {
            txs,
            square_size: trailer.square_size,
            hash: trailer.data_hash,
        })
    }

    /// Hash of the data.
    ///
    /// Uses the hash carried by the trailer when present, else hashes the transactions.
    pub fn hash(&self) -> Bytes {
        if !self.hash.is_empty() {
            return self.hash.clone();
        }
        let tx_hashes: Vec<_> = self.txs.iter().map(|tx| sha256([&tx[..]])).collect();
        sha256(tx_hashes.iter().map(|h| &h[..]))
    }

    /// Re-encodes the data (with its trailer) as a transaction list.
    pub fn to_txs(&self) -> TxsWithTrailer {
        TxsWithTrailer::encode(
            self.txs.clone(),
            &Trailer {
                data_hash: self.hash(),
                square_size: self.square_size,
            },
        )
    }
}

/// A block: header, data, and the commit for the previous block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub data: Data,
    pub last_commit: Option<Commit>,
}

impl Block {
    /// Computes any header hashes that are still empty.
    pub fn fill_header(&mut self) {
        if self.header.last_commit_hash.is_empty() {
            if let Some(commit) = &self.last_commit {
                self.header.last_commit_hash = commit.hash();
            }
        }
        if self.header.data_hash.is_empty() {
            self.header.data_hash = self.data.hash();
        }
    }

    /// Hash of the block (the hash of its header).
    pub fn hash(&self) -> Bytes {
        self.header.hash()
    }
}

/// Builds a block at `height` from a trailer-encoded transaction list, filling the header
/// hashes that can be computed from the block itself.
pub fn make_block(
    height: u64,
    txs: &TxsWithTrailer,
    last_commit: Option<Commit>,
) -> Result<Block, Error> {
    let data = Data::from_txs(txs)?;
    let mut block = Block {
        header: Header::new(height),
        data,
        last_commit,
    };
    block.fill_header();
    debug!(
        height,
        txs = block.data.txs.len(),
        square_size = block.data.square_size,
        "built block"
    );
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trailer::encode_trailer;

    fn txs() -> Vec<Tx> {
        vec![Bytes::from_static(b"tx1"), Bytes::from_static(b"tx2")]
    }

    #[test]
    fn test_make_block_uses_trailer() {
        let data_hash = Bytes::from_static(&[7; 32]);
        let encoded = encode_trailer(txs(), data_hash.clone(), 4);
        let block = make_block(3, &encoded, None).unwrap();
        assert_eq!(block.header.height, 3);
        assert_eq!(block.header.version.block, BLOCK_PROTOCOL);
        assert_eq!(block.data.txs, txs());
        assert_eq!(block.data.square_size, 4);
        assert_eq!(block.data.hash(), data_hash);
        assert_eq!(block.header.data_hash, data_hash);
        assert!(block.header.last_commit_hash.is_empty());
        assert_eq!(block.data.to_txs(), encoded);
    }

    #[test]
    fn test_make_block_empty() {
        let block = make_block(1, &TxsWithTrailer::default(), None).unwrap();
        assert!(block.data.txs.is_empty());
        assert_eq!(block.data.square_size, 0);
        assert_eq!(block.header.data_hash, sha256(std::iter::empty()));
    }

    #[test]
    fn test_make_block_rejects_incomplete_trailer() {
        let raw = TxsWithTrailer::from(vec![Bytes::from_static(b"tx")]);
        assert!(matches!(
            make_block(1, &raw, None),
            Err(Error::IncompleteTrailer)
        ));
    }

    #[test]
    fn test_make_block_last_commit_hash() {
        let commit = Commit {
            height: 1,
            round: 0,
            block_id: BlockId::default(),
            signatures: Vec::new(),
        };
        let encoded = encode_trailer(txs(), Bytes::from_static(b"hash"), 1);
        let block = make_block(2, &encoded, Some(commit.clone())).unwrap();
        assert_eq!(block.header.last_commit_hash, commit.hash());

        // The header hash covers the data hash
        let encoded = encode_trailer(txs(), Bytes::from_static(b"other"), 1);
        let other = make_block(2, &encoded, Some(commit)).unwrap();
        assert_ne!(block.hash(), other.hash());
    }
}
