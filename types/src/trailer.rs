//! Trailer carrying block data metadata at the end of a transaction list.
//!
//! A block's transaction list is extended with two reserved elements so the metadata can travel
//! through interfaces that only accept a list of transactions:
//!
//! ```text
//! [tx_0, tx_1, ..., tx_n-1, data_hash, square_size (u64, big-endian)]
//! ```
//!
//! An empty list carries no metadata. A list of one element is malformed.

use crate::Error;
use bytes::Bytes;
use commonware_codec::{DecodeExt, Encode};

/// An opaque transaction.
pub type Tx = Bytes;

/// Metadata stored in the last two elements of a [TxsWithTrailer].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trailer {
    /// Hash of the block data.
    pub data_hash: Bytes,
    /// Width of the data square.
    pub square_size: u64,
}

/// Result of decoding a [TxsWithTrailer].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Transactions without the trailer.
    pub txs: Vec<Tx>,
    /// Trailer metadata (default for an empty list).
    pub trailer: Trailer,
}

/// A transaction list whose last two elements may hold a [Trailer].
///
/// Kept distinct from `Vec<Tx>` so the trailer is not mistaken for (or reordered with)
/// ordinary transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxsWithTrailer(Vec<Bytes>);

impl TxsWithTrailer {
    /// Appends `trailer` to `txs`.
    pub fn encode(txs: Vec<Tx>, trailer: &Trailer) -> Self {
        let mut raw = txs;
        raw.reserve(2);
        raw.push(trailer.data_hash.clone());
        raw.push(trailer.square_size.encode().freeze());
        Self(raw)
    }

    /// Splits the list into transactions and trailer.
    pub fn decode(&self) -> Result<Decoded, Error> {
        let (square_size, rest) = match self.0.split_last() {
            None => return Ok(Decoded::default()),
            Some(split) => split,
        };
        let (data_hash, txs) = rest.split_last().ok_or(Error::IncompleteTrailer)?;
        let square_size = u64::decode(square_size.clone()).map_err(Error::InvalidSquareSize)?;
        Ok(Decoded {
            txs: txs.to_vec(),
            trailer: Trailer {
                data_hash: data_hash.clone(),
                square_size,
            },
        })
    }

    /// Raw elements, including the trailer.
    pub fn as_slice(&self) -> &[Bytes] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Bytes> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Bytes>> for TxsWithTrailer {
    /// Wraps raw elements without validating them (validation happens on decode).
    fn from(raw: Vec<Bytes>) -> Self {
        Self(raw)
    }
}

/// Appends `data_hash` and the big-endian `square_size` to `txs`.
pub fn encode_trailer(txs: Vec<Tx>, data_hash: Bytes, square_size: u64) -> TxsWithTrailer {
    TxsWithTrailer::encode(
        txs,
        &Trailer {
            data_hash,
            square_size,
        },
    )
}

/// Strips the trailer from `txs`, returning the transactions, data hash, and square size.
pub fn decode_trailer(txs: &TxsWithTrailer) -> Result<(Vec<Tx>, Bytes, u64), Error> {
    let Decoded { txs, trailer } = txs.decode()?;
    Ok((txs, trailer.data_hash, trailer.square_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_txs(rng: &mut StdRng, n: usize) -> Vec<Tx> {
        (0..n)
            .map(|_| {
                let len = rng.gen_range(0..64);
                let mut tx = vec![0u8; len];
                rng.fill(&mut tx[..]);
                Bytes::from(tx)
            })
            .collect()
    }

    #[test]
    fn test_round_trip() {
        let mut rng = StdRng::seed_from_u64(0);
        for n in [0, 1, 2, 17] {
            let txs = random_txs(&mut rng, n);
            let mut hash = [0u8; 32];
            rng.fill(&mut hash);
            let data_hash = Bytes::copy_from_slice(&hash);
            let square_size = rng.gen::<u64>();

            let encoded = encode_trailer(txs.clone(), data_hash.clone(), square_size);
            assert_eq!(encoded.len(), n + 2);
            let decoded = decode_trailer(&encoded).unwrap();
            assert_eq!(decoded, (txs, data_hash, square_size));
        }
    }

    #[test]
    fn test_square_size_big_endian() {
        let encoded = encode_trailer(Vec::new(), Bytes::from_static(b"hash"), 0x0102);
        assert_eq!(&encoded.as_slice()[1][..], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);

        let raw = TxsWithTrailer::from(vec![
            Bytes::from_static(b"tx"),
            Bytes::from_static(b"hash"),
            Bytes::from_static(&[0, 0, 0, 0, 0, 0, 0, 64]),
        ]);
        let decoded = raw.clone().decode().unwrap();
        assert_eq!(decoded.txs, vec![Bytes::from_static(b"tx")]);
        assert_eq!(decoded.trailer.data_hash, Bytes::from_static(b"hash"));
        assert_eq!(decoded.trailer.square_size, 64);

        // Raw elements keep the trailer
        let elements = raw.into_inner();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[1], Bytes::from_static(b"hash"));
    }

    #[test]
    fn test_empty_has_no_metadata() {
        let decoded = TxsWithTrailer::default().decode().unwrap();
        assert!(decoded.txs.is_empty());
        assert!(decoded.trailer.data_hash.is_empty());
        assert_eq!(decoded.trailer.square_size, 0);
    }

    #[test]
    fn test_single_element_is_incomplete() {
        let raw = TxsWithTrailer::from(vec![Bytes::from_static(&[0; 8])]);
        assert!(matches!(raw.decode(), Err(Error::IncompleteTrailer)));
    }

    #[test]
    fn test_malformed_square_size() {
        for len in [0, 1, 7, 9, 32] {
            let raw = TxsWithTrailer::from(vec![
                Bytes::from_static(b"hash"),
                Bytes::from(vec![1u8; len]),
            ]);
            assert!(matches!(raw.decode(), Err(Error::InvalidSquareSize(_))));
        }
    }

    #[test]
    fn test_empty_data_hash() {
        let encoded = encode_trailer(vec![Bytes::from_static(b"tx")], Bytes::new(), 4);
        let (txs, data_hash, square_size) = decode_trailer(&encoded).unwrap();
        assert_eq!(txs.len(), 1);
        assert!(data_hash.is_empty());
        assert_eq!(square_size, 4);
    }
}
