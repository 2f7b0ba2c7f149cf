//! Encoding and hashing helpers shared across types.

use bytes::{BufMut, Bytes};
use commonware_codec::{varint::UInt, EncodeSize, Write};
use commonware_cryptography::{Hasher, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes a varint length prefix followed by `bytes`.
pub(crate) fn write_bytes(bytes: &[u8], writer: &mut impl BufMut) {
    UInt(bytes.len() as u64).write(writer);
    writer.put_slice(bytes);
}

/// Size of `bytes` when written with [write_bytes].
pub(crate) fn bytes_encode_size(bytes: &[u8]) -> usize {
    UInt(bytes.len() as u64).encode_size() + bytes.len()
}

/// Milliseconds since the Unix epoch (timestamps before the epoch collapse to zero).
pub(crate) fn epoch_millis(time: &SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// SHA-256 over the concatenation of `parts`.
pub(crate) fn sha256<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Bytes {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    Bytes::copy_from_slice(&digest)
}
