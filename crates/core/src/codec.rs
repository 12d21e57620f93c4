//! Fixed-width binary encoding of a top-K chart.
//!
//! A chart is written as its ranking, highest rank first, one 16-byte record
//! per entry: `identity` then `score`, each a big-endian `i64`. There is no
//! header; the entry count is `len / 16`. An empty chart encodes to zero
//! bytes, while an absent or zero-length value decodes to `None`, meaning
//! "not computed yet".

use std::marker::PhantomData;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{RankedEntry, TopK};

/// Bytes per encoded entry.
pub const RECORD_WIDTH: usize = 16;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("corrupt encoding: {len} bytes is not a multiple of the {record_width}-byte record width")]
    CorruptEncoding { len: usize, record_width: usize },
}

/// Serialization of a value crossing a storage or network boundary.
pub trait Codec {
    type Value;

    fn encode(&self, value: &Self::Value) -> Bytes;

    /// `None` input, or an empty slice, yields `Ok(None)`.
    fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<Self::Value>, CodecError>;
}

/// The [`Codec`] for [`TopK`] charts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopKCodec<const K: usize> {
    _chart: PhantomData<TopK<K>>,
}

impl<const K: usize> TopKCodec<K> {
    pub const fn new() -> Self {
        Self { _chart: PhantomData }
    }
}

impl<const K: usize> Codec for TopKCodec<K> {
    type Value = TopK<K>;

    fn encode(&self, value: &TopK<K>) -> Bytes {
        let mut buf = BytesMut::with_capacity(value.len() * RECORD_WIDTH);
        for entry in value {
            buf.put_i64(entry.identity);
            buf.put_i64(entry.score);
        }
        buf.freeze()
    }

    fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<TopK<K>>, CodecError> {
        let mut buf = match bytes {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Ok(None),
        };
        if buf.len() % RECORD_WIDTH != 0 {
            return Err(CodecError::CorruptEncoding {
                len: buf.len(),
                record_width: RECORD_WIDTH,
            });
        }

        let mut chart = TopK::new();
        while buf.has_remaining() {
            let identity = buf.get_i64();
            let score = buf.get_i64();
            chart.add(RankedEntry::new(identity, score));
        }
        Ok(Some(chart))
    }
}
