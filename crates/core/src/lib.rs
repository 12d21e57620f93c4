//! Core types for Streaming Charts: ranked entries, the bounded top-K
//! aggregate and its fixed-width wire codec.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub type Identity = i64;
pub type Score = i64;

/// Group key of the global chart, alongside the per-genre charts.
pub const TOP_FIVE_KEY: &str = "all";

pub mod entry;
pub mod topk;
pub mod codec;
pub mod music;
pub mod articles;

pub use codec::{Codec, CodecError, TopKCodec, RECORD_WIDTH};
pub use entry::RankedEntry;
pub use topk::{TopFive, TopK};

/// Operation carried by the upstream feed for a single grouping key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeOp {
    /// Retract a previously delivered value.
    Remove,
    /// Upsert a new value.
    Add,
}

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Parses one record of a JSON-lines input feed.
pub fn decode_json_line<T: DeserializeOwned>(line: &str) -> Result<T, CoreError> {
    Ok(serde_json::from_str(line.trim())?)
}
