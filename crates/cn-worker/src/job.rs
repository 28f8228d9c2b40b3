//! Job decoding and validation.
//!
//! A `job` message is either adopted whole or rejected whole: this module
//! parses every field into a [`Job`] before the engine touches any of its
//! own state, so a bad field can never leave a half-updated job behind.

use std::collections::HashMap;

use cn_hash::CnHash;
use thiserror::Error;

use crate::registry;
use crate::{MAX_BLOB_LEN, MIN_BLOB_LEN};

/// Why a `job` message was rejected. The display text is the wire-level
/// `error` message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("Unsupported algo")]
    UnsupportedAlgo,
    #[error("Bad blob length")]
    BadBlobLength,
    #[error("Bad blob hex")]
    BadBlobHex,
    #[error("Bad target hex")]
    BadTargetHex,
}

/// A validated mining job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub hash: CnHash,
    pub blob: Vec<u8>,
    pub target: u64,
}

impl Job {
    /// Parse and validate the fields of a `job` message.
    ///
    /// Missing fields degrade to empty/zero values and fail the matching
    /// validation step, so malformed messages are rejections, never panics.
    pub fn from_values(values: &HashMap<String, String>) -> Result<Job, JobError> {
        let algo = field(values, "algo");
        let soft_aes = field(values, "soft_aes").parse::<u32>().unwrap_or(0) != 0;
        let ways = field(values, "ways").parse::<usize>().unwrap_or(0);
        let hash = registry::lookup(algo, ways, soft_aes).ok_or(JobError::UnsupportedAlgo)?;

        let blob_hex = field(values, "blob_hex");
        let blob_len = blob_hex.len() / 2;
        if blob_hex.len() % 2 != 0 || blob_len < MIN_BLOB_LEN || blob_len >= MAX_BLOB_LEN {
            return Err(JobError::BadBlobLength);
        }
        let blob = hex::decode(blob_hex).map_err(|_| JobError::BadBlobHex)?;

        let target = decode_target(field(values, "target"))?;

        Ok(Job { hash, blob, target })
    }
}

fn field<'a>(values: &'a HashMap<String, String>, key: &str) -> &'a str {
    values.get(key).map(String::as_str).unwrap_or("")
}

/// Decode a 1..16 nibble pool target into the 64-bit compare bound.
///
/// Compact (≤ 8 nibble) targets are zero-extended to 8 nibbles, read as a
/// little-endian u32 and stretched over the full 64-bit range; wide targets
/// are read as a little-endian u64 directly. A zero target would declare
/// every hash a share and is rejected.
pub fn decode_target(target: &str) -> Result<u64, JobError> {
    if target.is_empty() || target.len() > 16 {
        return Err(JobError::BadTargetHex);
    }
    if target.len() <= 8 {
        let padded = format!("{target:0>8}");
        let bytes = hex::decode(&padded).map_err(|_| JobError::BadTargetHex)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes);
        let compact = u32::from_le_bytes(raw);
        if compact == 0 {
            return Err(JobError::BadTargetHex);
        }
        Ok(u64::MAX / (u64::from(u32::MAX) / u64::from(compact)))
    } else {
        let padded = format!("{target:0>16}");
        let bytes = hex::decode(&padded).map_err(|_| JobError::BadTargetHex)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes);
        let target = u64::from_le_bytes(raw);
        if target == 0 {
            return Err(JobError::BadTargetHex);
        }
        Ok(target)
    }
}
