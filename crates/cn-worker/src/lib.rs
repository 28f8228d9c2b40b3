//! CryptoNight mining worker core.
//!
//! A [`Worker`] hosts a compute engine on its own OS thread. The host feeds
//! it `job`, `pause` and `close` messages through the bridge and receives
//! `result` (found shares), `hashrate` (windowed telemetry) and `error`
//! (rejected jobs) messages back through its callbacks. Hashing itself lives
//! in the `cn-hash` crate; this crate owns the control plane, validation,
//! the nonce search loop and the scratchpad lifecycle.

mod engine;
pub mod job;
pub mod message;
pub mod queue;
pub mod registry;
mod worker;

pub use job::{decode_target, Job, JobError};
pub use message::Message;
pub use queue::MessageQueue;
pub use worker::{Callbacks, Worker, WorkerError};

pub use cn_hash::{HASH_LEN, MAX_WAYS};

/// Smallest accepted block-header blob, in bytes.
pub const MIN_BLOB_LEN: usize = 76;
/// Exclusive upper bound on the blob length.
pub const MAX_BLOB_LEN: usize = 96;
/// Byte offset of the 32-bit little-endian nonce inside a blob.
pub const NONCE_OFFSET: usize = 39;
/// Byte offset of the 64-bit little-endian compare word inside a hash.
pub const RESULT_OFFSET: usize = 24;
/// Idle-poll sleep between inbound drains while no job is armed.
pub const IDLE_POLL_MS: u64 = 200;
/// Length of the hashrate reporting window.
pub const HASHRATE_WINDOW_MS: u64 = 60_000;
/// Round mask gating the clock sample (every 8th round).
pub const HASHRATE_SAMPLE_MASK: u64 = 0x7;
