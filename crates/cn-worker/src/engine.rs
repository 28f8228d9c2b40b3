//! The mining engine: a synchronous compute loop owning the job state,
//! nonce counter, hash buffers and scratchpad memory.
//!
//! The engine runs on a dedicated OS thread. Between hash rounds it drains
//! the inbound queue and applies control messages in arrival order; while a
//! job is armed it performs one multi-way hash round per iteration, emits a
//! `result` for every lane whose compare word beats the target, then refills
//! the lane nonces from a single monotonic counter.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cn_hash::{CnHash, Scratchpad};
use log::{debug, info, warn};

use crate::job::Job;
use crate::message::Message;
use crate::queue::MessageQueue;
use crate::worker::Signal;
use crate::{
    HASHRATE_SAMPLE_MASK, HASHRATE_WINDOW_MS, HASH_LEN, IDLE_POLL_MS, MAX_BLOB_LEN, MAX_WAYS,
    NONCE_OFFSET, RESULT_OFFSET,
};

pub(crate) struct Engine {
    inbound: Arc<MessageQueue<Message>>,
    outbound: Arc<MessageQueue<Message>>,
    signal: Arc<Signal>,

    /// Armed hash function; `None` while idle.
    hash: Option<CnHash>,
    scratchpads: Vec<Scratchpad>,
    ways: usize,
    mem: usize,

    /// `ways` back-to-back copies of the job blob, nonces spliced in place.
    input: [u8; MAX_WAYS * MAX_BLOB_LEN],
    blob_len: usize,
    output: [u8; MAX_WAYS * HASH_LEN],

    /// Next nonce to hand out; reset on every accepted job, wraps at 2^32.
    nonce: u32,
    target: u64,

    window_start: Option<Instant>,
    hash_count: u64,
}

impl Engine {
    pub(crate) fn new(
        inbound: Arc<MessageQueue<Message>>,
        outbound: Arc<MessageQueue<Message>>,
        signal: Arc<Signal>,
    ) -> Self {
        Engine {
            inbound,
            outbound,
            signal,
            hash: None,
            scratchpads: Vec::new(),
            ways: 0,
            mem: 0,
            input: [0; MAX_WAYS * MAX_BLOB_LEN],
            blob_len: 0,
            output: [0; MAX_WAYS * HASH_LEN],
            nonce: 0,
            target: 0,
            window_start: None,
            hash_count: 0,
        }
    }

    /// Main loop; returns only on `close`.
    pub(crate) fn run(mut self) {
        info!("mining engine started");
        let mut batch = VecDeque::new();
        loop {
            self.inbound.drain(&mut batch);
            while let Some(msg) = batch.pop_front() {
                match msg.name.as_str() {
                    "job" => self.apply_job(&msg.values),
                    "pause" => {
                        debug!("mining paused");
                        self.hash = None;
                    }
                    "close" => {
                        info!("mining engine closing");
                        self.scratchpads.clear();
                        return;
                    }
                    other => debug!("ignoring unknown message {:?}", other),
                }
            }
            match self.hash {
                Some(hash) => self.round(hash),
                None => thread::sleep(Duration::from_millis(IDLE_POLL_MS)),
            }
        }
    }

    /// Validate and adopt a `job` message, or emit an `error` and keep the
    /// current state untouched.
    fn apply_job(&mut self, values: &HashMap<String, String>) {
        let job = match Job::from_values(values) {
            Ok(job) => job,
            Err(err) => {
                warn!("job rejected: {}", err);
                self.emit(Message::with("error", "message", err.to_string()));
                return;
            }
        };

        let ways = job.hash.ways();
        let mem = job.hash.mem();
        if (ways, mem) != (self.ways, self.mem) {
            debug!("allocating {} scratchpads of {} bytes", ways, mem);
            self.scratchpads.clear();
            self.scratchpads.extend((0..ways).map(|_| Scratchpad::new(mem)));
            self.ways = ways;
            self.mem = mem;
        }

        self.blob_len = job.blob.len();
        self.target = job.target;
        self.nonce = 0;
        for way in 0..ways {
            let start = way * self.blob_len;
            self.input[start..start + self.blob_len].copy_from_slice(&job.blob);
            self.set_nonce(way, self.nonce);
            self.nonce = self.nonce.wrapping_add(1);
        }

        // A different specialization restarts the rate window.
        if self.hash != Some(job.hash) {
            self.window_start = None;
            self.hash_count = 0;
        }
        self.hash = Some(job.hash);
        info!(
            "mining {:?}/{:?} ways={} blob_len={} target={:#018x}",
            job.hash.family(),
            job.hash.variant(),
            ways,
            self.blob_len,
            self.target
        );
    }

    /// One hash round: telemetry sample, `ways` hashes, share checks, refill.
    fn round(&mut self, hash: CnHash) {
        if self.hash_count & HASHRATE_SAMPLE_MASK == 0 {
            self.sample_hashrate();
        }

        hash.hash(
            &self.input[..self.ways * self.blob_len],
            self.blob_len,
            &mut self.output[..self.ways * HASH_LEN],
            &mut self.scratchpads,
        );

        for way in 0..self.ways {
            let word = way * HASH_LEN + RESULT_OFFSET;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&self.output[word..word + 8]);
            if u64::from_le_bytes(raw) < self.target {
                // report the nonce that produced this hash, then refill
                let nonce = self.get_nonce(way);
                debug!("share found: way={} nonce={}", way, nonce);
                self.emit(Message::with("result", "nonce", nonce.to_string()));
            }
            self.set_nonce(way, self.nonce);
            self.nonce = self.nonce.wrapping_add(1);
        }
        self.hash_count += 1;
    }

    /// Clock sampling is amortized to every 8th round; a window longer than
    /// 60 s flushes one `hashrate` message and restarts.
    fn sample_hashrate(&mut self) {
        let now = Instant::now();
        match self.window_start {
            None => {
                self.window_start = Some(now);
                self.hash_count = 0;
            }
            Some(start) => {
                let elapsed_ms = now.duration_since(start).as_millis() as u64;
                if elapsed_ms > HASHRATE_WINDOW_MS {
                    let rate = windowed_rate(self.ways, self.hash_count, elapsed_ms);
                    debug!("hashrate {:.2} H/s over {} ms", rate, elapsed_ms);
                    self.emit(Message::with("hashrate", "hashrate", format!("{rate}")));
                    self.window_start = Some(now);
                    self.hash_count = 0;
                }
            }
        }
    }

    fn emit(&self, msg: Message) {
        self.outbound.write(msg);
        self.signal.raise();
    }

    fn set_nonce(&mut self, way: usize, nonce: u32) {
        let off = way * self.blob_len + NONCE_OFFSET;
        self.input[off..off + 4].copy_from_slice(&nonce.to_le_bytes());
    }

    fn get_nonce(&self, way: usize) -> u32 {
        let off = way * self.blob_len + NONCE_OFFSET;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.input[off..off + 4]);
        u32::from_le_bytes(raw)
    }
}

/// Hashes per second over a window: `ways` lanes per round.
pub(crate) fn windowed_rate(ways: usize, rounds: u64, elapsed_ms: u64) -> f64 {
    ways as f64 * rounds as f64 / elapsed_ms as f64 * 1000.0
}
