//! The control-plane bridge.
//!
//! A [`Worker`] owns the engine thread and a dispatch thread standing in for
//! the host's event loop. Control messages go in through [`Worker::send`];
//! everything the engine emits is drained on the dispatch thread and handed
//! to the host callbacks in order. When the engine thread exits,
//! `on_complete` fires after a final drain; if it aborted, `on_error` fires
//! with a description instead.

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use log::error;
use thiserror::Error;

use crate::engine::Engine;
use crate::message::Message;
use crate::queue::MessageQueue;

/// Errors surfaced synchronously to the host.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("message name must not be empty")]
    EmptyMessageName,
    #[error("worker is closed")]
    Closed,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Host-side sinks for engine output.
pub struct Callbacks {
    /// Called once per outbound message, in emission order.
    pub on_data: Box<dyn FnMut(&str, &HashMap<String, String>) + Send>,
    /// Called exactly once after the engine exits cleanly.
    pub on_complete: Box<dyn FnOnce() + Send>,
    /// Called instead of `on_complete` if the engine aborts.
    pub on_error: Box<dyn FnOnce(&str) + Send>,
}

/// Wake flag between the engine and the dispatch thread.
///
/// Raised after every outbound write and once at engine exit; one wake may
/// cover any number of pending messages.
pub(crate) struct Signal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Signal {
            raised: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn raise(&self) {
        let mut raised = self.raised.lock().unwrap_or_else(|e| e.into_inner());
        *raised = true;
        drop(raised);
        self.cond.notify_one();
    }

    pub(crate) fn wait(&self) {
        let mut raised = self.raised.lock().unwrap_or_else(|e| e.into_inner());
        while !*raised {
            raised = self.cond.wait(raised).unwrap_or_else(|e| e.into_inner());
        }
        *raised = false;
    }
}

/// Handle to a running mining worker.
pub struct Worker {
    inbound: Arc<MessageQueue<Message>>,
    finished: Arc<AtomicBool>,
    dispatch: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the engine and dispatch threads.
    pub fn start(callbacks: Callbacks) -> Result<Worker, WorkerError> {
        let inbound = Arc::new(MessageQueue::new());
        let outbound = Arc::new(MessageQueue::new());
        let signal = Arc::new(Signal::new());
        let finished = Arc::new(AtomicBool::new(false));

        let engine = Engine::new(
            Arc::clone(&inbound),
            Arc::clone(&outbound),
            Arc::clone(&signal),
        );

        let engine_handle = {
            let finished = Arc::clone(&finished);
            let signal = Arc::clone(&signal);
            thread::Builder::new()
                .name("cn-engine".into())
                .spawn(move || {
                    let result = catch_unwind(AssertUnwindSafe(|| engine.run()));
                    finished.store(true, Ordering::SeqCst);
                    signal.raise();
                    if let Err(panic) = result {
                        resume_unwind(panic);
                    }
                })?
        };

        let dispatch_handle = {
            let outbound = Arc::clone(&outbound);
            let signal = Arc::clone(&signal);
            let finished = Arc::clone(&finished);
            let spawned = thread::Builder::new()
                .name("cn-dispatch".into())
                .spawn(move || dispatch_loop(engine_handle, outbound, signal, finished, callbacks));
            match spawned {
                Ok(handle) => handle,
                Err(err) => {
                    // tear the engine down again before reporting
                    inbound.write(Message::new("close"));
                    return Err(WorkerError::Spawn(err));
                }
            }
        };

        Ok(Worker {
            inbound,
            finished,
            dispatch: Some(dispatch_handle),
        })
    }

    /// Enqueue a control message. Non-blocking and thread-safe.
    pub fn send(&self, name: &str, values: HashMap<String, String>) -> Result<(), WorkerError> {
        if name.is_empty() {
            return Err(WorkerError::EmptyMessageName);
        }
        if self.finished.load(Ordering::SeqCst) {
            return Err(WorkerError::Closed);
        }
        self.inbound.write(Message {
            name: name.to_string(),
            values,
        });
        Ok(())
    }

    /// Ask the engine to terminate.
    pub fn close(&self) -> Result<(), WorkerError> {
        self.send("close", HashMap::new())
    }

    /// Whether the engine thread has exited.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Wait for the engine and dispatch threads; the completion callback has
    /// fired by the time this returns.
    pub fn join(mut self) {
        if let Some(handle) = self.dispatch.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(handle) = self.dispatch.take() {
            let _ = self.close();
            let _ = handle.join();
        }
    }
}

fn dispatch_loop(
    engine: JoinHandle<()>,
    outbound: Arc<MessageQueue<Message>>,
    signal: Arc<Signal>,
    finished: Arc<AtomicBool>,
    mut callbacks: Callbacks,
) {
    let mut batch = VecDeque::new();
    loop {
        signal.wait();
        outbound.drain(&mut batch);
        while let Some(msg) = batch.pop_front() {
            (callbacks.on_data)(&msg.name, &msg.values);
        }
        if finished.load(Ordering::SeqCst) {
            break;
        }
    }

    // the engine may have emitted between our last drain and its exit
    outbound.drain(&mut batch);
    while let Some(msg) = batch.pop_front() {
        (callbacks.on_data)(&msg.name, &msg.values);
    }

    match engine.join() {
        Ok(()) => (callbacks.on_complete)(),
        Err(panic) => {
            let text = panic_text(panic.as_ref());
            error!("engine thread aborted: {}", text);
            (callbacks.on_error)(&text);
        }
    }
}

fn panic_text(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "engine thread panicked".to_string()
    }
}
