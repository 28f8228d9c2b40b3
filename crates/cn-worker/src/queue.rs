//! Thread-safe FIFO queues linking the engine thread to the host.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// An unbounded multi-producer queue with a blocking read and a
/// non-blocking bulk drain.
///
/// Writes never block and are strictly FIFO per producer. Nothing is ever
/// dropped; the queue grows as needed.
pub struct MessageQueue<T> {
    buffer: Mutex<VecDeque<T>>,
    ready: Condvar,
}

impl<T> MessageQueue<T> {
    pub fn new() -> Self {
        MessageQueue {
            buffer: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    /// Append one item and wake a blocked reader.
    pub fn write(&self, item: T) {
        let mut buf = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buf.push_back(item);
        drop(buf);
        self.ready.notify_one();
    }

    /// Block until the queue is non-empty, then pop the head.
    pub fn read(&self) -> T {
        let mut buf = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(item) = buf.pop_front() {
                return item;
            }
            buf = self.ready.wait(buf).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Atomically move everything buffered into `out`. Never blocks.
    pub fn drain(&self, out: &mut VecDeque<T>) {
        let mut buf = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        out.append(&mut buf);
    }

    pub fn is_empty(&self) -> bool {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn preserves_fifo_order() {
        let q = MessageQueue::new();
        for i in 0..10 {
            q.write(i);
        }
        for i in 0..10 {
            assert_eq!(q.read(), i);
        }
    }

    #[test]
    fn drain_moves_everything_at_once() {
        let q = MessageQueue::new();
        q.write("a");
        q.write("b");
        let mut out = VecDeque::new();
        q.drain(&mut out);
        assert_eq!(out, VecDeque::from(["a", "b"]));
        assert!(q.is_empty());

        // draining an empty queue is a no-op
        q.drain(&mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn drain_appends_after_existing_items() {
        let q = MessageQueue::new();
        q.write(3);
        let mut out = VecDeque::from([1, 2]);
        q.drain(&mut out);
        assert_eq!(out, VecDeque::from([1, 2, 3]));
    }

    #[test]
    fn read_blocks_until_write() {
        let q = Arc::new(MessageQueue::new());
        let writer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                q.write(7u32);
            })
        };
        assert_eq!(q.read(), 7);
        writer.join().unwrap();
    }

    #[test]
    fn order_is_stable_per_producer() {
        let q = Arc::new(MessageQueue::new());
        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                for i in 0..100u32 {
                    q.write(i);
                }
            })
        };
        producer.join().unwrap();
        let mut out = VecDeque::new();
        q.drain(&mut out);
        assert_eq!(out.len(), 100);
        assert!(out.iter().zip(out.iter().skip(1)).all(|(a, b)| a < b));
    }
}
