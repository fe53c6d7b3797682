//! Per-worker delivery queue.
//!
//! Producers on any thread prepend packets under a single mutex; the owning
//! worker detaches the whole list in one locked operation and walks it
//! without holding the lock. Because producers prepend, a detached
//! [`Batch`] yields the most recently pushed packet first.

use std::sync::{Mutex, MutexGuard};

use super::Packet;

struct Link {
    packet: Packet,
    next: Option<Box<Link>>,
}

/// Mutex-guarded intrusive stack of pending packets.
#[derive(Default)]
pub struct WorkerQueue {
    head: Mutex<Option<Box<Link>>>,
}

impl WorkerQueue {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<Link>>> {
        match self.head.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Prepend `packet`. Safe to call from any thread.
    pub fn push(&self, packet: Packet) {
        let mut head = self.lock();
        let next = head.take();
        *head = Some(Box::new(Link { packet, next }));
    }

    /// Atomically detach every pending packet.
    #[must_use]
    pub fn take_all(&self) -> Batch {
        Batch {
            head: self.lock().take(),
        }
    }

    /// Returns `true` when no packet is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock().is_none() }
}

impl Drop for WorkerQueue {
    fn drop(&mut self) {
        let head = match self.head.get_mut() {
            Ok(head) => head.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(Batch { head });
    }
}

impl std::fmt::Debug for WorkerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerQueue")
            .field("empty", &self.is_empty())
            .finish()
    }
}

/// Packets detached from a [`WorkerQueue`], newest first.
///
/// Each packet is handed out by value, so it is released as soon as the
/// caller drops it.
#[derive(Default)]
pub struct Batch {
    head: Option<Box<Link>>,
}

impl Batch {
    /// Returns `true` when the batch holds no packets.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.head.is_none() }
}

impl Iterator for Batch {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        let link = self.head.take()?;
        let Link { packet, next } = *link;
        self.head = next;
        Some(packet)
    }
}

impl Drop for Batch {
    // Unlink iteratively so a long list cannot overflow the stack.
    fn drop(&mut self) { for _packet in self.by_ref() {} }
}
