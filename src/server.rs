//! Server identifiers and the fixed-capacity server pool.
//!
//! The pool hands out servers in FIFO order over its free list: initially
//! `S1..=SN` in ascending order, and released servers rejoin at the back.

use std::collections::{BTreeSet, VecDeque};

use crate::error::{SimError, SimResult};

/// Identifier of one server (channel) in the pool. Numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerId(u32);

impl ServerId {
    /// Create a server ID from a raw integer.
    #[inline]
    pub fn new(id: u32) -> Self {
        ServerId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// A fixed pool of `capacity` servers, each either free or busy.
///
/// Invariant: `free ∩ busy = ∅` and `free.len() + busy.len() == capacity`.
#[derive(Debug, Clone)]
pub struct ServerPool {
    capacity: usize,
    free: VecDeque<ServerId>,
    busy: BTreeSet<ServerId>,
}

impl ServerPool {
    /// Create a pool with servers `S1..=S{capacity}`, all free.
    ///
    /// A zero-capacity pool is valid and blocks every arrival.
    pub fn new(capacity: u32) -> Self {
        ServerPool {
            capacity: capacity as usize,
            free: (1..=capacity).map(ServerId).collect(),
            busy: BTreeSet::new(),
        }
    }

    /// Take the oldest free server and mark it busy.
    pub fn allocate(&mut self) -> SimResult<ServerId> {
        let id = self.free.pop_front().ok_or(SimError::CapacityExhausted)?;
        self.busy.insert(id);
        Ok(id)
    }

    /// Return a busy server to the back of the free list.
    pub fn deallocate(&mut self, id: ServerId) -> SimResult<()> {
        if !self.busy.remove(&id) {
            return Err(SimError::UnknownServer(id));
        }
        self.free.push_back(id);
        Ok(())
    }

    /// Returns `true` if at least one server is free.
    pub fn is_free(&self) -> bool {
        !self.free.is_empty()
    }

    /// Number of free servers.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of busy servers.
    pub fn busy_count(&self) -> usize {
        self.busy.len()
    }

    /// Total number of servers.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if `id` is currently serving a call.
    pub fn is_busy(&self, id: ServerId) -> bool {
        self.busy.contains(&id)
    }
}
