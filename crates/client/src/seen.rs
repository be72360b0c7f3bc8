// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded window of inbound message ids.

use std::collections::{HashSet, VecDeque};

use chatlink_core::MessageId;

/// FIFO ring of recently seen ids; the oldest id is forgotten once full.
#[derive(Debug)]
pub struct SeenIds {
    order: VecDeque<MessageId>,
    set: HashSet<MessageId>,
    capacity: usize,
}

impl SeenIds {
    /// Creates a window holding at most `capacity` ids (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SeenIds {
            order: VecDeque::with_capacity(capacity),
            set: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Records `id`; returns false if it was already in the window.
    pub fn insert(&mut self, id: MessageId) -> bool {
        if self.set.contains(&id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.set.insert(id.clone());
        self.order.push_back(id);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.set.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
