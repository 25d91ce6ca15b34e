// src/buffers.rs
//
// Temporal primitives shared by the monitors: a circular persistence
// buffer for debouncing noisy booleans, a string-keyed cooldown tracker
// and a class-label smoothing buffer with majority vote.

use indexmap::IndexMap;
use std::collections::HashMap;

/// Fixed-capacity circular buffer of booleans.
///
/// The `filled` flag latches true the first time the write index wraps and
/// stays true until [`reset`](Self::reset). Until then only the slots
/// written so far count as valid.
#[derive(Debug, Clone)]
pub struct PersistenceBuffer {
    buffer: Vec<bool>,
    max_size: usize,
    index: usize,
    filled: bool,
}

impl PersistenceBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            buffer: vec![false; size],
            max_size: size,
            index: 0,
            filled: false,
        }
    }

    /// Push a value, overwriting the oldest slot once full.
    pub fn push(&mut self, value: bool) {
        self.buffer[self.index] = value;
        self.index = (self.index + 1) % self.max_size;
        if self.index == 0 {
            self.filled = true;
        }
    }

    /// Number of true values among the valid slots.
    pub fn count(&self) -> usize {
        let length = if self.filled { self.max_size } else { self.index };
        self.buffer[..length].iter().filter(|&&v| v).count()
    }

    pub fn is_full(&self) -> bool {
        self.filled
    }

    /// Valid slots in chronological order, oldest first.
    pub fn ordered(&self) -> Vec<bool> {
        if self.filled {
            let mut out = Vec::with_capacity(self.max_size);
            out.extend_from_slice(&self.buffer[self.index..]);
            out.extend_from_slice(&self.buffer[..self.index]);
            out
        } else {
            self.buffer[..self.index].to_vec()
        }
    }

    /// Number of valid slots.
    pub fn len(&self) -> usize {
        if self.filled {
            self.max_size
        } else {
            self.index
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn reset(&mut self) {
        self.buffer.fill(false);
        self.index = 0;
        self.filled = false;
    }
}

/// String-keyed cooldown tracker for suppressing repeated alerts.
#[derive(Debug, Clone, Default)]
pub struct CooldownTracker {
    cooldowns: HashMap<String, f64>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on_cooldown(&self, key: &str, now: f64) -> bool {
        match self.cooldowns.get(key) {
            Some(&expiry) => now < expiry,
            None => false,
        }
    }

    pub fn set_cooldown(&mut self, key: &str, now: f64, duration: f64) {
        self.cooldowns.insert(key.to_string(), now + duration);
    }

    /// Remaining time until expiry; 0 once expired or for unknown keys.
    pub fn remaining(&self, key: &str, now: f64) -> f64 {
        match self.cooldowns.get(key) {
            Some(&expiry) => (expiry - now).max(0.0),
            None => 0.0,
        }
    }

    /// Drop every entry whose expiry has passed.
    pub fn clear_expired(&mut self, now: f64) {
        self.cooldowns.retain(|_, &mut expiry| now < expiry);
    }

    pub fn reset(&mut self) {
        self.cooldowns.clear();
    }
}

/// Fixed-capacity circular buffer of class labels with majority vote.
///
/// Ties break to whichever label was inserted first among the tied ones,
/// so the tally has to run over an insertion-ordered map.
#[derive(Debug, Clone)]
pub struct ClassSmoothingBuffer {
    buffer: Vec<String>,
    max_size: usize,
    index: usize,
    filled: bool,
}

impl ClassSmoothingBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            buffer: vec![String::new(); size],
            max_size: size,
            index: 0,
            filled: false,
        }
    }

    pub fn push(&mut self, cls: &str) {
        self.buffer[self.index] = cls.to_string();
        self.index = (self.index + 1) % self.max_size;
        if self.index == 0 {
            self.filled = true;
        }
    }

    /// Label with the highest count among the valid slots; empty string
    /// for an empty buffer. Empty labels are never tallied.
    pub fn majority_class(&self) -> String {
        let length = if self.filled { self.max_size } else { self.index };

        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for cls in &self.buffer[..length] {
            if !cls.is_empty() {
                *counts.entry(cls.as_str()).or_insert(0) += 1;
            }
        }

        let mut max_count = 0;
        let mut majority = "";
        for (&cls, &count) in &counts {
            if count > max_count {
                max_count = count;
                majority = cls;
            }
        }

        majority.to_string()
    }

    pub fn reset(&mut self) {
        for slot in &mut self.buffer {
            slot.clear();
        }
        self.index = 0;
        self.filled = false;
    }
}
