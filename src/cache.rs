//! Caches that shortcut repeated decompression: a single-slot MRU cache
//! for the last decompressed key block (used by prefix scans), and an
//! MRU cache for decompressed record blocks keyed by block number.

use std::collections::HashMap;

/// Single-slot cache for the last decompressed key block, keyed by its
/// first word. Mutation is serialized by `Dictionary` holding it behind
/// `&mut self`; concurrent access across distinct `Dictionary` instances
/// is the caller's responsibility.
pub(crate) struct KeyBlockCache {
    slot: Option<(String, Vec<u8>)>,
}

impl KeyBlockCache {
    pub fn new() -> Self {
        KeyBlockCache { slot: None }
    }

    pub fn get(&self, first_word: &str) -> Option<&[u8]> {
        match &self.slot {
            Some((key, data)) if key == first_word => Some(data.as_slice()),
            _ => None,
        }
    }

    pub fn put(&mut self, first_word: String, data: Vec<u8>) {
        self.slot = Some((first_word, data));
    }
}

impl Default for KeyBlockCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded MRU cache of decompressed record blocks, keyed by block
/// number. A fixed capacity keeps repeated lookups into the same block
/// cheap without holding the whole record section in memory.
pub(crate) struct RecordBlockCache {
    capacity: usize,
    entries: HashMap<usize, Vec<u8>>,
    /// Recency order, most-recent last; used to evict when over capacity.
    order: Vec<usize>,
}

impl RecordBlockCache {
    pub fn new(capacity: usize) -> Self {
        RecordBlockCache { capacity: capacity.max(1), entries: HashMap::new(), order: Vec::new() }
    }

    pub fn get(&mut self, block_no: usize) -> Option<&[u8]> {
        if self.entries.contains_key(&block_no) {
            self.touch(block_no);
            self.entries.get(&block_no).map(Vec::as_slice)
        } else {
            None
        }
    }

    pub fn put(&mut self, block_no: usize, data: Vec<u8>) {
        if !self.entries.contains_key(&block_no) && self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.first().copied() {
                self.entries.remove(&oldest);
                self.order.remove(0);
            }
        }
        self.entries.insert(block_no, data);
        self.touch(block_no);
    }

    fn touch(&mut self, block_no: usize) {
        self.order.retain(|b| *b != block_no);
        self.order.push(block_no);
    }
}
