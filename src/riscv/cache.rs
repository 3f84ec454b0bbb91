//! Configurable cache simulator sitting in front of main memory. The cache
//! tracks hits and misses only; data always lives in memory.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::sink::{BlockState, ChangeEvent, SharedSink};
use crate::utils::{is_power_of_two, log2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacePolicy {
    Lru,
    Fifo,
    Rand,
}

/// Small deterministic generator for the RAND policy. Seeded once so a
/// pinned seed reproduces a run exactly.
#[derive(Debug, Clone)]
struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    fn new(seed: u32) -> Self {
        XorShift32 { state: if seed == 0 { 0x9e37_79b9 } else { seed } }
    }

    fn next(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() as usize) % n
    }
}

#[derive(Debug, Clone, Copy)]
struct Block {
    valid: bool,
    tag: u32,
    age: u64,
}

impl Block {
    fn new() -> Self {
        Block { valid: false, tag: 0, age: 0 }
    }

    fn reset(&mut self) {
        *self = Block::new();
    }
}

#[derive(Debug, Clone)]
struct CacheSet {
    set: usize,
    size: usize,
    policy: ReplacePolicy,
    blocks: Vec<Block>,
    fifo: Vec<usize>,
}

impl CacheSet {
    fn new(set: usize, size: usize, policy: ReplacePolicy) -> Self {
        CacheSet { set, size, policy, blocks: vec![Block::new(); size], fifo: Vec::new() }
    }

    /// Simulates a read of one byte-address mapped to this set. Fills the
    /// victim block on a miss.
    fn load(&mut self, tag: u32, hits: &mut HashSet<usize>, misses: &mut HashSet<usize>, rng: &mut XorShift32) -> bool {
        for i in 0..self.size {
            let block = &mut self.blocks[i];
            if block.valid && block.tag == tag {
                if self.policy == ReplacePolicy::Lru {
                    block.age += 1;
                }
                hits.insert(i + self.set * self.size);
                return true;
            }
        }
        let index = self.evict(true, rng);
        let block = &mut self.blocks[index];
        block.tag = tag;
        block.valid = true;
        block.age = 1;
        misses.insert(index + self.set * self.size);
        false
    }

    /// Simulates a write. Misses pick a victim for display but do not
    /// allocate, and never rotate the replacement queue.
    fn write(&mut self, tag: u32, hits: &mut HashSet<usize>, misses: &mut HashSet<usize>, rng: &mut XorShift32) -> bool {
        for i in 0..self.size {
            let block = &mut self.blocks[i];
            if block.valid && block.tag == tag {
                if self.policy == ReplacePolicy::Lru {
                    block.age += 1;
                }
                hits.insert(i + self.set * self.size);
                return true;
            }
        }
        let index = self.evict(false, rng);
        misses.insert(index + self.set * self.size);
        false
    }

    fn evict(&mut self, read: bool, rng: &mut XorShift32) -> usize {
        // invalid blocks fill first
        for i in 0..self.size {
            if !self.blocks[i].valid {
                if self.policy == ReplacePolicy::Fifo {
                    self.fifo.push(i);
                }
                return i;
            }
        }
        match self.policy {
            ReplacePolicy::Lru => {
                let mut index = 0;
                for i in 1..self.size {
                    if self.blocks[i].age < self.blocks[index].age {
                        index = i;
                    }
                }
                index
            }
            ReplacePolicy::Fifo => {
                let index = self.fifo[0];
                if read {
                    self.fifo.remove(0);
                    self.fifo.push(index);
                }
                index
            }
            ReplacePolicy::Rand => {
                if self.fifo.is_empty() {
                    let victim = rng.below(self.size);
                    self.fifo.push(victim);
                }
                let index = self.fifo[0];
                if read {
                    self.fifo.remove(0);
                }
                index
            }
        }
    }

    fn reset(&mut self) {
        self.fifo.clear();
        for block in &mut self.blocks {
            block.reset();
        }
    }
}

/// Snapshot of the whole cache, captured lazily at the first access of a
/// step and restored on back-step.
#[derive(Debug, Clone)]
pub struct CacheBackup {
    hits: u32,
    accesses: u32,
    sets: Vec<CacheSet>,
    state: Vec<BlockState>,
}

pub struct Cache {
    associativity: usize,
    block_size: usize,
    num_blocks: usize,
    policy: ReplacePolicy,
    tag_shamt: u32,
    index_shamt: u32,
    accesses: u32,
    hits: u32,
    sets: Vec<CacheSet>,
    state: Vec<BlockState>,
    diff: Option<CacheBackup>,
    hit_marks: HashSet<usize>,
    miss_marks: HashSet<usize>,
    rng: XorShift32,
    sink: Option<SharedSink>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("associativity", &self.associativity)
            .field("block_size", &self.block_size)
            .field("num_blocks", &self.num_blocks)
            .field("policy", &self.policy)
            .field("tag_shamt", &self.tag_shamt)
            .field("index_shamt", &self.index_shamt)
            .field("accesses", &self.accesses)
            .field("hits", &self.hits)
            .field("sets", &self.sets)
            .field("state", &self.state)
            .field("diff", &self.diff)
            .field("hit_marks", &self.hit_marks)
            .field("miss_marks", &self.miss_marks)
            .field("rng", &self.rng)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Cache {
    pub fn new(block_size: usize, num_blocks: usize, associativity: usize, policy: ReplacePolicy) -> Self {
        let mut cache = Cache {
            associativity,
            block_size,
            num_blocks,
            policy,
            tag_shamt: 0,
            index_shamt: 0,
            accesses: 0,
            hits: 0,
            sets: Vec::new(),
            state: Vec::new(),
            diff: None,
            hit_marks: HashSet::new(),
            miss_marks: HashSet::new(),
            rng: XorShift32::new(0x9e37_79b9),
            sink: None,
        };
        cache.organize();
        cache
    }

    pub fn set_sink(&mut self, sink: SharedSink) {
        self.sink = Some(sink);
    }

    /// Reseeds the RAND replacement generator; a fixed seed makes RAND
    /// runs reproducible.
    pub fn seed_rng(&mut self, seed: u32) {
        self.rng = XorShift32::new(seed);
    }

    // ---------- reconfiguration ----------

    /// Applies a whole geometry at once. Every parameter must be a power
    /// of two and `associativity <= num_blocks`.
    pub fn configure(
        &mut self,
        block_size: usize,
        num_blocks: usize,
        associativity: usize,
        policy: ReplacePolicy,
    ) -> bool {
        if !is_power_of_two(block_size)
            || !is_power_of_two(num_blocks)
            || !is_power_of_two(associativity)
            || associativity > num_blocks
        {
            return false;
        }
        self.block_size = block_size;
        self.num_blocks = num_blocks;
        self.associativity = associativity;
        self.policy = policy;
        self.organize();
        true
    }

    pub fn set_block_size(&mut self, n: usize) -> bool {
        if is_power_of_two(n) {
            self.block_size = n;
            self.organize();
            return true;
        }
        false
    }

    pub fn set_num_blocks(&mut self, n: usize) -> bool {
        if is_power_of_two(n) && self.associativity <= n {
            self.num_blocks = n;
            self.organize();
            return true;
        }
        false
    }

    pub fn set_associativity(&mut self, n: usize) -> bool {
        if is_power_of_two(n) && n <= self.num_blocks {
            self.associativity = n;
            self.organize();
            return true;
        }
        false
    }

    pub fn set_policy(&mut self, policy: ReplacePolicy) {
        self.policy = policy;
        self.organize();
    }

    // ---------- accesses ----------

    pub fn load_byte(&mut self, address: u32) {
        let hit = self.read(address);
        if hit {
            self.hits += 1;
        }
        self.accesses += 1;
        self.publish();
    }

    pub fn load_half(&mut self, address: u32) {
        let b0 = self.read(address);
        let b1 = self.read(address.wrapping_add(1));
        if b0 && b1 {
            self.hits += 1;
        }
        self.accesses += 1;
        self.publish();
    }

    pub fn load_word(&mut self, address: u32) {
        let b0 = self.read(address);
        let b1 = self.read(address.wrapping_add(1));
        let b2 = self.read(address.wrapping_add(2));
        let b3 = self.read(address.wrapping_add(3));
        if b0 && b1 && b2 && b3 {
            self.hits += 1;
        }
        self.accesses += 1;
        self.publish();
    }

    pub fn store_byte(&mut self, address: u32) {
        let hit = self.write(address);
        if hit {
            self.hits += 1;
        }
        self.accesses += 1;
        self.publish();
    }

    pub fn store_half(&mut self, address: u32) {
        let b0 = self.write(address);
        let b1 = self.write(address.wrapping_add(1));
        if b0 && b1 {
            self.hits += 1;
        }
        self.accesses += 1;
        self.publish();
    }

    pub fn store_word(&mut self, address: u32) {
        let b0 = self.write(address);
        let b1 = self.write(address.wrapping_add(1));
        let b2 = self.write(address.wrapping_add(2));
        let b3 = self.write(address.wrapping_add(3));
        if b0 && b1 && b2 && b3 {
            self.hits += 1;
        }
        self.accesses += 1;
        self.publish();
    }

    // ---------- history integration ----------

    /// Takes the pending snapshot, if any access happened since the last
    /// call.
    pub fn take_diff(&mut self) -> Option<CacheBackup> {
        self.diff.take()
    }

    pub fn restore(&mut self, backup: CacheBackup) {
        self.hits = backup.hits;
        self.accesses = backup.accesses;
        self.sets = backup.sets;
        self.state = backup.state;
        if let Some(sink) = &self.sink {
            for (i, st) in self.state.iter().enumerate() {
                sink.on_change(ChangeEvent::CacheBlockState { index: i, state: *st });
            }
        }
    }

    pub fn reset(&mut self) {
        self.hits = 0;
        self.accesses = 0;
        self.diff = None;
        self.hit_marks.clear();
        self.miss_marks.clear();
        for set in &mut self.sets {
            set.reset();
        }
        for st in &mut self.state {
            *st = BlockState::Empty;
        }
        if let Some(sink) = &self.sink {
            for i in 0..self.num_blocks {
                sink.on_change(ChangeEvent::CacheBlockState { index: i, state: BlockState::Empty });
            }
        }
    }

    // ---------- stats ----------

    pub fn accesses(&self) -> u32 {
        self.accesses
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn misses(&self) -> u32 {
        self.accesses - self.hits
    }

    pub fn hit_rate(&self) -> f32 {
        if self.accesses != 0 {
            self.hits as f32 / self.accesses as f32
        } else {
            0.0
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn cache_size(&self) -> usize {
        self.block_size * self.num_blocks
    }

    pub fn policy(&self) -> ReplacePolicy {
        self.policy
    }

    pub fn direct_mapped(&self) -> bool {
        self.associativity == 1
    }

    pub fn fully_associative(&self) -> bool {
        self.associativity == self.num_blocks
    }

    /// Display state of block `i` in `0..num_blocks`.
    pub fn block_state(&self, i: usize) -> BlockState {
        self.state[i]
    }

    // ---------- internals ----------

    fn read(&mut self, address: u32) -> bool {
        let tag = address >> self.tag_shamt;
        let index = self.index_of(address);
        self.snapshot();
        self.sets[index].load(tag, &mut self.hit_marks, &mut self.miss_marks, &mut self.rng)
    }

    fn write(&mut self, address: u32) -> bool {
        let tag = address >> self.tag_shamt;
        let index = self.index_of(address);
        self.snapshot();
        self.sets[index].write(tag, &mut self.hit_marks, &mut self.miss_marks, &mut self.rng)
    }

    fn snapshot(&mut self) {
        if self.diff.is_none() {
            self.diff = Some(CacheBackup {
                hits: self.hits,
                accesses: self.accesses,
                sets: self.sets.clone(),
                state: self.state.clone(),
            });
        }
    }

    fn index_of(&self, address: u32) -> usize {
        let num_sets = self.num_blocks / self.associativity;
        ((address >> self.index_shamt) as usize) & (num_sets - 1)
    }

    /// A block that both hit and missed within one multi-byte access
    /// displays as a miss.
    fn publish(&mut self) {
        for &idx in &self.hit_marks {
            if !self.miss_marks.contains(&idx) {
                self.state[idx] = BlockState::Hit;
                if let Some(sink) = &self.sink {
                    sink.on_change(ChangeEvent::CacheBlockState { index: idx, state: BlockState::Hit });
                }
            }
        }
        for &idx in &self.miss_marks {
            self.state[idx] = BlockState::Miss;
            if let Some(sink) = &self.sink {
                sink.on_change(ChangeEvent::CacheBlockState { index: idx, state: BlockState::Miss });
            }
        }
        self.hit_marks.clear();
        self.miss_marks.clear();
    }

    fn organize(&mut self) {
        let num_sets = self.num_blocks / self.associativity;
        self.index_shamt = log2(self.block_size);
        self.tag_shamt = self.index_shamt + log2(num_sets);
        self.sets = (0..num_sets)
            .map(|i| CacheSet::new(i, self.associativity, self.policy))
            .collect();
        self.state = vec![BlockState::Empty; self.num_blocks];
        self.hits = 0;
        self.accesses = 0;
        self.diff = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_mapped_eviction_sequence() {
        // blockSize=4, numBlocks=4, associativity=1, LRU
        let mut cache = Cache::new(4, 4, 1, ReplacePolicy::Lru);
        let expected = [false, false, true, false, false, false, false];
        let addrs = [0x100u32, 0x104, 0x100, 0x200, 0x300, 0x400, 0x100];
        for (addr, want_hit) in addrs.iter().zip(expected) {
            let before = cache.hits();
            cache.load_word(*addr);
            let hit = cache.hits() == before + 1;
            assert_eq!(hit, want_hit, "address 0x{addr:x}");
        }
        assert_eq!(cache.accesses(), 7);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn multi_byte_access_counts_once() {
        let mut cache = Cache::new(4, 4, 1, ReplacePolicy::Lru);
        cache.load_word(0x100);
        cache.load_half(0x104);
        cache.store_byte(0x108);
        assert_eq!(cache.accesses(), 3);
    }

    #[test]
    fn write_miss_does_not_allocate() {
        let mut cache = Cache::new(4, 4, 1, ReplacePolicy::Lru);
        cache.store_word(0x100);
        assert_eq!(cache.hits(), 0);
        // a load to the same block still misses: the write did not fill it
        cache.load_word(0x100);
        assert_eq!(cache.hits(), 0);
        // now it is filled
        cache.load_word(0x100);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn fifo_rotates_on_reads_only() {
        // fully associative, two blocks
        let mut cache = Cache::new(4, 2, 2, ReplacePolicy::Fifo);
        cache.load_word(0x00); // fills block 0
        cache.load_word(0x10); // fills block 1
        cache.load_word(0x20); // evicts 0x00 (head of queue)
        cache.load_word(0x10); // still resident
        assert_eq!(cache.hits(), 1);
        cache.load_word(0x00); // miss: was evicted
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn reset_clears_stats_and_state() {
        let mut cache = Cache::new(4, 4, 1, ReplacePolicy::Lru);
        cache.load_word(0x100);
        cache.reset();
        assert_eq!(cache.accesses(), 0);
        assert_eq!(cache.hits(), 0);
        for i in 0..4 {
            assert_eq!(cache.block_state(i), crate::sink::BlockState::Empty);
        }
    }

    #[test]
    fn backup_restores_counters_bit_for_bit() {
        let mut cache = Cache::new(4, 4, 1, ReplacePolicy::Lru);
        cache.load_word(0x100);
        cache.take_diff();
        let before_hits = cache.hits();
        let before_accesses = cache.accesses();
        cache.load_word(0x100); // hit
        let backup = cache.take_diff().expect("snapshot taken");
        cache.restore(backup);
        assert_eq!(cache.hits(), before_hits);
        assert_eq!(cache.accesses(), before_accesses);
    }

    #[test]
    fn hit_rate_law() {
        let mut cache = Cache::new(4, 4, 1, ReplacePolicy::Lru);
        assert_eq!(cache.hit_rate(), 0.0);
        cache.load_word(0x100);
        cache.load_word(0x100);
        assert!(cache.hits() <= cache.accesses());
        assert_eq!(cache.hit_rate(), cache.hits() as f32 / cache.accesses() as f32);
    }
}
