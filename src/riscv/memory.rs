//! Sparse byte-addressable main memory with segment protection and the
//! cache simulator in front of every public access.

use std::collections::HashMap;

use crate::errors::SimulationFault;
use crate::riscv::cache::Cache;
use crate::riscv::*;
use crate::settings::Settings;
use crate::sink::{ChangeEvent, SharedSink};
use crate::utils::{align_to_word, sign_extend_byte, sign_extend_half};

pub struct Memory {
    mem: HashMap<u32, u8>,
    diff: HashMap<u32, u8>,
    cache: Cache,
    /// exclusive end of the loaded text image
    text_end: u32,
    /// rodata range, begin inclusive / end exclusive
    rodata: Option<(u32, u32)>,
    heap_start: u32,
    heap: u32,
    has_text: bool,
    self_modifying: bool,
    sink: Option<SharedSink>,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("mem", &self.mem)
            .field("diff", &self.diff)
            .field("cache", &self.cache)
            .field("text_end", &self.text_end)
            .field("rodata", &self.rodata)
            .field("heap_start", &self.heap_start)
            .field("heap", &self.heap)
            .field("has_text", &self.has_text)
            .field("self_modifying", &self.self_modifying)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Memory {
    pub fn new(settings: &Settings) -> Self {
        Memory {
            mem: HashMap::new(),
            diff: HashMap::new(),
            cache: Cache::new(
                settings.cache_block_size,
                settings.cache_num_blocks,
                settings.cache_associativity,
                settings.cache_policy,
            ),
            text_end: TEXT_BEGIN,
            rodata: None,
            heap_start: STATIC_BEGIN,
            heap: STATIC_BEGIN,
            has_text: false,
            self_modifying: settings.self_modifying,
            sink: None,
        }
    }

    pub fn set_sink(&mut self, sink: SharedSink) {
        self.sink = Some(sink);
    }

    /// Fixes the segment boundaries after the linker lays the program out.
    pub fn set_layout(&mut self, text_end: u32, rodata: Option<(u32, u32)>, heap_start: u32) {
        self.text_end = text_end;
        self.rodata = rodata;
        self.heap_start = heap_start;
        self.heap = heap_start;
        self.has_text = text_end > TEXT_BEGIN;
    }

    /// Drops every allocated byte and all bookkeeping; the loader restores
    /// the image afterwards.
    pub fn reset(&mut self) {
        self.mem.clear();
        self.diff.clear();
        self.heap = self.heap_start;
        self.cache.reset();
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    // ---------- protection ----------

    /// Checks whether `address` may be accessed. Reserved bands always
    /// fail; text and rodata reject writes (text becomes writable in
    /// self-modifying mode).
    pub fn check(&self, address: u32, read: bool) -> bool {
        if (RESERVED_LOW_BEGIN..=RESERVED_LOW_END).contains(&address) {
            return false;
        }
        if (RESERVED_HIGH_BEGIN..=RESERVED_HIGH_END).contains(&address) {
            return false;
        }
        if !read && self.has_text && (TEXT_BEGIN..self.text_end).contains(&address) && !self.self_modifying {
            return false;
        }
        if !read {
            if let Some((begin, end)) = self.rodata {
                if (begin..end).contains(&address) {
                    if !self.self_modifying {
                        return false;
                    }
                    log::warn!("write into read-only data at 0x{address:08x}");
                }
            }
        }
        true
    }

    #[inline]
    fn aligned(&self, address: u32, size: u32) -> bool {
        self.self_modifying || address % size == 0
    }

    // ---------- raw byte plumbing ----------

    fn raw_load(&self, address: u32) -> u8 {
        self.mem.get(&address).copied().unwrap_or(0)
    }

    fn raw_store(&mut self, address: u32, value: u8, save: bool) {
        if save {
            self.diff.entry(address).or_insert_with(|| self.mem.get(&address).copied().unwrap_or(0));
        }
        self.mem.insert(address, value);
        if let Some(sink) = &self.sink {
            sink.on_change(ChangeEvent::MemoryChanged { address, value });
        }
    }

    // ---------- loader / restore paths (no cache, no diff, no checks) ----------

    /// Image byte store used by the loader only.
    pub fn store_image_byte(&mut self, address: u32, value: u8) {
        self.raw_store(address, value, false);
    }

    /// Image word store used by the loader only.
    pub fn store_image_word(&mut self, address: u32, value: u32) {
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            self.raw_store(address.wrapping_add(i as u32), *b, false);
        }
    }

    /// Puts back the previous values recorded in a history diff.
    pub fn restore(&mut self, diff: &HashMap<u32, u8>) {
        for (&address, &value) in diff {
            self.raw_store(address, value, false);
        }
    }

    /// Word read bypassing cache and checks, used by fetch and hosts.
    pub fn peek_word(&self, address: u32) -> u32 {
        u32::from_le_bytes([
            self.raw_load(address),
            self.raw_load(address.wrapping_add(1)),
            self.raw_load(address.wrapping_add(2)),
            self.raw_load(address.wrapping_add(3)),
        ])
    }

    pub fn peek_byte(&self, address: u32) -> u8 {
        self.raw_load(address)
    }

    // ---------- privileged (unchecked, cache-visible) ----------

    pub fn priv_store_byte(&mut self, address: u32, value: u32) {
        self.cache.store_byte(address);
        self.raw_store(address, value as u8, true);
    }

    pub fn priv_load_byte_unsigned(&mut self, address: u32) -> u32 {
        self.cache.load_byte(address);
        self.raw_load(address) as u32
    }

    // ---------- public (checked) ----------

    pub fn load_byte_unsigned(&mut self, address: u32) -> Result<u32, SimulationFault> {
        if !self.check(address, true) {
            return Err(SimulationFault::InvalidAddress { addr: address, read: true });
        }
        Ok(self.priv_load_byte_unsigned(address))
    }

    pub fn load_byte(&mut self, address: u32) -> Result<i32, SimulationFault> {
        Ok(sign_extend_byte(self.load_byte_unsigned(address)?))
    }

    pub fn load_half_unsigned(&mut self, address: u32) -> Result<u32, SimulationFault> {
        let ok = self.aligned(address, 2)
            && self.check(address, true)
            && self.check(address.wrapping_add(1), true);
        if !ok {
            return Err(SimulationFault::InvalidAddress { addr: address, read: true });
        }
        self.cache.load_half(address);
        let lo = self.raw_load(address) as u32;
        let hi = self.raw_load(address.wrapping_add(1)) as u32;
        Ok((hi << 8) | lo)
    }

    pub fn load_half(&mut self, address: u32) -> Result<i32, SimulationFault> {
        Ok(sign_extend_half(self.load_half_unsigned(address)?))
    }

    pub fn load_word(&mut self, address: u32) -> Result<u32, SimulationFault> {
        let ok = self.aligned(address, 4)
            && (0..4).all(|i| self.check(address.wrapping_add(i), true));
        if !ok {
            return Err(SimulationFault::InvalidAddress { addr: address, read: true });
        }
        self.cache.load_word(address);
        Ok(u32::from_le_bytes([
            self.raw_load(address),
            self.raw_load(address.wrapping_add(1)),
            self.raw_load(address.wrapping_add(2)),
            self.raw_load(address.wrapping_add(3)),
        ]))
    }

    pub fn store_byte(&mut self, address: u32, value: u32) -> Result<(), SimulationFault> {
        if !self.check(address, false) {
            return Err(SimulationFault::InvalidAddress { addr: address, read: false });
        }
        self.priv_store_byte(address, value);
        Ok(())
    }

    pub fn store_half(&mut self, address: u32, value: u32) -> Result<(), SimulationFault> {
        let ok = self.aligned(address, 2)
            && self.check(address, false)
            && self.check(address.wrapping_add(1), false);
        if !ok {
            return Err(SimulationFault::InvalidAddress { addr: address, read: false });
        }
        self.cache.store_half(address);
        self.raw_store(address, value as u8, true);
        self.raw_store(address.wrapping_add(1), (value >> 8) as u8, true);
        Ok(())
    }

    pub fn store_word(&mut self, address: u32, value: u32) -> Result<(), SimulationFault> {
        let ok = self.aligned(address, 4)
            && (0..4).all(|i| self.check(address.wrapping_add(i), false));
        if !ok {
            return Err(SimulationFault::InvalidAddress { addr: address, read: false });
        }
        self.cache.store_word(address);
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            self.raw_store(address.wrapping_add(i as u32), *b, true);
        }
        Ok(())
    }

    // ---------- heap ----------

    pub fn heap_pointer(&self) -> u32 {
        self.heap
    }

    pub fn heap_start(&self) -> u32 {
        self.heap_start
    }

    /// History restore of the heap pointer.
    pub fn set_heap_pointer(&mut self, address: u32) {
        self.heap = address;
    }

    /// sbrk: allocates `bytes` from the heap, zeroing the new area through
    /// the cache-visible path, and word-aligns the next pointer. Returns
    /// the start of the allocated area, or -1 on failure.
    pub fn allocate_from_heap(&mut self, bytes: i32) -> i32 {
        if bytes < 0 {
            return -1;
        }
        let address = self.heap;
        let end = address as u64 + bytes as u64;
        if end > STATIC_CEILING as u64 + 1 {
            return -1;
        }
        self.heap = align_to_word(end as u32);
        for i in 0..(self.heap - address) {
            self.priv_store_byte(address + i, 0);
        }
        address as i32
    }

    // ---------- history ----------

    pub fn take_diff(&mut self) -> HashMap<u32, u8> {
        std::mem::take(&mut self.diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Memory {
        let mut mem = Memory::new(&Settings::default());
        // one instruction of text, rodata at the static base
        mem.set_layout(TEXT_BEGIN + 4, Some((STATIC_BEGIN, STATIC_BEGIN + 8)), STATIC_BEGIN + 16);
        mem
    }

    #[test]
    fn unread_locations_are_zero() {
        let mut mem = memory();
        assert_eq!(mem.load_word(0x2000_0000).unwrap(), 0);
    }

    #[test]
    fn store_load_round_trip() {
        let mut mem = memory();
        mem.store_word(0x2000_0000, 0xdead_beef).unwrap();
        assert_eq!(mem.load_word(0x2000_0000).unwrap(), 0xdead_beef);
        assert_eq!(mem.load_byte_unsigned(0x2000_0000).unwrap(), 0xef);
        assert_eq!(mem.load_byte(0x2000_0003).unwrap(), sign_extend_byte(0xde));
    }

    #[test]
    fn reserved_bands_fault() {
        let mut mem = memory();
        assert!(mem.store_byte(0x0000_1000, 1).is_err());
        assert!(mem.load_word(0xffff_0000).is_err());
    }

    #[test]
    fn text_rejects_user_stores_but_allows_reads() {
        let mut mem = memory();
        mem.store_image_word(TEXT_BEGIN, 0x0000_0073);
        assert!(mem.store_word(TEXT_BEGIN, 0).is_err());
        assert_eq!(mem.load_word(TEXT_BEGIN).unwrap(), 0x0000_0073);
    }

    #[test]
    fn rodata_rejects_stores() {
        let mut mem = memory();
        assert!(mem.store_byte(STATIC_BEGIN, 1).is_err());
        assert!(mem.load_byte(STATIC_BEGIN).is_ok());
    }

    #[test]
    fn self_modifying_inverts_text_rule() {
        let settings = Settings { self_modifying: true, ..Settings::default() };
        let mut mem = Memory::new(&settings);
        mem.set_layout(TEXT_BEGIN + 4, None, STATIC_BEGIN);
        assert!(mem.store_word(TEXT_BEGIN, 0x13).is_ok());
    }

    #[test]
    fn misaligned_word_faults() {
        let mut mem = memory();
        assert!(mem.load_word(0x2000_0001).is_err());
        assert!(mem.store_half(0x2000_0001, 1).is_err());
    }

    #[test]
    fn heap_allocation_word_aligns() {
        let mut mem = memory();
        let first = mem.allocate_from_heap(5);
        assert_eq!(first, (STATIC_BEGIN + 16) as i32);
        let second = mem.allocate_from_heap(4);
        assert_eq!(second, (STATIC_BEGIN + 24) as i32);
        assert_eq!(mem.allocate_from_heap(-1), -1);
    }

    #[test]
    fn diff_records_previous_values_once() {
        let mut mem = memory();
        mem.store_byte(0x2000_0000, 7).unwrap();
        mem.store_byte(0x2000_0000, 9).unwrap();
        let diff = mem.take_diff();
        assert_eq!(diff.get(&0x2000_0000), Some(&0));
        mem.restore(&diff);
        assert_eq!(mem.peek_byte(0x2000_0000), 0);
    }
}
