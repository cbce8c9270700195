//! Virtual-to-physical register allocation, grounded on
//! `examples/original_source/src/codegen/register_allocator.hpp`'s
//! `RegisterAllocator`: LRU eviction over a fixed physical pool, spill slots
//! at monotonically decreasing rbp-relative offsets, and spill/allocation
//! counters for analysis.
//!
//! The pool is the fourteen registers spec.md names (`RAX, RBX, RCX, RDX,
//! RSI, RDI, R8..R15`) minus `RDI`, which this crate reserves as the fixed
//! base pointer for VM memory passed into the generated function (the
//! System V ABI's first argument register) — a generalization the original
//! never needed, since translating memory operands wasn't in its scope.

use std::collections::{HashMap, HashSet};

use crate::x86::{X86Encoder, X86Register};

const ALLOCATABLE: [X86Register; 13] = [
    X86Register::Rax,
    X86Register::Rbx,
    X86Register::Rcx,
    X86Register::Rdx,
    X86Register::Rsi,
    X86Register::R8,
    X86Register::R9,
    X86Register::R10,
    X86Register::R11,
    X86Register::R12,
    X86Register::R13,
    X86Register::R14,
    X86Register::R15,
];

/// The fixed base pointer for VM memory, passed as the generated function's
/// first argument. Excluded from the allocatable pool alongside RSP/RBP.
pub const MEMORY_BASE: X86Register = X86Register::Rdi;

pub struct RegisterAllocator {
    virt_to_phys: HashMap<u8, X86Register>,
    used: HashSet<X86Register>,
    dirty: HashSet<u8>,
    /// Least-recently-used ordering of currently-mapped virtual registers;
    /// front is the eviction candidate, back is most recently touched.
    lru: Vec<u8>,
    spill_slots: HashMap<u8, i32>,
    next_spill_offset: i32,
    spill_count: usize,
    allocation_count: usize,
}

impl Default for RegisterAllocator {
    fn default() -> Self {
        Self {
            virt_to_phys: HashMap::new(),
            used: HashSet::new(),
            dirty: HashSet::new(),
            lru: Vec::new(),
            spill_slots: HashMap::new(),
            next_spill_offset: -8,
            spill_count: 0,
            allocation_count: 0,
        }
    }
}

impl RegisterAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_allocated(&self, virt: u8) -> bool {
        self.virt_to_phys.contains_key(&virt)
    }

    fn touch(&mut self, virt: u8) {
        self.lru.retain(|&v| v != virt);
        self.lru.push(virt);
    }

    /// Binds `virt` to a free or evicted physical register.
    pub fn allocate(&mut self, virt: u8, encoder: &mut X86Encoder) -> X86Register {
        if let Some(&phys) = self.virt_to_phys.get(&virt) {
            self.touch(virt);
            return phys;
        }

        let phys = self.find_free_register().unwrap_or_else(|| self.evict_least_recently_used(encoder));
        self.virt_to_phys.insert(virt, phys);
        self.used.insert(phys);
        self.touch(virt);
        self.allocation_count += 1;
        phys
    }

    /// Returns `virt`'s physical register, reloading from its spill slot if
    /// it has no current mapping.
    pub fn get(&mut self, virt: u8, encoder: &mut X86Encoder) -> X86Register {
        if let Some(&phys) = self.virt_to_phys.get(&virt) {
            self.touch(virt);
            return phys;
        }
        let phys = self.allocate(virt, encoder);
        if let Some(&offset) = self.spill_slots.get(&virt) {
            encoder.emit_mov_reg_mem(phys, X86Register::Rbp, offset);
        }
        phys
    }

    /// Returns `virt`'s physical register to the pool without a writeback;
    /// the caller guarantees it is clean.
    pub fn free(&mut self, virt: u8) {
        if let Some(phys) = self.virt_to_phys.remove(&virt) {
            self.used.remove(&phys);
        }
        self.lru.retain(|&v| v != virt);
        self.dirty.remove(&virt);
    }

    pub fn mark_dirty(&mut self, virt: u8) {
        self.dirty.insert(virt);
    }

    pub fn mark_clean(&mut self, virt: u8) {
        self.dirty.remove(&virt);
    }

    fn allocate_spill_slot(&mut self, virt: u8) -> i32 {
        if let Some(&offset) = self.spill_slots.get(&virt) {
            return offset;
        }
        let offset = self.next_spill_offset;
        self.next_spill_offset -= 8;
        self.spill_slots.insert(virt, offset);
        offset
    }

    /// Writes `virt`'s current value to its spill slot if dirty, allocating
    /// a slot on first use.
    pub fn spill_register(&mut self, virt: u8, encoder: &mut X86Encoder) {
        if !self.dirty.contains(&virt) {
            return;
        }
        let Some(&phys) = self.virt_to_phys.get(&virt) else {
            return;
        };
        let offset = self.allocate_spill_slot(virt);
        encoder.emit_mov_mem_reg(X86Register::Rbp, offset, phys);
        self.mark_clean(virt);
        self.spill_count += 1;
    }

    /// Reloads `virt`'s value from its spill slot into its current physical.
    pub fn reload_register(&mut self, virt: u8, encoder: &mut X86Encoder) {
        let (Some(&phys), Some(&offset)) = (self.virt_to_phys.get(&virt), self.spill_slots.get(&virt)) else {
            return;
        };
        encoder.emit_mov_reg_mem(phys, X86Register::Rbp, offset);
    }

    /// Emits a store for every currently-dirty mapping; used before native
    /// calls and at function boundaries.
    pub fn spill_all_dirty(&mut self, encoder: &mut X86Encoder) {
        for virt in self.dirty.clone() {
            self.spill_register(virt, encoder);
        }
    }

    fn find_free_register(&self) -> Option<X86Register> {
        ALLOCATABLE.iter().copied().find(|r| !self.used.contains(r))
    }

    fn evict_least_recently_used(&mut self, encoder: &mut X86Encoder) -> X86Register {
        let victim = self.lru.remove(0);
        self.spill_register(victim, encoder);
        let phys = self
            .virt_to_phys
            .remove(&victim)
            .expect("lru entry must have a current mapping");
        self.used.remove(&phys);
        phys
    }

    /// Discards every mapping without emitting code; used only when
    /// entering a new function frame whose prologue initializes registers.
    pub fn reset_for_new_function(&mut self) {
        self.virt_to_phys.clear();
        self.used.clear();
        self.dirty.clear();
        self.lru.clear();
        self.spill_slots.clear();
        self.next_spill_offset = -8;
    }

    pub fn spill_count(&self) -> usize {
        self.spill_count
    }

    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn allocates_distinct_physicals_for_distinct_virtuals() {
        let mut alloc = RegisterAllocator::new();
        let mut enc = X86Encoder::new();
        let a = alloc.allocate(0, &mut enc);
        let b = alloc.allocate(1, &mut enc);
        assert_ne!(a, b);
        assert_eq!(alloc.allocation_count(), 2);
    }

    #[test]
    fn reallocating_the_same_virtual_returns_the_same_physical() {
        let mut alloc = RegisterAllocator::new();
        let mut enc = X86Encoder::new();
        let a = alloc.allocate(5, &mut enc);
        let a_again = alloc.get(5, &mut enc);
        assert_eq!(a, a_again);
        assert_eq!(alloc.allocation_count(), 1);
    }

    #[test]
    fn exhausting_the_pool_evicts_the_least_recently_used() {
        let mut alloc = RegisterAllocator::new();
        let mut enc = X86Encoder::new();
        for v in 0..13u8 {
            alloc.allocate(v, &mut enc);
        }
        // virt 0 is now the least recently used; allocating a 14th virtual
        // register must evict it.
        assert!(alloc.is_allocated(0));
        let evicted_phys = *alloc.virt_to_phys.get(&0).unwrap();
        alloc.allocate(13, &mut enc);
        assert!(!alloc.is_allocated(0));
        assert_eq!(*alloc.virt_to_phys.get(&13).unwrap(), evicted_phys);
    }

    #[test]
    fn eviction_spills_a_dirty_victim_before_freeing_it() {
        let mut alloc = RegisterAllocator::new();
        let mut enc = X86Encoder::new();
        for v in 0..13u8 {
            alloc.allocate(v, &mut enc);
        }
        alloc.mark_dirty(0);
        let len_before = enc.len();
        alloc.allocate(13, &mut enc);
        assert!(enc.len() > len_before);
        assert_eq!(alloc.spill_count(), 1);
    }

    #[test]
    fn spill_all_dirty_is_a_noop_with_nothing_dirty() {
        let mut alloc = RegisterAllocator::new();
        let mut enc = X86Encoder::new();
        alloc.allocate(0, &mut enc);
        let len_before = enc.len();
        alloc.spill_all_dirty(&mut enc);
        assert_eq!(enc.len(), len_before);
    }

    #[test]
    fn reset_for_new_function_discards_mappings_without_emitting_code() {
        let mut alloc = RegisterAllocator::new();
        let mut enc = X86Encoder::new();
        alloc.allocate(0, &mut enc);
        alloc.mark_dirty(0);
        let len_before = enc.len();
        alloc.reset_for_new_function();
        assert_eq!(enc.len(), len_before);
        assert!(!alloc.is_allocated(0));
    }

    #[test]
    fn spill_slots_are_reused_and_monotonically_decreasing() {
        let mut alloc = RegisterAllocator::new();
        assert_eq!(alloc.allocate_spill_slot(0), -8);
        assert_eq!(alloc.allocate_spill_slot(1), -16);
        assert_eq!(alloc.allocate_spill_slot(0), -8);
    }
}
