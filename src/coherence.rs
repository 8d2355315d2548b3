//! A directory tracking MESI state for a small memory.
//!
//! Every line has a directory entry holding its state and a bitmask of the
//! cores with a copy. This is only used to produce realistic
//! (sharers, state) pairs for synthetic traces; no data moves.

use bitvec::prelude::*;
use log::trace;

use crate::CoherenceState;

/// Directory state for one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub state: CoherenceState,

    /// Bit `n` is set when core `n` holds a copy
    pub sharers: BitVec,
}
impl DirectoryEntry {
    pub fn new(num_cores: usize) -> Self {
        Self {
            state: CoherenceState::Invalid,
            sharers: bitvec![0; num_cores],
        }
    }

    /// Return the number of cores holding a copy.
    pub fn num_sharers(&self) -> u32 { self.sharers.count_ones() as u32 }

    /// Return the cores holding a copy.
    pub fn cores(&self) -> Vec<usize> { self.sharers.iter_ones().collect() }
}

/// Counters for protocol actions taken by the directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub reads: u64,
    pub writes: u64,

    /// Reads that forced a private owner down to Shared
    pub downgrades: u64,

    /// Copies invalidated by writes
    pub invalidations: u64,
}

/// A MESI directory.
#[derive(Clone, Debug)]
pub struct Directory {
    num_cores: usize,
    entries: Vec<DirectoryEntry>,
    pub stat: DirectoryStats,
}
impl Directory {
    pub fn new(num_cores: usize, num_lines: usize) -> Self {
        assert!(num_cores > 0 && num_lines > 0);
        Self {
            num_cores,
            entries: vec![DirectoryEntry::new(num_cores); num_lines],
            stat: DirectoryStats::default(),
        }
    }

    pub fn num_cores(&self) -> usize { self.num_cores }

    pub fn num_lines(&self) -> usize { self.entries.len() }

    pub fn entry(&self, addr: usize) -> &DirectoryEntry { &self.entries[addr] }

    fn entry_mut(&mut self, core: usize, addr: usize) -> &mut DirectoryEntry {
        assert!(core < self.num_cores, "core {} out of range", core);
        assert!(addr < self.entries.len(), "address {} out of range", addr);
        &mut self.entries[addr]
    }

    /// Handle a read from some core, returning the resulting state and
    /// number of sharers.
    ///
    /// - Invalid: the reader gets an Exclusive copy
    /// - Exclusive/Modified: a different reader downgrades the owner, and
    ///   both end up Shared
    /// - Shared: the reader is added to the sharers
    pub fn handle_read(&mut self, core: usize, addr: usize) -> (CoherenceState, u32) {
        self.stat.reads += 1;
        let line = self.entry_mut(core, addr);
        let mut downgrade = false;
        match line.state {
            CoherenceState::Invalid => {
                line.state = CoherenceState::Exclusive;
            },
            CoherenceState::Exclusive | CoherenceState::Modified => {
                if !line.sharers[core] {
                    line.state = CoherenceState::Shared;
                    downgrade = true;
                }
            },
            CoherenceState::Shared => {},
        }
        line.sharers.set(core, true);
        let res = (line.state, line.num_sharers());
        trace!("read  core {} addr {:2} -> {} {:?}", core, addr, res.0, line.cores());
        if downgrade {
            self.stat.downgrades += 1;
        }
        res
    }

    /// Handle a write from some core, returning the resulting state and
    /// number of sharers.
    ///
    /// Every other copy is invalidated and the writer becomes the Modified
    /// owner.
    pub fn handle_write(&mut self, core: usize, addr: usize) -> (CoherenceState, u32) {
        self.stat.writes += 1;
        let line = self.entry_mut(core, addr);
        let others = line.num_sharers() - line.sharers[core] as u32;
        line.sharers.fill(false);
        line.sharers.set(core, true);
        line.state = CoherenceState::Modified;
        trace!("write core {} addr {:2} -> M, invalidated {}", core, addr, others);
        self.stat.invalidations += others as u64;
        (CoherenceState::Modified, 1)
    }
}
