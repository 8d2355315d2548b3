//! Memory access traces.
//!
//! A [Trace] is a list of [AccessRecord], either produced by one of the
//! synthetic workloads below or read from a text file with one access per
//! line:
//!
//! ```text
//! # addr     pc       sharers state
//! 0x3e8      0xbad    0       E
//! 0x0        0xf00d   4       M
//! ```
//!
//! Addresses and program counters are hexadecimal (the `0x` prefix is
//! optional), the sharer count is decimal and the state is one of
//! `I`, `S`, `E` or `M`. Everything after a `#` is ignored.

use rand::prelude::*;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::{ BufRead, BufReader, Write };
use std::path::Path;

use crate::coherence::Directory;
use crate::error::*;
use crate::feature::FeatureTuple;
use crate::CoherenceState;

/// Program counter of the streaming access in the built-in workloads.
pub const SCAN_PC: u64 = 0xBAD;

/// Program counter of the reused, shared access in the built-in workloads.
pub const HOT_PC: u64 = 0xF00D;

/// A single memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccessRecord {
    pub addr: u64,
    pub pc: u64,

    /// Number of cores holding the line when it was accessed
    pub sharers: u32,

    pub state: CoherenceState,
}
impl AccessRecord {
    pub fn new(addr: u64, pc: u64, sharers: u32, state: CoherenceState) -> Self {
        Self { addr, pc, sharers, state }
    }

    /// Return the predictor inputs for this access.
    pub fn features(&self) -> FeatureTuple {
        FeatureTuple::new(self.pc, self.sharers, self.state)
    }
}

/// A named list of accesses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trace {
    pub name: String,
    pub records: Vec<AccessRecord>,
}
impl Trace {
    pub fn new(name: impl ToString) -> Self {
        Self { name: name.to_string(), records: Vec::new() }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn push(&mut self, r: AccessRecord) { self.records.push(r); }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &AccessRecord> {
        self.records.iter()
    }

    /// Parse a trace in the text format.
    pub fn from_reader(name: impl ToString, reader: impl BufRead) -> Result<Self> {
        let mut res = Self::new(name);
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(r) = parse_line(idx + 1, &line)? {
                res.push(r);
            }
        }
        Ok(res)
    }

    /// Read a trace file in the text format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let f = File::open(path)?;
        Self::from_reader(name, BufReader::new(f))
    }

    /// Write this trace in the text format.
    pub fn write_to(&self, mut w: impl Write) -> Result<()> {
        writeln!(w, "# {}", self.name)?;
        for r in self.records.iter() {
            writeln!(w, "{:#x} {:#x} {} {}", r.addr, r.pc, r.sharers, r.state)?;
        }
        Ok(())
    }
}

fn parse_hex(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16).ok()
}

fn parse_line(line: usize, text: &str) -> Result<Option<AccessRecord>> {
    let text = match text.find('#') {
        Some(pos) => &text[..pos],
        None => text,
    };
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.is_empty() {
        return Ok(None);
    }
    let err = |msg: String| Error::TraceParse { line, msg };
    if fields.len() != 4 {
        return Err(err(format!("expected 4 fields, found {}", fields.len())));
    }
    let addr = parse_hex(fields[0])
        .ok_or_else(|| err(format!("bad address '{}'", fields[0])))?;
    let pc = parse_hex(fields[1])
        .ok_or_else(|| err(format!("bad program counter '{}'", fields[1])))?;
    let sharers = fields[2].parse::<u32>()
        .map_err(|e| err(format!("bad sharer count '{}': {}", fields[2], e)))?;
    let state = CoherenceState::from_name(fields[3])
        .ok_or_else(|| err(format!("bad coherence state '{}'", fields[3])))?;
    Ok(Some(AccessRecord { addr, pc, sharers, state }))
}

/// A streaming scan interleaved with a small, heavily shared working set.
///
/// Each epoch makes 600 accesses to fresh addresses from [SCAN_PC] (no
/// sharers, Exclusive), followed by 400 accesses cycling over 16 hot
/// addresses from [HOT_PC] (4 sharers, Modified).
pub fn scanner_vs_hotset(epochs: usize) -> Trace {
    let mut res = Trace::new("scanner_vs_hotset");
    for epoch in 0..epochs as u64 {
        for i in 0..600 {
            res.push(AccessRecord::new(
                1000 + i + epoch * 100, SCAN_PC, 0, CoherenceState::Exclusive
            ));
        }
        for k in 0..400 {
            res.push(AccessRecord::new(
                k % 16, HOT_PC, 4, CoherenceState::Modified
            ));
        }
    }
    res
}

/// One shared worker line interleaved access-by-access with a stream.
///
/// Each epoch makes `per_epoch` pairs of accesses: address 50 from
/// [HOT_PC] (4 sharers, Shared) and then a fresh streaming address from
/// [SCAN_PC].
pub fn scanner_vs_worker(epochs: usize, per_epoch: usize) -> Trace {
    let mut res = Trace::new("scanner_vs_worker");
    let n = per_epoch as u64;
    for epoch in 0..epochs as u64 {
        for i in 0..n {
            res.push(AccessRecord::new(50, HOT_PC, 4, CoherenceState::Shared));
            res.push(AccessRecord::new(
                100 + i + epoch * n, SCAN_PC, 0, CoherenceState::Exclusive
            ));
        }
    }
    res
}

/// Parameters for [coherent_mix].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoherentMixConfig {
    pub num_cores: usize,

    /// Number of lines in the shared region tracked by the directory
    pub shared_lines: usize,

    /// Total number of accesses
    pub accesses: usize,

    /// Percentage of accesses that go to the shared region
    pub shared_pct: u32,

    /// Percentage of shared accesses that are writes
    pub write_pct: u32,

    pub line_bytes: u64,
}
impl Default for CoherentMixConfig {
    fn default() -> Self {
        Self {
            num_cores: 4,
            shared_lines: 64,
            accesses: 20_000,
            shared_pct: 60,
            write_pct: 30,
            line_bytes: 64,
        }
    }
}

/// Base address of the streaming region in [coherent_mix].
const STREAM_BASE: u64 = 0x10_0000;

/// A seeded multicore workload with real MESI states.
///
/// Shared accesses pick a random core, line and operation and are run
/// through a [Directory], so the recorded (sharers, state) pairs follow the
/// protocol. Reads and writes use different program counters. The rest of
/// the accesses stream through private, never reused lines.
///
/// Shared lines are spaced 8 lines apart so that they crowd into a few
/// sets of a 64-set cache.
pub fn coherent_mix(seed: u64, cfg: CoherentMixConfig) -> Trace {
    assert!(cfg.shared_pct <= 100 && cfg.write_pct <= 100);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dir = Directory::new(cfg.num_cores, cfg.shared_lines);
    let mut res = Trace::new(format!("coherent_mix_{}", seed));
    let mut next_stream = 0;

    for _ in 0..cfg.accesses {
        if rng.gen_range(0..100) < cfg.shared_pct {
            let core = rng.gen_range(0..cfg.num_cores);
            let line = rng.gen_range(0..cfg.shared_lines);
            let addr = line as u64 * 8 * cfg.line_bytes;
            let (pc, (state, sharers)) = if rng.gen_range(0..100) < cfg.write_pct {
                (0xA100 + core as u64, dir.handle_write(core, line))
            } else {
                (0xA000 + core as u64, dir.handle_read(core, line))
            };
            res.push(AccessRecord::new(addr, pc, sharers, state));
        } else {
            let addr = STREAM_BASE + next_stream * cfg.line_bytes;
            next_stream += 1;
            res.push(AccessRecord::new(addr, SCAN_PC, 1, CoherenceState::Exclusive));
        }
    }
    res
}


#[cfg(test)]
mod test {
    use super::*;
    use itertools::*;

    #[test]
    fn scanner_vs_hotset_layout() {
        let t = scanner_vs_hotset(2);
        assert_eq!(t.len(), 2000);
        assert_eq!(t.records[0], AccessRecord::new(1000, SCAN_PC, 0, CoherenceState::Exclusive));
        assert_eq!(t.records[600].addr, 0);
        assert_eq!(t.records[615].addr, 15);
        assert_eq!(t.records[616].addr, 0);
        assert_eq!(t.records[1000].addr, 1100);
        let hot = t.iter().filter(|r| r.pc == HOT_PC).count();
        assert_eq!(hot, 800);
    }

    #[test]
    fn scanner_vs_worker_layout() {
        let t = scanner_vs_worker(3, 200);
        assert_eq!(t.len(), 1200);
        assert!(t.iter().step_by(2).all(|r| r.addr == 50 && r.sharers == 4));
        let scans: Vec<u64> = t.iter().skip(1).step_by(2).map(|r| r.addr).collect();
        assert_eq!(scans[0], 100);
        assert_eq!(scans[200], 300);
        assert!(scans.iter().all_unique());
    }

    #[test]
    fn coherent_mix_is_seeded() {
        let cfg = CoherentMixConfig { accesses: 2000, ..Default::default() };
        let a = coherent_mix(7, cfg);
        let b = coherent_mix(7, cfg);
        let c = coherent_mix(8, cfg);
        assert_eq!(a, b);
        assert_ne!(a.records, c.records);
        assert!(a.iter().any(|r| r.state == CoherenceState::Modified));
        assert!(a.iter().any(|r| r.state == CoherenceState::Shared && r.sharers > 1));
        assert!(a.iter()
            .filter(|r| r.state == CoherenceState::Modified)
            .all(|r| r.sharers == 1));
    }

    #[test]
    fn parse_text_trace() {
        let text = "\
            # a comment\n\
            0x3e8 0xbad 0 E\n\
            \n\
            0 F00D 4 m   # trailing comment\n";
        let t = Trace::from_reader("t", text.as_bytes()).unwrap();
        assert_eq!(t.records, vec![
            AccessRecord::new(1000, 0xBAD, 0, CoherenceState::Exclusive),
            AccessRecord::new(0, 0xF00D, 4, CoherenceState::Modified),
        ]);
    }

    #[test]
    fn parse_errors_report_the_line() {
        let text = "0x1 0x2 0 S\n0x1 0x2 three S\n";
        match Trace::from_reader("t", text.as_bytes()) {
            Err(Error::TraceParse { line, .. }) => assert_eq!(line, 2),
            r => panic!("unexpected result {:?}", r),
        }
        let text = "0x1 0x2 0 X\n";
        assert!(matches!(Trace::from_reader("t", text.as_bytes()),
            Err(Error::TraceParse { line: 1, .. })));
        let text = "0x1 0x2 0\n";
        assert!(Trace::from_reader("t", text.as_bytes()).is_err());
    }

    #[test]
    fn written_traces_parse_back() {
        let t = scanner_vs_hotset(1);
        let mut buf = Vec::new();
        t.write_to(&mut buf).unwrap();
        let u = Trace::from_reader("scanner_vs_hotset", buf.as_slice()).unwrap();
        assert_eq!(t, u);
    }
}
