//! Run trace and replay verification.
//!
//! Records every processed event of a run into an append-only trace,
//! optionally snapshots the pool state every `n` events, and provides
//! a text export/import so a stored trace can be checked against a fresh
//! run with the same seed.
use std::io::{self, BufRead, Write};

use crate::engine::{Disposition, StepOutcome};
use crate::event::{EventId, TrafficClass};
use crate::server::ServerId;
use crate::time::VirtualTime;

// ── Hash utility ──────────────────────────────────────────────────────

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

fn class_code(class: TrafficClass) -> u64 {
    match class {
        TrafficClass::Single => 1,
        TrafficClass::Handover => 2,
        TrafficClass::NewCall => 3,
    }
}

fn disposition_hash(d: Disposition) -> u64 {
    match d {
        Disposition::Admitted(s) => hash_combine(1, u64::from(s.raw())),
        Disposition::Blocked => 2,
        Disposition::Departed(s) => hash_combine(3, u64::from(s.raw())),
    }
}

// ── Entries ───────────────────────────────────────────────────────────

/// One processed event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    /// Position in the run, starting at 0.
    pub index: u64,
    /// What happened.
    pub outcome: StepOutcome,
}

/// A snapshot of the pool and counters at a point in the run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Checkpoint {
    /// Number of events processed when this checkpoint was taken.
    pub event_index: u64,
    /// Logical time at the checkpoint.
    pub time: VirtualTime,
    /// Busy servers at the checkpoint.
    pub busy: u64,
    /// Blocked arrivals so far.
    pub blocked: u64,
    /// Combined hash of the fields above.
    pub state_hash: u64,
}

impl Checkpoint {
    /// Build a checkpoint, computing its hash.
    pub fn new(event_index: u64, time: VirtualTime, busy: u64, blocked: u64) -> Self {
        let mut h = hash_combine(event_index, time.as_f64().to_bits());
        h = hash_combine(h, busy);
        h = hash_combine(h, blocked);
        Checkpoint {
            event_index,
            time,
            busy,
            blocked,
            state_hash: h,
        }
    }
}

// ── Run trace ─────────────────────────────────────────────────────────

/// Append-only trace of processed events with optional checkpointing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTrace {
    entries: Vec<TraceEntry>,
    checkpoints: Vec<Checkpoint>,
    checkpoint_interval: Option<u64>,
}

impl RunTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        RunTrace::default()
    }

    /// Create a trace with a checkpoint every `n` events.
    pub fn with_checkpoint_interval(n: u64) -> Self {
        RunTrace {
            checkpoint_interval: Some(n),
            ..RunTrace::default()
        }
    }

    /// Record a processed event.
    pub fn record(&mut self, outcome: StepOutcome) {
        let index = self.entries.len() as u64;
        self.entries.push(TraceEntry { index, outcome });
    }

    /// Add a checkpoint.
    pub fn add_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.push(checkpoint);
    }

    /// Whether a checkpoint is due after `events_processed` events.
    pub fn should_checkpoint(&self, events_processed: u64) -> bool {
        match self.checkpoint_interval {
            Some(n) if n > 0 => events_processed % n == 0,
            _ => false,
        }
    }

    /// Recorded entries.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Recorded checkpoints.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deterministic hash of the whole trace.
    pub fn trace_hash(&self) -> u64 {
        let mut h: u64 = 0;
        for entry in &self.entries {
            let o = &entry.outcome;
            h = hash_combine(h, o.event.raw());
            h = hash_combine(h, o.time.as_f64().to_bits());
            h = hash_combine(h, class_code(o.class));
            h = hash_combine(h, disposition_hash(o.disposition));
        }
        h
    }

    /// Whether processed times never decrease.
    pub fn is_time_ordered(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].outcome.time <= w[1].outcome.time)
    }

    // ── Export / Import ───────────────────────────────────────────

    /// Export the trace in a line-oriented text format.
    ///
    /// Times are written as raw `f64` bits so a round trip is exact.
    pub fn export<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "# CALLSIM TRACE v1")?;
        writeln!(w, "# events: {}", self.entries.len())?;
        writeln!(w, "# checkpoints: {}", self.checkpoints.len())?;

        for entry in &self.entries {
            let o = &entry.outcome;
            write!(
                w,
                "E {} {:016x} {} {} ",
                entry.index,
                o.time.as_f64().to_bits(),
                o.event.raw(),
                o.class
            )?;
            match o.disposition {
                Disposition::Admitted(s) => writeln!(w, "admit {}", s.raw())?,
                Disposition::Blocked => writeln!(w, "block")?,
                Disposition::Departed(s) => writeln!(w, "depart {}", s.raw())?,
            }
        }

        for cp in &self.checkpoints {
            writeln!(
                w,
                "C {} {:016x} {} {} {:016x}",
                cp.event_index,
                cp.time.as_f64().to_bits(),
                cp.busy,
                cp.blocked,
                cp.state_hash
            )?;
        }

        Ok(())
    }

    /// Import a trace written by [`RunTrace::export`].
    pub fn import<R: BufRead>(r: R) -> io::Result<Self> {
        let mut trace = RunTrace::new();

        for line in r.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invalid = |e: String| io::Error::new(io::ErrorKind::InvalidData, e);
            if line.starts_with('E') {
                trace.entries.push(parse_entry(line).map_err(invalid)?);
            } else if line.starts_with('C') {
                trace.checkpoints.push(parse_checkpoint(line).map_err(invalid)?);
            } else {
                return Err(invalid(format!("unrecognised line: {}", line)));
            }
        }

        Ok(trace)
    }
}

// ── Verification ──────────────────────────────────────────────────────

/// Whether two traces processed the same events in the same order.
pub fn traces_match(a: &RunTrace, b: &RunTrace) -> bool {
    a.entries == b.entries
}

/// Whether two traces agree on every checkpoint.
pub fn checkpoints_match(a: &RunTrace, b: &RunTrace) -> bool {
    a.checkpoints == b.checkpoints
}

// ── Parsing helpers ───────────────────────────────────────────────────

fn parse_u64(s: Option<&str>, label: &str) -> Result<u64, String> {
    s.ok_or(format!("missing {}", label))?
        .parse()
        .map_err(|e| format!("{}: {}", label, e))
}

fn parse_bits(s: Option<&str>, label: &str) -> Result<u64, String> {
    let raw = s.ok_or(format!("missing {}", label))?;
    u64::from_str_radix(raw, 16).map_err(|e| format!("{}: {}", label, e))
}

fn parse_server(s: Option<&str>) -> Result<ServerId, String> {
    let raw: u32 = s
        .ok_or("missing server")?
        .parse()
        .map_err(|e| format!("server: {}", e))?;
    Ok(ServerId::new(raw))
}

fn parse_class(s: Option<&str>) -> Result<TrafficClass, String> {
    match s {
        Some("single") => Ok(TrafficClass::Single),
        Some("handover") => Ok(TrafficClass::Handover),
        Some("newcall") => Ok(TrafficClass::NewCall),
        Some(other) => Err(format!("unknown class: {}", other)),
        None => Err("missing class".into()),
    }
}

fn parse_entry(line: &str) -> Result<TraceEntry, String> {
    let mut parts = line.split(' ');
    if parts.next() != Some("E") {
        return Err(format!("invalid entry line: {}", line));
    }
    let index = parse_u64(parts.next(), "index")?;
    let time = VirtualTime::new(f64::from_bits(parse_bits(parts.next(), "time")?));
    let event = EventId::new(parse_u64(parts.next(), "event")?);
    let class = parse_class(parts.next())?;
    let disposition = match parts.next() {
        Some("admit") => Disposition::Admitted(parse_server(parts.next())?),
        Some("block") => Disposition::Blocked,
        Some("depart") => Disposition::Departed(parse_server(parts.next())?),
        other => return Err(format!("unknown disposition: {:?}", other)),
    };
    Ok(TraceEntry {
        index,
        outcome: StepOutcome {
            event,
            class,
            time,
            disposition,
        },
    })
}

fn parse_checkpoint(line: &str) -> Result<Checkpoint, String> {
    let mut parts = line.split(' ');
    if parts.next() != Some("C") {
        return Err(format!("invalid checkpoint: {}", line));
    }
    let event_index = parse_u64(parts.next(), "index")?;
    let time = VirtualTime::new(f64::from_bits(parse_bits(parts.next(), "time")?));
    let busy = parse_u64(parts.next(), "busy")?;
    let blocked = parse_u64(parts.next(), "blocked")?;
    let state_hash = parse_bits(parts.next(), "hash")?;
    Ok(Checkpoint {
        event_index,
        time,
        busy,
        blocked,
        state_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: u64, t: f64, disposition: Disposition) -> StepOutcome {
        StepOutcome {
            event: EventId::new(id),
            class: TrafficClass::Handover,
            time: VirtualTime::new(t),
            disposition,
        }
    }

    fn sample() -> RunTrace {
        let mut trace = RunTrace::with_checkpoint_interval(2);
        trace.record(outcome(0, 0.0, Disposition::Admitted(ServerId::new(1))));
        trace.record(outcome(1, 0.75, Disposition::Blocked));
        trace.add_checkpoint(Checkpoint::new(2, VirtualTime::new(0.75), 1, 1));
        trace.record(outcome(0, 3.1, Disposition::Departed(ServerId::new(1))));
        trace
    }

    #[test]
    fn test_record_assigns_indices() {
        let trace = sample();
        let idx: Vec<u64> = trace.entries().iter().map(|e| e.index).collect();
        assert_eq!(idx, vec![0, 1, 2]);
        assert_eq!(trace.len(), 3);
        assert!(trace.is_time_ordered());
    }

    #[test]
    fn test_should_checkpoint() {
        let trace = RunTrace::with_checkpoint_interval(5);
        assert!(!trace.should_checkpoint(4));
        assert!(trace.should_checkpoint(5));
        assert!(!RunTrace::new().should_checkpoint(5));
    }

    #[test]
    fn test_hash_sensitive_to_order() {
        let a = sample();
        let mut b = RunTrace::new();
        for entry in a.entries().iter().rev() {
            b.record(entry.outcome.clone());
        }
        assert_ne!(a.trace_hash(), b.trace_hash());
        assert_eq!(a.trace_hash(), sample().trace_hash());
    }

    #[test]
    fn test_export_import_is_exact() {
        let trace = sample();
        let mut buf = Vec::new();
        trace.export(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("# CALLSIM TRACE v1"));
        assert!(text.contains(" handover block"));

        let back = RunTrace::import(buf.as_slice()).unwrap();
        assert!(traces_match(&trace, &back));
        assert!(checkpoints_match(&trace, &back));
        assert_eq!(trace.trace_hash(), back.trace_hash());
    }

    #[test]
    fn test_import_rejects_garbage() {
        let err = RunTrace::import("E 0 zz 1 single block\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(RunTrace::import("X nope\n".as_bytes()).is_err());
    }
}
