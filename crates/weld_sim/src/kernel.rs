//! Delta-cycle simulation kernel with passive wait-driven processes.
//!
//! Writes, whether from the testbench or from a process, are queued and
//! committed together at the start of the next delta cycle. After a commit,
//! every process whose wait is satisfied by the changed signals is resumed
//! once, in registration order; whatever it writes becomes visible only at
//! the following commit. [`Simulator::settle`] repeats this until no writes
//! are queued. Processes are passive: a waiting process never keeps the
//! simulation running on its own.

use indexmap::IndexMap;
use std::collections::HashSet;
use weld_common::Arena;

use crate::error::SimError;
use crate::value::{SimSignal, SimSignalId};

/// Maximum delta cycles per [`Simulator::settle`] call (default).
pub const DEFAULT_MAX_DELTAS: u32 = 1000;

/// What a suspended process is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wait {
    /// Any change of the signal.
    Changed(SimSignalId),
    /// A change of the signal to exactly this value.
    Level(SimSignalId, u64),
}

/// A passive, non-terminating simulation process written as a state machine.
pub trait Process {
    /// Returns the first wait, before the process has run.
    fn start(&mut self) -> Wait;

    /// Runs the process after its wait fired and returns the next wait.
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Wait;
}

/// Signal access for a resumed process.
pub struct ProcessContext<'a> {
    signals: &'a Arena<SimSignalId, SimSignal>,
    pending: &'a mut IndexMap<SimSignalId, u64>,
}

impl ProcessContext<'_> {
    /// Reads a signal's committed value.
    pub fn get(&self, id: SimSignalId) -> u64 {
        self.signals[id].value
    }

    /// Queues a write, truncated to the signal's width.
    pub fn set(&mut self, id: SimSignalId, value: u64) {
        self.pending.insert(id, value & self.signals[id].mask());
    }
}

struct Slot {
    process: Box<dyn Process>,
    wait: Wait,
}

/// The simulator: signals, queued writes, and processes.
pub struct Simulator {
    signals: Arena<SimSignalId, SimSignal>,
    processes: Vec<Slot>,
    pending: IndexMap<SimSignalId, u64>,
    max_deltas: u32,
    total_deltas: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// Creates an empty simulator.
    pub fn new() -> Self {
        Self {
            signals: Arena::new(),
            processes: Vec::new(),
            pending: IndexMap::new(),
            max_deltas: DEFAULT_MAX_DELTAS,
            total_deltas: 0,
        }
    }

    /// Sets the maximum number of delta cycles per [`settle`](Self::settle).
    pub fn set_max_deltas(&mut self, max: u32) {
        self.max_deltas = max;
    }

    /// Adds a signal initialized to zero.
    pub fn add_signal(&mut self, name: impl Into<String>, width: u32) -> Result<SimSignalId, SimError> {
        let name = name.into();
        if width == 0 || width > 64 {
            return Err(SimError::InvalidWidth { name, width });
        }
        Ok(self.signals.alloc(SimSignal {
            name,
            width,
            value: 0,
        }))
    }

    /// Returns a signal by ID.
    pub fn signal(&self, id: SimSignalId) -> &SimSignal {
        &self.signals[id]
    }

    /// Finds a signal by name.
    pub fn find_signal(&self, name: &str) -> Option<SimSignalId> {
        self.signals
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(id, _)| id)
    }

    /// Number of signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Number of processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Total delta cycles run so far.
    pub fn total_deltas(&self) -> u64 {
        self.total_deltas
    }

    /// Registers a passive process; it first runs when its initial wait fires.
    pub fn add_process(&mut self, mut process: Box<dyn Process>) {
        let wait = process.start();
        self.processes.push(Slot { process, wait });
    }

    /// Reads a signal's committed value.
    pub fn get(&self, id: SimSignalId) -> u64 {
        self.signals[id].value
    }

    /// Queues a write; it takes effect at the next [`settle`](Self::settle).
    pub fn set(&mut self, id: SimSignalId, value: u64) -> Result<(), SimError> {
        let sig = &self.signals[id];
        if value & !sig.mask() != 0 {
            return Err(SimError::ValueTooWide {
                signal: sig.name.clone(),
                value,
                width: sig.width,
            });
        }
        self.pending.insert(id, value);
        Ok(())
    }

    /// Runs delta cycles until no writes are queued. Returns the number run.
    pub fn settle(&mut self) -> Result<u32, SimError> {
        let mut deltas = 0;
        while !self.pending.is_empty() {
            if deltas == self.max_deltas {
                return Err(SimError::DeltaCycleLimit {
                    max_deltas: self.max_deltas,
                });
            }
            deltas += 1;
            let changed = self.commit();
            self.wake(&changed);
        }
        self.total_deltas += u64::from(deltas);
        Ok(deltas)
    }

    /// Drives `clk` high, settles, drives it low, and settles again.
    pub fn tick(&mut self, clk: SimSignalId) -> Result<(), SimError> {
        self.set(clk, 1)?;
        self.settle()?;
        self.set(clk, 0)?;
        self.settle()?;
        Ok(())
    }

    fn commit(&mut self) -> HashSet<SimSignalId> {
        let mut changed = HashSet::new();
        for (id, value) in self.pending.drain(..) {
            let sig = &mut self.signals[id];
            if sig.value != value {
                sig.value = value;
                changed.insert(id);
            }
        }
        changed
    }

    fn wake(&mut self, changed: &HashSet<SimSignalId>) {
        let Self {
            signals,
            processes,
            pending,
            ..
        } = self;
        for slot in processes.iter_mut() {
            let fired = match slot.wait {
                Wait::Changed(id) => changed.contains(&id),
                Wait::Level(id, level) => changed.contains(&id) && signals[id].value == level,
            };
            if fired {
                let mut ctx = ProcessContext {
                    signals: &*signals,
                    pending: &mut *pending,
                };
                slot.wait = slot.process.resume(&mut ctx);
            }
        }
    }
}
