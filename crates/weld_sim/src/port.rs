//! Run-time behavior of adapted pads.
//!
//! A [`SimPort`] connects a simulated physical port to the logical signals
//! of a [`SimPin`]. One passive process is spawned per active direction,
//! sampling or driving the port with the same rate semantics the pad
//! adapter synthesizes in hardware:
//!
//! - rate 0 follows every change;
//! - rate 1 transfers one sample per rising edge of the pin's clock;
//! - rate 2 transfers two samples per cycle, one per clock phase, through a
//!   short pipeline.
//!
//! Active-low pins complement data crossing the port.

use std::collections::BTreeMap;

use weld_common::{pad_roles, Direction, Role, Shape};

use crate::error::SimError;
use crate::kernel::{Process, ProcessContext, Simulator, Wait};
use crate::value::SimSignalId;

/// The logical side of a simulated pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPin {
    /// Name prefix of the pin signals.
    pub name: String,
    /// The simulated physical port.
    pub port: SimSignalId,
    /// Which way data flows.
    pub direction: Direction,
    /// Samples per clock cycle.
    pub rate: u8,
    /// Whether the port is active-low.
    pub invert: bool,
    /// Logical signals by role.
    pub signals: BTreeMap<Role, SimSignalId>,
}

impl SimPin {
    /// Returns the signal of a role, if the pin has one.
    pub fn signal(&self, role: Role) -> Option<SimSignalId> {
        self.signals.get(&role).copied()
    }

    fn require(&self, role: Role) -> Result<SimSignalId, SimError> {
        self.signal(role).ok_or_else(|| SimError::MissingPinSignal {
            pin: self.name.clone(),
            role,
        })
    }
}

/// Spawns the processes that animate a [`SimPin`].
pub struct SimPort;

impl SimPort {
    /// Registers one process per active direction of `pin` with `sim`.
    ///
    /// Returns the number of processes spawned.
    pub fn spawn(sim: &mut Simulator, pin: &SimPin) -> Result<usize, SimError> {
        pad_roles(pin.direction, pin.rate)?;
        let port = pin.port;
        let mask = if pin.invert {
            Shape::unsigned(sim.signal(port).width).mask()
        } else {
            0
        };

        let mut processes: Vec<Box<dyn Process>> = Vec::new();
        if pin.direction.has_input() {
            processes.push(match pin.rate {
                0 => Box::new(Direct {
                    from: port,
                    to: pin.require(Role::I)?,
                    mask,
                }),
                1 => Box::new(Clocked {
                    clk: pin.require(Role::IClk)?,
                    from: port,
                    to: pin.require(Role::I)?,
                    mask,
                }),
                _ => Box::new(DoubleRateInput {
                    clk: pin.require(Role::IClk)?,
                    port,
                    i0: pin.require(Role::I0)?,
                    i1: pin.require(Role::I1)?,
                    mask,
                    rise: 0,
                    fall: 0,
                    phase: Phase::Rise,
                }),
            });
        }
        if pin.direction.has_output() {
            processes.push(match pin.rate {
                0 => Box::new(Direct {
                    from: pin.require(Role::O)?,
                    to: port,
                    mask,
                }),
                1 => Box::new(Clocked {
                    clk: pin.require(Role::OClk)?,
                    from: pin.require(Role::O)?,
                    to: port,
                    mask,
                }),
                _ => Box::new(DoubleRateOutput {
                    clk: pin.require(Role::OClk)?,
                    port,
                    o0: pin.require(Role::O0)?,
                    o1: pin.require(Role::O1)?,
                    mask,
                    lane0: [0; 2],
                    lane1: [0; 2],
                    second_half: 0,
                    phase: Phase::Rise,
                }),
            });
        }

        let count = processes.len();
        for process in processes {
            sim.add_process(process);
        }
        Ok(count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Rise,
    Fall,
}

/// Rate 0: mirrors every change of `from` onto `to`.
struct Direct {
    from: SimSignalId,
    to: SimSignalId,
    mask: u64,
}

impl Process for Direct {
    fn start(&mut self) -> Wait {
        Wait::Changed(self.from)
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Wait {
        let value = ctx.get(self.from);
        ctx.set(self.to, value ^ self.mask);
        Wait::Changed(self.from)
    }
}

/// Rate 1: copies `from` to `to` on each rising edge of `clk`.
struct Clocked {
    clk: SimSignalId,
    from: SimSignalId,
    to: SimSignalId,
    mask: u64,
}

impl Process for Clocked {
    fn start(&mut self) -> Wait {
        Wait::Level(self.clk, 1)
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Wait {
        let value = ctx.get(self.from);
        ctx.set(self.to, value ^ self.mask);
        Wait::Level(self.clk, 1)
    }
}

/// Rate 2 input.
///
/// The port is sampled on both edges. At each rising edge the previous
/// cycle's two samples are presented: the rising one on `i0`, the falling
/// one on `i1`.
struct DoubleRateInput {
    clk: SimSignalId,
    port: SimSignalId,
    i0: SimSignalId,
    i1: SimSignalId,
    mask: u64,
    rise: u64,
    fall: u64,
    phase: Phase,
}

impl Process for DoubleRateInput {
    fn start(&mut self) -> Wait {
        Wait::Level(self.clk, 1)
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Wait {
        match self.phase {
            Phase::Rise => {
                let previous = std::mem::replace(&mut self.rise, ctx.get(self.port));
                ctx.set(self.i0, previous ^ self.mask);
                ctx.set(self.i1, self.fall ^ self.mask);
                self.phase = Phase::Fall;
                Wait::Level(self.clk, 0)
            }
            Phase::Fall => {
                self.fall = ctx.get(self.port);
                self.phase = Phase::Rise;
                Wait::Level(self.clk, 1)
            }
        }
    }
}

/// Rate 2 output.
///
/// Each lane is a two-deep queue sampled at the rising edge. The head of
/// lane 0 is driven for the high half of the cycle and the head of lane 1
/// for the low half, so a sample reaches the port two cycles after it was
/// sampled.
struct DoubleRateOutput {
    clk: SimSignalId,
    port: SimSignalId,
    o0: SimSignalId,
    o1: SimSignalId,
    mask: u64,
    lane0: [u64; 2],
    lane1: [u64; 2],
    second_half: u64,
    phase: Phase,
}

impl Process for DoubleRateOutput {
    fn start(&mut self) -> Wait {
        Wait::Level(self.clk, 1)
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Wait {
        match self.phase {
            Phase::Rise => {
                let first_half = shift(&mut self.lane0, ctx.get(self.o0));
                ctx.set(self.port, first_half ^ self.mask);
                self.second_half = shift(&mut self.lane1, ctx.get(self.o1));
                self.phase = Phase::Fall;
                Wait::Level(self.clk, 0)
            }
            Phase::Fall => {
                ctx.set(self.port, self.second_half ^ self.mask);
                self.phase = Phase::Rise;
                Wait::Level(self.clk, 1)
            }
        }
    }
}

/// Pushes `value` into a two-deep queue and returns the value shifted out.
fn shift(queue: &mut [u64; 2], value: u64) -> u64 {
    let out = queue[0];
    *queue = [queue[1], value];
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(sim: &mut Simulator, direction: Direction, rate: u8, width: u32, invert: bool) -> SimPin {
        let port = sim.add_signal("port", width).unwrap();
        let mut signals = BTreeMap::new();
        for &role in pad_roles(direction, rate).unwrap() {
            let id = sim.add_signal(format!("pin_{role}"), role.width(width)).unwrap();
            signals.insert(role, id);
        }
        SimPin {
            name: "pin".into(),
            port,
            direction,
            rate,
            invert,
            signals,
        }
    }

    #[test]
    fn spawns_one_process_per_direction() {
        let mut sim = Simulator::new();
        let cases = [
            (Direction::None, 0, 0),
            (Direction::Input, 1, 1),
            (Direction::Output, 2, 1),
            (Direction::InOut, 1, 2),
            (Direction::OutputEnable, 0, 1),
        ];
        for (direction, rate, expected) in cases {
            let p = pin(&mut sim, direction, rate, 2, false);
            assert_eq!(SimPort::spawn(&mut sim, &p).unwrap(), expected, "{direction}");
        }
    }

    #[test]
    fn unsupported_and_incomplete_pins() {
        let mut sim = Simulator::new();
        let mut p = pin(&mut sim, Direction::Input, 1, 1, false);
        p.rate = 3;
        assert!(matches!(
            SimPort::spawn(&mut sim, &p),
            Err(SimError::UnsupportedPin(_))
        ));
        p.rate = 1;
        p.signals.remove(&Role::IClk);
        assert!(matches!(
            SimPort::spawn(&mut sim, &p),
            Err(SimError::MissingPinSignal {
                role: Role::IClk,
                ..
            })
        ));
    }

    #[test]
    fn direct_input_follows_changes_inverted() {
        let mut sim = Simulator::new();
        let p = pin(&mut sim, Direction::Input, 0, 4, true);
        SimPort::spawn(&mut sim, &p).unwrap();
        let i = p.signal(Role::I).unwrap();
        sim.set(p.port, 0b1010).unwrap();
        sim.settle().unwrap();
        assert_eq!(sim.get(i), 0b0101);
        sim.set(p.port, 0b1111).unwrap();
        sim.settle().unwrap();
        assert_eq!(sim.get(i), 0);
    }

    #[test]
    fn direct_output_follows_changes() {
        let mut sim = Simulator::new();
        let p = pin(&mut sim, Direction::Output, 0, 8, false);
        SimPort::spawn(&mut sim, &p).unwrap();
        sim.set(p.signal(Role::O).unwrap(), 0x3c).unwrap();
        sim.settle().unwrap();
        assert_eq!(sim.get(p.port), 0x3c);
    }

    #[test]
    fn clocked_input_samples_on_rising_edge() {
        let mut sim = Simulator::new();
        let p = pin(&mut sim, Direction::Input, 1, 1, false);
        SimPort::spawn(&mut sim, &p).unwrap();
        let (i, clk) = (p.signal(Role::I).unwrap(), p.signal(Role::IClk).unwrap());
        sim.set(p.port, 1).unwrap();
        sim.settle().unwrap();
        assert_eq!(sim.get(i), 0);
        sim.tick(clk).unwrap();
        assert_eq!(sim.get(i), 1);
    }

    #[test]
    fn double_rate_input_lanes() {
        let mut sim = Simulator::new();
        let p = pin(&mut sim, Direction::Input, 2, 8, false);
        SimPort::spawn(&mut sim, &p).unwrap();
        let clk = p.signal(Role::IClk).unwrap();
        let (i0, i1) = (p.signal(Role::I0).unwrap(), p.signal(Role::I1).unwrap());

        // Cycle 1: 0x11 on the high phase, 0x22 on the low phase.
        sim.set(p.port, 0x11).unwrap();
        sim.settle().unwrap();
        sim.set(clk, 1).unwrap();
        sim.settle().unwrap();
        sim.set(p.port, 0x22).unwrap();
        sim.settle().unwrap();
        sim.set(clk, 0).unwrap();
        sim.settle().unwrap();
        assert_eq!((sim.get(i0), sim.get(i1)), (0, 0));

        // Cycle 2 presents cycle 1's pair.
        sim.set(p.port, 0x33).unwrap();
        sim.settle().unwrap();
        sim.set(clk, 1).unwrap();
        sim.settle().unwrap();
        assert_eq!((sim.get(i0), sim.get(i1)), (0x11, 0x22));
    }

    #[test]
    fn double_rate_output_lanes() {
        let mut sim = Simulator::new();
        let p = pin(&mut sim, Direction::Output, 2, 4, true);
        SimPort::spawn(&mut sim, &p).unwrap();
        let clk = p.signal(Role::OClk).unwrap();
        let (o0, o1) = (p.signal(Role::O0).unwrap(), p.signal(Role::O1).unwrap());

        sim.set(o0, 0x1).unwrap();
        sim.set(o1, 0x2).unwrap();
        sim.settle().unwrap();
        let mut seen = Vec::new();
        for _ in 0..3 {
            sim.set(clk, 1).unwrap();
            sim.settle().unwrap();
            seen.push(sim.get(p.port) ^ 0xf);
            sim.set(clk, 0).unwrap();
            sim.settle().unwrap();
            seen.push(sim.get(p.port) ^ 0xf);
        }
        // Two cycles of queue latency, then the first pair.
        assert_eq!(seen, vec![0, 0, 0, 0, 0x1, 0x2]);
    }
}
