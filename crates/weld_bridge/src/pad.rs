//! Pad adaptation: turning physical pads into guest capabilities.
//!
//! [`PadAdapter::adapt`] walks a [`PadDescriptor`] and, for every leaf,
//! synthesizes the host primitives its (direction, rate) needs, imports the
//! resulting logical signals into the guest, and returns a
//! [`CapabilityNode`] of the same shape. Which members a leaf exposes comes
//! from [`pad_roles`]; which primitives back them is decided here.
//!
//! Active-low pads invert their data members at the bridge. Clocks and
//! output enables are never inverted.

use crate::bridge::{AdaptedPad, SignalBridge};
use crate::capability::{CapabilityBody, CapabilityNode};
use crate::error::BridgeError;
use crate::signature::{Member, Signature};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use weld_common::{pad_roles, DirSpec, Direction, FieldSpec, Flow, RateSpec, Role, Shape};
use weld_host::{HostExpr, HostModule, HostSignalId, Special};

/// A physical pad as handed out by a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadDescriptor {
    /// A single physical signal.
    Leaf {
        /// The host signal wired to the pins.
        signal: HostSignalId,
        /// Width in bits.
        width: u32,
        /// Whether the pins are active-low.
        inverted: bool,
    },
    /// Named subsignals in layout order.
    Aggregate(IndexMap<String, PadDescriptor>),
}

/// Adapts pads into capabilities, registering every exposed signal with a bridge.
pub struct PadAdapter<'b> {
    bridge: &'b mut SignalBridge,
}

impl<'b> PadAdapter<'b> {
    /// Creates an adapter working on `bridge`.
    pub fn new(bridge: &'b mut SignalBridge) -> Self {
        Self { bridge }
    }

    /// Adapts `pad`, naming guest signals `{name}_{role}`.
    ///
    /// An absent direction leaves the pad unadapted; an absent rate is 0.
    /// Adapting the same leaf again with the same parameters returns the
    /// first capability and synthesizes nothing.
    pub fn adapt(
        &mut self,
        name: &str,
        pad: &PadDescriptor,
        dir: Option<&DirSpec>,
        rate: Option<&RateSpec>,
    ) -> Result<CapabilityNode, BridgeError> {
        self.bridge.ensure_collecting("adapt a pad")?;
        match pad {
            PadDescriptor::Leaf {
                signal,
                width,
                inverted,
            } => {
                let direction = uniform(name, dir)?.unwrap_or_default();
                let rate = uniform(name, rate)?.unwrap_or(0);
                self.adapt_leaf(name, *signal, *width, *inverted, direction, rate)
            }
            PadDescriptor::Aggregate(fields) => self.adapt_aggregate(name, fields, dir, rate),
        }
    }

    fn adapt_aggregate(
        &mut self,
        name: &str,
        fields: &IndexMap<String, PadDescriptor>,
        dir: Option<&DirSpec>,
        rate: Option<&RateSpec>,
    ) -> Result<CapabilityNode, BridgeError> {
        check_field_names(name, fields, dir)?;
        check_field_names(name, fields, rate)?;
        let dirs = FieldSpec::normalize(dir, fields.keys().map(String::as_str));
        let rates = FieldSpec::normalize(rate, fields.keys().map(String::as_str));

        let mut signature = Signature::new();
        let mut children = IndexMap::new();
        for (field, sub) in fields {
            let child = self.adapt(
                &format!("{name}_{field}"),
                sub,
                dirs.get(field).and_then(Option::as_ref),
                rates.get(field).and_then(Option::as_ref),
            )?;
            signature.add(
                field.clone(),
                Member::Interface {
                    flow: Flow::Out,
                    signature: child.signature().clone(),
                },
            );
            children.insert(field.clone(), child);
        }

        let node = CapabilityNode::new(
            name.to_string(),
            signature,
            CapabilityBody::Aggregate(children),
        );
        node.check(self.bridge.guest())?;
        Ok(node)
    }

    fn adapt_leaf(
        &mut self,
        name: &str,
        pad: HostSignalId,
        width: u32,
        inverted: bool,
        direction: Direction,
        rate: u8,
    ) -> Result<CapabilityNode, BridgeError> {
        let roles = pad_roles(direction, rate)?;
        if roles.is_empty() {
            return Ok(CapabilityNode::new(
                name.to_string(),
                Signature::new(),
                CapabilityBody::Leaf(BTreeMap::new()),
            ));
        }

        if let Some(done) = self.bridge.pads.get(&pad) {
            if (done.direction, done.rate) == (direction, rate) {
                return Ok(done.node.clone());
            }
            return Err(BridgeError::PadConflict {
                name: done.node.name().to_string(),
                direction: done.direction,
                rate: done.rate,
                requested_direction: direction,
                requested_rate: rate,
            });
        }

        let pad_shape = Shape {
            width,
            signed: self.bridge.host().signal(pad).shape.signed,
        };
        let logical = synthesize(self.bridge.host_mut(), name, pad, direction, rate);

        let mut signals = BTreeMap::new();
        for &role in roles {
            let host = logical.get(&role).copied().ok_or_else(|| {
                weld_common::InternalError::new(format!(
                    "no host signal synthesized for '{name}_{role}'"
                ))
            })?;
            let guest = self.bridge.import_from_host(
                host,
                Some(&format!("{name}_{role}")),
                inverted && role.is_data(),
            )?;
            signals.insert(role, guest);
        }

        let node = CapabilityNode::new(
            name.to_string(),
            Signature::for_roles(roles, pad_shape),
            CapabilityBody::Leaf(signals),
        );
        node.check(self.bridge.guest())?;
        log::debug!(
            "adapted pad '{name}' as '{direction}' at rate {rate}{}",
            if inverted { " (active-low)" } else { "" }
        );
        self.bridge.pads.insert(
            pad,
            AdaptedPad {
                direction,
                rate,
                node: node.clone(),
            },
        );
        Ok(node)
    }
}

/// Reads a spec that must be scalar because it applies to a single pad.
fn uniform<T: Copy>(name: &str, spec: Option<&FieldSpec<T>>) -> Result<Option<T>, BridgeError> {
    match spec {
        None => Ok(None),
        Some(FieldSpec::Uniform(value)) => Ok(Some(*value)),
        Some(FieldSpec::Fields(_)) => Err(BridgeError::SpecShape {
            name: name.to_string(),
        }),
    }
}

/// Rejects per-field specs naming fields the aggregate does not have.
fn check_field_names<T>(
    name: &str,
    fields: &IndexMap<String, PadDescriptor>,
    spec: Option<&FieldSpec<T>>,
) -> Result<(), BridgeError> {
    if let Some(FieldSpec::Fields(map)) = spec {
        if let Some(unknown) = map.keys().find(|k| !fields.contains_key(*k)) {
            return Err(BridgeError::MissingMember {
                node: name.to_string(),
                member: unknown.clone(),
            });
        }
    }
    Ok(())
}

/// Builds the host primitives for one leaf and returns the host signal behind each role.
///
/// Rate 0 inputs and outputs use the pad itself. Tristates take a single
/// enable bit replicated across the pad.
fn synthesize(
    host: &mut HostModule,
    name: &str,
    pad: HostSignalId,
    direction: Direction,
    rate: u8,
) -> BTreeMap<Role, HostSignalId> {
    let width = host.signal(pad).width();
    let like =
        |host: &mut HostModule, suffix: &str| host.signal_like(pad, format!("{name}_{suffix}"));
    let bit = |host: &mut HostModule, suffix: &str| {
        host.add_signal(format!("{name}_{suffix}"), Shape::unsigned(1))
    };
    let tristate = |host: &mut HostModule, o: HostSignalId, oe: HostSignalId, i: HostSignalId| {
        host.add_special(Special::Tristate {
            target: pad,
            o,
            oe: HostExpr::Replicate {
                bit: oe,
                count: width,
            },
            i,
        });
    };

    let mut out = BTreeMap::new();
    match (direction, rate) {
        (Direction::Input, 0) => {
            out.insert(Role::I, pad);
        }
        (Direction::Output, 0) => {
            out.insert(Role::O, pad);
        }
        (Direction::InOut, 0) | (Direction::OutputEnable, 0) => {
            let i = like(host, "i");
            let o = like(host, "o");
            let oe = bit(host, "oe");
            tristate(host, o, oe, i);
            if direction == Direction::InOut {
                out.insert(Role::I, i);
            }
            out.insert(Role::O, o);
            out.insert(Role::Oe, oe);
        }
        (Direction::Input, 1) => {
            let i = like(host, "i");
            let clk = bit(host, "i_clk");
            host.add_special(Special::SdrInput { i: pad, o: i, clk });
            out.insert(Role::I, i);
            out.insert(Role::IClk, clk);
        }
        (Direction::Output, 1) => {
            let o = like(host, "o");
            let clk = bit(host, "o_clk");
            host.add_special(Special::SdrOutput { i: o, o: pad, clk });
            out.insert(Role::O, o);
            out.insert(Role::OClk, clk);
        }
        (Direction::InOut, 1) | (Direction::OutputEnable, 1) => {
            let pad_i = like(host, "pad_i");
            let pad_o = like(host, "pad_o");
            let oe = bit(host, "oe");
            tristate(host, pad_o, oe, pad_i);
            if direction == Direction::InOut {
                let i = like(host, "i");
                let i_clk = bit(host, "i_clk");
                host.add_special(Special::SdrInput {
                    i: pad_i,
                    o: i,
                    clk: i_clk,
                });
                out.insert(Role::I, i);
                out.insert(Role::IClk, i_clk);
            }
            let o = like(host, "o");
            let o_clk = bit(host, "o_clk");
            host.add_special(Special::SdrOutput {
                i: o,
                o: pad_o,
                clk: o_clk,
            });
            out.insert(Role::O, o);
            out.insert(Role::Oe, oe);
            out.insert(Role::OClk, o_clk);
        }
        (Direction::Input, 2) => {
            let i0 = like(host, "i0");
            let i1 = like(host, "i1");
            let clk = bit(host, "i_clk");
            host.add_special(Special::DdrInput {
                i: pad,
                o1: i0,
                o2: i1,
                clk,
            });
            out.insert(Role::I0, i0);
            out.insert(Role::I1, i1);
            out.insert(Role::IClk, clk);
        }
        (Direction::Output, 2) => {
            let o0 = like(host, "o0");
            let o1 = like(host, "o1");
            let clk = bit(host, "o_clk");
            host.add_special(Special::DdrOutput {
                i1: o0,
                i2: o1,
                o: pad,
                clk,
            });
            out.insert(Role::O0, o0);
            out.insert(Role::O1, o1);
            out.insert(Role::OClk, clk);
        }
        // The decision table has already rejected every other pair.
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use weld_host::HostModule;

    fn bridge_with_pad(width: u32) -> (SignalBridge, PadDescriptor) {
        let mut bridge = SignalBridge::new("core", HostModule::new("top"));
        let signal = bridge
            .host_mut()
            .add_signal("pad", Shape::unsigned(width));
        let pad = PadDescriptor::Leaf {
            signal,
            width,
            inverted: false,
        };
        (bridge, pad)
    }

    fn member_names(node: &CapabilityNode) -> Vec<&str> {
        let mut names: Vec<_> = node.signature().members().map(|(n, _)| n).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn every_table_cell() {
        let directions = [
            Direction::None,
            Direction::Input,
            Direction::Output,
            Direction::InOut,
            Direction::OutputEnable,
        ];
        for direction in directions {
            for rate in 0..=3u8 {
                let (mut bridge, pad) = bridge_with_pad(4);
                let result = PadAdapter::new(&mut bridge).adapt(
                    "pad_x",
                    &pad,
                    Some(&direction.into()),
                    Some(&rate.into()),
                );
                match pad_roles(direction, rate) {
                    Ok(roles) => {
                        let node = result.unwrap();
                        let mut expected: Vec<_> = roles.iter().map(|r| r.as_str()).collect();
                        expected.sort_unstable();
                        assert_eq!(member_names(&node), expected, "{direction} at {rate}");
                        assert_eq!(bridge.connections().len(), roles.len());
                    }
                    Err(_) => {
                        assert!(
                            matches!(result, Err(BridgeError::UnsupportedPad(_))),
                            "{direction} at {rate} should be rejected"
                        );
                        assert!(bridge.host().specials.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn primitive_counts() {
        let cases: [(Direction, u8, usize, usize); 8] = [
            (Direction::Input, 0, 0, 0),
            (Direction::Output, 1, 0, 1),
            (Direction::InOut, 0, 1, 0),
            (Direction::InOut, 1, 1, 2),
            (Direction::OutputEnable, 0, 1, 0),
            (Direction::OutputEnable, 1, 1, 1),
            (Direction::Input, 2, 0, 1),
            (Direction::Output, 2, 0, 1),
        ];
        for (direction, rate, tristates, syncs) in cases {
            let (mut bridge, pad) = bridge_with_pad(8);
            PadAdapter::new(&mut bridge)
                .adapt("pad_x", &pad, Some(&direction.into()), Some(&rate.into()))
                .unwrap();
            let specials = &bridge.host().specials;
            let t = specials
                .iter()
                .filter(|s| matches!(s, Special::Tristate { .. }))
                .count();
            let s = specials.iter().filter(|s| s.is_synchronizer()).count();
            assert_eq!((t, s), (tristates, syncs), "{direction} at {rate}");
        }
    }

    #[test]
    fn rate_zero_uses_pad_directly() {
        let (mut bridge, pad) = bridge_with_pad(1);
        let node = PadAdapter::new(&mut bridge)
            .adapt("pad_led", &pad, Some(&Direction::Output.into()), None)
            .unwrap();
        let o = node.signal(Role::O).unwrap();
        assert_eq!(bridge.guest().signal(o).name, "pad_led_o");
        let PadDescriptor::Leaf { signal, .. } = pad else {
            unreachable!()
        };
        assert_eq!(bridge.source_of(o), Some(signal));
    }

    #[test]
    fn tristate_enable_is_one_bit_replicated() {
        let (mut bridge, pad) = bridge_with_pad(8);
        let node = PadAdapter::new(&mut bridge)
            .adapt("pad_dq", &pad, Some(&Direction::InOut.into()), None)
            .unwrap();
        let oe = node.signal(Role::Oe).unwrap();
        assert_eq!(bridge.guest().signal(oe).shape, Shape::unsigned(1));
        let host_oe = bridge.source_of(oe).unwrap();
        match &bridge.host().specials[0] {
            Special::Tristate { oe, .. } => assert_eq!(
                *oe,
                HostExpr::Replicate {
                    bit: host_oe,
                    count: 8
                }
            ),
            other => panic!("expected tristate, got {other:?}"),
        }
    }

    #[test]
    fn active_low_inverts_data_only() {
        let mut bridge = SignalBridge::new("core", HostModule::new("top"));
        let signal = bridge.host_mut().add_signal("pad", Shape::unsigned(2));
        let pad = PadDescriptor::Leaf {
            signal,
            width: 2,
            inverted: true,
        };
        PadAdapter::new(&mut bridge)
            .adapt("pad_x", &pad, Some(&Direction::InOut.into()), Some(&1u8.into()))
            .unwrap();
        let inverted: Vec<_> = bridge
            .connections()
            .iter()
            .filter(|c| c.invert)
            .map(|c| bridge.host().signal(c.source).name.as_str())
            .collect();
        assert_eq!(inverted, vec!["pad_x_i", "pad_x_o"]);
    }

    #[test]
    fn repeated_adaptation_is_cached() {
        let (mut bridge, pad) = bridge_with_pad(8);
        let dir = DirSpec::from(Direction::InOut);
        let rate = RateSpec::from(1u8);
        let first = PadAdapter::new(&mut bridge)
            .adapt("pad_dq", &pad, Some(&dir), Some(&rate))
            .unwrap();
        let specials = bridge.host().specials.len();
        let connections = bridge.connections().len();
        let second = PadAdapter::new(&mut bridge)
            .adapt("pad_dq", &pad, Some(&dir), Some(&rate))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(bridge.host().specials.len(), specials);
        assert_eq!(bridge.connections().len(), connections);

        let err = PadAdapter::new(&mut bridge)
            .adapt("pad_dq", &pad, Some(&Direction::Input.into()), None)
            .unwrap_err();
        assert!(matches!(err, BridgeError::PadConflict { .. }));
    }

    #[test]
    fn per_field_spec_on_leaf_is_rejected() {
        let (mut bridge, pad) = bridge_with_pad(1);
        let dir = DirSpec::fields([("x", Direction::Input.into())]);
        let err = PadAdapter::new(&mut bridge)
            .adapt("pad_led", &pad, Some(&dir), None)
            .unwrap_err();
        assert!(matches!(err, BridgeError::SpecShape { .. }));
    }

    #[test]
    fn unknown_field_in_spec_is_rejected() {
        let (mut bridge, pad) = bridge_with_pad(1);
        let aggregate = PadDescriptor::Aggregate(IndexMap::from([("tx".to_string(), pad)]));
        let dir = DirSpec::fields([("rx", Direction::Input.into())]);
        let err = PadAdapter::new(&mut bridge)
            .adapt("pad_uart", &aggregate, Some(&dir), None)
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingMember { ref member, .. } if member == "rx"));
    }

    #[test]
    fn absent_direction_exposes_nothing() {
        let (mut bridge, pad) = bridge_with_pad(4);
        let node = PadAdapter::new(&mut bridge)
            .adapt("pad_x", &pad, None, Some(&2u8.into()))
            .unwrap();
        assert!(node.is_empty());
        assert!(bridge.connections().is_empty());
    }

    #[test]
    fn adapting_after_emit_is_rejected() {
        let (mut bridge, pad) = bridge_with_pad(1);
        bridge.emit().unwrap();
        let err = PadAdapter::new(&mut bridge)
            .adapt("pad_x", &pad, Some(&Direction::Input.into()), None)
            .unwrap_err();
        assert!(matches!(err, BridgeError::PhaseViolation { .. }));
    }
}
