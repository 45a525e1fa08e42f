//! The signal bridge: connections between host and guest, guest code
//! generation, and the black-box instance that binds them.
//!
//! A [`SignalBridge`] moves through four phases. While collecting, host
//! signals are paired with guest targets. [`SignalBridge::emit`] generates
//! the guest netlist with exactly the connected targets as ports and records
//! the resulting [`PortMap`]. [`SignalBridge::build_instance`] turns every
//! connection into an instance port binding, inserting inverters for
//! active-low connections. [`SignalBridge::finalize`] does all of this on
//! behalf of a [`Platform`], writing the netlist where the platform wants it.

use crate::capability::CapabilityNode;
use crate::error::BridgeError;
use crate::port_map::PortMap;
use crate::proxy::Platform;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use weld_common::Direction;
use weld_guest::{convert, GuestModule, GuestRef, GuestSignalId, PortDirection, TOP_DOMAIN};
use weld_host::{HostExpr, HostModule, HostSignalId, Instance, Special};

/// Name of the host's default clock domain.
pub const HOST_TOP_DOMAIN: &str = "sys";

/// Where a bridge is in its one-shot lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Accepting connections.
    Collecting,
    /// The netlist and port map exist; connections are sealed.
    Emitted,
    /// The instance has been built.
    Instantiated,
    /// The instance is in the host module and the netlist is on disk.
    Finalized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Collecting => "collecting",
            Phase::Emitted => "emitted",
            Phase::Instantiated => "instantiated",
            Phase::Finalized => "finalized",
        })
    }
}

/// A pairing of a host signal with a guest target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// The host side.
    pub source: HostSignalId,
    /// The guest side.
    pub target: GuestRef,
    /// Whether the value is complemented when crossing.
    pub invert: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AdaptedPad {
    pub(crate) direction: Direction,
    pub(crate) rate: u8,
    pub(crate) node: CapabilityNode,
}

/// Owns the host module, the guest module, and the connections between them.
#[derive(Debug)]
pub struct SignalBridge {
    name: String,
    host: HostModule,
    guest: GuestModule,
    connections: Vec<ConnectionRecord>,
    phase: Phase,
    netlist: Option<String>,
    port_map: PortMap,
    pub(crate) pads: HashMap<HostSignalId, AdaptedPad>,
}

impl SignalBridge {
    /// Creates a bridge that will generate a guest module called `name`
    /// and instantiate it in `host`.
    pub fn new(name: impl Into<String>, host: HostModule) -> Self {
        Self {
            name: name.into(),
            host,
            guest: GuestModule::new(),
            connections: Vec::new(),
            phase: Phase::Collecting,
            netlist: None,
            port_map: PortMap::default(),
            pads: HashMap::new(),
        }
    }

    /// Name of the generated module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The host module.
    pub fn host(&self) -> &HostModule {
        &self.host
    }

    /// The host module, for adding host-side logic.
    pub fn host_mut(&mut self) -> &mut HostModule {
        &mut self.host
    }

    /// The guest module.
    pub fn guest(&self) -> &GuestModule {
        &self.guest
    }

    /// The guest module, for adding guest-side logic.
    pub fn guest_mut(&mut self) -> &mut GuestModule {
        &mut self.guest
    }

    /// All connections in registration order.
    pub fn connections(&self) -> &[ConnectionRecord] {
        &self.connections
    }

    /// The port map; empty until [`emit`](Self::emit).
    pub fn port_map(&self) -> &PortMap {
        &self.port_map
    }

    /// The generated netlist, once emitted.
    pub fn netlist(&self) -> Option<&str> {
        self.netlist.as_deref()
    }

    /// Returns the host signal connected to a guest signal, if any.
    pub fn source_of(&self, target: GuestSignalId) -> Option<HostSignalId> {
        self.connections
            .iter()
            .find(|c| c.target == GuestRef::Signal(target))
            .map(|c| c.source)
    }

    /// Consumes the bridge, returning the host module.
    pub fn into_host(self) -> HostModule {
        self.host
    }

    pub(crate) fn ensure_collecting(&self, operation: &'static str) -> Result<(), BridgeError> {
        self.ensure_phase(Phase::Collecting, operation)
    }

    fn ensure_phase(&self, expected: Phase, operation: &'static str) -> Result<(), BridgeError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(BridgeError::PhaseViolation {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Pairs a host signal with a guest target.
    ///
    /// Duplicate targets are accepted here and rejected by
    /// [`build_instance`](Self::build_instance).
    pub fn connect(
        &mut self,
        source: HostSignalId,
        target: impl Into<GuestRef>,
        invert: bool,
    ) -> Result<(), BridgeError> {
        self.ensure_collecting("connect")?;
        self.connections.push(ConnectionRecord {
            source,
            target: target.into(),
            invert,
        });
        Ok(())
    }

    /// Declares a guest clock domain driven by the host domain `name`.
    ///
    /// The host default domain `sys` becomes the guest default domain.
    pub fn declare_clock_domain(&mut self, name: &str) -> Result<(), BridgeError> {
        self.ensure_collecting("declare a clock domain")?;
        let guest_name = if name == HOST_TOP_DOMAIN {
            TOP_DOMAIN
        } else {
            name
        };
        self.guest.add_domain(guest_name)?;
        let clk = self.host.clock_signal(name);
        let rst = self.host.reset_signal(name);
        self.connect(clk, GuestRef::Clock(guest_name.to_string()), false)?;
        self.connect(rst, GuestRef::Reset(guest_name.to_string()), false)?;
        log::debug!("bridged clock domain '{name}' as '{guest_name}'");
        Ok(())
    }

    /// Creates a host signal shaped and named like a guest signal and connects them.
    pub fn import_from_guest(
        &mut self,
        signal: GuestSignalId,
        invert: bool,
    ) -> Result<HostSignalId, BridgeError> {
        self.ensure_collecting("import a guest signal")?;
        let guest = self.guest.signal(signal);
        let host = self.host.add_signal(guest.name.clone(), guest.shape);
        self.connect(host, signal, invert)?;
        Ok(host)
    }

    /// Creates a guest signal shaped like a host signal and connects them.
    ///
    /// The guest signal is called `name`, or takes the host signal's name.
    pub fn import_from_host(
        &mut self,
        signal: HostSignalId,
        name: Option<&str>,
        invert: bool,
    ) -> Result<GuestSignalId, BridgeError> {
        self.ensure_collecting("import a host signal")?;
        let host = self.host.signal(signal);
        let name = name.map_or_else(|| host.name.clone(), str::to_string);
        let guest = self.guest.add_signal(name, host.shape);
        self.connect(signal, guest, invert)?;
        Ok(guest)
    }

    /// Generates the guest netlist with exactly the connected targets as ports.
    ///
    /// Seals the connection list. Can only be called once.
    pub fn emit(&mut self) -> Result<&str, BridgeError> {
        self.ensure_collecting("emit")?;
        let ports: Vec<GuestRef> = self.connections.iter().map(|c| c.target.clone()).collect();
        let generated = convert(&self.guest, &self.name, &ports)?;
        self.port_map = PortMap::from_generated(&self.guest, &generated);
        self.phase = Phase::Emitted;
        log::info!(
            "generated module '{}' with {} ports",
            self.name,
            generated.ports.len()
        );
        Ok(self.netlist.insert(generated.text).as_str())
    }

    /// Binds every connection to its generated port.
    ///
    /// Labels are `{i|o}_{name}` from the guest's point of view. An inverted
    /// connection binds a fresh `{source}_inv` signal: for a guest input it
    /// is driven with the complement of the source, for a guest output the
    /// source is driven with its complement.
    pub fn build_instance(&mut self) -> Result<Instance, BridgeError> {
        self.ensure_phase(Phase::Emitted, "build the instance")?;

        let mut bindings = Vec::with_capacity(self.connections.len());
        let mut seen = BTreeMap::new();
        for (index, conn) in self.connections.iter().enumerate() {
            let info = self.port_map.lookup(&conn.target)?;
            let label = info.label();
            if seen.insert(label.clone(), index).is_some() {
                return Err(BridgeError::PortCollision { label });
            }
            bindings.push((label, info.direction, conn.source, conn.invert));
        }

        let mut instance = Instance::new(self.name.clone());
        for (label, direction, source, invert) in bindings {
            let bound = if invert {
                let name = format!("{}_inv", self.host.signal(source).name);
                let inv = self.host.signal_like(source, name);
                match direction {
                    PortDirection::Input => self.host.comb(inv, HostExpr::not(source)),
                    PortDirection::Output => self.host.comb(source, HostExpr::not(inv)),
                }
                inv
            } else {
                source
            };
            instance.ports.insert(label, bound);
        }
        self.phase = Phase::Instantiated;
        Ok(instance)
    }

    /// Writes the netlist to `{output_dir}/gateware/{name}.v`, registers it
    /// with the platform, and adds the instance to the host module.
    ///
    /// Emits first if that has not happened yet. The instance is built
    /// before anything is written, so a port collision leaves no file and
    /// no registered source behind. Returns the netlist path.
    pub fn finalize<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
    ) -> Result<PathBuf, BridgeError> {
        if self.phase == Phase::Collecting {
            self.emit()?;
        }
        self.ensure_phase(Phase::Emitted, "finalize")?;
        let instance = self.build_instance()?;

        let dir = platform.output_dir().join("gateware");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.v", self.name));
        std::fs::write(&path, self.netlist.as_deref().unwrap_or_default())?;
        platform.add_source(&path);

        self.host.add_special(Special::Instance(instance));
        self.phase = Phase::Finalized;
        log::info!("wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weld_common::Shape;
    use weld_guest::Expr;

    fn bridge() -> SignalBridge {
        SignalBridge::new("core", HostModule::new("top"))
    }

    #[test]
    fn imports_preserve_shape() {
        let mut b = bridge();
        let a = b.host_mut().add_signal("sample", Shape::signed(12));
        let g = b.import_from_host(a, None, false).unwrap();
        assert_eq!(b.guest().signal(g).name, "sample");
        assert_eq!(b.guest().signal(g).shape, Shape::signed(12));

        let back = b.import_from_guest(g, false).unwrap();
        assert_eq!(b.host().signal(back).shape, Shape::signed(12));
        assert_eq!(b.connections().len(), 2);
        assert_eq!(b.source_of(g), Some(a));
    }

    #[test]
    fn sys_domain_maps_to_guest_default() {
        let mut b = bridge();
        b.declare_clock_domain("sys").unwrap();
        assert!(b.guest().domain(TOP_DOMAIN).is_some());
        let clk = b.host_mut().clock_signal("sys");
        assert_eq!(
            b.connections()[0],
            ConnectionRecord {
                source: clk,
                target: GuestRef::Clock(TOP_DOMAIN.into()),
                invert: false,
            }
        );
        assert!(matches!(
            b.declare_clock_domain("sys"),
            Err(BridgeError::Guest(_))
        ));
    }

    #[test]
    fn domain_clock_binds_by_alias() {
        let mut b = bridge();
        b.declare_clock_domain("sys").unwrap();
        let q = b.guest_mut().add_signal("q", Shape::unsigned(1));
        b.guest_mut().sync(TOP_DOMAIN, q, !Expr::from(q));
        b.import_from_guest(q, false).unwrap();
        b.emit().unwrap();
        let inst = b.build_instance().unwrap();
        let labels: Vec<_> = inst.ports.keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["i_clk", "i_rst", "o_q"]);
    }

    #[test]
    fn unconnected_signals_are_not_ports() {
        let mut b = bridge();
        let a = b.host_mut().add_signal("a", Shape::unsigned(4));
        let g = b.import_from_host(a, Some("din"), false).unwrap();
        let hidden = b.guest_mut().add_signal("hidden", Shape::unsigned(4));
        b.guest_mut().comb(hidden, !Expr::from(g));
        let text = b.emit().unwrap().to_string();
        assert!(text.contains("input [3:0] din"));
        assert!(!text.contains("output [3:0] hidden"));
    }

    #[test]
    fn malformed_guest_logic_fails_emit() {
        let mut b = bridge();
        let a = b.host_mut().add_signal("a", Shape::unsigned(4));
        let g = b.import_from_host(a, None, false).unwrap();
        let y = b.guest_mut().add_signal("y", Shape::unsigned(2));
        b.guest_mut().comb(y, Expr::from(g).slice(3, 1));
        b.import_from_guest(y, false).unwrap();
        assert!(matches!(
            b.emit(),
            Err(BridgeError::Guest(weld_guest::GuestError::InvalidSlice { .. }))
        ));
        assert_eq!(b.phase(), Phase::Collecting);
    }

    #[test]
    fn collision_is_reported() {
        let mut b = bridge();
        let g = b.guest_mut().add_signal("x", Shape::unsigned(1));
        let a1 = b.host_mut().add_signal("a1", Shape::unsigned(1));
        let a2 = b.host_mut().add_signal("a2", Shape::unsigned(1));
        b.connect(a1, g, false).unwrap();
        b.connect(a2, g, false).unwrap();
        b.emit().unwrap();
        let err = b.build_instance().unwrap_err();
        assert!(matches!(err, BridgeError::PortCollision { ref label } if label == "i_x"));
        // Nothing was inserted before the collision was found.
        assert!(b.host().assignments.is_empty());
    }

    #[test]
    fn phases_are_enforced() {
        let mut b = bridge();
        let a = b.host_mut().add_signal("a", Shape::unsigned(1));
        assert!(matches!(
            b.build_instance(),
            Err(BridgeError::PhaseViolation {
                phase: Phase::Collecting,
                ..
            })
        ));
        b.import_from_host(a, None, false).unwrap();
        b.emit().unwrap();
        assert_eq!(b.phase(), Phase::Emitted);
        assert!(matches!(
            b.connect(a, GuestRef::Clock("x".into()), false),
            Err(BridgeError::PhaseViolation { .. })
        ));
        assert!(b.emit().is_err());
        assert!(b.import_from_host(a, None, false).is_err());
        b.build_instance().unwrap();
        assert!(matches!(
            b.build_instance(),
            Err(BridgeError::PhaseViolation {
                phase: Phase::Instantiated,
                ..
            })
        ));
    }

    #[test]
    fn collision_in_finalize_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = weld_config::load_config_from_str(&format!(
            "[bridge]\noutput_dir = {:?}\n",
            dir.path().display().to_string()
        ))
        .unwrap();
        let mut platform = crate::ConfigPlatform::new(config);

        let mut b = bridge();
        let g = b.guest_mut().add_signal("x", Shape::unsigned(1));
        let a1 = b.host_mut().add_signal("a1", Shape::unsigned(1));
        let a2 = b.host_mut().add_signal("a2", Shape::unsigned(1));
        b.connect(a1, g, false).unwrap();
        b.connect(a2, g, false).unwrap();

        assert!(matches!(
            b.finalize(&mut platform),
            Err(BridgeError::PortCollision { .. })
        ));
        assert!(platform.sources().is_empty());
        assert!(!dir.path().join("gateware").join("core.v").exists());
        assert_eq!(b.phase(), Phase::Emitted);
        assert!(b.host().specials.is_empty());
    }

    #[test]
    fn inverted_input_and_output() {
        let mut b = bridge();
        let pad_in = b.host_mut().add_signal("btn", Shape::unsigned(1));
        let din = b.import_from_host(pad_in, None, true).unwrap();
        let dout = b.guest_mut().add_signal("led", Shape::unsigned(1));
        b.guest_mut().comb(dout, din);
        let pad_out = b.import_from_guest(dout, true).unwrap();
        b.emit().unwrap();
        let inst = b.build_instance().unwrap();

        let in_bound = inst.port("i_btn").unwrap();
        let out_bound = inst.port("o_led").unwrap();
        assert_eq!(b.host().signal(in_bound).name, "btn_inv");
        assert_eq!(b.host().signal(out_bound).name, "led_inv");
        assert_eq!(
            b.host().driver(in_bound).unwrap().value,
            HostExpr::not(pad_in)
        );
        assert_eq!(
            b.host().driver(pad_out).unwrap().value,
            HostExpr::not(out_bound)
        );
    }
}
