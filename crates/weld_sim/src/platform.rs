//! Simulation resource manager.
//!
//! [`SimPlatform`] hands out pins for the resources of a `weld.toml` table.
//! Each requested leaf gets a simulated physical port and one logical signal
//! per role its direction and rate need; [`SimPlatform::prepare`] then
//! attaches a [`SimPort`] to every pin requested so far.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use weld_common::{pad_roles, DirSpec, Direction, FieldSpec, RateSpec};
use weld_config::{ConfigError, PadLayout, WeldConfig};

use crate::error::SimError;
use crate::kernel::Simulator;
use crate::port::{SimPin, SimPort};
use crate::value::SimSignalId;

/// Direction of a pin requested without one.
pub const DEFAULT_DIRECTION: Direction = Direction::InOut;

/// A requested resource: one pin, or named groups of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimResource {
    /// A single pin.
    Pin(SimPin),
    /// Named subresources in layout order.
    Group(IndexMap<String, SimResource>),
}

impl SimResource {
    /// Returns the pin of a single-pin resource.
    pub fn pin(&self) -> Option<&SimPin> {
        match self {
            SimResource::Pin(pin) => Some(pin),
            SimResource::Group(_) => None,
        }
    }

    /// Returns a named subresource of a group.
    pub fn field(&self, name: &str) -> Option<&SimResource> {
        match self {
            SimResource::Pin(_) => None,
            SimResource::Group(fields) => fields.get(name),
        }
    }

    /// The simulated physical port of a single-pin resource.
    pub fn port(&self) -> Option<SimSignalId> {
        self.pin().map(|pin| pin.port)
    }
}

/// Hands out simulated pins described by a [`WeldConfig`].
#[derive(Debug)]
pub struct SimPlatform {
    config: WeldConfig,
    requested: HashSet<(String, Option<u32>)>,
    pending: Vec<SimPin>,
}

impl SimPlatform {
    /// Creates a platform from a loaded configuration.
    pub fn new(config: WeldConfig) -> Self {
        Self {
            config,
            requested: HashSet::new(),
            pending: Vec::new(),
        }
    }

    /// Loads `weld.toml` from `project_dir`.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        Ok(Self::new(weld_config::load_config(project_dir)?))
    }

    /// The configuration.
    pub fn config(&self) -> &WeldConfig {
        &self.config
    }

    /// Requests a resource, allocating its port and pin signals in `sim`.
    ///
    /// Pins without a direction default to [`DEFAULT_DIRECTION`]; pins
    /// without a rate default to rate 0. A resource can be requested once.
    pub fn request(
        &mut self,
        sim: &mut Simulator,
        name: &str,
        index: Option<u32>,
        dir: Option<DirSpec>,
        rate: Option<RateSpec>,
    ) -> Result<SimResource, SimError> {
        let resource = self.config.resource(name, index).ok_or_else(|| {
            SimError::UnknownResource(match index {
                Some(index) => format!("{name}_{index}"),
                None => name.to_string(),
            })
        })?;
        let logical = resource.logical_name();
        let key = (name.to_string(), index);
        if self.requested.contains(&key) {
            return Err(SimError::AlreadyRequested(logical));
        }
        let layout = resource.layout()?;

        let mut pins = Vec::new();
        let requested = build(
            sim,
            &logical,
            &format!("pad_{logical}"),
            &layout,
            dir.as_ref(),
            rate.as_ref(),
            &mut pins,
        )?;
        log::debug!("requested resource '{logical}' ({} pins)", pins.len());
        self.requested.insert(key);
        self.pending.extend(pins);
        Ok(requested)
    }

    /// Spawns a [`SimPort`] for every pin requested since the last call.
    ///
    /// Returns the number of processes added to `sim`.
    pub fn prepare(&mut self, sim: &mut Simulator) -> Result<usize, SimError> {
        let mut spawned = 0;
        for pin in self.pending.drain(..) {
            let count = SimPort::spawn(sim, &pin)?;
            log::debug!(
                "attached '{}' ({} at rate {}, {count} processes)",
                pin.name,
                pin.direction,
                pin.rate
            );
            spawned += count;
        }
        Ok(spawned)
    }
}

fn build(
    sim: &mut Simulator,
    port_name: &str,
    pin_name: &str,
    layout: &PadLayout,
    dir: Option<&DirSpec>,
    rate: Option<&RateSpec>,
    pins: &mut Vec<SimPin>,
) -> Result<SimResource, SimError> {
    match layout {
        PadLayout::Leaf { width, inverted } => {
            let direction = uniform(pin_name, dir)?.unwrap_or(DEFAULT_DIRECTION);
            let rate = uniform(pin_name, rate)?.unwrap_or(0);
            let roles = pad_roles(direction, rate)?;

            let port = sim.add_signal(port_name, *width)?;
            let mut signals = BTreeMap::new();
            for &role in roles {
                let id = sim.add_signal(format!("{pin_name}_{role}"), role.width(*width))?;
                signals.insert(role, id);
            }
            let pin = SimPin {
                name: pin_name.to_string(),
                port,
                direction,
                rate,
                invert: *inverted,
                signals,
            };
            pins.push(pin.clone());
            Ok(SimResource::Pin(pin))
        }
        PadLayout::Aggregate(fields) => {
            check_field_names(pin_name, fields, dir)?;
            check_field_names(pin_name, fields, rate)?;
            let names = || fields.keys().map(String::as_str);
            let dirs = FieldSpec::normalize(dir, names());
            let rates = FieldSpec::normalize(rate, names());
            let mut group = IndexMap::new();
            for (field, sub) in fields {
                let resource = build(
                    sim,
                    &format!("{port_name}_{field}"),
                    &format!("{pin_name}_{field}"),
                    sub,
                    dirs[field.as_str()].as_ref(),
                    rates[field.as_str()].as_ref(),
                    pins,
                )?;
                group.insert(field.clone(), resource);
            }
            Ok(SimResource::Group(group))
        }
    }
}

/// Rejects per-field specs naming fields the group does not have.
fn check_field_names<T>(
    group: &str,
    fields: &IndexMap<String, PadLayout>,
    spec: Option<&FieldSpec<T>>,
) -> Result<(), SimError> {
    if let Some(FieldSpec::Fields(map)) = spec {
        if let Some(unknown) = map.keys().find(|k| !fields.contains_key(*k)) {
            return Err(SimError::MissingMember {
                group: group.to_string(),
                member: unknown.clone(),
            });
        }
    }
    Ok(())
}

fn uniform<T: Copy>(pin: &str, spec: Option<&FieldSpec<T>>) -> Result<Option<T>, SimError> {
    match spec {
        None => Ok(None),
        Some(FieldSpec::Uniform(value)) => Ok(Some(*value)),
        Some(FieldSpec::Fields(_)) => Err(SimError::SpecShape(pin.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weld_common::Role;

    fn platform() -> SimPlatform {
        let config = weld_config::load_config_from_str(
            r#"
[bridge]
output_dir = "build"

[[resource]]
name = "led"
index = 0
width = 1
inverted = true

[[resource]]
name = "sdram"

[resource.fields.clk]
width = 1

[resource.fields.dq]
width = 8
"#,
        )
        .unwrap();
        SimPlatform::new(config)
    }

    #[test]
    fn leaf_signal_names() {
        let mut p = platform();
        let mut sim = Simulator::new();
        let led = p
            .request(&mut sim, "led", Some(0), Some(Direction::Output.into()), Some(1u8.into()))
            .unwrap();
        let pin = led.pin().unwrap();
        assert_eq!(sim.signal(pin.port).name, "led_0");
        assert!(pin.invert);
        let names: Vec<_> = pin.signals.values().map(|&id| sim.signal(id).name.as_str()).collect();
        assert_eq!(names, vec!["pad_led_0_o", "pad_led_0_o_clk"]);
    }

    #[test]
    fn default_direction_is_bidirectional() {
        let mut p = platform();
        let mut sim = Simulator::new();
        let led = p.request(&mut sim, "led", Some(0), None, None).unwrap();
        let pin = led.pin().unwrap();
        assert_eq!((pin.direction, pin.rate), (Direction::InOut, 0));
        assert!(pin.signal(Role::Oe).is_some());
        assert_eq!(p.prepare(&mut sim).unwrap(), 2);
    }

    #[test]
    fn group_with_per_field_spec() {
        let mut p = platform();
        let mut sim = Simulator::new();
        let dirs = DirSpec::fields([
            ("clk", Direction::Output.into()),
            ("dq", Direction::InOut.into()),
        ]);
        let rates = RateSpec::fields([("dq", FieldSpec::Uniform(1u8))]);
        let sdram = p.request(&mut sim, "sdram", None, Some(dirs), Some(rates)).unwrap();
        assert!(sdram.pin().is_none());
        let dq = sdram.field("dq").and_then(SimResource::pin).unwrap();
        assert_eq!(sim.signal(dq.port).name, "sdram_dq");
        assert_eq!(sim.signal(dq.signal(Role::Oe).unwrap()).width, 1);
        assert_eq!(sim.signal(dq.signal(Role::O).unwrap()).width, 8);
        assert_eq!(
            sim.signal(dq.signal(Role::IClk).unwrap()).name,
            "pad_sdram_dq_i_clk"
        );
        // clk: one output process; dq: one input and one output process.
        assert_eq!(p.prepare(&mut sim).unwrap(), 3);
        assert_eq!(p.prepare(&mut sim).unwrap(), 0);
    }

    #[test]
    fn request_errors() {
        let mut p = platform();
        let mut sim = Simulator::new();
        assert!(matches!(
            p.request(&mut sim, "led", None, None, None),
            Err(SimError::UnknownResource(name)) if name == "led"
        ));
        assert!(matches!(
            p.request(&mut sim, "led", Some(0), Some(DirSpec::fields([("x", Direction::Input.into())])), None),
            Err(SimError::SpecShape(_))
        ));
        assert!(matches!(
            p.request(&mut sim, "led", Some(0), None, Some(2u8.into())),
            Err(SimError::UnsupportedPin(_))
        ));
        p.request(&mut sim, "led", Some(0), None, None).unwrap();
        let err = p.request(&mut sim, "led", Some(0), None, None).unwrap_err();
        assert_eq!(err.to_string(), "resource 'led_0' has already been requested");
    }
}
