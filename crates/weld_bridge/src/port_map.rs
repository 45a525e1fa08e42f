//! Port names and directions recovered from guest code generation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use weld_common::{InternalError, WeldResult};
use weld_guest::{Generated, GuestModule, GuestRef, PortDirection};
use weld_host::PortPrefix;

/// The generated name and direction of one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port name in the generated module.
    pub name: String,
    /// Direction from the generated module's point of view.
    pub direction: PortDirection,
}

impl PortInfo {
    /// Returns the instance label `{i|o}_{name}`.
    pub fn label(&self) -> String {
        let prefix = match self.direction {
            PortDirection::Input => PortPrefix::Input,
            PortDirection::Output => PortPrefix::Output,
        };
        prefix.label(&self.name)
    }
}

/// Maps connection targets to their generated ports.
///
/// Built once from the generator's output. Domain clocks and resets that
/// became ports are reachable both as [`GuestRef::Signal`] and as
/// [`GuestRef::Clock`]/[`GuestRef::Reset`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortMap {
    entries: BTreeMap<GuestRef, PortInfo>,
}

impl PortMap {
    /// Builds the map from a generation result.
    pub fn from_generated(module: &GuestModule, generated: &Generated) -> Self {
        let mut entries = BTreeMap::new();
        for (&id, &direction) in &generated.ports {
            if let Some(name) = generated.names.get(&id) {
                entries.insert(
                    GuestRef::Signal(id),
                    PortInfo {
                        name: name.clone(),
                        direction,
                    },
                );
            }
        }
        for (name, domain) in &module.domains {
            if let Some(info) = entries.get(&GuestRef::Signal(domain.clk)).cloned() {
                entries.insert(GuestRef::Clock(name.clone()), info);
            }
            if let Some(info) = entries.get(&GuestRef::Signal(domain.rst)).cloned() {
                entries.insert(GuestRef::Reset(name.clone()), info);
            }
        }
        Self { entries }
    }

    /// Returns the port for `target`, if it became one.
    pub fn get(&self, target: &GuestRef) -> Option<&PortInfo> {
        self.entries.get(target)
    }

    /// Returns the port for a target that must have become one.
    pub fn lookup(&self, target: &GuestRef) -> WeldResult<&PortInfo> {
        self.get(target)
            .ok_or_else(|| InternalError::new(format!("{target} has no generated port")))
    }

    /// Number of entries, aliases included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` before generation or when nothing was connected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&GuestRef, &PortInfo)> {
        self.entries.iter()
    }
}
