//! Pad direction and sample-rate vocabulary.
//!
//! The (direction × rate) decision table in [`pad_roles`] is shared by the
//! synthesis-side pad adapter and the simulation-side port model, so both
//! agree on which capability members a pad exposes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which way data crosses a physical pad.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Pad is left unadapted; no capability members are exposed.
    #[default]
    #[serde(rename = "-")]
    None,
    /// Input only.
    #[serde(rename = "i")]
    Input,
    /// Output only.
    #[serde(rename = "o")]
    Output,
    /// Bidirectional tristate with the sampled input exposed.
    #[serde(rename = "io")]
    InOut,
    /// Drive-only tristate; the input side is wired but not exposed.
    #[serde(rename = "oe")]
    OutputEnable,
}

impl Direction {
    /// Returns the short textual form (`-`, `i`, `o`, `io`, `oe`).
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::None => "-",
            Direction::Input => "i",
            Direction::Output => "o",
            Direction::InOut => "io",
            Direction::OutputEnable => "oe",
        }
    }

    /// Returns `true` if data is sampled from the pad.
    pub fn has_input(self) -> bool {
        matches!(self, Direction::Input | Direction::InOut)
    }

    /// Returns `true` if data is driven onto the pad.
    pub fn has_output(self) -> bool {
        matches!(
            self,
            Direction::Output | Direction::InOut | Direction::OutputEnable
        )
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown direction string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pad direction '{0}' (expected one of -, i, o, io, oe)")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" => Ok(Direction::None),
            "i" => Ok(Direction::Input),
            "o" => Ok(Direction::Output),
            "io" => Ok(Direction::InOut),
            "oe" => Ok(Direction::OutputEnable),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// Flow of a capability member, seen from the logic that consumes the capability.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Flow {
    /// Driven by the consumer (outputs, enables, clocks).
    In,
    /// Driven by the capability (sampled inputs).
    Out,
}

impl Flow {
    /// Returns the opposite flow.
    pub fn flip(self) -> Self {
        match self {
            Flow::In => Flow::Out,
            Flow::Out => Flow::In,
        }
    }
}

/// A named member of a leaf pad capability.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sampled input.
    I,
    /// Driven output.
    O,
    /// Output enable.
    Oe,
    /// Input synchronizer clock.
    IClk,
    /// Output synchronizer clock.
    OClk,
    /// Double-rate input, rising-edge lane.
    I0,
    /// Double-rate input, falling-edge lane.
    I1,
    /// Double-rate output, first-half lane.
    O0,
    /// Double-rate output, second-half lane.
    O1,
}

impl Role {
    /// Returns the member name used in signatures and signal names.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::I => "i",
            Role::O => "o",
            Role::Oe => "oe",
            Role::IClk => "i_clk",
            Role::OClk => "o_clk",
            Role::I0 => "i0",
            Role::I1 => "i1",
            Role::O0 => "o0",
            Role::O1 => "o1",
        }
    }

    /// Returns the member's flow from the consumer's point of view.
    pub fn flow(self) -> Flow {
        match self {
            Role::I | Role::I0 | Role::I1 => Flow::Out,
            _ => Flow::In,
        }
    }

    /// Returns `true` for members carrying pad data (subject to active-low inversion).
    pub fn is_data(self) -> bool {
        !matches!(self, Role::Oe | Role::IClk | Role::OClk)
    }

    /// Returns the member width for a pad of `pad_width` bits.
    pub fn width(self, pad_width: u32) -> u32 {
        if self.is_data() {
            pad_width
        } else {
            1
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (direction, rate) pair with no entry in the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pad direction '{direction}' at rate {rate} is not supported")]
pub struct UnsupportedPad {
    /// The requested direction.
    pub direction: Direction,
    /// The requested samples per clock cycle.
    pub rate: u8,
}

/// Returns the capability members a leaf pad exposes for `direction` at `rate`.
///
/// Rate 0 is unclocked, rate 1 is one sample per cycle through a synchronizer,
/// rate 2 is double data rate. Bidirectional pads have no double-rate form.
pub fn pad_roles(direction: Direction, rate: u8) -> Result<&'static [Role], UnsupportedPad> {
    use Role::*;
    let roles: &'static [Role] = match (direction, rate) {
        (Direction::None, 0..=2) => &[],
        (Direction::Input, 0) => &[I],
        (Direction::Input, 1) => &[I, IClk],
        (Direction::Input, 2) => &[I0, I1, IClk],
        (Direction::Output, 0) => &[O],
        (Direction::Output, 1) => &[O, OClk],
        (Direction::Output, 2) => &[O0, O1, OClk],
        (Direction::InOut, 0) => &[I, O, Oe],
        (Direction::InOut, 1) => &[I, O, Oe, IClk, OClk],
        (Direction::OutputEnable, 0) => &[O, Oe],
        (Direction::OutputEnable, 1) => &[O, Oe, OClk],
        _ => return Err(UnsupportedPad { direction, rate }),
    };
    Ok(roles)
}

/// A scalar-or-mapping parameter applied to a pad descriptor.
///
/// `Uniform` applies one value to every field of an aggregate; `Fields`
/// gives each field its own (possibly nested) spec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec<T> {
    /// One value for the pad and all of its fields.
    Uniform(T),
    /// A per-field spec; missing fields take the default.
    Fields(IndexMap<String, FieldSpec<T>>),
}

/// Direction parameter for a pad request.
pub type DirSpec = FieldSpec<Direction>;

/// Sample-rate parameter for a pad request.
pub type RateSpec = FieldSpec<u8>;

impl<T: Clone> FieldSpec<T> {
    /// Builds a per-field spec from `(name, spec)` pairs.
    pub fn fields<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FieldSpec<T>)>,
    {
        FieldSpec::Fields(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the scalar value, or `None` for a per-field spec.
    pub fn as_uniform(&self) -> Option<&T> {
        match self {
            FieldSpec::Uniform(value) => Some(value),
            FieldSpec::Fields(_) => None,
        }
    }

    /// Normalizes an optional spec into one entry per field name.
    ///
    /// A uniform spec is repeated for every field; a per-field spec is looked
    /// up by name; an absent spec leaves every field absent.
    pub fn normalize<'a>(
        spec: Option<&FieldSpec<T>>,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> IndexMap<String, Option<FieldSpec<T>>> {
        fields
            .into_iter()
            .map(|name| {
                let sub = match spec {
                    None => None,
                    Some(FieldSpec::Uniform(value)) => Some(FieldSpec::Uniform(value.clone())),
                    Some(FieldSpec::Fields(map)) => map.get(name).cloned(),
                };
                (name.to_string(), sub)
            })
            .collect()
    }
}

impl<T> From<T> for FieldSpec<T> {
    fn from(value: T) -> Self {
        FieldSpec::Uniform(value)
    }
}
