//! Configuration types deserialized from `weld.toml`.

use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;

/// Default name of the generated guest module.
pub const DEFAULT_MODULE_NAME: &str = "guest_wrapper";

/// The top-level configuration parsed from `weld.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct WeldConfig {
    /// Generated module settings.
    pub bridge: BridgeSection,
    /// Physical resources, written as `[[resource]]` tables.
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceConfig>,
}

impl WeldConfig {
    /// Finds the resource with the given name and index.
    pub fn resource(&self, name: &str, index: Option<u32>) -> Option<&ResourceConfig> {
        self.resources
            .iter()
            .find(|r| r.name == name && r.index == index)
    }
}

/// The `[bridge]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeSection {
    /// Name of the generated guest module.
    #[serde(default = "default_module_name")]
    pub name: String,
    /// Build output directory; netlists go to `{output_dir}/gateware/`.
    pub output_dir: PathBuf,
    /// Target device part number, forwarded to designs that ask for it.
    #[serde(default)]
    pub device: String,
}

fn default_module_name() -> String {
    DEFAULT_MODULE_NAME.to_string()
}

/// A physical resource: either a single pad (`width`) or a group of named subsignals (`fields`).
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    /// Resource name, e.g. `led` or `sdram`.
    pub name: String,
    /// Index distinguishing several resources of the same name.
    #[serde(default)]
    pub index: Option<u32>,
    /// Width of a single-pad resource.
    #[serde(default)]
    pub width: Option<u32>,
    /// Whether a single-pad resource is active-low.
    #[serde(default)]
    pub inverted: bool,
    /// Subsignals of a grouped resource, in layout order.
    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,
}

impl ResourceConfig {
    /// Returns the logical name, `name` or `name_index`.
    pub fn logical_name(&self) -> String {
        match self.index {
            Some(index) => format!("{}_{index}", self.name),
            None => self.name.clone(),
        }
    }

    /// Resolves the validated pad layout of this resource.
    pub fn layout(&self) -> Result<PadLayout, ConfigError> {
        layout_of(&self.logical_name(), self.width, self.inverted, &self.fields)
    }
}

/// A subsignal of a grouped resource; may itself be grouped.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    /// Width of a single-pad field.
    #[serde(default)]
    pub width: Option<u32>,
    /// Whether a single-pad field is active-low.
    #[serde(default)]
    pub inverted: bool,
    /// Nested subsignals.
    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,
}

/// The validated shape of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadLayout {
    /// A single pad of `width` bits.
    Leaf {
        /// Width in bits.
        width: u32,
        /// Active-low.
        inverted: bool,
    },
    /// Named subsignals in layout order.
    Aggregate(IndexMap<String, PadLayout>),
}

fn layout_of(
    path: &str,
    width: Option<u32>,
    inverted: bool,
    fields: &IndexMap<String, FieldConfig>,
) -> Result<PadLayout, ConfigError> {
    match (width, fields.is_empty()) {
        (Some(0), _) => Err(ConfigError::ValidationError(format!(
            "resource '{path}' has zero width"
        ))),
        (Some(width), true) => Ok(PadLayout::Leaf { width, inverted }),
        (Some(_), false) => Err(ConfigError::ValidationError(format!(
            "resource '{path}' sets both width and fields"
        ))),
        (None, true) => Err(ConfigError::MissingField(format!("{path}.width"))),
        (None, false) => {
            let mut layout = IndexMap::new();
            for (name, field) in fields {
                let sub = layout_of(
                    &format!("{path}.{name}"),
                    field.width,
                    field.inverted,
                    &field.fields,
                )?;
                layout.insert(name.clone(), sub);
            }
            Ok(PadLayout::Aggregate(layout))
        }
    }
}
