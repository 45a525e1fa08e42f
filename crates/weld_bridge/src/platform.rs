//! A build platform backed by the resource table of a `weld.toml`.

use crate::error::PlatformError;
use crate::pad::PadDescriptor;
use crate::proxy::Platform;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use weld_common::Shape;
use weld_config::{ConfigError, PadLayout, WeldConfig};
use weld_host::HostModule;

/// Hands out pads described by a [`WeldConfig`].
///
/// Each resource's host signals are allocated on its first request; later
/// requests return the same descriptor.
#[derive(Debug)]
pub struct ConfigPlatform {
    config: WeldConfig,
    allocated: HashMap<(String, Option<u32>), PadDescriptor>,
    sources: Vec<PathBuf>,
}

impl ConfigPlatform {
    /// Creates a platform from a loaded configuration.
    pub fn new(config: WeldConfig) -> Self {
        Self {
            config,
            allocated: HashMap::new(),
            sources: Vec::new(),
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

    /// Name configured for the generated module.
    pub fn module_name(&self) -> &str {
        &self.config.bridge.name
    }

    /// Sources added so far.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

fn allocate(host: &mut HostModule, name: &str, layout: &PadLayout) -> PadDescriptor {
    match layout {
        PadLayout::Leaf { width, inverted } => PadDescriptor::Leaf {
            signal: host.add_signal(name, Shape::unsigned(*width)),
            width: *width,
            inverted: *inverted,
        },
        PadLayout::Aggregate(fields) => PadDescriptor::Aggregate(
            fields
                .iter()
                .map(|(field, sub)| (field.clone(), allocate(host, &format!("{name}_{field}"), sub)))
                .collect::<IndexMap<_, _>>(),
        ),
    }
}

impl Platform for ConfigPlatform {
    fn request(
        &mut self,
        host: &mut HostModule,
        name: &str,
        index: Option<u32>,
    ) -> Result<PadDescriptor, PlatformError> {
        let key = (name.to_string(), index);
        if let Some(pad) = self.allocated.get(&key) {
            return Ok(pad.clone());
        }
        let resource = self.config.resource(name, index).ok_or_else(|| {
            PlatformError::UnknownResource(match index {
                Some(index) => format!("{name}_{index}"),
                None => name.to_string(),
            })
        })?;
        let pad = allocate(host, &resource.logical_name(), &resource.layout()?);
        log::debug!("allocated resource '{}'", resource.logical_name());
        self.allocated.insert(key, pad.clone());
        Ok(pad)
    }

    fn device(&self) -> &str {
        &self.config.bridge.device
    }

    fn output_dir(&self) -> &Path {
        &self.config.bridge.output_dir
    }

    fn add_source(&mut self, path: &Path) {
        self.sources.push(path.to_path_buf());
    }
}
