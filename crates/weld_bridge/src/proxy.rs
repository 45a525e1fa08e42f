//! The build-platform seam and the proxy guest designs request pads through.

use crate::bridge::SignalBridge;
use crate::capability::CapabilityNode;
use crate::error::{BridgeError, PlatformError};
use crate::pad::{PadAdapter, PadDescriptor};
use std::path::Path;
use weld_common::{DirSpec, RateSpec};
use weld_host::HostModule;

/// What the bridge needs from a build platform.
pub trait Platform {
    /// Hands out the physical pad `name` (optionally indexed), allocating its
    /// host signals in `host` on first request.
    fn request(
        &mut self,
        host: &mut HostModule,
        name: &str,
        index: Option<u32>,
    ) -> Result<PadDescriptor, PlatformError>;

    /// Target device part number.
    fn device(&self) -> &str;

    /// Directory build products are written under.
    fn output_dir(&self) -> &Path;

    /// Adds a generated file to the build's sources.
    fn add_source(&mut self, path: &Path);
}

/// Requests pads from a platform and adapts them on a bridge.
pub struct PlatformProxy<'a, P: Platform + ?Sized> {
    bridge: &'a mut SignalBridge,
    platform: &'a mut P,
}

impl<'a, P: Platform + ?Sized> PlatformProxy<'a, P> {
    /// Creates a proxy over `platform` that registers signals with `bridge`.
    pub fn new(bridge: &'a mut SignalBridge, platform: &'a mut P) -> Self {
        Self { bridge, platform }
    }

    /// Requests a pad and adapts it with the given direction and rate.
    ///
    /// Guest signals are named `pad_{name}[_{index}]_{role}`.
    pub fn request(
        &mut self,
        name: &str,
        index: Option<u32>,
        dir: Option<DirSpec>,
        rate: Option<RateSpec>,
    ) -> Result<CapabilityNode, BridgeError> {
        let pad = self.platform.request(self.bridge.host_mut(), name, index)?;
        let logical = match index {
            Some(index) => format!("{name}_{index}"),
            None => name.to_string(),
        };
        PadAdapter::new(&mut *self.bridge).adapt(
            &format!("pad_{logical}"),
            &pad,
            dir.as_ref(),
            rate.as_ref(),
        )
    }

    /// The platform's target device.
    pub fn device(&self) -> &str {
        self.platform.device()
    }

    /// The bridge, for guest logic built between requests.
    pub fn bridge(&mut self) -> &mut SignalBridge {
        &mut *self.bridge
    }
}
