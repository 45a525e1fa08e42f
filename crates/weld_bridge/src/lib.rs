//! Embedding a generated guest module into a host netlist.
//!
//! A [`SignalBridge`] collects connections between host signals and guest
//! targets, generates the guest's Verilog with exactly those targets as
//! ports, and instantiates the result in the host module. Physical pads are
//! requested through a [`PlatformProxy`], which adapts them with a
//! [`PadAdapter`] into [`CapabilityNode`]s the guest logic connects to.
//!
//! ```text
//! PlatformProxy::request ─► PadAdapter ─► SignalBridge::import_from_host
//!                                              │
//!        SignalBridge::finalize ◄── emit ◄─────┘
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod capability;
pub mod error;
pub mod pad;
pub mod platform;
pub mod port_map;
pub mod proxy;
pub mod signature;

pub use bridge::{ConnectionRecord, Phase, SignalBridge, HOST_TOP_DOMAIN};
pub use capability::{CapabilityBody, CapabilityNode};
pub use error::{BridgeError, PlatformError};
pub use pad::{PadAdapter, PadDescriptor};
pub use platform::ConfigPlatform;
pub use port_map::{PortInfo, PortMap};
pub use proxy::{Platform, PlatformProxy};
pub use signature::{Member, Signature};
