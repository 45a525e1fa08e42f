//! Capability trees handed to guest logic.

use crate::error::BridgeError;
use crate::signature::{Member, Signature};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use weld_common::{Flow, Role};
use weld_guest::{GuestModule, GuestSignalId};

/// The members of a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityBody {
    /// Guest signals of a single pad, by role.
    Leaf(BTreeMap<Role, GuestSignalId>),
    /// One capability per field of an aggregate pad, in layout order.
    Aggregate(IndexMap<String, CapabilityNode>),
}

/// An adapted pad: the guest-side signals guest logic connects to.
///
/// Mirrors the shape of the pad it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityNode {
    name: String,
    signature: Signature,
    body: CapabilityBody,
}

impl CapabilityNode {
    pub(crate) fn new(name: String, signature: Signature, body: CapabilityBody) -> Self {
        Self {
            name,
            signature,
            body,
        }
    }

    /// The name prefix of the signals in this capability.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The members.
    pub fn body(&self) -> &CapabilityBody {
        &self.body
    }

    /// Returns the capability of an aggregate field.
    pub fn field(&self, name: &str) -> Result<&CapabilityNode, BridgeError> {
        let found = match &self.body {
            CapabilityBody::Aggregate(fields) => fields.get(name),
            CapabilityBody::Leaf(_) => None,
        };
        found.ok_or_else(|| self.missing(name))
    }

    /// Returns the guest signal of a leaf role.
    pub fn signal(&self, role: Role) -> Result<GuestSignalId, BridgeError> {
        self.try_signal(role)
            .ok_or_else(|| self.missing(role.as_str()))
    }

    /// Returns the guest signal of a leaf role, if present.
    pub fn try_signal(&self, role: Role) -> Option<GuestSignalId> {
        match &self.body {
            CapabilityBody::Leaf(signals) => signals.get(&role).copied(),
            CapabilityBody::Aggregate(_) => None,
        }
    }

    /// Returns `true` if the capability exposes nothing.
    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }

    /// Checks that the declared signature matches the members actually built.
    pub(crate) fn check(&self, guest: &GuestModule) -> Result<(), BridgeError> {
        let mut built = Signature::new();
        match &self.body {
            CapabilityBody::Leaf(signals) => {
                for (&role, &id) in signals {
                    built.add(
                        role.as_str(),
                        Member::Port {
                            flow: role.flow(),
                            shape: guest.signal(id).shape,
                        },
                    );
                }
            }
            CapabilityBody::Aggregate(fields) => {
                for (name, node) in fields {
                    built.add(
                        name.clone(),
                        Member::Interface {
                            flow: Flow::Out,
                            signature: node.signature.clone(),
                        },
                    );
                }
            }
        }
        match self.signature.difference(&built) {
            None => Ok(()),
            Some(detail) => Err(BridgeError::SignatureMismatch {
                name: self.name.clone(),
                detail,
            }),
        }
    }

    fn missing(&self, member: &str) -> BridgeError {
        BridgeError::MissingMember {
            node: self.name.clone(),
            member: member.to_string(),
        }
    }
}
