//! Capability signatures: named, flow-typed interface members.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use weld_common::{Flow, Role, Shape};

/// One member of a [`Signature`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Member {
    /// A signal port.
    Port {
        /// Who drives it, seen from the consumer.
        flow: Flow,
        /// Its shape.
        shape: Shape,
    },
    /// A nested interface.
    Interface {
        /// Flow of the nested interface as a whole.
        flow: Flow,
        /// Its members.
        signature: Signature,
    },
}

impl Member {
    /// Returns the member's flow.
    pub fn flow(&self) -> Flow {
        match self {
            Member::Port { flow, .. } | Member::Interface { flow, .. } => *flow,
        }
    }
}

/// An ordered set of named members.
///
/// Equality ignores member order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    members: IndexMap<String, Member>,
}

impl Signature {
    /// Creates an empty signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the members a leaf pad exposes for `roles` on a pad of `pad_shape`.
    pub fn for_roles(roles: &[Role], pad_shape: Shape) -> Self {
        let mut sig = Self::new();
        for &role in roles {
            let shape = Shape {
                width: role.width(pad_shape.width),
                signed: role.is_data() && pad_shape.signed,
            };
            sig.add(
                role.as_str(),
                Member::Port {
                    flow: role.flow(),
                    shape,
                },
            );
        }
        sig
    }

    /// Adds or replaces a member.
    pub fn add(&mut self, name: impl Into<String>, member: Member) {
        self.members.insert(name.into(), member);
    }

    /// Returns a member by name.
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Iterates over members in declaration order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if there are no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Describes the first difference between `self` and `other`, if any.
    pub fn difference(&self, other: &Signature) -> Option<String> {
        for (name, member) in &self.members {
            match other.members.get(name) {
                None => return Some(format!("member '{name}' is missing")),
                Some(found) if found != member => {
                    return Some(format!(
                        "member '{name}' is declared as {} but built as {}",
                        MemberDisplay(member),
                        MemberDisplay(found)
                    ))
                }
                Some(_) => {}
            }
        }
        other
            .members
            .keys()
            .find(|name| !self.members.contains_key(*name))
            .map(|name| format!("member '{name}' is not declared"))
    }
}

struct MemberDisplay<'a>(&'a Member);

impl fmt::Display for MemberDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Member::Port { flow, shape } => write!(f, "{flow:?}({shape})"),
            Member::Interface { flow, signature } => write!(f, "{flow:?}({signature})"),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Signature({")?;
        for (i, (name, member)) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{name}': {}", MemberDisplay(member))?;
        }
        f.write_str("})")
    }
}
