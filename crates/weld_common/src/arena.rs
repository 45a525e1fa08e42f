//! Generic arena for dense, ID-indexed storage of netlist entities.
//!
//! The [`Arena`] provides O(1) insertion and lookup by opaque [`ArenaId`] keys.
//! Items are never removed, so IDs stay valid for the lifetime of the arena.
//! ID newtypes are declared with [`define_id!`](crate::define_id).

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
///
/// Implementors must provide a bijection between `u32` indices and the ID type.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// Declares a `u32` ID newtype usable as an [`Arena`] key.
///
/// The calling crate must depend on `serde`.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl $crate::arena::ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

/// A dense, ID-indexed container.
///
/// Items are always appended (never reordered or removed), making IDs stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocates a new item and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Returns the ID the next [`alloc`](Self::alloc) will hand out.
    pub fn next_id(&self) -> I {
        I::from_raw(self.items.len() as u32)
    }

    /// Returns a reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }

    /// Returns the item with the given ID, or `None` if it was never allocated here.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Returns a mutable reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the arena contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over references to items in allocation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}
