//! Cart identity sets.
//!
//! An [`IdentitySet`] is the collection of cart IDs a requester is entitled to
//! act on, split by [`IdentityType`]. The same shape is stored in the browser
//! session and, keyed by cart token, in the shared ephemeral token store.

use serde::{Deserialize, Serialize};

use super::id::CartId;

/// Which list of an identity a cart ID belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityType {
    /// Carts that are still being shopped.
    Active,
    /// Carts that have been placed but are kept for reference.
    Completed,
}

impl IdentityType {
    /// Every identity type, in storage order.
    pub const ALL: [Self; 2] = [Self::Active, Self::Completed];

    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

/// Cart IDs by [`IdentityType`].
///
/// Lists keep insertion order for stable display. Adding an ID that is
/// already present is a no-op, so merging the same set twice never produces
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySet {
    #[serde(default)]
    active: Vec<CartId>,
    #[serde(default)]
    completed: Vec<CartId>,
}

impl IdentitySet {
    /// Create an empty identity set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// Cart IDs of the given type, in insertion order.
    #[must_use]
    pub fn cart_ids(&self, kind: IdentityType) -> &[CartId] {
        match kind {
            IdentityType::Active => &self.active,
            IdentityType::Completed => &self.completed,
        }
    }

    fn list_mut(&mut self, kind: IdentityType) -> &mut Vec<CartId> {
        match kind {
            IdentityType::Active => &mut self.active,
            IdentityType::Completed => &mut self.completed,
        }
    }

    /// Whether `id` is tracked under `kind`.
    #[must_use]
    pub fn contains(&self, id: CartId, kind: IdentityType) -> bool {
        self.cart_ids(kind).contains(&id)
    }

    /// Append `id` under `kind`. Returns `false` if it was already present.
    pub fn add(&mut self, id: CartId, kind: IdentityType) -> bool {
        let list = self.list_mut(kind);
        if list.contains(&id) {
            return false;
        }
        list.push(id);
        true
    }

    /// Remove `id` from `kind`. Returns `false` if it was not present.
    pub fn remove(&mut self, id: CartId, kind: IdentityType) -> bool {
        let list = self.list_mut(kind);
        let before = list.len();
        list.retain(|existing| *existing != id);
        list.len() != before
    }

    /// Union `other` into `self`, preserving existing entries.
    ///
    /// Returns `true` if any ID was added.
    pub fn merge(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for kind in IdentityType::ALL {
            for &id in other.cart_ids(kind) {
                changed |= self.add(id, kind);
            }
        }
        changed
    }

    /// Whether both lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.completed.is_empty()
    }
}
