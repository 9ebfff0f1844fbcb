//! Named-group registry.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use smol_str::SmolStr;

use crate::group::Group;

/// A namespace of cache groups, keyed by name.
///
/// The handle is cheap to clone (the map is shared). Most processes use the
/// single [`Registry::global`] instance; tests hold explicit instances so
/// state never leaks between them.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    groups: Arc<DashMap<SmolStr, Arc<Group>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// The process-wide registry.
    pub fn global() -> Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new).clone()
    }

    /// Registers `group` under its name.
    ///
    /// # Panics
    ///
    /// Panics when the name is already taken: groups are registered once at
    /// startup, and a duplicate name is a programmer error.
    pub fn register(&self, group: Arc<Group>) {
        match self.groups.entry(SmolStr::new(group.name())) {
            Entry::Occupied(existing) => {
                panic!("hoard: duplicate registration of group {:?}", existing.key())
            }
            Entry::Vacant(slot) => {
                slot.insert(group);
            }
        }
    }

    /// Looks up a group by name.
    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` when no groups are registered.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
