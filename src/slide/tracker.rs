use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::support::SupportState;

/// Opaque host identity of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability of an entity as far as slide correction cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    Grid,
    Other,
}

/// What the host reports when an entity appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityInfo {
    pub id: EntityId,
    pub kind: EntityKind,
}

impl EntityInfo {
    pub fn character(id: EntityId) -> Self {
        Self {
            id,
            kind: EntityKind::Character,
        }
    }

    pub fn is_character(&self) -> bool {
        self.kind == EntityKind::Character
    }
}

/// Tracked characters and their support state.
///
/// Membership and support state share one map, so state is created on add
/// and dropped on remove.
#[derive(Debug, Default)]
pub struct EntityTracker {
    characters: HashMap<EntityId, SupportState>,
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks the entity if it is a character. Returns true if newly added.
    pub fn on_entity_added(&mut self, entity: &EntityInfo) -> bool {
        if !entity.is_character() || self.characters.contains_key(&entity.id) {
            return false;
        }
        self.characters.insert(entity.id, SupportState::new());
        true
    }

    /// Stops tracking the entity. Returns true if it was tracked.
    pub fn on_entity_removed(&mut self, id: EntityId) -> bool {
        self.characters.remove(&id).is_some()
    }

    /// Registers everything present at startup. Returns how many were new.
    pub fn bulk_register_existing<'a, I>(&mut self, entities: I) -> usize
    where
        I: IntoIterator<Item = &'a EntityInfo>,
    {
        entities
            .into_iter()
            .filter(|entity| self.on_entity_added(entity))
            .count()
    }

    /// Sorted copy of tracked ids for iteration while the set may change.
    pub fn snapshot(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.characters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.characters.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn clear(&mut self) {
        self.characters.clear();
    }

    pub fn support(&self, id: EntityId) -> Option<&SupportState> {
        self.characters.get(&id)
    }

    pub fn support_mut(&mut self, id: EntityId) -> Option<&mut SupportState> {
        self.characters.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut tracker = EntityTracker::new();
        let info = EntityInfo::character(EntityId(7));
        assert!(tracker.on_entity_added(&info));
        assert!(!tracker.on_entity_added(&info));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_non_characters_are_ignored() {
        let mut tracker = EntityTracker::new();
        let grid = EntityInfo {
            id: EntityId(1),
            kind: EntityKind::Grid,
        };
        assert!(!tracker.on_entity_added(&grid));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut tracker = EntityTracker::new();
        tracker.on_entity_added(&EntityInfo::character(EntityId(2)));
        assert!(!tracker.on_entity_removed(EntityId(99)));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.on_entity_removed(EntityId(2)));
        assert!(!tracker.on_entity_removed(EntityId(2)));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_readd_resets_support_state() {
        let mut tracker = EntityTracker::new();
        let info = EntityInfo::character(EntityId(3));
        tracker.on_entity_added(&info);
        tracker.support_mut(EntityId(3)).unwrap().supported = true;

        tracker.on_entity_removed(EntityId(3));
        tracker.on_entity_added(&info);
        assert!(!tracker.support(EntityId(3)).unwrap().supported);
    }

    #[test]
    fn test_bulk_register_filters_and_dedups() {
        let mut tracker = EntityTracker::new();
        let entities = [
            EntityInfo::character(EntityId(5)),
            EntityInfo {
                id: EntityId(6),
                kind: EntityKind::Other,
            },
            EntityInfo::character(EntityId(4)),
            EntityInfo::character(EntityId(5)),
        ];
        assert_eq!(tracker.bulk_register_existing(&entities), 2);
        assert_eq!(tracker.snapshot(), vec![EntityId(4), EntityId(5)]);
    }
}
