use std::sync::{PoisonError, RwLock};

use hashbrown::HashMap;

use crate::models::Coordinate;

/// Successful lookups of one resolver instance, keyed by normalized name.
///
/// Failures are never stored so that a later batch can try again.
#[derive(Debug, Default)]
pub(crate) struct GeocodeCache {
    entries: RwLock<HashMap<String, Coordinate>>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Coordinate> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    pub fn insert(&self, key: String, coordinate: Coordinate) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, coordinate);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = GeocodeCache::new();
        assert_eq!(cache.len(), 0);

        let canoas = Coordinate::new(-29.92, -51.18).unwrap();
        cache.insert("canoas".into(), canoas);
        assert_eq!(cache.get("canoas"), Some(canoas));
        assert_eq!(cache.get("Canoas"), None);
        assert_eq!(cache.len(), 1);
    }
}
