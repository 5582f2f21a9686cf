//! Cache key: a description with its hash computed once

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::description::PipelineStateDescription;

/// Description paired with its precomputed hash
///
/// The map hashes the stored value instead of walking the description on
/// every lookup. Equality checks the hash first, then the full description.
#[derive(Debug, Clone)]
pub struct HashedDescription {
    description: Arc<PipelineStateDescription>,
    hash: u64,
}

impl HashedDescription {
    pub fn new(description: Arc<PipelineStateDescription>) -> Self {
        let hash = description.hash_code();
        Self { description, hash }
    }

    /// Rebuilds a key from a hash computed earlier for the same description
    pub(crate) fn from_parts(description: Arc<PipelineStateDescription>, hash: u64) -> Self {
        Self { description, hash }
    }

    pub fn description(&self) -> &Arc<PipelineStateDescription> {
        &self.description
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for HashedDescription {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && *self.description == *other.description
    }
}

impl Eq for HashedDescription {}

impl Hash for HashedDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashMap;

    #[test]
    fn test_key_lookup_with_separate_description() {
        let mut map = HashMap::new();
        map.insert(HashedDescription::new(Arc::new(PipelineStateDescription::new())), 7u32);

        let lookup = HashedDescription::new(Arc::new(PipelineStateDescription::new()));
        assert_eq!(map.get(&lookup), Some(&7));

        let mut other = PipelineStateDescription::new();
        other.sample_mask = 0x0000_FFFF;
        assert!(map.get(&HashedDescription::new(Arc::new(other))).is_none());
    }

    #[test]
    fn test_hash_matches_description() {
        let description = Arc::new(PipelineStateDescription::new());
        let key = HashedDescription::new(description.clone());
        assert_eq!(key.hash_value(), description.hash_code());
        assert!(Arc::ptr_eq(key.description(), &description));
    }
}
