//! Compiled effect bytecode
//!
//! The cache never looks inside the bytecode. An effect is identified by a
//! hash of its stages, so two separately loaded copies of the same effect
//! compare equal.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use smallvec::SmallVec;
use wgpu_types as wgt;

/// Bytecode for one shader stage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderStageBytecode {
    pub stage: wgt::ShaderStages,
    pub entry_point: String,
    pub data: Vec<u8>,
}

impl ShaderStageBytecode {
    pub fn new(stage: wgt::ShaderStages, entry_point: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            stage,
            entry_point: entry_point.into(),
            data,
        }
    }
}

/// Content identifier of an [`EffectBytecode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectBytecodeId(u64);

impl EffectBytecodeId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// All stages of a compiled effect
#[derive(Debug, Clone)]
pub struct EffectBytecode {
    id: EffectBytecodeId,
    stages: SmallVec<[ShaderStageBytecode; 2]>,
}

impl EffectBytecode {
    pub fn new(stages: impl IntoIterator<Item = ShaderStageBytecode>) -> Self {
        let stages: SmallVec<[ShaderStageBytecode; 2]> = stages.into_iter().collect();
        let mut hasher = DefaultHasher::new();
        stages.hash(&mut hasher);
        Self {
            id: EffectBytecodeId(hasher.finish()),
            stages,
        }
    }

    pub fn id(&self) -> EffectBytecodeId {
        self.id
    }

    pub fn stages(&self) -> &[ShaderStageBytecode] {
        &self.stages
    }

    /// Bytecode for `stage`, if the effect has it
    pub fn stage(&self, stage: wgt::ShaderStages) -> Option<&ShaderStageBytecode> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

impl PartialEq for EffectBytecode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.stages == other.stages
    }
}

impl Eq for EffectBytecode {}

impl Hash for EffectBytecode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(fragment: &[u8]) -> EffectBytecode {
        EffectBytecode::new([
            ShaderStageBytecode::new(wgt::ShaderStages::VERTEX, "vs_main", vec![1, 2, 3]),
            ShaderStageBytecode::new(wgt::ShaderStages::FRAGMENT, "fs_main", fragment.to_vec()),
        ])
    }

    #[test]
    fn test_identity_follows_content() {
        let a = effect(&[4, 5]);
        let b = effect(&[4, 5]);
        let c = effect(&[4, 6]);

        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
        assert_ne!(a.id(), c.id());
        assert_ne!(a, c);
    }

    #[test]
    fn test_stage_lookup() {
        let effect = effect(&[9]);
        assert_eq!(effect.stage(wgt::ShaderStages::FRAGMENT).map(|s| s.entry_point.as_str()), Some("fs_main"));
        assert!(effect.stage(wgt::ShaderStages::COMPUTE).is_none());
        assert_eq!(effect.stages().len(), 2);
    }
}
