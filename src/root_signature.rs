//! Resource binding layout shared by pipelines

use wgpu_types as wgt;

/// Type of binding expected at a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingLayoutType {
    Texture,
    Sampler,
    UniformBuffer,
    StorageBuffer,
}

/// Binding layout entry for a specific slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingLayoutEntry {
    /// Which bind group this entry belongs to (0, 1, 2, etc.)
    pub group: u32,
    /// Binding slot within the group
    pub binding: u32,
    pub ty: BindingLayoutType,
    pub visibility: wgt::ShaderStages,
}

/// Resource bindings a pipeline expects
///
/// Equality is structural over the entries; the label is only for logs.
#[derive(Debug, Clone, Default)]
pub struct RootSignature {
    pub label: Option<String>,
    entries: Vec<BindingLayoutEntry>,
}

impl RootSignature {
    /// Entries are kept sorted by (group, binding)
    pub fn new(label: Option<String>, mut entries: Vec<BindingLayoutEntry>) -> Self {
        entries.sort_by_key(|e| (e.group, e.binding));
        Self { label, entries }
    }

    pub fn entries(&self) -> &[BindingLayoutEntry] {
        &self.entries
    }

    /// Number of bind groups, counting gaps
    pub fn group_count(&self) -> u32 {
        self.entries.iter().map(|e| e.group.saturating_add(1)).max().unwrap_or(0)
    }
}

impl PartialEq for RootSignature {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for RootSignature {}

impl std::hash::Hash for RootSignature {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(group: u32, binding: u32, ty: BindingLayoutType) -> BindingLayoutEntry {
        BindingLayoutEntry {
            group,
            binding,
            ty,
            visibility: wgt::ShaderStages::VERTEX | wgt::ShaderStages::FRAGMENT,
        }
    }

    #[test]
    fn test_entry_order_does_not_matter() {
        let a = RootSignature::new(
            Some("a".into()),
            vec![entry(1, 0, BindingLayoutType::UniformBuffer), entry(0, 1, BindingLayoutType::Sampler)],
        );
        let b = RootSignature::new(
            Some("b".into()),
            vec![entry(0, 1, BindingLayoutType::Sampler), entry(1, 0, BindingLayoutType::UniformBuffer)],
        );
        assert_eq!(a, b);
        assert_eq!(a.group_count(), 2);
        assert_eq!(RootSignature::default().group_count(), 0);
    }

    #[test]
    fn test_group_count_at_max_group() {
        let signature = RootSignature::new(None, vec![entry(u32::MAX, 0, BindingLayoutType::Texture)]);
        assert_eq!(signature.group_count(), u32::MAX);
    }
}
