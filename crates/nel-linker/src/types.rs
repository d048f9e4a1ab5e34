//! Entity type mapping

use std::collections::{BTreeMap, HashSet};

/// Key of the mapping entry that passes unmapped types through
const PASS_THROUGH: &str = "*";

/// Maps knowledge base types to output types
#[derive(Debug, Clone, Default)]
pub struct TypeMapper {
    mappings: BTreeMap<String, String>,
    pass_through: bool,
}

impl TypeMapper {
    pub fn new(mappings: &BTreeMap<String, String>) -> Self {
        let pass_through = mappings.is_empty() || mappings.contains_key(PASS_THROUGH);
        let mappings = mappings
            .iter()
            .filter(|(from, _)| from.as_str() != PASS_THROUGH)
            .map(|(from, to)| (from.clone(), to.clone()))
            .collect();

        Self {
            mappings,
            pass_through,
        }
    }

    /// Output types for `types`, in first occurrence order
    pub fn map<'a, I>(&self, types: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut seen = HashSet::new();
        types
            .into_iter()
            .filter_map(|t| match self.mappings.get(t) {
                Some(mapped) => Some(mapped.clone()),
                None if self.pass_through => Some(t.clone()),
                None => None,
            })
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }
}
