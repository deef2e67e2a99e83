use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::StageResult;
use crate::stages::{StageCatalog, StageKey};

/// Aggregate response: one [`StageResult`] per catalog stage.
///
/// Entries are kept in catalog order so serialized responses are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResponse {
    pub results: IndexMap<StageKey, StageResult>,
}

impl CompileResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: StageKey, result: StageResult) {
        self.results.insert(key, result);
    }

    pub fn get(&self, key: StageKey) -> Option<&StageResult> {
        self.results.get(&key)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when the response holds exactly the catalog's stage keys.
    pub fn is_complete(&self, catalog: &StageCatalog) -> bool {
        self.results.len() == catalog.len()
            && catalog
                .stages()
                .iter()
                .all(|spec| self.results.contains_key(&spec.key))
    }

    /// True when every stage exited with status 0.
    pub fn all_succeeded(&self) -> bool {
        self.results.values().all(StageResult::succeeded)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StageKey, &StageResult)> {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::Toolchain;

    #[test]
    fn completeness_tracks_catalog_keys() {
        let catalog = StageCatalog::new(Toolchain::default());
        let mut response = CompileResponse::new();
        assert!(!response.is_complete(&catalog));

        for spec in catalog.stages() {
            response.insert(
                spec.key,
                StageResult::exited(spec.label, Vec::new(), 0, ""),
            );
        }
        assert!(response.is_complete(&catalog));
        assert!(response.all_succeeded());
    }

    #[test]
    fn serializes_keys_in_insertion_order() {
        let mut response = CompileResponse::new();
        response.insert(StageKey::Parse, StageResult::exited("Parse", Vec::new(), 0, ""));
        response.insert(StageKey::SilRaw, StageResult::exited("SIL Raw", Vec::new(), 1, "error"));

        let json = serde_json::to_string(&response).unwrap();
        let parse_at = json.find("\"parse\"").unwrap();
        let raw_at = json.find("\"silRaw\"").unwrap();
        assert!(parse_at < raw_at);
        assert!(!response.all_succeeded());
    }
}
