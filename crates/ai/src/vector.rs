//! Vector index abstraction and an in-process implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bedtime_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Metadata stored alongside each story embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMetadata {
    pub is_public: bool,
    /// Owner of the story; absent for system-owned stories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<DbId>,
}

/// One embedding keyed by story id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

impl VectorRecord {
    pub fn for_story(story_id: DbId, values: Vec<f32>, metadata: VectorMetadata) -> Self {
        Self {
            id: story_id.to_string(),
            values,
            metadata,
        }
    }
}

/// Restricts matches to public vectors plus those owned by `owner_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityFilter {
    pub owner_id: Option<DbId>,
}

impl VisibilityFilter {
    pub fn allows(&self, metadata: &VectorMetadata) -> bool {
        metadata.is_public || (self.owner_id.is_some() && metadata.user_id == self.owner_id)
    }

    /// The filter in the index's metadata query language.
    pub fn to_query(&self) -> serde_json::Value {
        let mut clauses = vec![serde_json::json!({ "isPublic": { "$eq": true } })];
        if let Some(owner_id) = self.owner_id {
            clauses.push(serde_json::json!({ "userId": { "$eq": owner_id } }));
        }
        serde_json::json!({ "$or": clauses })
    }
}

/// A nearest-neighbour hit, best first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
}

impl VectorMatch {
    /// The story id encoded in the match id, if it is numeric.
    pub fn story_id(&self) -> Option<DbId> {
        self.id.parse().ok()
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records in `namespace`.
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), GenerationError>;

    /// Up to `top_k` records closest to `vector`, best first.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        filter: &VisibilityFilter,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, GenerationError>;
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Exhaustive cosine-similarity index held in memory.
#[derive(Default)]
pub struct MemoryVectorIndex {
    namespaces: Mutex<HashMap<String, HashMap<String, VectorRecord>>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored in `namespace`.
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(namespace)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), GenerationError> {
        let mut namespaces = self.namespaces.lock().unwrap_or_else(|e| e.into_inner());
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            entries.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        filter: &VisibilityFilter,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, GenerationError> {
        let namespaces = self.namespaces.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<VectorMatch> = entries
            .values()
            .filter(|record| filter.allows(&record.metadata))
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: cosine(vector, &record.values),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(top_k);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public() -> VectorMetadata {
        VectorMetadata {
            is_public: true,
            user_id: None,
        }
    }

    fn private(user_id: DbId) -> VectorMetadata {
        VectorMetadata {
            is_public: false,
            user_id: Some(user_id),
        }
    }

    #[test]
    fn filter_allows_public_and_owned() {
        let filter = VisibilityFilter { owner_id: Some(1) };
        assert!(filter.allows(&public()));
        assert!(filter.allows(&private(1)));
        assert!(!filter.allows(&private(2)));
        assert!(!VisibilityFilter::default().allows(&private(2)));
    }

    #[test]
    fn filter_query_includes_owner_clause() {
        let query = VisibilityFilter { owner_id: Some(9) }.to_query();
        assert_eq!(query["$or"][1]["userId"]["$eq"], 9);
        let anonymous = VisibilityFilter::default().to_query();
        assert_eq!(anonymous["$or"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_and_respects_filter() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(
                "ns",
                vec![
                    VectorRecord::for_story(1, vec![1.0, 0.0], public()),
                    VectorRecord::for_story(2, vec![0.9, 0.1], public()),
                    VectorRecord::for_story(3, vec![0.0, 1.0], public()),
                    VectorRecord::for_story(4, vec![1.0, 0.0], private(77)),
                ],
            )
            .await
            .unwrap();

        let hits = index
            .query("ns", &[1.0, 0.0], &VisibilityFilter::default(), 2)
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().filter_map(VectorMatch::story_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let index = MemoryVectorIndex::new();
        index
            .upsert("dev", vec![VectorRecord::for_story(1, vec![1.0], public())])
            .await
            .unwrap();
        let hits = index
            .query("prod", &[1.0], &VisibilityFilter::default(), 5)
            .await
            .unwrap();
        assert!(hits.is_empty());
        assert_eq!(index.len("dev"), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_id() {
        let index = MemoryVectorIndex::new();
        for values in [vec![1.0, 0.0], vec![0.0, 1.0]] {
            index
                .upsert("ns", vec![VectorRecord::for_story(5, values, public())])
                .await
                .unwrap();
        }
        assert_eq!(index.len("ns"), 1);
        let hits = index
            .query("ns", &[0.0, 1.0], &VisibilityFilter::default(), 1)
            .await
            .unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }
}
