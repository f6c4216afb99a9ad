//! Similar-story lookup constants and rank reconstruction.
//!
//! The vector index returns ranked ids; the record store returns records in
//! arbitrary order. [`place_by_rank`] puts each record back into the slot of
//! its id so the similarity order survives the round-trip.

use crate::types::DbId;

/// Number of neighbours requested from the vector index.
pub const SIMILAR_STORIES_TOP_K: usize = 5;

/// Cosine similarity below which a match is not a neighbour.
pub const MIN_SIMILARITY_SCORE: f32 = 0.3;

/// Dimensionality of story text embeddings.
pub const EMBEDDING_DIMENSIONS: usize = 512;

/// Vector namespace used by production deployments.
pub const PRODUCTION_NAMESPACE: &str = "bedtime-ai";

/// Vector namespace used by every other environment.
pub const DEVELOPMENT_NAMESPACE: &str = "bedtime-ai-dev";

/// Resolve the vector namespace for a deployment environment name.
///
/// Only `"production"` (case-insensitive) maps to the production namespace,
/// so local and staging data never leak into production results.
pub fn namespace_for_environment(environment: &str) -> &'static str {
    if environment.eq_ignore_ascii_case("production") {
        PRODUCTION_NAMESPACE
    } else {
        DEVELOPMENT_NAMESPACE
    }
}

/// Whether a match with `score` counts as a neighbour.
pub fn is_neighbour(score: f32) -> bool {
    score >= MIN_SIMILARITY_SCORE
}

/// Drop the query story's own id from ranked match ids, keeping order.
pub fn exclude_self(ranked_ids: impl IntoIterator<Item = DbId>, own_id: DbId) -> Vec<DbId> {
    ranked_ids.into_iter().filter(|id| *id != own_id).collect()
}

/// Place `records` into one slot per ranked id.
///
/// Records whose id is not in `ranked_ids` are ignored. An id with no
/// matching record leaves `None` in its slot; later slots do not shift.
pub fn place_by_rank<T>(
    ranked_ids: &[DbId],
    records: Vec<T>,
    id_of: impl Fn(&T) -> DbId,
) -> Vec<Option<T>> {
    let mut slots: Vec<Option<T>> = ranked_ids.iter().map(|_| None).collect();
    for record in records {
        let id = id_of(&record);
        if let Some(index) = ranked_ids.iter().position(|ranked| *ranked == id) {
            slots[index] = Some(record);
        }
    }
    slots
}
