//! Admin maintenance handlers.
//!
//! Endpoints:
//! - POST   /admin/embeddings/reindex

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use bedtime_core::story::StoryState;
use bedtime_db::models::story::StoryQuery;

use crate::error::AppResult;
use crate::response::{DataResponse, ReindexResponse};
use crate::state::AppState;

/// Page size used while walking all ready stories.
const REINDEX_PAGE_SIZE: i64 = 100;

/// POST /api/v1/admin/embeddings/reindex
///
/// Recompute and upsert embeddings for every ready story, one page at a
/// time.
pub async fn reindex_embeddings(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut indexed = 0;
    let mut offset = 0;

    loop {
        let page = state
            .store
            .list(&StoryQuery {
                states: vec![StoryState::Ready],
                limit: Some(REINDEX_PAGE_SIZE),
                offset: Some(offset),
                ..Default::default()
            })
            .await?;
        if page.is_empty() {
            break;
        }

        indexed += state.similarity.index_stories(&page).await?;
        offset += page.len() as i64;
        if (page.len() as i64) < REINDEX_PAGE_SIZE {
            break;
        }
    }

    tracing::info!(indexed, namespace = %state.similarity.namespace(), "Embeddings reindexed");
    Ok(Json(DataResponse {
        data: ReindexResponse { indexed },
    }))
}
