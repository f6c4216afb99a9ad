pub mod admin;
pub mod health;
pub mod stories;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /stories                          list public feed, create
/// /stories/{id}                     get
/// /stories/{id}/related             similar stories
/// /stories/{id}/duration            report playback duration (PUT)
///
/// /admin/embeddings/reindex         re-embed all ready stories (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/stories", stories::router())
        .nest("/admin", admin::router())
}
