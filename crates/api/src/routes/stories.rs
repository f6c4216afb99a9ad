use axum::routing::{get, put};
use axum::Router;

use crate::handlers::stories;
use crate::state::AppState;

/// Routes mounted at `/stories`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(stories::list_stories).post(stories::create_story))
        .route("/{id}", get(stories::get_story))
        .route("/{id}/related", get(stories::related_stories))
        .route("/{id}/duration", put(stories::update_duration))
}
