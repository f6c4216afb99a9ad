//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod story_repo;
pub mod user_repo;

pub use story_repo::StoryRepo;
pub use user_repo::UserRepo;
