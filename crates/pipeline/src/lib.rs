//! Story generation pipeline: the per-story state machine driver and the
//! similarity lookup built on story embeddings.

pub mod context;
pub mod driver;
pub mod error;
pub mod locks;
pub mod similarity;

pub use driver::{Generators, StoryPipeline};
pub use error::PipelineError;
pub use similarity::SimilarityService;
