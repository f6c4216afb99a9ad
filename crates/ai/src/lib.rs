//! External collaborators for story generation: OpenAI text, image, speech,
//! and embedding clients, vector indexes, and asset storage.

pub mod assets;
pub mod error;
pub mod generation;
pub mod openai;
pub mod pinecone;
pub mod prompts;
pub mod structured;
pub mod vector;

pub use assets::{AssetWriter, LocalAssetWriter};
pub use error::GenerationError;
pub use generation::{
    AudioGenerator, Embedder, GeneratedStory, ImageGenerator, StoryContext, StoryRequest,
    TextGenerator,
};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use pinecone::{PineconeConfig, PineconeIndex};
pub use vector::{MemoryVectorIndex, VectorIndex, VectorMatch, VectorMetadata, VectorRecord, VisibilityFilter};
