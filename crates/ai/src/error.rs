/// Errors raised by every external collaborator: text, image, and speech
/// generation, embeddings, the vector index, and asset storage.
///
/// Collaborators always fail with one of these instead of returning a
/// sentinel value, so the pipeline has a single place to catch them.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request itself failed (network, DNS, TLS, body read, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream API returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response arrived but its structured payload could not be decoded.
    #[error("Malformed structured output: {0}")]
    MalformedOutput(String),

    /// A required input field was absent on the story.
    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    /// The API answered successfully but carried no usable content.
    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),

    /// Writing or inspecting a generated asset failed.
    #[error("Asset storage failed: {0}")]
    Asset(String),
}

impl From<std::io::Error> for GenerationError {
    fn from(err: std::io::Error) -> Self {
        Self::Asset(err.to_string())
    }
}
