//! Pinecone data-plane client implementing [`VectorIndex`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GenerationError;
use crate::vector::{VectorIndex, VectorMatch, VectorRecord, VisibilityFilter};

const API_VERSION: &str = "2024-07";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pinecone caps upsert requests; larger batches are split.
const UPSERT_BATCH_SIZE: usize = 100;

/// Connection settings for one Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    /// Index host, e.g. `https://stories-abc123.svc.us-east1.pinecone.io`.
    pub index_host: String,
}

pub struct PineconeIndex {
    client: reqwest::Client,
    config: PineconeConfig,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

fn upsert_body(namespace: &str, records: &[VectorRecord]) -> serde_json::Value {
    serde_json::json!({
        "namespace": namespace,
        "vectors": records,
    })
}

fn query_body(
    namespace: &str,
    vector: &[f32],
    filter: &VisibilityFilter,
    top_k: usize,
) -> serde_json::Value {
    serde_json::json!({
        "namespace": namespace,
        "vector": vector,
        "topK": top_k,
        "filter": filter.to_query(),
        "includeMetadata": false,
        "includeValues": false,
    })
}

impl PineconeIndex {
    pub fn new(config: PineconeConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        let host = self.config.index_host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}{path}")
        } else {
            format!("https://{host}{path}")
        }
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response, GenerationError> {
        let response = self
            .client
            .post(self.url(path))
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), GenerationError> {
        for chunk in records.chunks(UPSERT_BATCH_SIZE) {
            self.post("/vectors/upsert", &upsert_body(namespace, chunk)).await?;
            tracing::debug!(namespace, count = chunk.len(), "Vectors upserted");
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
        let response = self
            .post("/query", &query_body(namespace, vector, filter, top_k))
            .await?;
        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::VectorMetadata;

    fn index(host: &str) -> PineconeIndex {
        PineconeIndex::new(PineconeConfig {
            api_key: "key".to_string(),
            index_host: host.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn bare_host_gets_https_scheme() {
        assert_eq!(index("idx.pinecone.io").url("/query"), "https://idx.pinecone.io/query");
        assert_eq!(index("http://localhost:5080/").url("/query"), "http://localhost:5080/query");
    }

    #[test]
    fn upsert_body_uses_camel_case_metadata() {
        let record = VectorRecord::for_story(
            8,
            vec![0.5],
            VectorMetadata {
                is_public: true,
                user_id: Some(2),
            },
        );
        let body = upsert_body("bedtime-ai-dev", &[record]);
        assert_eq!(body["namespace"], "bedtime-ai-dev");
        assert_eq!(body["vectors"][0]["id"], "8");
        assert_eq!(body["vectors"][0]["metadata"]["isPublic"], true);
        assert_eq!(body["vectors"][0]["metadata"]["userId"], 2);
    }

    #[test]
    fn query_body_carries_filter_and_top_k() {
        let body = query_body("ns", &[0.1, 0.2], &VisibilityFilter { owner_id: Some(4) }, 5);
        assert_eq!(body["topK"], 5);
        assert_eq!(body["filter"]["$or"][1]["userId"]["$eq"], 4);
    }

    #[test]
    fn query_response_tolerates_missing_matches() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"namespace":"ns"}"#).unwrap();
        assert!(parsed.matches.is_empty());
        let parsed: QueryResponse =
            serde_json::from_str(r#"{"matches":[{"id":"3","score":0.9}]}"#).unwrap();
        assert_eq!(parsed.matches[0].story_id(), Some(3));
    }
}
