//! Remote embedding provider with a deterministic local fallback.
//!
//! Grounded on `app/domain/services/embedding_service.py`'s Cohere client:
//! a blocking HTTP call to a configured embedding endpoint, silently
//! falling back to [`vdb_core::embedding::LocalHashEmbedder`] on any
//! transport or shape error (§7: embedding failures never propagate).

use serde::{Deserialize, Serialize};
use tracing::warn;

use vdb_core::embedding::{fit_dimension, EmbeddingProvider, LocalHashEmbedder};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct RemoteEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    fallback: LocalHashEmbedder,
}

impl RemoteEmbedder {
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint,
            api_key,
            model,
            fallback: LocalHashEmbedder::new(),
        }
    }

    fn call_remote(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                model: &self.model,
                texts: [text],
            })
            .send()?
            .error_for_status()?
            .json::<EmbedResponse>()?;
        resp.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty embeddings response"))
    }
}

impl EmbeddingProvider for RemoteEmbedder {
    fn embed(&self, text: &str, target_dimension: usize) -> Vec<f32> {
        match self.call_remote(text) {
            Ok(vec) => fit_dimension(vec, target_dimension),
            Err(err) => {
                warn!(error = %err, "remote embedding call failed, using local fallback");
                self.fallback.embed(text, target_dimension)
            }
        }
    }
}
