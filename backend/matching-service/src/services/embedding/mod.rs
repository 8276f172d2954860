// ============================================
// Embedding / Semantic Search Client
// ============================================
//
// Thin typed client over the external vector-search service. Every call runs
// under an explicit deadline; `is_available` never errors (any failure reads
// as "down"), so callers can branch to the keyword fallback without handling
// transport details.

use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use resilience::with_timeout;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum EmbedError {
    /// Health probe failed or timed out; service treated as down.
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),

    /// An embed/upsert/search call failed or timed out.
    #[error("embedding call failed: {0}")]
    Call(String),
}

pub type EmbedResult<T> = std::result::Result<T, EmbedError>;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// One record pushed into the semantic index. `vector` may be omitted; the
/// service then embeds `text` itself.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    pub payload: Value,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    items: &'a [UpsertItem],
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UpsertStats {
    pub added: u32,
    pub removed: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridSearchRequest {
    pub free_text: String,
    pub vibes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub avoid: Vec<String>,
    pub top_k: u32,
    pub filter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_province: Option<String>,
    pub boost_vibes: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    #[serde(default)]
    pub vibe_matches: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HybridSearchResponse {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
    #[serde(default)]
    pub strategy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    vectors: Option<u64>,
    #[allow(dead_code)]
    #[serde(default)]
    dimensions: Option<u32>,
}

/// Seam for the external semantic index, so the matcher and jobs can run
/// against an in-process stub in tests.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>>;

    async fn upsert(&self, items: &[UpsertItem]) -> EmbedResult<UpsertStats>;

    async fn hybrid_search(&self, request: &HybridSearchRequest)
        -> EmbedResult<HybridSearchResponse>;

    /// Never errors; any failure reads as unavailable.
    async fn is_available(&self) -> bool;
}

pub struct EmbeddingClient {
    client: HttpClient,
    base_url: String,
    call_timeout: Duration,
    bulk_timeout: Duration,
    health_timeout: Duration,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            call_timeout: Duration::from_secs(config.timeout_secs),
            bulk_timeout: Duration::from_secs(config.bulk_timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        }
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
        deadline: Duration,
    ) -> EmbedResult<T> {
        let url = format!("{}{}", self.base_url, path);
        with_timeout(deadline, async {
            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| e.to_string())?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(format!("HTTP {}: {}", status, text));
            }

            response.json::<T>().await.map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| EmbedError::Call(e.to_string()))
    }

    async fn health(&self) -> EmbedResult<HealthResponse> {
        let url = format!("{}/healthz", self.base_url);
        with_timeout(self.health_timeout, async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| e.to_string())?;

            if !response.status().is_success() {
                return Err(format!("HTTP {}", response.status()));
            }

            response
                .json::<HealthResponse>()
                .await
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| EmbedError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl SemanticIndex for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        let response: EmbedResponse = self
            .post_json("/embed", &EmbedRequest { texts }, self.call_timeout)
            .await?;
        Ok(response.embeddings)
    }

    async fn upsert(&self, items: &[UpsertItem]) -> EmbedResult<UpsertStats> {
        self.post_json("/upsert", &UpsertRequest { items }, self.bulk_timeout)
            .await
    }

    async fn hybrid_search(
        &self,
        request: &HybridSearchRequest,
    ) -> EmbedResult<HybridSearchResponse> {
        debug!(
            free_text = %request.free_text.chars().take(50).collect::<String>(),
            vibes = request.vibes.len(),
            filter_type = %request.filter_type,
            "calling hybrid-search"
        );
        self.post_json("/hybrid-search", request, self.call_timeout)
            .await
    }

    async fn is_available(&self) -> bool {
        match self.health().await {
            Ok(health) if health.status == "ok" => {
                debug!(
                    model = health.model.as_deref().unwrap_or("unknown"),
                    vectors = health.vectors.unwrap_or(0),
                    "embedding service healthy"
                );
                true
            }
            Ok(health) => {
                warn!(status = %health.status, "embedding service unhealthy");
                false
            }
            Err(e) => {
                warn!(error = %e, "embedding health check failed");
                false
            }
        }
    }
}
