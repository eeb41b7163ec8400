//! Elasticsearch REST client implementing [`SearchEngine`]

use crate::search::config::SearchConfig;
use crate::search::engine::{RawHit, RawSearchResponse, SearchEngine};
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::{Query, SearchRequest};
use crate::search::script::ReactionScript;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Talks to a single Elasticsearch node over HTTP
pub struct ElasticsearchEngine {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    hits: HitsBody,
}

#[derive(Debug, Deserialize)]
struct HitsBody {
    total: TotalBody,
    #[serde(default)]
    hits: Vec<HitBody>,
}

#[derive(Debug, Deserialize)]
struct TotalBody {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct HitBody {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[derive(Debug, Deserialize)]
struct DeleteByQueryBody {
    #[serde(default)]
    deleted: u64,
}

impl ElasticsearchEngine {
    /// Build a client from configuration. A configured CA certificate must be readable PEM.
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));

        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                SearchError::InvalidConfiguration(format!(
                    "Failed to read CA certificate {:?}: {}",
                    path, e
                ))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                SearchError::InvalidConfiguration(format!("Invalid CA certificate: {}", e))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder.build().map_err(|e| {
            SearchError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.node_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}/{}", self.base_url, path))
            .header("User-Agent", "playbook/1.0");

        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> SearchResult<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Unavailable(format!(
                    "Request timed out after {} seconds",
                    self.timeout_secs
                ))
            } else if e.is_connect() {
                SearchError::Unavailable(format!("Failed to connect to {}: {}", self.base_url, e))
            } else {
                SearchError::QueryFailed(format!("Request failed: {}", e))
            }
        })
    }

    /// Map a non-success response to an error, using `otherwise` for unclassified failures
    async fn check(
        response: Response,
        target: &str,
        otherwise: fn(String) -> SearchError,
    ) -> SearchResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("{} returned {}: {}", target, status, body);

        Err(match status {
            StatusCode::NOT_FOUND if body.contains("index_not_found_exception") => {
                SearchError::IndexNotFound(message)
            }
            StatusCode::NOT_FOUND => SearchError::DocumentNotFound(message),
            StatusCode::CONFLICT => SearchError::VersionConflict(message),
            StatusCode::SERVICE_UNAVAILABLE => SearchError::Unavailable(message),
            _ => otherwise(message),
        })
    }
}

#[async_trait]
impl SearchEngine for ElasticsearchEngine {
    async fn index_exists(&self, index: &str) -> SearchResult<bool> {
        let response = self.send(self.request(Method::HEAD, index)).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(SearchError::QueryFailed(format!(
                "Index existence check for {} returned {}",
                index, status
            ))),
        }
    }

    async fn create_index(&self, index: &str, mappings: &Value) -> SearchResult<()> {
        let request = self
            .request(Method::PUT, index)
            .json(&json!({ "mappings": mappings }));
        let response = self.send(request).await?;
        Self::check(response, index, SearchError::IndexInitFailed).await?;

        tracing::debug!(index = %index, "Index created");
        Ok(())
    }

    async fn index_document(&self, index: &str, id: &str, document: &Value) -> SearchResult<()> {
        let request = self
            .request(Method::PUT, &format!("{}/_doc/{}", index, id))
            .json(document);
        let response = self.send(request).await?;
        Self::check(response, index, SearchError::IndexingFailed).await?;

        tracing::debug!(index = %index, document_id = %id, "Document indexed");
        Ok(())
    }

    async fn update_document(&self, index: &str, id: &str, partial: &Value) -> SearchResult<()> {
        let request = self
            .request(Method::POST, &format!("{}/_update/{}", index, id))
            .json(&json!({ "doc": partial }));
        let response = self.send(request).await?;
        Self::check(response, index, SearchError::IndexingFailed).await?;

        tracing::debug!(index = %index, document_id = %id, "Document updated");
        Ok(())
    }

    async fn update_by_script(
        &self,
        index: &str,
        id: &str,
        script: &ReactionScript,
    ) -> SearchResult<()> {
        let request = self
            .request(Method::POST, &format!("{}/_update/{}", index, id))
            .json(&script.to_json());
        let response = self.send(request).await?;
        Self::check(response, index, SearchError::ScriptFailed).await?;

        tracing::debug!(
            index = %index,
            document_id = %id,
            steps = script.steps().len(),
            "Document updated by script"
        );
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> SearchResult<()> {
        let request = self.request(Method::DELETE, &format!("{}/_doc/{}", index, id));
        let response = self.send(request).await?;
        Self::check(response, index, SearchError::DeletionFailed).await?;

        tracing::debug!(index = %index, document_id = %id, "Document deleted");
        Ok(())
    }

    async fn delete_by_query(&self, index: &str, query: &Query) -> SearchResult<u64> {
        let request = self
            .request(Method::POST, &format!("{}/_delete_by_query", index))
            .json(&json!({ "query": query }));
        let response = self.send(request).await?;
        let response = Self::check(response, index, SearchError::DeletionFailed).await?;

        let body: DeleteByQueryBody = response
            .json()
            .await
            .map_err(|e| SearchError::Serialization(format!("Invalid delete response: {}", e)))?;

        tracing::debug!(index = %index, deleted = body.deleted, "Documents deleted by query");
        Ok(body.deleted)
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> SearchResult<RawSearchResponse> {
        let http_request = self
            .request(Method::POST, &format!("{}/_search", index))
            .json(&request.to_json());
        let response = self.send(http_request).await?;
        let response = Self::check(response, index, SearchError::QueryFailed).await?;

        let body: SearchBody = response
            .json()
            .await
            .map_err(|e| SearchError::Serialization(format!("Invalid search response: {}", e)))?;

        Ok(RawSearchResponse {
            total: body.hits.total.value,
            hits: body
                .hits
                .hits
                .into_iter()
                .map(|hit| RawHit {
                    id: hit.id,
                    score: hit.score.unwrap_or(0.0),
                    source: hit.source,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::SearchConfigBuilder;

    #[test]
    fn test_base_url_is_normalized() {
        let config = SearchConfigBuilder::new()
            .node_url("http://localhost:9200/")
            .build();
        let engine = ElasticsearchEngine::new(&config).unwrap();
        assert_eq!(engine.base_url, "http://localhost:9200");
    }

    #[test]
    fn test_missing_ca_certificate_is_a_configuration_error() {
        let config = SearchConfigBuilder::new()
            .ca_cert("/nonexistent/ca.pem".into())
            .build();
        assert!(matches!(
            ElasticsearchEngine::new(&config),
            Err(SearchError::InvalidConfiguration(_))
        ));
    }
}
