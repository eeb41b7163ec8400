//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which search engine implementation backs the projection
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackend {
    #[default]
    Elasticsearch,
    InMemory,
}

/// Names of the three projection indices
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexNames {
    #[serde(default = "default_items_index")]
    pub items: String,

    #[serde(default = "default_tags_index")]
    pub tags: String,

    #[serde(default = "default_users_index")]
    pub users: String,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            items: default_items_index(),
            tags: default_tags_index(),
            users: default_users_index(),
        }
    }
}

/// Search projection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Engine backend
    #[serde(default)]
    pub backend: SearchBackend,

    /// Elasticsearch node URL
    #[serde(default = "default_node_url")]
    pub node_url: String,

    /// Basic auth username
    pub username: Option<String>,

    /// Name of the environment variable holding the basic auth password
    pub password_env: Option<String>,

    /// PEM encoded CA certificate used to verify the node
    pub ca_cert: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Index names
    #[serde(default)]
    pub indices: IndexNames,

    /// Results per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Minimum number of should clauses that must match, engine default when unset
    pub minimum_should_match: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::default(),
            node_url: default_node_url(),
            username: None,
            password_env: None,
            ca_cert: None,
            request_timeout_secs: default_request_timeout(),
            indices: IndexNames::default(),
            page_size: default_page_size(),
            minimum_should_match: None,
        }
    }
}

impl SearchConfig {
    /// Basic auth password read from the configured environment variable
    pub fn password(&self) -> Option<String> {
        self.password_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
    }
}

fn default_node_url() -> String {
    "https://localhost:9200".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_page_size() -> u32 {
    20
}

fn default_items_index() -> String {
    "pickup_lines".to_string()
}

fn default_tags_index() -> String {
    "tags".to_string()
}

fn default_users_index() -> String {
    "users".to_string()
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn backend(mut self, backend: SearchBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn node_url(mut self, url: impl Into<String>) -> Self {
        self.config.node_url = url.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    pub fn password_env(mut self, name: impl Into<String>) -> Self {
        self.config.password_env = Some(name.into());
        self
    }

    pub fn ca_cert(mut self, path: PathBuf) -> Self {
        self.config.ca_cert = Some(path);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn indices(mut self, indices: IndexNames) -> Self {
        self.config.indices = indices;
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn minimum_should_match(mut self, value: u32) -> Self {
        self.config.minimum_should_match = Some(value);
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
