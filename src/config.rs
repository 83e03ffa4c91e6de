//! Runtime configuration shared by the library and the CLI

use crate::ingest::IngestMode;
use std::time::Duration;

/// What to ingest and which domain it belongs to
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Target AD domain, e.g. `lab.local`. Upper-cased when building identities.
    pub domain: String,
    /// How the input file is interpreted
    pub mode: IngestMode,
}

impl LoaderConfig {
    pub fn new(domain: impl Into<String>, mode: IngestMode) -> Self {
        Self {
            domain: domain.into(),
            mode,
        }
    }
}

/// Connection settings for the Neo4j HTTP endpoint
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// Base URL of the HTTP API
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Database name (Neo4j 4+)
    pub database: String,
    /// Connection attempts before giving up
    pub connect_retries: u32,
    /// Pause between connection attempts
    pub retry_delay: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            database: "neo4j".to_string(),
            connect_retries: 3,
            retry_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Neo4jConfig {
    /// Transactional commit endpoint for the configured database
    pub fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.uri.trim_end_matches('/'),
            self.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_url_trims_slash() {
        let config = Neo4jConfig {
            uri: "http://graph.lab:7474/".to_string(),
            database: "bloodhound".to_string(),
            ..Default::default()
        };
        assert_eq!(config.commit_url(), "http://graph.lab:7474/db/bloodhound/tx/commit");
    }

    #[test]
    fn test_defaults() {
        let config = Neo4jConfig::default();
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.connect_retries, 3);
    }
}
