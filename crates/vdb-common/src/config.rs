//! Configuration loaded from environment variables (§6.2).
//!
//! Mirrors the teacher's `Config::load` pattern: typed fields with sane
//! defaults, overridable from the process environment, no external file
//! format required for the core to run.

use serde::{Deserialize, Serialize};

/// Index variant selectable per-library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    BruteForce,
    KdTree,
    Lsh,
}

impl Default for IndexType {
    fn default() -> Self {
        IndexType::BruteForce
    }
}

impl std::str::FromStr for IndexType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "brute_force" => Ok(IndexType::BruteForce),
            "kd_tree" => Ok(IndexType::KdTree),
            "lsh" => Ok(IndexType::Lsh),
            other => Err(format!("unknown index type: {other}")),
        }
    }
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IndexType::BruteForce => "brute_force",
            IndexType::KdTree => "kd_tree",
            IndexType::Lsh => "lsh",
        };
        write!(f, "{s}")
    }
}

/// Node role in a leader/follower replication topology (§6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Leader,
    Follower,
}

impl Default for NodeRole {
    fn default() -> Self {
        NodeRole::Leader
    }
}

/// Process-wide settings, loaded once at startup and passed explicitly
/// (per DESIGN NOTES: avoid hidden globals / singletons).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,

    pub default_index_type: IndexType,
    pub allow_stale_index: bool,
    pub max_embedding_dimension: usize,

    pub embedding_provider: String,
    pub embedding_endpoint: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,

    pub persistence_enabled: bool,
    pub persistence_dir: String,

    pub max_concurrent_index_builds: usize,

    pub node_role: NodeRole,
    pub leader_url: Option<String>,
    pub replication_interval_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "vector-db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            log_format: "json".to_string(),

            default_index_type: IndexType::BruteForce,
            allow_stale_index: true,
            max_embedding_dimension: 4096,

            embedding_provider: "none".to_string(),
            embedding_endpoint: None,
            embedding_api_key: None,
            embedding_model: "local-hash-v1".to_string(),

            persistence_enabled: false,
            persistence_dir: "./data".to_string(),

            max_concurrent_index_builds: 2,

            node_role: NodeRole::Leader,
            leader_url: None,
            replication_interval_seconds: 10,
        }
    }
}

impl Settings {
    /// Load settings from `VECTORDB_*` environment variables, falling
    /// back to [`Settings::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut s = Settings::default();
        macro_rules! env_str {
            ($key:literal, $field:expr) => {
                if let Ok(v) = std::env::var($key) {
                    $field = v;
                }
            };
        }
        macro_rules! env_parse {
            ($key:literal, $field:expr) => {
                if let Ok(v) = std::env::var($key) {
                    if let Ok(parsed) = v.parse() {
                        $field = parsed;
                    }
                }
            };
        }

        env_str!("VECTORDB_APP_NAME", s.app_name);
        env_str!("VECTORDB_HOST", s.host);
        env_parse!("VECTORDB_PORT", s.port);
        env_str!("VECTORDB_LOG_LEVEL", s.log_level);
        env_str!("VECTORDB_LOG_FORMAT", s.log_format);

        if let Ok(v) = std::env::var("VECTORDB_DEFAULT_INDEX_TYPE") {
            if let Ok(parsed) = v.parse::<IndexType>() {
                s.default_index_type = parsed;
            }
        }
        env_parse!("VECTORDB_ALLOW_STALE_INDEX", s.allow_stale_index);
        env_parse!("VECTORDB_MAX_EMBEDDING_DIMENSION", s.max_embedding_dimension);

        env_str!("VECTORDB_EMBEDDING_PROVIDER", s.embedding_provider);
        if let Ok(v) = std::env::var("VECTORDB_EMBEDDING_ENDPOINT") {
            s.embedding_endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("VECTORDB_EMBEDDING_API_KEY") {
            s.embedding_api_key = Some(v);
        }
        env_str!("VECTORDB_EMBEDDING_MODEL", s.embedding_model);

        env_parse!("VECTORDB_PERSISTENCE_ENABLED", s.persistence_enabled);
        env_str!("VECTORDB_PERSISTENCE_DIR", s.persistence_dir);

        env_parse!("VECTORDB_MAX_CONCURRENT_INDEX_BUILDS", s.max_concurrent_index_builds);

        if let Ok(v) = std::env::var("VECTORDB_NODE_ROLE") {
            s.node_role = match v.as_str() {
                "follower" => NodeRole::Follower,
                _ => NodeRole::Leader,
            };
        }
        if let Ok(v) = std::env::var("VECTORDB_LEADER_URL") {
            s.leader_url = Some(v);
        }
        env_parse!("VECTORDB_REPLICATION_INTERVAL_SECONDS", s.replication_interval_seconds);

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let s = Settings::default();
        assert_eq!(s.default_index_type, IndexType::BruteForce);
        assert!(s.allow_stale_index);
        assert_eq!(s.max_embedding_dimension, 4096);
        assert_eq!(s.max_concurrent_index_builds, 2);
        assert_eq!(s.node_role, NodeRole::Leader);
    }

    #[test]
    fn index_type_round_trips_through_display_and_from_str() {
        for t in [IndexType::BruteForce, IndexType::KdTree, IndexType::Lsh] {
            let s = t.to_string();
            assert_eq!(s.parse::<IndexType>().unwrap(), t);
        }
    }
}
