// asp_migrator/src/config.rs
// Loading and validation of the main config and per-connector config files.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::error::{MigratorError, Result};

/// Shared settings for a whole run. Loaded once, never mutated.
#[derive(Debug, Clone)]
pub struct MainConfig {
    pub cluster_id:              String,
    pub rest_endpoint:           String,
    pub instance_url:            String,
    pub processor_prefix:        String,
    pub kafka_connection_name:   String,
    pub mongodb_connection_name: String,
    pub cluster_name:            String,
    pub group_id:                String,
    pub tenant_name:             String,
}

impl MainConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let value = read_json(path)?;
        let config = MainConfig {
            cluster_id:              require_string(&value, path, "confluent-cluster-id")?,
            rest_endpoint:           require_string(&value, path, "confluent-rest-endpoint")?,
            instance_url:            require_string(
                &value,
                path,
                "mongodb-stream-processor-instance-url",
            )?,
            processor_prefix:        require_string(&value, path, "stream-processor-prefix")?,
            kafka_connection_name:   require_string(&value, path, "kafka-connection-name")?,
            mongodb_connection_name: require_string(&value, path, "mongodb-connection-name")?,
            cluster_name:            require_string(&value, path, "mongodb-cluster-name")?,
            group_id:                require_string(&value, path, "mongodb-group-id")?,
            tenant_name:             require_string(&value, path, "mongodb-tenant-name")?,
        };
        validate_rest_endpoint(&config.rest_endpoint, path)?;
        Ok(config)
    }
}

/// The bootstrap server derivation needs a host, so reject endpoints that do
/// not parse up front rather than per item.
fn validate_rest_endpoint(endpoint: &str, path: &Path) -> Result<()> {
    let has_host = Url::parse(endpoint)
        .map(|url| url.host_str().is_some())
        .unwrap_or(false);
    if !has_host {
        return Err(MigratorError::validation(
            path,
            format!(
                "Field 'confluent-rest-endpoint' must be an absolute URL with a host, got '{}'",
                endpoint
            ),
        ));
    }
    Ok(())
}

/// Which way data flows for one connector item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Source,
    Sink,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Source => "source",
            Direction::Sink => "sink",
        }
    }
}

/// Offset reset policy for sink consumers. Fixed set, anything else is
/// rejected at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetReset {
    Earliest,
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "earliest" => Some(OffsetReset::Earliest),
            "latest" => Some(OffsetReset::Latest),
            _ => None,
        }
    }
}

/// How a source item names its output topic: either a literal name /
/// placeholder pattern, or the legacy `topic.prefix` form that expands to
/// `<prefix>.<database>.<collection>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicTarget {
    Pattern(String),
    Prefix(String),
}

#[derive(Debug, Clone)]
pub struct SourceItem {
    pub user:               String,
    pub password:           String,
    pub api_key:            String,
    pub api_secret:         String,
    pub database:           String,
    pub collection:         String,
    pub topic:              TopicTarget,
    pub partitions:         i32,
    pub replication_factor: i32,
}

#[derive(Debug, Clone)]
pub struct SinkItem {
    pub user:                   String,
    pub password:               String,
    pub api_key:                String,
    pub api_secret:             String,
    pub database:               String,
    pub collection:             String,
    pub topics:                 Vec<String>,
    pub offset_reset:           OffsetReset,
    pub auto_create_collection: bool,
}

/// One connector configuration file, already validated.
#[derive(Debug, Clone)]
pub enum ConnectorItemConfig {
    Source(SourceItem),
    Sink(SinkItem),
}

const COMMON_KEYS: &[&str] = &[
    "connection.user",
    "connection.password",
    "kafka.api.key",
    "kafka.api.secret",
    "database",
    "collection",
];

const SOURCE_KEYS: &[&str] = &[
    "topic",
    "topic.prefix",
    "topic.creation.default.partitions",
    "topic.creation.default.replication.factor",
];

const SINK_KEYS: &[&str] = &[
    "topics",
    "consumer.override.auto.offset.reset",
    "collection.auto.create",
];

impl ConnectorItemConfig {
    /// Loads and validates one connector file. The variant is detected from
    /// the field set: `topics` marks a sink, `topic`/`topic.prefix` a source.
    pub fn load(path: &Path) -> Result<Self> {
        let value = read_json(path)?;

        let has_sink_topics = value.get("topics").is_some();
        let has_source_topic = value.get("topic").is_some() || value.get("topic.prefix").is_some();

        let item = match (has_source_topic, has_sink_topics) {
            (true, true) => {
                return Err(MigratorError::validation(
                    path,
                    "both source ('topic'/'topic.prefix') and sink ('topics') fields present",
                ));
            },
            (false, false) => {
                return Err(MigratorError::validation(
                    path,
                    "neither 'topic'/'topic.prefix' (source) nor 'topics' (sink) present",
                ));
            },
            (true, false) => ConnectorItemConfig::Source(load_source(&value, path)?),
            (false, true) => ConnectorItemConfig::Sink(load_sink(&value, path)?),
        };

        warn_unrecognized(&value, path, item.direction());
        Ok(item)
    }

    pub fn direction(&self) -> Direction {
        match self {
            ConnectorItemConfig::Source(_) => Direction::Source,
            ConnectorItemConfig::Sink(_) => Direction::Sink,
        }
    }

    /// The target collection, which also serves as the item identifier in the
    /// derived processor name.
    pub fn collection(&self) -> &str {
        match self {
            ConnectorItemConfig::Source(s) => &s.collection,
            ConnectorItemConfig::Sink(s) => &s.collection,
        }
    }
}

fn load_source(value: &Value, path: &Path) -> Result<SourceItem> {
    let topic = match (value.get("topic"), value.get("topic.prefix")) {
        (Some(_), Some(_)) => {
            return Err(MigratorError::validation(
                path,
                "'topic' and 'topic.prefix' are mutually exclusive",
            ));
        },
        (Some(t), None) => TopicTarget::Pattern(string_field(t, path, "topic")?),
        (None, Some(p)) => TopicTarget::Prefix(string_field(p, path, "topic.prefix")?),
        (None, None) => unreachable!("variant detection requires one of the topic fields"),
    };

    Ok(SourceItem {
        user: require_string(value, path, "connection.user")?,
        password: require_string(value, path, "connection.password")?,
        api_key: require_string(value, path, "kafka.api.key")?,
        api_secret: require_string(value, path, "kafka.api.secret")?,
        database: require_string(value, path, "database")?,
        collection: require_string(value, path, "collection")?,
        topic,
        partitions: optional_int(
            value,
            path,
            "topic.creation.default.partitions",
            crate::DEFAULT_TOPIC_PARTITIONS,
        )?,
        replication_factor: optional_int(
            value,
            path,
            "topic.creation.default.replication.factor",
            crate::DEFAULT_REPLICATION_FACTOR,
        )?,
    })
}

fn load_sink(value: &Value, path: &Path) -> Result<SinkItem> {
    let topics = match value.get("topics") {
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        Some(Value::Array(arr)) => {
            let mut names = Vec::with_capacity(arr.len());
            for entry in arr {
                names.push(string_field(entry, path, "topics")?);
            }
            if names.is_empty() {
                return Err(MigratorError::validation(path, "'topics' array cannot be empty"));
            }
            names
        },
        _ => {
            return Err(MigratorError::validation(
                path,
                "'topics' must be a non-empty string or array of strings",
            ));
        },
    };

    let reset_raw = require_string(value, path, "consumer.override.auto.offset.reset")?;
    let offset_reset = OffsetReset::parse(&reset_raw).ok_or_else(|| {
        MigratorError::validation(
            path,
            format!(
                "'consumer.override.auto.offset.reset' must be 'earliest' or 'latest', got '{}'",
                reset_raw
            ),
        )
    })?;

    let auto_create_collection = match value.get("collection.auto.create") {
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(MigratorError::validation(
                path,
                "'collection.auto.create' must be a boolean",
            ));
        },
        None => {
            return Err(MigratorError::validation(
                path,
                "Missing required field 'collection.auto.create'",
            ));
        },
    };

    Ok(SinkItem {
        user: require_string(value, path, "connection.user")?,
        password: require_string(value, path, "connection.password")?,
        api_key: require_string(value, path, "kafka.api.key")?,
        api_secret: require_string(value, path, "kafka.api.secret")?,
        database: require_string(value, path, "database")?,
        collection: require_string(value, path, "collection")?,
        topics,
        offset_reset,
        auto_create_collection,
    })
}

fn warn_unrecognized(value: &Value, path: &Path, direction: Direction) {
    let recognized: &[&str] = match direction {
        Direction::Source => SOURCE_KEYS,
        Direction::Sink => SINK_KEYS,
    };
    if let Some(object) = value.as_object() {
        for key in object.keys() {
            if !COMMON_KEYS.contains(&key.as_str()) && !recognized.contains(&key.as_str()) {
                warn!("Skipping unrecognized field '{}' in {}", key, path.display());
            }
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| MigratorError::ConfigParse {
        path:   path.to_path_buf(),
        source: e,
    })
}

fn require_string(value: &Value, path: &Path, key: &str) -> Result<String> {
    match value.get(key) {
        Some(v) => {
            let s = string_field(v, path, key)?;
            if s.is_empty() {
                return Err(MigratorError::validation(
                    path,
                    format!("Field '{}' must not be empty", key),
                ));
            }
            Ok(s)
        },
        None => Err(MigratorError::validation(
            path,
            format!("Missing required field '{}'", key),
        )),
    }
}

fn string_field(value: &Value, path: &Path, key: &str) -> Result<String> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        MigratorError::validation(path, format!("Field '{}' must be a string", key))
    })
}

fn optional_int(value: &Value, path: &Path, key: &str, default: i32) -> Result<i32> {
    match value.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                MigratorError::validation(
                    path,
                    format!("Field '{}' must be a positive integer", key),
                )
            }),
    }
}
