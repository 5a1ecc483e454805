// asp_migrator/src/translate.rs
// Pure mapping from connector-style configuration to the platform's native
// connection specs and pipeline stages. No I/O, deterministic.

use serde_json::{Value, json};
use url::Url;

use crate::config::{ConnectorItemConfig, MainConfig, SinkItem, SourceItem, TopicTarget};
use crate::error::{MigratorError, Result};
use crate::platform::{
    DbRole, InstanceAuth, KafkaConnectionSpec, MongoConnectionSpec, QueueCredentials, TopicSpec,
};

/// The connections an item's processor depends on, plus the credentials for
/// the instance session used to create it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRequirement {
    pub kafka:    KafkaConnectionSpec,
    pub mongodb:  MongoConnectionSpec,
    pub instance: InstanceAuth,
}

/// Everything the provisioning steps need for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedItem {
    pub processor_name: String,
    pub connections:    ConnectionRequirement,
    /// Topics to provision ahead of the processor. Empty for sink items.
    pub topics:         Vec<TopicSpec>,
    pub pipeline:       Vec<Value>,
}

/// Translates one validated connector item against the shared main config.
pub fn translate(item: &ConnectorItemConfig, main: &MainConfig) -> Result<TranslatedItem> {
    match item {
        ConnectorItemConfig::Source(source) => translate_source(source, main),
        ConnectorItemConfig::Sink(sink) => translate_sink(sink, main),
    }
}

fn translate_source(source: &SourceItem, main: &MainConfig) -> Result<TranslatedItem> {
    let topic = expand_topic(&source.topic, &source.database, &source.collection);
    let pipeline = vec![
        json!({
            "$source": {
                "connectionName": main.mongodb_connection_name,
                "db": source.database,
                "coll": source.collection,
            },
        }),
        json!({
            "$emit": {
                "connectionName": main.kafka_connection_name,
                "topic": topic,
            },
        }),
    ];

    Ok(TranslatedItem {
        processor_name: processor_name(&main.processor_prefix, &source.collection),
        connections:    connection_requirement(
            main,
            &source.api_key,
            &source.api_secret,
            &source.user,
            &source.password,
            DbRole::ReadAnyDatabase,
        )?,
        topics:         vec![TopicSpec {
            name:               topic,
            partitions:         source.partitions,
            replication_factor: source.replication_factor,
        }],
        pipeline,
    })
}

fn translate_sink(sink: &SinkItem, main: &MainConfig) -> Result<TranslatedItem> {
    // A single topic stays a plain string, matching what the platform accepts
    // for both forms.
    let topic_value = if sink.topics.len() == 1 {
        Value::String(sink.topics[0].clone())
    } else {
        Value::Array(sink.topics.iter().cloned().map(Value::String).collect())
    };

    let when_not_matched = if sink.auto_create_collection {
        "insert"
    } else {
        "fail"
    };

    let pipeline = vec![
        json!({
            "$source": {
                "connectionName": main.kafka_connection_name,
                "topic": topic_value,
                "config": {
                    "auto_offset_reset": sink.offset_reset.as_str(),
                },
            },
        }),
        json!({
            "$merge": {
                "into": {
                    "connectionName": main.mongodb_connection_name,
                    "db": sink.database,
                    "coll": sink.collection,
                },
                "whenNotMatched": when_not_matched,
            },
        }),
    ];

    Ok(TranslatedItem {
        processor_name: processor_name(&main.processor_prefix, &sink.collection),
        connections:    connection_requirement(
            main,
            &sink.api_key,
            &sink.api_secret,
            &sink.user,
            &sink.password,
            DbRole::ReadWriteAnyDatabase,
        )?,
        topics:         Vec::new(),
        pipeline,
    })
}

fn connection_requirement(
    main: &MainConfig,
    api_key: &str,
    api_secret: &str,
    user: &str,
    password: &str,
    role: DbRole,
) -> Result<ConnectionRequirement> {
    Ok(ConnectionRequirement {
        kafka:    KafkaConnectionSpec {
            name:              main.kafka_connection_name.clone(),
            bootstrap_servers: bootstrap_servers(&main.rest_endpoint)?,
            credentials:       QueueCredentials {
                api_key:    api_key.to_string(),
                api_secret: api_secret.to_string(),
            },
        },
        mongodb:  MongoConnectionSpec {
            name:         main.mongodb_connection_name.clone(),
            cluster_name: main.cluster_name.clone(),
            role,
        },
        instance: InstanceAuth {
            url:      main.instance_url.clone(),
            username: user.to_string(),
            password: password.to_string(),
        },
    })
}

fn processor_name(prefix: &str, collection: &str) -> String {
    format!("{}-{}", prefix, collection)
}

/// The queue's broker listener lives on the REST endpoint's host at the
/// standard bootstrap port. The endpoint is validated at config load, so the
/// error paths here are unreachable in a normal run.
fn bootstrap_servers(rest_endpoint: &str) -> Result<String> {
    let url = Url::parse(rest_endpoint).map_err(|e| {
        MigratorError::Other(format!("Invalid REST endpoint '{}': {}", rest_endpoint, e))
    })?;
    let host = url.host_str().ok_or_else(|| {
        MigratorError::Other(format!("REST endpoint '{}' has no host", rest_endpoint))
    })?;
    Ok(format!("{}:{}", host, crate::KAFKA_BOOTSTRAP_PORT))
}

fn expand_topic(target: &TopicTarget, database: &str, collection: &str) -> String {
    match target {
        TopicTarget::Pattern(pattern) => pattern
            .replace("{database}", database)
            .replace("{collection}", collection),
        TopicTarget::Prefix(prefix) => format!("{}.{}.{}", prefix, database, collection),
    }
}
