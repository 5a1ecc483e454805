// asp_migrator/src/platform.rs
// Capability traits for the external platforms, plus the shared resource types.
// Real clients (atlas.rs, kafka.rs) and test doubles implement the same traits.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;

/// Proof that the run holds an authenticated platform session. Acquired once
/// at run start and passed by reference to every call.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: String,
}

/// Credentials for the stream processing instance itself. These come from the
/// connector item, not the shared session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceAuth {
    pub url:      String,
    pub username: String,
    pub password: String,
}

/// Built-in database role granted to a MongoDB connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbRole {
    ReadAnyDatabase,
    ReadWriteAnyDatabase,
}

impl DbRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbRole::ReadAnyDatabase => "readAnyDatabase",
            DbRole::ReadWriteAnyDatabase => "readWriteAnyDatabase",
        }
    }
}

/// API key pair for the queue cluster, taken from the connector item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueCredentials {
    pub api_key:    String,
    pub api_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConnectionSpec {
    pub name:              String,
    pub bootstrap_servers: String,
    pub credentials:       QueueCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConnectionSpec {
    pub name:         String,
    pub cluster_name: String,
    pub role:         DbRole,
}

/// A named connection to be ensured on the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSpec {
    Kafka(KafkaConnectionSpec),
    Mongodb(MongoConnectionSpec),
}

impl ConnectionSpec {
    pub fn name(&self) -> &str {
        match self {
            ConnectionSpec::Kafka(spec) => &spec.name,
            ConnectionSpec::Mongodb(spec) => &spec.name,
        }
    }

    /// The request body the platform expects for `create-resource`.
    pub fn to_request_body(&self) -> Value {
        match self {
            ConnectionSpec::Kafka(spec) => json!({
                "name": spec.name,
                "type": "Kafka",
                "authentication": {
                    "mechanism": "PLAIN",
                    "username": spec.credentials.api_key,
                    "password": spec.credentials.api_secret,
                },
                "bootstrapServers": spec.bootstrap_servers,
                "config": {
                    "auto.offset.reset": "earliest",
                    "group.id": format!("{}-consumer-group", spec.name),
                },
                "security": {
                    "protocol": "SASL_SSL",
                },
            }),
            ConnectionSpec::Mongodb(spec) => json!({
                "type": "Cluster",
                "clusterName": spec.cluster_name,
                "dbRoleToExecute": {
                    "role": spec.role.as_str(),
                    "type": "BUILT_IN",
                },
            }),
        }
    }
}

/// A Kafka topic to be ensured on the queue cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name:               String,
    pub partitions:         i32,
    pub replication_factor: i32,
}

/// Observed lifecycle state of an existing stream processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Running,
    Stopped,
}

/// Outcome of an idempotent ensure operation. `AlreadyExists` is a skip, not
/// a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorOutcome {
    Created,
    AlreadyExists,
    Started,
}

/// The stream processing platform: connection and processor management.
#[async_trait]
pub trait StreamsPlatform: Send + Sync {
    async fn authenticate(&self) -> Result<Session>;

    async fn connection_exists(&self, session: &Session, name: &str) -> Result<bool>;

    async fn create_connection(
        &self,
        session: &Session,
        spec: &ConnectionSpec,
    ) -> Result<()>;

    async fn processor_state(
        &self,
        session: &Session,
        auth: &InstanceAuth,
        name: &str,
    ) -> Result<Option<ProcessorState>>;

    async fn create_processor(
        &self,
        session: &Session,
        auth: &InstanceAuth,
        name: &str,
        pipeline: &[Value],
    ) -> Result<()>;

    async fn start_processor(
        &self,
        session: &Session,
        auth: &InstanceAuth,
        name: &str,
    ) -> Result<()>;
}

/// The message queue's administrative API: topic management. Credentials are
/// per-call because each connector item carries its own API key pair.
#[async_trait]
pub trait TopicAdmin: Send + Sync {
    async fn topic_exists(&self, creds: &QueueCredentials, name: &str) -> Result<bool>;

    /// Returns `AlreadyExists` when the platform reports the topic was
    /// created concurrently between the existence check and this call.
    async fn create_topic(
        &self,
        creds: &QueueCredentials,
        spec: &TopicSpec,
    ) -> Result<EnsureOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kafka_spec() -> ConnectionSpec {
        ConnectionSpec::Kafka(KafkaConnectionSpec {
            name:              "kafka-conn".to_string(),
            bootstrap_servers: "pkc-xyz.confluent.cloud:9092".to_string(),
            credentials:       QueueCredentials {
                api_key:    "key".to_string(),
                api_secret: "secret".to_string(),
            },
        })
    }

    #[test]
    fn kafka_request_body_matches_the_platform_schema() {
        let body = kafka_spec().to_request_body();

        assert_eq!(body["name"], "kafka-conn");
        assert_eq!(body["type"], "Kafka");
        assert_eq!(body["authentication"]["mechanism"], "PLAIN");
        assert_eq!(body["authentication"]["username"], "key");
        assert_eq!(body["authentication"]["password"], "secret");
        assert_eq!(body["bootstrapServers"], "pkc-xyz.confluent.cloud:9092");
        assert_eq!(body["config"]["auto.offset.reset"], "earliest");
        assert_eq!(body["config"]["group.id"], "kafka-conn-consumer-group");
        assert_eq!(body["security"]["protocol"], "SASL_SSL");
    }

    #[test]
    fn mongodb_request_body_carries_cluster_and_role() {
        let body = ConnectionSpec::Mongodb(MongoConnectionSpec {
            name:         "mongo-conn".to_string(),
            cluster_name: "Cluster0".to_string(),
            role:         DbRole::ReadWriteAnyDatabase,
        })
        .to_request_body();

        assert_eq!(body["type"], "Cluster");
        assert_eq!(body["clusterName"], "Cluster0");
        assert_eq!(body["dbRoleToExecute"]["role"], "readWriteAnyDatabase");
        assert_eq!(body["dbRoleToExecute"]["type"], "BUILT_IN");
    }
}
