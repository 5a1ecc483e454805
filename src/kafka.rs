// asp_migrator/src/kafka.rs
// TopicAdmin implementation against the Confluent Kafka REST API (v3).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::MainConfig;
use crate::error::{MigratorError, Result};
use crate::platform::{EnsureOutcome, QueueCredentials, TopicAdmin, TopicSpec};

// Confluent's "topic already exists" application error code, returned with a
// 400 by some gateway versions instead of a plain 409.
const ERROR_CODE_TOPIC_EXISTS: i64 = 40002;

pub struct ConfluentRest {
    client:        Client,
    rest_endpoint: String,
    cluster_id:    String,
}

impl ConfluentRest {
    pub fn new(main: &MainConfig) -> Self {
        ConfluentRest {
            client:        Client::new(),
            rest_endpoint: main.rest_endpoint.trim_end_matches('/').to_string(),
            cluster_id:    main.cluster_id.clone(),
        }
    }

    fn topics_url(&self) -> String {
        format!(
            "{}/kafka/v3/clusters/{}/topics",
            self.rest_endpoint, self.cluster_id
        )
    }
}

fn create_payload(spec: &TopicSpec) -> Value {
    json!({
        "topic_name": spec.name,
        "partitions_count": spec.partitions,
        "replication_factor": spec.replication_factor,
        "configs": [
            {"name": "cleanup.policy", "value": crate::DEFAULT_CLEANUP_POLICY},
        ],
    })
}

fn request_error(name: &str, e: reqwest::Error) -> MigratorError {
    MigratorError::TopicCreation {
        name:   name.to_string(),
        detail: format!("network error: {}", e),
    }
}

#[async_trait]
impl TopicAdmin for ConfluentRest {
    async fn topic_exists(&self, creds: &QueueCredentials, name: &str) -> Result<bool> {
        let url = format!("{}/{}", self.topics_url(), name);
        let response = self
            .client
            .get(&url)
            .basic_auth(&creds.api_key, Some(&creds.api_secret))
            .send()
            .await
            .map_err(|e| request_error(name, e))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(MigratorError::TopicCreation {
                    name:   name.to_string(),
                    detail: format!("lookup failed: HTTP {} - {}", status, body),
                })
            },
        }
    }

    async fn create_topic(
        &self,
        creds: &QueueCredentials,
        spec: &TopicSpec,
    ) -> Result<EnsureOutcome> {
        debug!(
            "Creating topic '{}' ({} partitions, replication {})",
            spec.name, spec.partitions, spec.replication_factor
        );
        let response = self
            .client
            .post(self.topics_url())
            .basic_auth(&creds.api_key, Some(&creds.api_secret))
            .json(&create_payload(spec))
            .send()
            .await
            .map_err(|e| request_error(&spec.name, e))?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(EnsureOutcome::Created);
        }
        if status == StatusCode::CONFLICT {
            info!("Topic already exists: {}", spec.name);
            return Ok(EnsureOutcome::AlreadyExists);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(parsed) = serde_json::from_str::<Value>(&body) {
            if parsed.get("error_code").and_then(Value::as_i64) == Some(ERROR_CODE_TOPIC_EXISTS) {
                info!("Topic already exists: {}", spec.name);
                return Ok(EnsureOutcome::AlreadyExists);
            }
        }

        Err(MigratorError::TopicCreation {
            name:   spec.name.clone(),
            detail: format!("HTTP {} - {}", status, body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_url_joins_endpoint_and_cluster() {
        let main = MainConfig {
            cluster_id:              "lkc-12345".to_string(),
            rest_endpoint:           "https://pkc-xyz.confluent.cloud:443/".to_string(),
            instance_url:            "mongodb://sp/".to_string(),
            processor_prefix:        "p".to_string(),
            kafka_connection_name:   "k".to_string(),
            mongodb_connection_name: "m".to_string(),
            cluster_name:            "c".to_string(),
            group_id:                "g".to_string(),
            tenant_name:             "t".to_string(),
        };
        let client = ConfluentRest::new(&main);
        assert_eq!(
            client.topics_url(),
            "https://pkc-xyz.confluent.cloud:443/kafka/v3/clusters/lkc-12345/topics"
        );
    }

    #[test]
    fn create_payload_includes_settings_and_cleanup_policy() {
        let spec = TopicSpec {
            name:               "evt-orders".to_string(),
            partitions:         6,
            replication_factor: 3,
        };
        let payload = create_payload(&spec);
        assert_eq!(payload["topic_name"], "evt-orders");
        assert_eq!(payload["partitions_count"], 6);
        assert_eq!(payload["replication_factor"], 3);
        assert_eq!(payload["configs"][0]["value"], "delete");
    }
}
