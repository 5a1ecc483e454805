// asp_migrator/src/atlas.rs
// StreamsPlatform implementation backed by the Atlas CLI (connections,
// session) and mongosh (stream processors on the instance).

use std::io::Write;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::MainConfig;
use crate::error::{MigratorError, Result};
use crate::platform::{
    ConnectionSpec, InstanceAuth, ProcessorState, Session, StreamsPlatform,
};

const CLI_TIMEOUT: Duration = Duration::from_secs(30);
const MONGOSH_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AtlasCli {
    group_id:    String,
    tenant_name: String,
}

impl AtlasCli {
    pub fn new(main: &MainConfig) -> Self {
        AtlasCli {
            group_id:    main.group_id.clone(),
            tenant_name: main.tenant_name.clone(),
        }
    }

    async fn run(&self, mut command: Command, timeout: Duration) -> Result<Output> {
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| MigratorError::Other("External command timed out".to_string()))??;
        Ok(output)
    }

    fn atlas_connections(&self, action: &str) -> Command {
        let mut command = Command::new("atlas");
        command
            .arg("streams")
            .arg("connections")
            .arg(action)
            .arg("--projectId")
            .arg(&self.group_id)
            .arg("--instance")
            .arg(&self.tenant_name)
            .arg("--output")
            .arg("json");
        command
    }

    fn mongosh(&self, auth: &InstanceAuth, js: &str) -> Command {
        // The shell requires the instance URL to end with exactly one slash.
        let mut url = auth.url.trim_end_matches('/').to_string();
        url.push('/');

        let mut command = Command::new("mongosh");
        command
            .arg(url)
            .arg("--tls")
            .arg("--authenticationDatabase")
            .arg("admin")
            .arg("--username")
            .arg(&auth.username)
            .arg("--password")
            .arg(&auth.password)
            .arg("--quiet")
            .arg("--eval")
            .arg(js);
        command
    }
}

#[async_trait]
impl StreamsPlatform for AtlasCli {
    async fn authenticate(&self) -> Result<Session> {
        let mut command = Command::new("atlas");
        command.arg("auth").arg("whoami");
        let output = self.run(command, CLI_TIMEOUT).await?;
        if !output.status.success() {
            return Err(MigratorError::Authentication(
                "no active Atlas CLI session; run 'atlas auth login' and retry".to_string(),
            ));
        }
        let identity = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Authenticated with Atlas CLI as {}", identity);
        Ok(Session { identity })
    }

    async fn connection_exists(&self, _session: &Session, name: &str) -> Result<bool> {
        let output = self.run(self.atlas_connections("list"), CLI_TIMEOUT).await?;
        if !output.status.success() {
            return Err(classify_atlas_failure(name, &output, |n, d| {
                MigratorError::ConnectionCreation {
                    name:   n.to_string(),
                    detail: format!("listing connections failed: {}", d),
                }
            }));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_connection_names(&stdout).iter().any(|n| n == name))
    }

    async fn create_connection(&self, _session: &Session, spec: &ConnectionSpec) -> Result<()> {
        let name = spec.name();
        let body = serde_json::to_string_pretty(&spec.to_request_body())
            .map_err(|e| MigratorError::Other(format!("Failed to serialize spec: {}", e)))?;

        // The CLI only accepts the connection spec from a file.
        let mut file = tempfile::Builder::new()
            .prefix("asp-connection-")
            .suffix(".json")
            .tempfile()?;
        file.write_all(body.as_bytes())?;

        let mut command = self.atlas_connections("create");
        command.arg(name).arg("--file").arg(file.path());
        debug!("Creating connection '{}' via Atlas CLI", name);

        let output = self.run(command, CLI_TIMEOUT).await?;
        if output.status.success() || stderr_says_already_exists(&output) {
            return Ok(());
        }
        Err(classify_atlas_failure(name, &output, |n, d| {
            MigratorError::ConnectionCreation {
                name:   n.to_string(),
                detail: d,
            }
        }))
    }

    async fn processor_state(
        &self,
        _session: &Session,
        auth: &InstanceAuth,
        name: &str,
    ) -> Result<Option<ProcessorState>> {
        let command = self.mongosh(auth, "JSON.stringify(sp.listStreamProcessors())");
        let output = self.run(command, MONGOSH_TIMEOUT).await?;
        if !output.status.success() {
            return Err(classify_mongosh_failure(name, &output));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_processor_state(&stdout, name))
    }

    async fn create_processor(
        &self,
        _session: &Session,
        auth: &InstanceAuth,
        name: &str,
        pipeline: &[Value],
    ) -> Result<()> {
        let pipeline_json = serde_json::to_string(pipeline)
            .map_err(|e| MigratorError::Other(format!("Failed to serialize pipeline: {}", e)))?;
        let js = format!(
            "sp.createStreamProcessor({}, {})",
            serde_json::to_string(name).unwrap_or_default(),
            pipeline_json
        );
        debug!("Creating stream processor '{}': {}", name, js);

        let output = self.run(self.mongosh(auth, &js), MONGOSH_TIMEOUT).await?;
        if output.status.success() || stderr_says_already_exists(&output) {
            return Ok(());
        }
        Err(classify_mongosh_failure(name, &output))
    }

    async fn start_processor(
        &self,
        _session: &Session,
        auth: &InstanceAuth,
        name: &str,
    ) -> Result<()> {
        let js = format!(
            "sp.getProcessor({}).start()",
            serde_json::to_string(name).unwrap_or_default()
        );
        let output = self.run(self.mongosh(auth, &js), MONGOSH_TIMEOUT).await?;
        if output.status.success() {
            return Ok(());
        }
        Err(classify_mongosh_failure(name, &output))
    }
}

/// Connection listings come back either as a bare array or wrapped in a
/// `results` field depending on the CLI version.
fn parse_connection_names(stdout: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<Value>(stdout.trim()) else {
        return Vec::new();
    };
    let entries = match &value {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(obj) => obj
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };
    entries
        .iter()
        .filter_map(|e| e.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Finds the named processor in mongosh's listStreamProcessors output. The
/// shell may print banner noise before the JSON line.
fn parse_processor_state(stdout: &str, name: &str) -> Option<ProcessorState> {
    for line in stdout.lines().rev() {
        let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(line.trim()) else {
            continue;
        };
        for entry in &entries {
            if entry.get("name").and_then(Value::as_str) == Some(name) {
                let running = entry.get("state").and_then(Value::as_str) == Some("STARTED");
                return Some(if running {
                    ProcessorState::Running
                } else {
                    ProcessorState::Stopped
                });
            }
        }
        return None;
    }
    None
}

fn stderr_says_already_exists(output: &Output) -> bool {
    let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
    stderr.contains("already exists") || stderr.contains("duplicate")
}

fn stderr_says_unauthenticated(output: &Output) -> bool {
    let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
    stderr.contains("not authenticated")
        || stderr.contains("not logged in")
        || stderr.contains("authentication failed")
        || stderr.contains("unauthorized")
}

fn classify_atlas_failure(
    name: &str,
    output: &Output,
    build: impl FnOnce(&str, String) -> MigratorError,
) -> MigratorError {
    if stderr_says_unauthenticated(output) {
        return MigratorError::Authentication(
            "Atlas CLI session rejected; run 'atlas auth login' and retry".to_string(),
        );
    }
    build(name, String::from_utf8_lossy(&output.stderr).trim().to_string())
}

fn classify_mongosh_failure(name: &str, output: &Output) -> MigratorError {
    if stderr_says_unauthenticated(output) {
        return MigratorError::Authentication(
            "stream processing instance rejected the credentials".to_string(),
        );
    }
    MigratorError::ProcessorCreation {
        name:   name.to_string(),
        detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_names_parse_from_results_wrapper() {
        let stdout = r#"{"results": [{"name": "kafka-conn", "type": "Kafka"},
                                      {"name": "mongo-conn", "type": "Cluster"}]}"#;
        let names = parse_connection_names(stdout);
        assert_eq!(names, vec!["kafka-conn", "mongo-conn"]);
    }

    #[test]
    fn connection_names_parse_from_bare_array() {
        let stdout = r#"[{"name": "kafka-conn"}]"#;
        assert_eq!(parse_connection_names(stdout), vec!["kafka-conn"]);
    }

    #[test]
    fn connection_names_empty_on_garbage() {
        assert!(parse_connection_names("error: something broke").is_empty());
    }

    #[test]
    fn processor_state_found_running() {
        let stdout = "Deprecation warning: something\n[{\"name\":\"shop-orders\",\"state\":\"STARTED\"}]\n";
        assert_eq!(
            parse_processor_state(stdout, "shop-orders"),
            Some(ProcessorState::Running)
        );
    }

    #[test]
    fn processor_state_found_stopped() {
        let stdout = r#"[{"name":"shop-orders","state":"CREATED"}]"#;
        assert_eq!(
            parse_processor_state(stdout, "shop-orders"),
            Some(ProcessorState::Stopped)
        );
    }

    #[test]
    fn processor_state_absent() {
        let stdout = r#"[{"name":"other","state":"STARTED"}]"#;
        assert_eq!(parse_processor_state(stdout, "shop-orders"), None);
    }
}
