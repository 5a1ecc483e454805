// asp_migrator/src/runner.rs
// Iterates a folder of connector configs, provisioning resources per item and
// isolating failures into a run report.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{ConnectorItemConfig, Direction, MainConfig};
use crate::connection::ConnectionManager;
use crate::error::{MigratorError, Result};
use crate::platform::{ConnectionSpec, ProcessorOutcome, Session, StreamsPlatform, TopicAdmin};
use crate::processor::ProcessorOrchestrator;
use crate::topic::TopicProvisioner;
use crate::translate::translate;

/// Which step of an item's provisioning flow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Load,
    Translate,
    Connection,
    Topic,
    Processor,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Load => "load",
            Step::Translate => "translate",
            Step::Connection => "connection",
            Step::Topic => "topic",
            Step::Processor => "processor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ItemOutcome {
    Created,
    AlreadyExists,
    Failed { step: Step, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub file:      String,
    pub processor: Option<String>,
    pub outcome:   ItemOutcome,
}

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub created: usize,
    pub skipped: usize,
    pub failed:  usize,
    pub items:   Vec<ItemResult>,
}

impl RunReport {
    fn record(&mut self, item: ItemResult) {
        match &item.outcome {
            ItemOutcome::Created => self.created += 1,
            ItemOutcome::AlreadyExists => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
        self.items.push(item);
    }

    /// The run as a whole fails if any item failed, regardless of how many
    /// succeeded.
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

struct StepFailure {
    step:      Step,
    processor: Option<String>,
    error:     MigratorError,
}

type StepResult<T> = std::result::Result<T, StepFailure>;

fn at_step<T>(
    step: Step,
    processor: Option<&str>,
    result: Result<T>,
) -> StepResult<T> {
    result.map_err(|error| StepFailure {
        step,
        processor: processor.map(str::to_string),
        error,
    })
}

pub struct BulkRunner<'a> {
    main:             &'a MainConfig,
    platform:         &'a dyn StreamsPlatform,
    topics:           &'a dyn TopicAdmin,
    direction:        Direction,
    start_processors: bool,
}

impl<'a> BulkRunner<'a> {
    pub fn new(
        main: &'a MainConfig,
        platform: &'a dyn StreamsPlatform,
        topics: &'a dyn TopicAdmin,
        direction: Direction,
        start_processors: bool,
    ) -> Self {
        BulkRunner {
            main,
            platform,
            topics,
            direction,
            start_processors,
        }
    }

    /// Processes every `*.json` file in the folder, lexically ordered. A
    /// failing item is recorded and the run moves on, except authentication
    /// failures, which end the run since the session is shared.
    pub async fn run(&self, items_folder: &Path) -> Result<RunReport> {
        let files = enumerate_items(items_folder)?;
        let mut report = RunReport::default();
        if files.is_empty() {
            warn!("No .json files found in {}", items_folder.display());
            return Ok(report);
        }
        info!("Found {} connector files to process", files.len());

        let session = self.platform.authenticate().await?;

        for file in &files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            info!("Processing: {}", name);

            match self.process_item(&session, file).await {
                Ok((processor, outcome)) => {
                    report.record(ItemResult {
                        file: name,
                        processor: Some(processor),
                        outcome,
                    });
                },
                Err(failure) => {
                    error!(
                        "Item {} failed at {} step: {}",
                        name,
                        failure.step.as_str(),
                        failure.error
                    );
                    let abort = failure.error.aborts_run();
                    report.record(ItemResult {
                        file:      name,
                        processor: failure.processor,
                        outcome:   ItemOutcome::Failed {
                            step:  failure.step,
                            error: failure.error.to_string(),
                        },
                    });
                    if abort {
                        error!("Session is no longer valid; aborting remaining items");
                        break;
                    }
                },
            }
        }

        Ok(report)
    }

    async fn process_item(
        &self,
        session: &Session,
        path: &Path,
    ) -> StepResult<(String, ItemOutcome)> {
        let item = at_step(Step::Load, None, ConnectorItemConfig::load(path))?;
        if item.direction() != self.direction {
            return Err(StepFailure {
                step:      Step::Load,
                processor: None,
                error:     MigratorError::validation(
                    path,
                    format!(
                        "item is a {} connector but this is a {} run",
                        item.direction().as_str(),
                        self.direction.as_str()
                    ),
                ),
            });
        }

        let translated = at_step(Step::Translate, None, translate(&item, self.main))?;
        let processor = translated.processor_name.clone();

        let connections = ConnectionManager::new(self.platform);
        let kafka_spec = ConnectionSpec::Kafka(translated.connections.kafka.clone());
        let mongo_spec = ConnectionSpec::Mongodb(translated.connections.mongodb.clone());
        for spec in [&kafka_spec, &mongo_spec] {
            at_step(
                Step::Connection,
                Some(&processor),
                connections.ensure_connection(session, spec).await,
            )?;
        }

        let provisioner = TopicProvisioner::new(self.topics);
        for topic in &translated.topics {
            at_step(
                Step::Topic,
                Some(&processor),
                provisioner
                    .ensure_topic(&translated.connections.kafka.credentials, topic)
                    .await,
            )?;
        }

        let orchestrator = ProcessorOrchestrator::new(self.platform);
        let outcome = at_step(
            Step::Processor,
            Some(&processor),
            orchestrator
                .ensure_processor(
                    session,
                    &translated.connections.instance,
                    &processor,
                    &translated.pipeline,
                    self.start_processors,
                )
                .await,
        )?;

        let outcome = match outcome {
            ProcessorOutcome::AlreadyExists => ItemOutcome::AlreadyExists,
            ProcessorOutcome::Created | ProcessorOutcome::Started => ItemOutcome::Created,
        };
        Ok((processor, outcome))
    }
}

fn enumerate_items(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
