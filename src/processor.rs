// asp_migrator/src/processor.rs
// Idempotent stream processor creation, with optional start.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::platform::{
    InstanceAuth, ProcessorOutcome, ProcessorState, Session, StreamsPlatform,
};

pub struct ProcessorOrchestrator<'a> {
    platform: &'a dyn StreamsPlatform,
}

impl<'a> ProcessorOrchestrator<'a> {
    pub fn new(platform: &'a dyn StreamsPlatform) -> Self {
        ProcessorOrchestrator { platform }
    }

    /// Creates the named processor if absent. When `start` is requested, a
    /// stopped processor (fresh or pre-existing) is also started.
    pub async fn ensure_processor(
        &self,
        session: &Session,
        auth: &InstanceAuth,
        name: &str,
        pipeline: &[Value],
        start: bool,
    ) -> Result<ProcessorOutcome> {
        match self.platform.processor_state(session, auth, name).await? {
            None => {
                self.platform
                    .create_processor(session, auth, name, pipeline)
                    .await?;
                info!("Created stream processor: {}", name);
                if start {
                    self.platform.start_processor(session, auth, name).await?;
                    info!("Started stream processor: {}", name);
                    return Ok(ProcessorOutcome::Started);
                }
                Ok(ProcessorOutcome::Created)
            },
            Some(ProcessorState::Stopped) if start => {
                self.platform.start_processor(session, auth, name).await?;
                info!("Started existing stream processor: {}", name);
                Ok(ProcessorOutcome::Started)
            },
            Some(_) => {
                debug!("Stream processor already exists: {}", name);
                Ok(ProcessorOutcome::AlreadyExists)
            },
        }
    }
}
