// asp_migrator/src/topic.rs
// Idempotent topic provisioning on the queue cluster. Source flow only.

use tracing::{debug, info};

use crate::error::Result;
use crate::platform::{EnsureOutcome, QueueCredentials, TopicAdmin, TopicSpec};

pub struct TopicProvisioner<'a> {
    admin: &'a dyn TopicAdmin,
}

impl<'a> TopicProvisioner<'a> {
    pub fn new(admin: &'a dyn TopicAdmin) -> Self {
        TopicProvisioner { admin }
    }

    pub async fn ensure_topic(
        &self,
        creds: &QueueCredentials,
        spec: &TopicSpec,
    ) -> Result<EnsureOutcome> {
        if self.admin.topic_exists(creds, &spec.name).await? {
            debug!("Topic already exists: {}", spec.name);
            return Ok(EnsureOutcome::AlreadyExists);
        }
        match self.admin.create_topic(creds, spec).await? {
            EnsureOutcome::Created => {
                info!("Created topic: {}", spec.name);
                Ok(EnsureOutcome::Created)
            },
            EnsureOutcome::AlreadyExists => {
                // Lost a race with another creator between check and create.
                debug!("Topic appeared concurrently: {}", spec.name);
                Ok(EnsureOutcome::AlreadyExists)
            },
        }
    }
}
