// asp_migrator/src/connection.rs
// Idempotent connection provisioning on the stream processing instance.

use tracing::{debug, info};

use crate::error::Result;
use crate::platform::{ConnectionSpec, EnsureOutcome, Session, StreamsPlatform};

pub struct ConnectionManager<'a> {
    platform: &'a dyn StreamsPlatform,
}

impl<'a> ConnectionManager<'a> {
    pub fn new(platform: &'a dyn StreamsPlatform) -> Self {
        ConnectionManager { platform }
    }

    /// Creates the connection unless one of the same name already exists.
    /// Reuse is by name only; stored settings are not compared against `spec`.
    pub async fn ensure_connection(
        &self,
        session: &Session,
        spec: &ConnectionSpec,
    ) -> Result<EnsureOutcome> {
        let name = spec.name();
        if self.platform.connection_exists(session, name).await? {
            debug!("Connection already exists, reusing: {}", name);
            return Ok(EnsureOutcome::AlreadyExists);
        }
        self.platform.create_connection(session, spec).await?;
        info!("Created connection: {}", name);
        Ok(EnsureOutcome::Created)
    }
}
