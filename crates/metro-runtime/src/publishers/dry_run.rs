use async_trait::async_trait;
use tracing::info;

use super::{PublishError, Publisher};

/// Stand-in for a real channel in pretend mode: logs instead of sending.
pub struct DryRunPublisher {
    name: String,
}

impl DryRunPublisher {
    pub fn new(channel: &str) -> Self {
        Self {
            name: format!("{} (pretend)", channel),
        }
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, message: &str) -> Result<(), PublishError> {
        info!(channel = %self.name, text = message, "would publish");
        Ok(())
    }
}
