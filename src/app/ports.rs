use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// String key-value persistence. Each `set` replaces the whole value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Request to print a label for a newly staged item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintRequest {
    pub sku: String,
    pub shelf_id: String,
    pub queued_at: DateTime<Utc>,
}

/// Outbound label queue. Callers never wait on or fail because of it.
pub trait PrintQueuePort: Send + Sync {
    fn enqueue(&self, request: &PrintRequest) -> Result<()>;
}
