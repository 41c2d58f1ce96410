//! Sink traits: the collaborators that receive pipeline output.
//!
//! Lectern never persists anything itself. Successful results go to a
//! [`ResultSink`], terminal failures are recorded in an [`ErrorSink`] and
//! announced through an [`AlertSink`]. Storage schemas are the sink's
//! business.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::generation::GenerationResult;
use crate::task::TaskType;

/// A stored error marker for one (unit, task) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub unit_id: String,
    pub task: TaskType,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

/// Receives a validated result per successful task type.
#[async_trait]
pub trait ResultSink: Send + Sync {
    fn name(&self) -> &str;

    /// Store (replacing any previous) result for the unit and task.
    async fn store(
        &self,
        unit_id: &str,
        task: TaskType,
        result: &GenerationResult,
    ) -> Result<(), SinkError>;
}

/// Remembers the last terminal failure per (unit, task) for display.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn record(&self, unit_id: &str, task: TaskType, message: &str) -> Result<(), SinkError>;

    async fn clear(&self, unit_id: &str, task: TaskType) -> Result<(), SinkError>;

    async fn last_error(&self, unit_id: &str, task: TaskType) -> Result<Option<ErrorRecord>, SinkError>;
}

/// Notifies operators about failures.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, subject: &str, message: &str) -> Result<(), SinkError>;
}
