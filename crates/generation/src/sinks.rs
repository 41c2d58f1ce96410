//! In-process sink implementations.
//!
//! Useful for tests, the CLI and embedders that keep results in memory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lectern_core::error::SinkError;
use lectern_core::{AlertSink, ErrorRecord, ErrorSink, GenerationResult, ResultSink, TaskType};
use tokio::sync::RwLock;
use tracing::{error, info};

type Key = (String, TaskType);

/// Keeps the latest result per (unit, task).
pub struct InMemoryResultSink {
    results: Arc<RwLock<HashMap<Key, GenerationResult>>>,
}

impl InMemoryResultSink {
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, unit_id: &str, task: TaskType) -> Option<GenerationResult> {
        self.results
            .read()
            .await
            .get(&(unit_id.to_string(), task))
            .cloned()
    }

    /// All results for a unit, in task order.
    pub async fn for_unit(&self, unit_id: &str) -> Vec<(TaskType, GenerationResult)> {
        let results = self.results.read().await;
        let mut found: Vec<(TaskType, GenerationResult)> = results
            .iter()
            .filter(|((unit, _), _)| unit == unit_id)
            .map(|((_, task), result)| (*task, result.clone()))
            .collect();
        found.sort_by_key(|(task, _)| *task);
        found
    }

    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }
}

impl Default for InMemoryResultSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultSink for InMemoryResultSink {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn store(
        &self,
        unit_id: &str,
        task: TaskType,
        result: &GenerationResult,
    ) -> Result<(), SinkError> {
        self.results
            .write()
            .await
            .insert((unit_id.to_string(), task), result.clone());
        Ok(())
    }
}

/// Last terminal failure per (unit, task).
///
/// Empty unit ids are ignored; messages are stored trimmed.
pub struct InMemoryErrorTracker {
    records: Arc<RwLock<HashMap<Key, ErrorRecord>>>,
}

impl InMemoryErrorTracker {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for InMemoryErrorTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ErrorSink for InMemoryErrorTracker {
    async fn record(&self, unit_id: &str, task: TaskType, message: &str) -> Result<(), SinkError> {
        if unit_id.trim().is_empty() {
            return Ok(());
        }
        let record = ErrorRecord {
            unit_id: unit_id.to_string(),
            task,
            message: message.trim().to_string(),
            recorded_at: Utc::now(),
        };
        self.records
            .write()
            .await
            .insert((unit_id.to_string(), task), record);
        Ok(())
    }

    async fn clear(&self, unit_id: &str, task: TaskType) -> Result<(), SinkError> {
        self.records
            .write()
            .await
            .remove(&(unit_id.to_string(), task));
        Ok(())
    }

    async fn last_error(
        &self,
        unit_id: &str,
        task: TaskType,
    ) -> Result<Option<ErrorRecord>, SinkError> {
        Ok(self
            .records
            .read()
            .await
            .get(&(unit_id.to_string(), task))
            .cloned())
    }
}

/// Sends alerts to the log at `error` level.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, subject: &str, message: &str) -> Result<(), SinkError> {
        error!(subject, message, "Alert");
        Ok(())
    }
}

/// Drops every alert.
pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn notify(&self, subject: &str, _message: &str) -> Result<(), SinkError> {
        info!(subject, "Alert suppressed");
        Ok(())
    }
}
