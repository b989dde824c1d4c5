//! Bulk operation executor - one mutation fanned out over an id set.
//!
//! Items settle independently: a failure on one id neither aborts nor
//! rolls back the others, and the core never retries a failed item.

use std::future::Future;

use anyhow::anyhow;
use futures::future::join_all;
use serde::Serialize;
use service_core::error::AppError;
use uuid::Uuid;

use crate::services::metrics::{BULK_ITEMS_TOTAL, ERRORS_TOTAL};

/// A single failed item: the id plus the error it settled with.
#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub kind: String,
    pub error: String,
}

/// Per-batch settlement report.
#[derive(Debug, Serialize)]
pub struct BulkOutcome<T> {
    pub updated: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

impl<T> BulkOutcome<T> {
    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total(&self) -> usize {
        self.updated.len() + self.failed.len()
    }
}

/// Apply `op` to every id and capture each settlement. Ordering between
/// items is not guaranteed and must not be relied upon.
pub async fn execute_bulk<T, F, Fut>(ids: &[Uuid], op: F) -> Result<BulkOutcome<T>, AppError>
where
    F: Fn(Uuid) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    if ids.is_empty() {
        return Err(AppError::InvalidInput(anyhow!(
            "Bulk operation requires at least one id"
        )));
    }

    let settlements = join_all(ids.iter().copied().map(op)).await;

    let mut outcome = BulkOutcome {
        updated: Vec::new(),
        failed: Vec::new(),
    };
    for (id, settled) in ids.iter().copied().zip(settlements) {
        match settled {
            Ok(value) => {
                BULK_ITEMS_TOTAL.with_label_values(&["updated"]).inc();
                outcome.updated.push(value);
            }
            Err(err) => {
                BULK_ITEMS_TOTAL.with_label_values(&["failed"]).inc();
                ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
                outcome.failed.push(BulkFailure {
                    id,
                    kind: err.kind().to_string(),
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(outcome)
}
