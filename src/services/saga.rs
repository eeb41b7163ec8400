//! Best-effort compensation for writes spanning two stores
//!
//! There is no transaction covering the relational store and the search projection. A
//! [`Saga`] collects named undo steps while a multi-store write progresses; when a later step
//! fails the registered steps run in reverse order and the original error is returned no
//! matter how the compensation went.

use crate::error::{AppError, Result};
use crate::metrics::{self, DUAL_WRITE_OPERATIONS_TOTAL, SAGA_COMPENSATIONS_TOTAL};
use futures::future::BoxFuture;
use std::future::Future;

struct Compensation<'a> {
    step: &'static str,
    action: BoxFuture<'a, Result<()>>,
}

pub struct Saga<'a> {
    name: &'static str,
    compensations: Vec<Compensation<'a>>,
}

impl<'a> Saga<'a> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            compensations: Vec::new(),
        }
    }

    /// Register an undo step, run only if a later step fails
    pub fn compensate_with<F>(&mut self, step: &'static str, action: F) -> &mut Self
    where
        F: Future<Output = Result<()>> + Send + 'a,
    {
        self.compensations.push(Compensation {
            step,
            action: Box::pin(action),
        });
        self
    }

    pub fn pending(&self) -> usize {
        self.compensations.len()
    }

    /// Await a step; on failure run every registered compensation and return the step's error
    pub async fn step<T, F>(&mut self, step: &'static str, action: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match action.await {
            Ok(value) => Ok(value),
            Err(error) => {
                tracing::error!(
                    saga = self.name,
                    step,
                    pending = self.pending(),
                    error = %error,
                    "Saga step failed"
                );
                Err(self.abort(error).await)
            }
        }
    }

    /// Run compensations newest first and hand back the original error
    pub async fn abort(&mut self, error: AppError) -> AppError {
        while let Some(compensation) = self.compensations.pop() {
            let outcome = match compensation.action.await {
                Ok(()) => {
                    tracing::warn!(
                        saga = self.name,
                        step = compensation.step,
                        "Compensation applied"
                    );
                    "success"
                }
                Err(e) => {
                    tracing::warn!(
                        saga = self.name,
                        step = compensation.step,
                        error = %e,
                        "Compensation failed, stores may diverge until reindex"
                    );
                    "error"
                }
            };
            SAGA_COMPENSATIONS_TOTAL
                .with_label_values(&[self.name, compensation.step, outcome])
                .inc();
        }
        error
    }
}

/// Count the outcome of one dual-store operation
pub fn record_dual_write<T>(operation: &str, result: &Result<T>) {
    DUAL_WRITE_OPERATIONS_TOTAL
        .with_label_values(&[operation, metrics::status_label(result)])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_success_skips_compensation() {
        let log = recorder();
        let mut saga = Saga::new("create_item");
        let inner = log.clone();
        saga.compensate_with("delete_row", async move {
            inner.lock().push("delete_row");
            Ok(())
        });

        let value = saga.step("index", async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
        assert!(log.lock().is_empty());
        assert_eq!(saga.pending(), 1);
    }

    #[tokio::test]
    async fn test_failure_runs_compensations_in_reverse() {
        let log = recorder();
        let mut saga = Saga::new("create_item");
        let first = log.clone();
        saga.compensate_with("delete_row", async move {
            first.lock().push("delete_row");
            Ok(())
        });
        let second = log.clone();
        saga.compensate_with("delete_document", async move {
            second.lock().push("delete_document");
            Ok(())
        });

        let result: Result<()> = saga
            .step("index", async {
                Err(AppError::ExternalStoreUnavailable("down".to_string()))
            })
            .await;

        assert!(matches!(result, Err(AppError::ExternalStoreUnavailable(_))));
        assert_eq!(*log.lock(), vec!["delete_document", "delete_row"]);
        assert_eq!(saga.pending(), 0);
    }

    #[tokio::test]
    async fn test_failed_compensation_keeps_original_error() {
        let mut saga = Saga::new("create_user");
        saga.compensate_with("delete_row", async {
            Err(AppError::Database("locked".to_string()))
        });

        let error = saga
            .abort(AppError::Internal("indexing failed".to_string()))
            .await;
        assert!(matches!(error, AppError::Internal(msg) if msg == "indexing failed"));
    }
}
