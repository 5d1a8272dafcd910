//! One-shot mutation state: Idle, Pending, then Succeeded or Failed.
//!
//! Failure is always an explicit terminal state carrying the normalized
//! message. A mutation whose future is dropped while pending goes back to
//! `Idle` rather than staying `Pending`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Login,
    Register,
    CreateBook,
    DeleteBook,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Pending,
    Succeeded,
    Failed(ApiError),
}

/// Latest status of each mutation kind.
#[derive(Debug, Default)]
pub struct MutationTracker {
    states: Mutex<HashMap<MutationKind, MutationStatus>>,
}

impl MutationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, kind: MutationKind) -> MutationStatus {
        self.lock().get(&kind).cloned().unwrap_or(MutationStatus::Idle)
    }

    /// Drive `mutation` to completion, recording its status transitions.
    pub async fn run<T, Fut>(&self, kind: MutationKind, mutation: Fut) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.set(kind, MutationStatus::Pending);
        let mut guard = PendingGuard {
            tracker: self,
            kind,
            settled: false,
        };
        let result = mutation.await;
        guard.settled = true;
        match &result {
            Ok(_) => {
                tracing::info!(?kind, "mutation succeeded");
                self.set(kind, MutationStatus::Succeeded);
            }
            Err(err) => {
                tracing::info!(?kind, message = err.message(), "mutation failed");
                self.set(kind, MutationStatus::Failed(err.clone()));
            }
        }
        result
    }

    pub fn reset(&self, kind: MutationKind) {
        self.lock().remove(&kind);
    }

    fn set(&self, kind: MutationKind, status: MutationStatus) {
        self.lock().insert(kind, status);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MutationKind, MutationStatus>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct PendingGuard<'a> {
    tracker: &'a MutationTracker,
    kind: MutationKind,
    settled: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker.reset(self.kind);
        }
    }
}
