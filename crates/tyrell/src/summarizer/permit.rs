//! Single-flight access to the inference backend.
//!
//! The model behind [`Inference`](crate::llm::Inference) serves one request at
//! a time. Callers acquire a [`ModelPermit`] from a shared [`ModelLock`] and
//! hand it to [`Summarizer::summarize`](super::Summarizer::summarize), which
//! never locks anything itself. The permit is released on drop.

use tokio::sync::{Mutex, MutexGuard};

/// Process-wide exclusive lock on the model. Waiters are served in FIFO order.
#[derive(Debug, Default)]
pub struct ModelLock {
    inner: Mutex<()>,
}

/// Proof that the holder has exclusive use of the model.
#[derive(Debug)]
pub struct ModelPermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl ModelLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the model is free.
    pub async fn acquire(&self) -> ModelPermit<'_> {
        ModelPermit {
            _guard: self.inner.lock().await,
        }
    }

    /// Take the model if nobody holds it.
    pub fn try_acquire(&self) -> Option<ModelPermit<'_>> {
        self.inner
            .try_lock()
            .ok()
            .map(|guard| ModelPermit { _guard: guard })
    }
}
