use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use tokio::sync::Mutex;

use crate::ci::JobLogSource;
use crate::models::RepoRef;

/// Serializes access to a log source that only tolerates one caller at a time.
///
/// Callers wait on an async mutex (no polling). The guard is dropped on
/// every exit path, including errors and cancellation of the caller.
pub struct SerializedLogSource<L> {
    inner: L,
    gate: Mutex<()>,
}

impl<L> SerializedLogSource<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            gate: Mutex::new(()),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: JobLogSource> JobLogSource for SerializedLogSource<L> {
    async fn job_log(&self, repo: &RepoRef, job_id: u64) -> Result<String> {
        let _guard = self.gate.lock().await;
        debug!("Acquired log gate for job {}", job_id);
        self.inner.job_log(repo, job_id).await
    }
}
