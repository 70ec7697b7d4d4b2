use crate::{classify, CreatedJob, Error, JobOutcome, JobResult, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Feature flag opting an account into the queue job backend.
pub const FEATURE_QUEUE_JOBS: &str = "queue-v2";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Legacy job service: a single call runs the job to completion and returns
/// the terminal state in the response body.
#[async_trait]
pub trait SyncJobApi: Send + Sync {
    async fn run_job(&self, component_id: &str, data: Value) -> Result<JobResult>;

    async fn run_sync_action(&self, component_id: &str, action: &str, data: Value)
        -> Result<Value>;
}

/// Queue job service: jobs are created, then polled until finished.
#[async_trait]
pub trait JobQueueApi: Send + Sync {
    async fn create_job(&self, component_id: &str, data: Value) -> Result<CreatedJob>;

    async fn get_job(&self, id: &str) -> Result<JobResult>;
}

/// Strategy for submitting a writer job and awaiting its terminal state.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run_job(&self, component_id: &str, data: Value) -> Result<JobResult>;

    /// Turn a terminal job state into success or a user-facing failure.
    fn process_result(&self, job: &JobResult) -> Result<()> {
        match classify(job) {
            JobOutcome::Success { id } => {
                info!("Writer job \"{}\" succeeded", id);
                Ok(())
            }
            JobOutcome::Failure { message } => Err(Error::Job(message)),
        }
    }
}

pub struct SyncJobRunner {
    jobs: Arc<dyn SyncJobApi>,
}

impl SyncJobRunner {
    pub fn new(jobs: Arc<dyn SyncJobApi>) -> Self {
        Self { jobs }
    }

    /// Run the writer's connectivity test action.
    pub async fn run_test_connection(&self, component_id: &str, data: Value) -> Result<Value> {
        self.jobs
            .run_sync_action(component_id, "testConnection", data)
            .await
    }
}

#[async_trait]
impl JobRunner for SyncJobRunner {
    async fn run_job(&self, component_id: &str, data: Value) -> Result<JobResult> {
        self.jobs.run_job(component_id, data).await
    }
}

pub struct QueueJobRunner {
    queue: Arc<dyn JobQueueApi>,
    poll_interval: Duration,
    deadline: Option<Duration>,
}

impl QueueJobRunner {
    pub fn new(queue: Arc<dyn JobQueueApi>) -> Self {
        Self {
            queue,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound the total wait. Without one the poll runs until the external
    /// process timeout kills the run.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[async_trait]
impl JobRunner for QueueJobRunner {
    async fn run_job(&self, component_id: &str, data: Value) -> Result<JobResult> {
        let created = self.queue.create_job(component_id, data).await?;
        info!("Created writer job \"{}\"", created.id);

        let started = tokio::time::Instant::now();
        loop {
            let job = self.queue.get_job(&created.id).await?;
            if job.is_finished {
                return Ok(job);
            }
            if let Some(deadline) = self.deadline {
                if started.elapsed() >= deadline {
                    return Err(Error::Job(format!(
                        "Writer job \"{}\" did not finish within {} seconds",
                        created.id,
                        deadline.as_secs()
                    )));
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Pick the job backend for the calling account: the queue feature selects
/// the polling runner, everyone else goes through the legacy synchronous
/// service.
pub fn select_job_runner(
    features: &HashSet<String>,
    sync: Arc<dyn SyncJobApi>,
    queue: Arc<dyn JobQueueApi>,
) -> Box<dyn JobRunner> {
    if features.contains(FEATURE_QUEUE_JOBS) {
        Box::new(QueueJobRunner::new(queue))
    } else {
        Box::new(SyncJobRunner::new(sync))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobResultDetail;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeQueue {
        /// Poll responses before the job reports itself finished.
        pending_polls: AtomicUsize,
        final_status: String,
        creates: AtomicUsize,
        polls: AtomicUsize,
    }

    impl FakeQueue {
        fn new(pending_polls: usize, final_status: &str) -> Self {
            Self {
                pending_polls: AtomicUsize::new(pending_polls),
                final_status: final_status.to_string(),
                creates: AtomicUsize::new(0),
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JobQueueApi for FakeQueue {
        async fn create_job(&self, _component_id: &str, _data: Value) -> Result<CreatedJob> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(CreatedJob {
                id: "job-1".to_string(),
            })
        }

        async fn get_job(&self, id: &str) -> Result<JobResult> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let finished = self
                .pending_polls
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                    remaining.checked_sub(1)
                })
                .is_err();
            Ok(JobResult {
                id: id.to_string(),
                status: if finished {
                    self.final_status.clone()
                } else {
                    "processing".to_string()
                },
                is_finished: finished,
                result: None,
            })
        }
    }

    struct FakeSyncJobs;

    #[async_trait]
    impl SyncJobApi for FakeSyncJobs {
        async fn run_job(&self, _component_id: &str, _data: Value) -> Result<JobResult> {
            Ok(JobResult {
                id: "77".to_string(),
                status: "success".to_string(),
                is_finished: true,
                result: Some(JobResultDetail::default()),
            })
        }

        async fn run_sync_action(
            &self,
            _component_id: &str,
            action: &str,
            _data: Value,
        ) -> Result<Value> {
            Ok(serde_json::json!({ "status": "success", "action": action }))
        }
    }

    fn fast_runner(queue: Arc<FakeQueue>) -> QueueJobRunner {
        QueueJobRunner::new(queue).with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_queue_runner_polls_until_finished() {
        let queue = Arc::new(FakeQueue::new(3, "success"));
        let runner = fast_runner(queue.clone());

        let job = runner
            .run_job("wr-db-snowflake", serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(job.id, "job-1");
        assert_eq!(job.status, "success");
        assert_eq!(queue.creates.load(Ordering::SeqCst), 1);
        assert_eq!(queue.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_queue_runner_returns_terminal_error_states() {
        let queue = Arc::new(FakeQueue::new(0, "error"));
        let runner = fast_runner(queue);

        let job = runner
            .run_job("wr-db-snowflake", serde_json::json!({}))
            .await
            .unwrap();

        assert!(job.is_finished);
        assert!(runner.process_result(&job).is_err());
    }

    #[tokio::test]
    async fn test_queue_runner_deadline_aborts_the_wait() {
        let queue = Arc::new(FakeQueue::new(usize::MAX, "success"));
        let runner = fast_runner(queue).with_deadline(Duration::from_millis(5));

        let err = runner
            .run_job("wr-db-snowflake", serde_json::json!({}))
            .await
            .unwrap_err();

        match err {
            Error::Job(message) => assert!(message.contains("job-1"), "{message}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_sync_runner_returns_the_response_job() {
        let runner = SyncJobRunner::new(Arc::new(FakeSyncJobs));
        let job = runner
            .run_job("wr-db-snowflake", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(job.id, "77");
        assert!(runner.process_result(&job).is_ok());
    }

    #[tokio::test]
    async fn test_queue_feature_selects_the_polling_runner() {
        let sync: Arc<dyn SyncJobApi> = Arc::new(FakeSyncJobs);
        let queue: Arc<dyn JobQueueApi> = Arc::new(FakeQueue::new(0, "success"));

        let features: HashSet<String> = [FEATURE_QUEUE_JOBS.to_string()].into();
        let runner = select_job_runner(&features, sync.clone(), queue.clone());
        let job = runner
            .run_job("wr-db-snowflake", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(job.id, "job-1");

        let runner = select_job_runner(&HashSet::new(), sync, queue);
        let job = runner
            .run_job("wr-db-snowflake", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(job.id, "77");
    }
}
