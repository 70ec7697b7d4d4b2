mod backend;
mod bigquery;
mod config;
mod connection;
mod error;
mod job;
mod orchestrator;
mod reconciler;
mod registry;
mod runner;
mod snowflake;

pub use backend::{backend_for, DbBackend};
pub use bigquery::{BigQueryBackend, BIGQUERY_WRITER};
pub use config::{
    is_valid_unquoted_identifier, BiCredentials, ColumnMapping, Config, DbConfig, Driver,
    Parameters, ServiceAccount, StagingProvider, StorageConfig, TableMapping, ValidationMode,
};
pub use connection::{AccessToken, DbConnection, DbConnectionOverride, RemoteConnection};
pub use error::{Error, Result};
pub use job::{classify, CreatedJob, JobOutcome, JobResult, JobResultDetail};
pub use orchestrator::{test_connection, test_credentials, Orchestrator};
pub use reconciler::ConnectionReconciler;
pub use registry::{BiAuth, ConnectionRegistry};
pub use runner::{
    select_job_runner, JobQueueApi, JobRunner, QueueJobRunner, SyncJobApi, SyncJobRunner,
    DEFAULT_POLL_INTERVAL, FEATURE_QUEUE_JOBS,
};
pub use snowflake::{SnowflakeBackend, SNOWFLAKE_BLOB_WRITER, SNOWFLAKE_WRITER};
