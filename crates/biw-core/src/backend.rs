use crate::{
    BigQueryBackend, Config, DbConnection, Driver, Error, Result, SnowflakeBackend,
    StagingProvider,
};
use serde_json::Value;

/// Warehouse-driver specific payload construction. One implementation per
/// supported driver, selected through [`backend_for`].
pub trait DbBackend: Send + Sync {
    /// Desired connection record for the BI platform.
    fn connection_payload(&self, name: &str) -> Result<DbConnection>;

    /// Component id of the downstream writer job.
    fn writer_component_id(&self) -> &str;

    /// Configuration data for the writer job. Submitters wrap it in the
    /// `configData` envelope on the wire.
    fn writer_job_payload(&self) -> Result<Value>;

    /// Payload for the writer's connectivity test action, `None` when the
    /// driver has no such action.
    fn test_connection_payload(&self) -> Result<Option<Value>>;
}

/// Select the backend implementation for the configured driver.
pub fn backend_for(
    config: &Config,
    run_id: Option<&str>,
    staging: Option<StagingProvider>,
) -> Result<Box<dyn DbBackend>> {
    match config.parameters.db.driver {
        Driver::Snowflake => {
            let staging = staging.ok_or_else(|| {
                Error::Configuration(
                    "BIW_STAGING_FILE_PROVIDER environment variable must be set".to_string(),
                )
            })?;
            Ok(Box::new(SnowflakeBackend::new(
                config.clone(),
                run_id.map(str::to_string),
                staging,
            )))
        }
        Driver::BigQuery => Ok(Box::new(BigQueryBackend::new(config.clone()))),
    }
}
