use crate::{Config, DbBackend, DbConfig, DbConnection, DbConnectionOverride, Result, StagingProvider};
use serde_json::{json, Value};

/// Writer component loading through the warehouse's direct DB interface.
pub const SNOWFLAKE_WRITER: &str = "wr-db-snowflake";

/// Writer component staging through blob storage, used on Azure stacks.
pub const SNOWFLAKE_BLOB_WRITER: &str = "wr-snowflake-blob-storage";

pub struct SnowflakeBackend {
    config: Config,
    run_id: Option<String>,
    staging: StagingProvider,
}

impl SnowflakeBackend {
    pub fn new(config: Config, run_id: Option<String>, staging: StagingProvider) -> Self {
        Self {
            config,
            run_id,
            staging,
        }
    }

    /// Account and warehouse travel in the secondary JDBC parameter string,
    /// the connection record has no first-class fields for them.
    fn jdbc_params(db: &DbConfig) -> Result<String> {
        Ok(format!(
            "account={}&warehouse={}",
            db.account()?,
            db.warehouse()?
        ))
    }

    fn db_parameters(&self) -> Result<Value> {
        let db = &self.config.parameters.db;
        let mut params = json!({
            "host": db.host()?,
            "database": db.database()?,
            "user": db.user()?,
            "password": db.resolved_password()?,
            "schema": db.schema()?,
            "warehouse": db.warehouse()?,
        });
        if let Some(run_id) = &self.run_id {
            params["runId"] = json!(run_id);
        }
        Ok(params)
    }
}

impl DbBackend for SnowflakeBackend {
    fn connection_payload(&self, name: &str) -> Result<DbConnection> {
        let db = &self.config.parameters.db;
        let mut connection = DbConnection {
            name: name.to_string(),
            dialect_name: "snowflake".to_string(),
            host: db.host()?.to_string(),
            username: Some(db.user()?.to_string()),
            password: Some(db.resolved_password()?.to_string()),
            certificate: None,
            file_type: None,
            database: db.database()?.to_string(),
            schema: Some(db.schema()?.to_string()),
            jdbc_additional_params: Some(Self::jdbc_params(db)?),
            tmp_db_name: None,
            pdt_context_override: None,
        };
        if let Some(cache) = &self.config.parameters.db_cache {
            connection.tmp_db_name = Some(cache.schema()?.to_string());
            connection.pdt_context_override = Some(DbConnectionOverride {
                context: "pdt".to_string(),
                host: cache.host()?.to_string(),
                username: cache.user()?.to_string(),
                password: cache.resolved_password()?.to_string(),
                database: cache.database()?.to_string(),
                jdbc_additional_params: Self::jdbc_params(cache)?,
            });
        }
        Ok(connection)
    }

    fn writer_component_id(&self) -> &str {
        match self.staging {
            StagingProvider::Azure => SNOWFLAKE_BLOB_WRITER,
            StagingProvider::Aws => SNOWFLAKE_WRITER,
        }
    }

    fn writer_job_payload(&self) -> Result<Value> {
        Ok(json!({
            "storage": {
                "input": self.config.storage.input,
            },
            "parameters": {
                "db": self.db_parameters()?,
                "tables": self.config.parameters.tables,
            },
        }))
    }

    fn test_connection_payload(&self) -> Result<Option<Value>> {
        Ok(Some(json!({
            "parameters": {
                "db": self.db_parameters()?,
            },
        })))
    }
}
