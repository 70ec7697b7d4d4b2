use crate::{ConnectionRegistry, DbConnection, Error, RemoteConnection, Result};
use std::sync::Arc;
use tracing::info;

/// Converges the connection record at the BI platform toward the desired
/// state computed by the backend strategy.
pub struct ConnectionReconciler {
    registry: Arc<dyn ConnectionRegistry>,
    force_update: bool,
}

impl ConnectionReconciler {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, force_update: bool) -> Self {
        Self {
            registry,
            force_update,
        }
    }

    /// Create the connection when it is absent; overwrite it only when the
    /// force-update flag is set. The update is always a full replace, no
    /// diffing. Returns the remote resource when a write happened.
    pub async fn reconcile(&self, desired: &DbConnection) -> Result<Option<RemoteConnection>> {
        match self.registry.lookup(&desired.name).await {
            Err(Error::NotFound(_)) => {
                info!("Creating connection \"{}\"", desired.name);
                Ok(Some(self.registry.create(desired).await?))
            }
            Err(e) => Err(e),
            Ok(_) if self.force_update => {
                info!("Forced connection update is in effect, updating");
                Ok(Some(self.registry.update(&desired.name, desired).await?))
            }
            Ok(_) => {
                info!("Connection already exists");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRegistry {
        exists: bool,
        fail_lookup: bool,
        lookups: AtomicUsize,
        creates: AtomicUsize,
        updates: AtomicUsize,
    }

    impl FakeRegistry {
        fn new(exists: bool) -> Self {
            Self {
                exists,
                fail_lookup: false,
                lookups: AtomicUsize::new(0),
                creates: AtomicUsize::new(0),
                updates: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            let mut registry = Self::new(false);
            registry.fail_lookup = true;
            registry
        }
    }

    #[async_trait]
    impl ConnectionRegistry for FakeRegistry {
        async fn lookup(&self, name: &str) -> Result<RemoteConnection> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail_lookup {
                return Err(Error::Remote("registry unavailable".to_string()));
            }
            if self.exists {
                Ok(RemoteConnection {
                    name: name.to_string(),
                    dialect_name: Some("snowflake".to_string()),
                })
            } else {
                Err(Error::NotFound(format!("Connection \"{name}\"")))
            }
        }

        async fn create(&self, connection: &DbConnection) -> Result<RemoteConnection> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteConnection {
                name: connection.name.clone(),
                dialect_name: Some(connection.dialect_name.clone()),
            })
        }

        async fn update(&self, name: &str, connection: &DbConnection) -> Result<RemoteConnection> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteConnection {
                name: name.to_string(),
                dialect_name: Some(connection.dialect_name.clone()),
            })
        }
    }

    fn desired(name: &str) -> DbConnection {
        DbConnection {
            name: name.to_string(),
            dialect_name: "snowflake".to_string(),
            host: "acme-eu1.snowflakecomputing.com".to_string(),
            username: Some("WRITER".to_string()),
            password: Some("secret".to_string()),
            certificate: None,
            file_type: None,
            database: "ANALYTICS".to_string(),
            schema: Some("PUBLIC".to_string()),
            jdbc_additional_params: Some("account=acme-eu1&warehouse=DEV".to_string()),
            tmp_db_name: None,
            pdt_context_override: None,
        }
    }

    #[tokio::test]
    async fn test_missing_connection_is_created() {
        let registry = Arc::new(FakeRegistry::new(false));
        let reconciler = ConnectionReconciler::new(registry.clone(), false);

        let written = reconciler.reconcile(&desired("wr_bi_1")).await.unwrap();

        assert_eq!(written.unwrap().name, "wr_bi_1");
        assert_eq!(registry.creates.load(Ordering::SeqCst), 1);
        assert_eq!(registry.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_existing_connection_is_left_alone() {
        let registry = Arc::new(FakeRegistry::new(true));
        let reconciler = ConnectionReconciler::new(registry.clone(), false);

        // Twice, to cover idempotence across invocations.
        assert!(reconciler.reconcile(&desired("wr_bi_1")).await.unwrap().is_none());
        assert!(reconciler.reconcile(&desired("wr_bi_1")).await.unwrap().is_none());

        assert_eq!(registry.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(registry.creates.load(Ordering::SeqCst), 0);
        assert_eq!(registry.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_force_update_overwrites_unconditionally() {
        let registry = Arc::new(FakeRegistry::new(true));
        let reconciler = ConnectionReconciler::new(registry.clone(), true);

        assert!(reconciler.reconcile(&desired("wr_bi_1")).await.unwrap().is_some());
        assert!(reconciler.reconcile(&desired("wr_bi_1")).await.unwrap().is_some());

        assert_eq!(registry.creates.load(Ordering::SeqCst), 0);
        assert_eq!(registry.updates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unexpected_lookup_failure_propagates() {
        let registry = Arc::new(FakeRegistry::failing());
        let reconciler = ConnectionReconciler::new(registry.clone(), false);

        let err = reconciler.reconcile(&desired("wr_bi_1")).await.unwrap_err();

        assert!(matches!(err, Error::Remote(_)));
        assert_eq!(registry.creates.load(Ordering::SeqCst), 0);
        assert_eq!(registry.updates.load(Ordering::SeqCst), 0);
    }
}
