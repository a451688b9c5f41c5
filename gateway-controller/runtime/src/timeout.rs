use crate::core::{SecretStore, ServiceCatalog, ServiceLookup};
use std::{collections::BTreeMap, time::Duration};
use tokio::time;

/// Bounds every lookup made through the inner catalog or secret store.
#[derive(Clone, Debug)]
pub struct Timeout<T> {
    inner: T,
    timeout: Duration,
}

impl<T> Timeout<T> {
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait::async_trait]
impl<T: ServiceCatalog> ServiceCatalog for Timeout<T> {
    async fn resolve_service(&self, name: &str, namespace: &str) -> anyhow::Result<ServiceLookup> {
        time::timeout(self.timeout, self.inner.resolve_service(name, namespace))
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "service lookup for {namespace}/{name} timed out after {:?}",
                    self.timeout
                )
            })?
    }
}

#[async_trait::async_trait]
impl<T: SecretStore> SecretStore for Timeout<T> {
    async fn get_secret_fields(&self, path: &str) -> anyhow::Result<BTreeMap<String, String>> {
        time::timeout(self.timeout, self.inner.get_secret_fields(path))
            .await
            .map_err(|_| anyhow::anyhow!("secret lookup for {path} timed out after {:?}", self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait::async_trait]
    impl ServiceCatalog for Stalled {
        async fn resolve_service(&self, _: &str, _: &str) -> anyhow::Result<ServiceLookup> {
            futures::future::pending().await
        }
    }

    #[async_trait::async_trait]
    impl SecretStore for Stalled {
        async fn get_secret_fields(&self, _: &str) -> anyhow::Result<BTreeMap<String, String>> {
            futures::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lookups_time_out() {
        let catalog = Timeout::new(Stalled, Duration::from_secs(1));
        let error = catalog
            .resolve_service("web", "default")
            .await
            .expect_err("lookup must time out");
        assert_eq!(
            error.to_string(),
            "service lookup for default/web timed out after 1s"
        );

        let error = catalog
            .get_secret_fields("pki/web")
            .await
            .expect_err("lookup must time out");
        assert_eq!(
            error.to_string(),
            "secret lookup for pki/web timed out after 1s"
        );
    }
}
