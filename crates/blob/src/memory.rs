use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{BlobClient, BlobError};

/// In-memory [`BlobClient`] fake used throughout the test suite. Overwrite
/// semantics and concurrent-safety match the real S3 client; there is no
/// network, so every call "succeeds durably" instantly.
#[derive(Default)]
pub struct InMemoryBlobClient {
    objects: RwLock<BTreeMap<(String, String), Bytes>>,
}

impl InMemoryBlobClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobClient for InMemoryBlobClient {
    async fn put(&self, namespace: &str, name: &str, bytes: Bytes) -> Result<(), BlobError> {
        self.objects
            .write()
            .await
            .insert((namespace.to_owned(), name.to_owned()), bytes);
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Bytes, BlobError> {
        self.objects
            .read()
            .await
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                namespace: namespace.to_owned(),
                name: name.to_owned(),
            })
    }

    async fn list(&self, namespace: &str, prefix: &str) -> Result<Vec<String>, BlobError> {
        let objects = self.objects.read().await;
        let mut names: Vec<String> = objects
            .keys()
            .filter(|(ns, name)| ns == namespace && name.starts_with(prefix))
            .map(|(_, name)| name.clone())
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, BlobError> {
        Ok(self
            .objects
            .read()
            .await
            .contains_key(&(namespace.to_owned(), name.to_owned())))
    }
}
