use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client, primitives::ByteStream};
use bytes::Bytes;
use tracing::warn;

use crate::{BlobClient, BlobError};

/// S3-backed [`BlobClient`]. `namespace` maps to a bucket name, `name` to a
/// key under `run_id/` inside it (the caller passes the already-namespaced
/// object name; this client does not itself enforce the `run_id/` prefix).
pub struct S3BlobClient {
    client: Client,
}

impl S3BlobClient {
    /// Loads credentials and region from the ambient AWS environment
    /// (`AWS_PROFILE`, `AWS_REGION`, instance/task role, ...), matching
    /// `aws_config::defaults(...).load()` used throughout the pack's own S3
    /// integration.
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            client: Client::new(&config),
        }
    }

    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobClient for S3BlobClient {
    async fn put(&self, namespace: &str, name: &str, bytes: Bytes) -> Result<(), BlobError> {
        self.client
            .put_object()
            .bucket(namespace)
            .key(name)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|source| BlobError::Unavailable {
                source: Box::new(source),
            })?;
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Bytes, BlobError> {
        let response = self
            .client
            .get_object()
            .bucket(namespace)
            .key(name)
            .send()
            .await
            .map_err(|source| {
                let message = source.to_string();
                if message.contains("NoSuchKey") {
                    BlobError::NotFound {
                        namespace: namespace.to_owned(),
                        name: name.to_owned(),
                    }
                } else {
                    BlobError::Unavailable {
                        source: Box::new(source),
                    }
                }
            })?;

        let aggregated = response
            .body
            .collect()
            .await
            .map_err(|source| BlobError::Unavailable {
                source: Box::new(source),
            })?;
        Ok(aggregated.into_bytes())
    }

    async fn list(&self, namespace: &str, prefix: &str) -> Result<Vec<String>, BlobError> {
        let mut names = Vec::new();
        let mut continuation_token = None;
        loop {
            let mut request = self.client.list_objects_v2().bucket(namespace).prefix(prefix);
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }
            let response = request.send().await.map_err(|source| BlobError::Unavailable {
                source: Box::new(source),
            })?;
            names.extend(response.contents().iter().filter_map(|obj| obj.key().map(str::to_owned)));
            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_owned()),
                None => break,
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, BlobError> {
        match self.client.head_object().bucket(namespace).key(name).send().await {
            Ok(_) => Ok(true),
            Err(source) => {
                let message = source.to_string();
                if message.contains("NotFound") || message.contains("404") {
                    Ok(false)
                } else {
                    warn!(namespace, name, error = %message, "head_object failed");
                    Err(BlobError::Unavailable {
                        source: Box::new(source),
                    })
                }
            }
        }
    }
}
