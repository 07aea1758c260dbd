//! The Blob Client capability: put/get/list/exists over a flat
//! `run_id/<object-name>` namespace. Two implementations: [`S3BlobClient`]
//! for production use and [`InMemoryBlobClient`] for tests.

mod memory;
mod name;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;

pub use memory::InMemoryBlobClient;
pub use name::BlobName;
pub use s3::S3BlobClient;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },
    #[error("blob store unavailable: {source}")]
    Unavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Overwrite-on-existence, at-least-once from the caller's perspective.
/// Safe to call concurrently from multiple tasks; no ordering guarantee
/// between concurrent puts to the same name (last-writer-wins).
#[async_trait]
pub trait BlobClient: Send + Sync {
    async fn put(&self, namespace: &str, name: &str, bytes: Bytes) -> Result<(), BlobError>;
    async fn get(&self, namespace: &str, name: &str) -> Result<Bytes, BlobError>;
    async fn list(&self, namespace: &str, prefix: &str) -> Result<Vec<String>, BlobError>;
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, BlobError>;
}
