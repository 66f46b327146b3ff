//! Hand-off boundary between acquisition and download/persistence.
//!
//! The orchestrator only knows that a resolved link plus its security go
//! in and a stored filename comes out. Production wires the HTTP
//! downloader to the SQLite store; tests substitute a recorder.

use crate::download::{DownloadError, Downloader};
use crate::model::Security;
use crate::store::{DocumentStore, StoreError};
use async_trait::async_trait;
use thiserror::Error;

/// Failure delivering one resolved document.
#[derive(Debug, Error)]
pub enum DeliverError {
    /// Non-200 response or transport failure fetching the link. The link
    /// was already resolved, so other jurisdictions are not retried.
    #[error(transparent)]
    Download(#[from] DownloadError),
    /// The document store rejected the record.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Consumes resolved links: download the bytes, persist the record.
#[async_trait]
pub trait DocumentSink: Send {
    /// Deliver one resolved document; returns the stored filename.
    async fn deliver(&mut self, link: &str, security: &Security) -> Result<String, DeliverError>;
}

/// Production sink: reqwest download, then a store write on the blocking
/// pool. The write is awaited before returning, so persistence stays
/// strictly ordered with acquisition and at most one write is in flight.
pub struct StoreSink {
    downloader: Downloader,
    store: DocumentStore,
}

impl StoreSink {
    pub fn new(downloader: Downloader, store: DocumentStore) -> Self {
        Self { downloader, store }
    }
}

#[async_trait]
impl DocumentSink for StoreSink {
    async fn deliver(&mut self, link: &str, security: &Security) -> Result<String, DeliverError> {
        let filename = self.downloader.fetch(link, &security.isin).await?;
        let path = self.downloader.path_of(&filename);

        self.store
            .attach_on_worker(
                filename.clone(),
                security.record_ref().to_string(),
                path,
            )
            .await?;

        tracing::info!("stored '{}' for {}", filename, security.isin);
        Ok(filename)
    }
}
