//! Collaborator seams. The agent supplies HTTP, radio and storage
//! implementations; tests supply in-memory fakes.

use anchorscan_model::{
    AnchorId, RelationshipUpdate, ScanDataEntry, ScanJob, TagRecord,
};
use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::Result;

/// Remote job backend.
#[async_trait]
pub trait AnchorApi: Send + Sync + Debug {
    /// `GET /scan-by-anchor/`. An empty list means no work.
    async fn poll_jobs(&self, anchor_id: &AnchorId) -> Result<Vec<ScanJob>>;

    /// `GET /get-tags-by-event/`.
    async fn fetch_roster(&self, event_id: &str) -> Result<Vec<TagRecord>>;

    /// `POST /scan_data`. The response body is returned verbatim for logging.
    async fn upload_scan_data(&self, entries: &[ScanDataEntry]) -> Result<String>;

    /// `POST /jet-rel/230`. The response body is returned verbatim for logging.
    async fn update_relationship(&self, update: &RelationshipUpdate) -> Result<String>;
}

/// Radio scanner control. Observations themselves arrive on a channel handed
/// to the orchestrator separately.
#[async_trait]
pub trait RadioScanner: Send + Debug {
    fn is_ready(&self) -> bool;

    async fn start(&mut self, allow_duplicates: bool) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;
}

/// Single-value persistence for the anchor identifier.
pub trait IdentityStore: Send + Sync + Debug {
    fn load(&self) -> Result<Option<String>>;

    fn store(&self, value: &str) -> Result<()>;
}
