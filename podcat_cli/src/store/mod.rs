use async_trait::async_trait;

use crate::{Result, Workload};

mod memory;
pub use self::memory::MemoryStore;

mod sqlite;
pub use self::sqlite::{OwnedRows, SqliteStore};

/// Operations a record store performs, for fault injection and call tracking
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreOp {
    Find,
    Create,
    Update,
    Delete,
    FindAll,
}

/// Durable workload records, keyed by store assigned identity
///
/// Ports and env vars belong to their workload and are always loaded,
/// replaced and deleted together with it.
/// Failures are `StoreError`s with the cause chained; a missing record is `NotFound`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Workload>;

    /// Persist a new workload and return its identity
    ///
    /// Any id on the workload is ignored.
    async fn create(&self, wl: &Workload) -> Result<i64>;

    /// Replace the workload with the same identity
    ///
    /// No concurrency token: the last write wins.
    async fn update(&self, wl: &Workload) -> Result<()>;

    /// Remove the workload and everything it owns, all or nothing
    async fn delete_by_id(&self, id: i64) -> Result<()>;

    async fn find_all(&self) -> Result<Vec<Workload>>;
}
