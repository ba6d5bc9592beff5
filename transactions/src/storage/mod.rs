pub mod pg;

pub use pg::PgTransactionStore;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::TransactionError;
use crate::model::{ExportRow, PagedResponse, Transaction};

/// Durable storage gateway for transaction records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Open an explicit unit of work. Writes issued through the returned
    /// handle become visible only on `commit`.
    async fn begin(&self) -> Result<Box<dyn StoreUow>, TransactionError>;

    /// Page of records whose `transaction_date` falls in `[start, end]`,
    /// ordered ascending by date. `total_pages` is the ceiling of the total
    /// matching count over `page_size`; `page` is 1-based.
    async fn get_paged_by_dates(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        page: u32,
        page_size: u32,
    ) -> Result<PagedResponse<Transaction>, TransactionError>;

    /// Full, unfiltered export projection.
    async fn get_export_rows(&self) -> Result<Vec<ExportRow>, TransactionError>;
}

/// One atomic unit of work over the store.
///
/// Dropping the handle without committing discards every write issued
/// through it.
#[async_trait]
pub trait StoreUow: Send {
    /// Insert-or-update keyed by `transaction_id`: on a key match every
    /// mutable column is overwritten, otherwise a new row is inserted.
    async fn upsert(&mut self, record: &Transaction) -> Result<(), TransactionError>;

    async fn commit(self: Box<Self>) -> Result<(), TransactionError>;

    async fn rollback(self: Box<Self>) -> Result<(), TransactionError>;
}
