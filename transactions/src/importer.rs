use std::sync::Arc;

use tracing::{info, warn};

use crate::codec::RecordCodec;
use crate::error::TransactionError;
use crate::storage::TransactionStore;
use crate::validator;

/// Validates an uploaded batch and commits it atomically.
///
/// Every step is a hard stop: a decode failure, an empty file or a single
/// invalid record rejects the whole batch before anything is written, and a
/// failed upsert rolls back every row already staged. Re-importing an
/// identical file upserts the same rows to the same values.
#[derive(Clone)]
pub struct Importer {
    codec: Arc<dyn RecordCodec>,
    store: Arc<dyn TransactionStore>,
}

impl Importer {
    pub fn new(codec: Arc<dyn RecordCodec>, store: Arc<dyn TransactionStore>) -> Self {
        Self { codec, store }
    }

    /// Import one uploaded file. Returns the number of records committed.
    pub async fn import(&self, file: &[u8]) -> Result<usize, TransactionError> {
        let records = self.codec.decode(file)?;
        if records.is_empty() {
            return Err(TransactionError::EmptyInput);
        }

        for record in &records {
            if !validator::is_valid(record) {
                warn!(
                    "Rejecting batch: record {} failed validation",
                    record.transaction_id
                );
                return Err(TransactionError::Validation {
                    transaction_id: record.transaction_id.clone(),
                });
            }
        }

        let mut uow = self.store.begin().await?;
        for record in &records {
            if let Err(err) = uow.upsert(record).await {
                // Surface the upsert failure, not any rollback failure.
                if let Err(rollback_err) = uow.rollback().await {
                    warn!("Rollback after failed upsert also failed: {rollback_err}");
                }
                return Err(err);
            }
        }
        uow.commit().await?;

        info!("Imported {} transaction records", records.len());
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExportRow, PagedResponse, Transaction};
    use crate::storage::StoreUow;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use mockall::mock;
    use mockall::predicate::always;

    mock! {
        Store {}

        #[async_trait]
        impl TransactionStore for Store {
            async fn begin(&self) -> Result<Box<dyn StoreUow>, TransactionError>;
            async fn get_paged_by_dates(
                &self,
                start: NaiveDateTime,
                end: NaiveDateTime,
                page: u32,
                page_size: u32,
            ) -> Result<PagedResponse<Transaction>, TransactionError>;
            async fn get_export_rows(&self) -> Result<Vec<ExportRow>, TransactionError>;
        }
    }

    mock! {
        Uow {}

        #[async_trait]
        impl StoreUow for Uow {
            async fn upsert(&mut self, record: &Transaction) -> Result<(), TransactionError>;
            async fn commit(self: Box<Self>) -> Result<(), TransactionError>;
            async fn rollback(self: Box<Self>) -> Result<(), TransactionError>;
        }
    }

    const VALID_CSV: &str = "transaction_id,name,email,amount,transaction_date,client_location\n\
        T1,John,john@example.com,10.00,2024-01-15 10:00:00,\"40.7, -74.0\"\n";

    #[tokio::test]
    async fn commits_after_all_upserts_succeed() {
        let mut store = MockStore::new();
        store.expect_begin().times(1).returning(|| {
            let mut uow = MockUow::new();
            uow.expect_upsert()
                .with(always())
                .times(1)
                .returning(|_| Ok(()));
            uow.expect_commit().times(1).returning(|| Ok(()));
            Ok(Box::new(uow))
        });

        let importer = Importer::new(Arc::new(crate::codec::FileRecordCodec), Arc::new(store));
        let imported = importer.import(VALID_CSV.as_bytes()).await.unwrap();
        assert_eq!(imported, 1);
    }

    #[tokio::test]
    async fn rolls_back_when_an_upsert_fails() {
        let mut store = MockStore::new();
        store.expect_begin().times(1).returning(|| {
            let mut uow = MockUow::new();
            uow.expect_upsert()
                .times(1)
                .returning(|_| Err(TransactionError::Internal("boom".to_string())));
            uow.expect_rollback().times(1).returning(|| Ok(()));
            uow.expect_commit().times(0);
            Ok(Box::new(uow))
        });

        let importer = Importer::new(Arc::new(crate::codec::FileRecordCodec), Arc::new(store));
        let result = importer.import(VALID_CSV.as_bytes()).await;
        assert!(matches!(result, Err(TransactionError::Internal(_))));
    }

    #[tokio::test]
    async fn invalid_record_rejects_batch_before_any_write() {
        // begin() is never expected: a validation failure must not open a
        // unit of work at all.
        let store = MockStore::new();
        let csv = "transaction_id,name,email,amount,transaction_date,client_location\n\
            T1,,john@example.com,10.00,2024-01-15 10:00:00,\"40.7, -74.0\"\n";

        let importer = Importer::new(Arc::new(crate::codec::FileRecordCodec), Arc::new(store));
        let result = importer.import(csv.as_bytes()).await;
        assert!(
            matches!(result, Err(TransactionError::Validation { ref transaction_id }) if transaction_id == "T1")
        );
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let store = MockStore::new();
        let csv = "transaction_id,name,email,amount,transaction_date,client_location\n";

        let importer = Importer::new(Arc::new(crate::codec::FileRecordCodec), Arc::new(store));
        let result = importer.import(csv.as_bytes()).await;
        assert!(matches!(result, Err(TransactionError::EmptyInput)));
    }
}
