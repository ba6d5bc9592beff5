use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, Row, Transaction as PgTx};
use tracing::{debug, error};

use crate::error::TransactionError;
use crate::model::{ExportRow, PagedResponse, Transaction};
use crate::storage::{StoreUow, TransactionStore};

pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub async fn new(database_url: &str) -> Result<Self, TransactionError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count_by_dates(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<i64, TransactionError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*)
            FROM transactions
            WHERE transaction_date BETWEEN $1 AND $2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get(0)?)
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn begin(&self) -> Result<Box<dyn StoreUow>, TransactionError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn get_paged_by_dates(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        page: u32,
        page_size: u32,
    ) -> Result<PagedResponse<Transaction>, TransactionError> {
        if page == 0 || page_size == 0 {
            return Err(TransactionError::Internal(
                "page and pageSize must be positive".to_string(),
            ));
        }

        debug!("Querying transactions between {start} and {end}, page {page}");
        let items = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT transaction_id, name, email, amount, transaction_date, client_location
            FROM transactions
            WHERE transaction_date BETWEEN $1 AND $2
            ORDER BY transaction_date
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(((page - 1) * page_size) as i64)
        .bind(page_size as i64)
        .fetch_all(&self.pool)
        .await?;

        let total_count = self.count_by_dates(start, end).await?;
        let total_pages = (total_count as u64).div_ceil(page_size as u64) as u32;

        Ok(PagedResponse { total_pages, items })
    }

    async fn get_export_rows(&self) -> Result<Vec<ExportRow>, TransactionError> {
        let rows = sqlx::query_as::<_, ExportRow>(
            r#"
            SELECT transaction_id, email, amount, transaction_date
            FROM transactions
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

struct PgUnitOfWork {
    tx: PgTx<'static, Postgres>,
}

#[async_trait]
impl StoreUow for PgUnitOfWork {
    async fn upsert(&mut self, record: &Transaction) -> Result<(), TransactionError> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions
                (transaction_id, name, email, amount, transaction_date, client_location)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (transaction_id) DO UPDATE
            SET name = EXCLUDED.name,
                email = EXCLUDED.email,
                amount = EXCLUDED.amount,
                transaction_date = EXCLUDED.transaction_date,
                client_location = EXCLUDED.client_location
            "#,
        )
        .bind(&record.transaction_id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(record.amount)
        .bind(record.transaction_date)
        .bind(&record.client_location)
        .execute(&mut *self.tx)
        .await;

        if let Err(e) = result {
            error!(
                "Failed to upsert transaction {}: {}",
                record.transaction_id, e
            );
            return Err(e.into());
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), TransactionError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), TransactionError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
