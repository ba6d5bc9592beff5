use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A financial transaction record.
///
/// `transaction_id` is the natural key, assigned upstream. `transaction_date`
/// is a naive local timestamp interpreted in the time zone of the
/// transaction's own origin (`client_location`, a `"lat, lon"` pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    pub name: String,
    pub email: String,
    pub amount: Decimal,
    pub transaction_date: NaiveDateTime,
    pub client_location: String,
}

/// One page of query results.
///
/// `total_pages` is derived from the total number of records matching the
/// queried range, not from the number of items actually returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub total_pages: u32,
    pub items: Vec<T>,
}

/// Read-only projection used for spreadsheet export. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub transaction_id: String,
    pub email: String,
    pub amount: Decimal,
    pub transaction_date: NaiveDateTime,
}

impl From<&Transaction> for ExportRow {
    fn from(transaction: &Transaction) -> Self {
        Self {
            transaction_id: transaction.transaction_id.clone(),
            email: transaction.email.clone(),
            amount: transaction.amount,
            transaction_date: transaction.transaction_date,
        }
    }
}
