use thiserror::Error;

/// Error taxonomy for the transaction pipeline.
///
/// Every fallible operation in the core returns one of these kinds so that
/// callers can match on the failure category instead of inspecting messages.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("failed to decode input file: {0}")]
    Decode(String),

    #[error("input file contains no records")]
    EmptyInput,

    #[error("record {transaction_id} failed validation")]
    Validation { transaction_id: String },

    #[error("no transactions found for the specified date range")]
    NotFound,

    #[error("no transactions found in the database")]
    NoData,

    #[error("time zone service error: {0}")]
    ExternalService(String),

    #[error("storage error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for TransactionError {
    fn from(err: sqlx::Error) -> Self {
        TransactionError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for TransactionError {
    fn from(err: reqwest::Error) -> Self {
        TransactionError::ExternalService(err.to_string())
    }
}

impl From<csv::Error> for TransactionError {
    fn from(err: csv::Error) -> Self {
        TransactionError::Decode(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for TransactionError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        TransactionError::Internal(err.to_string())
    }
}
