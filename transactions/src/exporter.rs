use std::sync::Arc;

use tracing::info;

use crate::codec::RecordCodec;
use crate::error::TransactionError;
use crate::storage::TransactionStore;

/// Fetches the full export projection and hands it to the codec.
#[derive(Clone)]
pub struct Exporter {
    codec: Arc<dyn RecordCodec>,
    store: Arc<dyn TransactionStore>,
}

impl Exporter {
    pub fn new(codec: Arc<dyn RecordCodec>, store: Arc<dyn TransactionStore>) -> Self {
        Self { codec, store }
    }

    /// Export every stored transaction as a spreadsheet binary.
    pub async fn export(&self) -> Result<Vec<u8>, TransactionError> {
        let rows = self.store.get_export_rows().await?;
        if rows.is_empty() {
            return Err(TransactionError::NoData);
        }

        info!("Exporting {} transaction rows", rows.len());
        self.codec.encode(&rows)
    }
}
