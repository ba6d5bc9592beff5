use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use futures::future::try_join_all;
use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::error::TransactionError;
use crate::model::{PagedResponse, Transaction};
use crate::storage::TransactionStore;
use crate::timezone::TimeZoneResolver;

/// Fixed range served by `get_in_january_2024`.
static JANUARY_2024: Lazy<(NaiveDateTime, NaiveDateTime)> = Lazy::new(|| {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2024, 1, 31)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    (start, end)
});

/// Paged retrieval over the transaction store, including the
/// timezone-adjust-and-refilter mode.
#[derive(Clone)]
pub struct TransactionQueries {
    store: Arc<dyn TransactionStore>,
    resolver: Arc<dyn TimeZoneResolver>,
}

impl TransactionQueries {
    pub fn new(store: Arc<dyn TransactionStore>, resolver: Arc<dyn TimeZoneResolver>) -> Self {
        Self { store, resolver }
    }

    /// Page of records in `[start, end]`, using the caller's range verbatim.
    pub async fn get_by_local_dates(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        page: u32,
        page_size: u32,
    ) -> Result<PagedResponse<Transaction>, TransactionError> {
        let response = self.store.get_paged_by_dates(start, end, page, page_size).await?;
        if response.items.is_empty() || response.total_pages == 0 {
            return Err(TransactionError::NotFound);
        }
        Ok(response)
    }

    /// Page of records with each `transaction_date` converted from the
    /// record's own zone (resolved from its coordinates) into
    /// `time_zone_id`.
    ///
    /// The stored range is widened by a day on either bound before querying
    /// so that records which only enter the caller's range after conversion
    /// are still fetched, then the converted items are re-filtered to the
    /// original `[start, end]`. `total_pages` still reflects the widened
    /// pre-conversion query, so a page can come back under-filled; see
    /// DESIGN.md for why this inconsistency is kept.
    pub async fn get_for_current_client_time_zone(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        time_zone_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<PagedResponse<Transaction>, TransactionError> {
        let widened_start = start + Duration::days(1);
        let widened_end = end - Duration::days(1);

        let response = self
            .store
            .get_paged_by_dates(widened_start, widened_end, page, page_size)
            .await?;
        if response.items.is_empty() || response.total_pages == 0 {
            return Err(TransactionError::NotFound);
        }

        debug!(
            "Converting {} records into time zone {}",
            response.items.len(),
            time_zone_id
        );

        // Fan out one resolve+convert per record. try_join_all drops the
        // remaining futures on the first failure, so a failed resolver call
        // aborts the page instead of returning partial results.
        let conversions = response.items.into_iter().map(|mut record| {
            let resolver = Arc::clone(&self.resolver);
            let destination = time_zone_id.to_string();
            async move {
                let origin_zone = resolver
                    .zone_id_from_coordinates(&record.client_location)
                    .await?;
                record.transaction_date = resolver.convert_local_time(
                    record.transaction_date,
                    &origin_zone,
                    &destination,
                )?;
                Ok::<_, TransactionError>(record)
            }
        });
        let converted = try_join_all(conversions).await?;

        let items: Vec<Transaction> = converted
            .into_iter()
            .filter(|record| record.transaction_date >= start && record.transaction_date <= end)
            .collect();

        info!(
            "Returning {} of the fetched records after conversion into {}",
            items.len(),
            time_zone_id
        );

        Ok(PagedResponse {
            total_pages: response.total_pages,
            items,
        })
    }

    /// Same as `get_by_local_dates` over the fixed January 2024 range.
    pub async fn get_in_january_2024(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<PagedResponse<Transaction>, TransactionError> {
        let (start, end) = *JANUARY_2024;
        self.get_by_local_dates(start, end, page, page_size).await
    }
}
