use async_trait::async_trait;
use chrono::offset::LocalResult;
use chrono::{Duration, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::TransactionError;

/// Resolves a coordinate pair to an IANA time zone id and converts naive
/// local timestamps between zones.
#[async_trait]
pub trait TimeZoneResolver: Send + Sync {
    /// Resolve a `"lat, lon"` coordinate string to a time zone identifier.
    async fn zone_id_from_coordinates(&self, coordinates: &str)
        -> Result<String, TransactionError>;

    /// Convert a naive local timestamp from one zone to another. The result
    /// is again a naive local timestamp; zone information is discarded.
    fn convert_local_time(
        &self,
        local: NaiveDateTime,
        origin_zone_id: &str,
        destination_zone_id: &str,
    ) -> Result<NaiveDateTime, TransactionError> {
        convert_between_zones(local, origin_zone_id, destination_zone_id)
    }
}

fn parse_zone(zone_id: &str) -> Result<Tz, TransactionError> {
    zone_id
        .parse()
        .map_err(|_| TransactionError::ExternalService(format!("unknown time zone id: {zone_id}")))
}

/// Resolve a naive local timestamp in `tz`, leniently.
///
/// An ambiguous time (DST fall-back overlap) maps to its earliest occurrence.
/// A nonexistent time (spring-forward gap) is shifted forward past the gap.
fn resolve_leniently(tz: Tz, local: NaiveDateTime) -> chrono::DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(resolved) => resolved,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let shifted = local + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&local))
        }
    }
}

pub fn convert_between_zones(
    local: NaiveDateTime,
    origin_zone_id: &str,
    destination_zone_id: &str,
) -> Result<NaiveDateTime, TransactionError> {
    let origin = parse_zone(origin_zone_id)?;
    let destination = parse_zone(destination_zone_id)?;

    let zoned = resolve_leniently(origin, local);
    Ok(zoned.with_timezone(&destination).naive_local())
}

/// Typed shape of the coordinate lookup response. The `timeZone` field being
/// absent is a hard failure, not an empty result.
#[derive(Debug, Deserialize)]
struct CoordinateZoneResponse {
    #[serde(rename = "timeZone")]
    time_zone: Option<String>,
}

/// Network-backed resolver against the timeapi.io coordinate endpoint.
pub struct TimeApiResolver {
    client: reqwest::Client,
    base_url: Url,
}

impl TimeApiResolver {
    pub fn new(base_url: &str) -> Result<Self, TransactionError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransactionError::ExternalService(format!("invalid base url: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }
}

fn split_coordinates(coordinates: &str) -> Result<(&str, &str), TransactionError> {
    let mut parts = coordinates.split(',').map(str::trim);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(latitude), Some(longitude), None) if !latitude.is_empty() && !longitude.is_empty() => {
            Ok((latitude, longitude))
        }
        _ => Err(TransactionError::ExternalService(format!(
            "invalid coordinates format '{coordinates}', expected 'latitude, longitude'"
        ))),
    }
}

#[async_trait]
impl TimeZoneResolver for TimeApiResolver {
    async fn zone_id_from_coordinates(
        &self,
        coordinates: &str,
    ) -> Result<String, TransactionError> {
        let (latitude, longitude) = split_coordinates(coordinates)?;

        let mut url = self
            .base_url
            .join("/api/TimeZone/coordinate")
            .map_err(|e| TransactionError::ExternalService(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("latitude", latitude)
            .append_pair("longitude", longitude);

        debug!("Resolving time zone for coordinates '{coordinates}'");
        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<CoordinateZoneResponse>()
            .await?;

        response.time_zone.ok_or_else(|| {
            TransactionError::ExternalService(
                "time zone lookup response did not contain a timeZone field".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn converts_between_fixed_offsets() {
        // January: New York is UTC-5, Berlin is UTC+1 -> 6 hours ahead.
        let converted =
            convert_between_zones(naive(2024, 1, 15, 10, 0), "America/New_York", "Europe/Berlin")
                .unwrap();
        assert_eq!(converted, naive(2024, 1, 15, 16, 0));
    }

    #[test]
    fn round_trips_outside_dst_transitions() {
        let original = naive(2024, 1, 15, 10, 0);
        let there =
            convert_between_zones(original, "America/New_York", "Asia/Tokyo").unwrap();
        let back = convert_between_zones(there, "Asia/Tokyo", "America/New_York").unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn same_zone_is_identity() {
        let original = naive(2024, 6, 1, 12, 30);
        let converted =
            convert_between_zones(original, "Europe/London", "Europe/London").unwrap();
        assert_eq!(converted, original);
    }

    #[test]
    fn gap_time_is_shifted_forward() {
        // 2024-03-10 02:30 does not exist in New York (spring forward).
        let converted = convert_between_zones(
            naive(2024, 3, 10, 2, 30),
            "America/New_York",
            "America/New_York",
        )
        .unwrap();
        assert_eq!(converted, naive(2024, 3, 10, 3, 30));
    }

    #[test]
    fn ambiguous_time_resolves_to_earliest() {
        // 2024-11-03 01:30 occurs twice in New York (fall back); the earliest
        // mapping is EDT (UTC-4), which is 05:30 UTC.
        let converted = convert_between_zones(
            naive(2024, 11, 3, 1, 30),
            "America/New_York",
            "Etc/UTC",
        )
        .unwrap();
        assert_eq!(converted, naive(2024, 11, 3, 5, 30));
    }

    #[test]
    fn unknown_zone_id_is_an_error() {
        let result = convert_between_zones(naive(2024, 1, 1, 0, 0), "Mars/Olympus", "Etc/UTC");
        assert!(matches!(result, Err(TransactionError::ExternalService(_))));
    }

    #[test]
    fn rejects_malformed_coordinates() {
        assert!(split_coordinates("40.7128").is_err());
        assert!(split_coordinates("a, b, c").is_err());
        assert!(split_coordinates("40.7128, -74.0060").is_ok());
    }
}
