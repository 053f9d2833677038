//! Timestamp bucketing for deduplicated time-series writes.

use chrono::{DateTime, Utc};

/// Default bucket width for listing price snapshots, in seconds.
pub const DEFAULT_BUCKET_SECS: i64 = 60;

/// Truncate a timestamp to the start of its enclosing fixed-width bucket.
///
/// The bucket forms part of the identity of time-series rows, so repeated
/// polls landing inside the same interval overwrite a single row instead of
/// accumulating near-duplicates.
pub fn bucket_timestamp(ts: DateTime<Utc>, width_secs: i64) -> DateTime<Utc> {
    let width = width_secs.max(1);
    let secs = ts.timestamp();
    let floored = secs - secs.rem_euclid(width);
    DateTime::from_timestamp(floored, 0).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_truncates_to_minute_start() {
        // 2024-01-01T00:00:59Z floors to 00:00:00
        let t = DateTime::from_timestamp(1_704_067_259, 500_000_000).unwrap();
        assert_eq!(bucket_timestamp(t, 60), ts(1_704_067_200));
    }

    #[test]
    fn test_same_bucket_for_nearby_polls() {
        let t1 = ts(1_704_067_201);
        let t2 = ts(1_704_067_259);
        assert_eq!(bucket_timestamp(t1, 60), bucket_timestamp(t2, 60));
    }

    #[test]
    fn test_different_buckets_across_boundary() {
        let t1 = ts(1_704_067_259);
        let t2 = ts(1_704_067_260);
        assert_ne!(bucket_timestamp(t1, 60), bucket_timestamp(t2, 60));
    }

    #[test]
    fn test_bucket_start_is_fixed_point() {
        let t = ts(1_704_067_200);
        assert_eq!(bucket_timestamp(t, 60), t);
    }

    #[test]
    fn test_custom_width() {
        let t = ts(1_704_067_250);
        assert_eq!(bucket_timestamp(t, 300), ts(1_704_067_200));
    }
}
