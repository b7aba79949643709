use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::domain::{SalaryInsight, SearchQuery};
use super::gateway::JobBoard;

/// Salary histogram lookup. Never fails the pipeline: every error is logged
/// and collapses to `None`.
pub struct SalaryAggregator {
    board: Arc<dyn JobBoard>,
}

impl SalaryAggregator {
    pub fn new(board: Arc<dyn JobBoard>) -> Self {
        Self { board }
    }

    pub async fn salary(&self, query: &SearchQuery) -> Option<SalaryInsight> {
        let payload = match self.board.histogram(query).await {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, country = query.country(), "salary histogram request failed");
                return None;
            }
        };

        match payload.histogram {
            Some(raw) if !raw.is_empty() => {
                let insight = summarize_histogram(raw);
                info!(
                    buckets = insight.histogram.len(),
                    average = ?insight.average,
                    "salary histogram fetched"
                );
                Some(insight)
            }
            _ => {
                info!("no salary histogram data found");
                None
            }
        }
    }
}

pub(crate) fn summarize_histogram(raw: BTreeMap<String, serde_json::Value>) -> SalaryInsight {
    let histogram: BTreeMap<String, u64> = raw
        .into_iter()
        .filter_map(|(bucket, count)| match bucket_count(&count) {
            Some(count) => Some((bucket, count)),
            None => {
                debug!(bucket, count = %count, "dropping histogram bucket with unusable count");
                None
            }
        })
        .collect();
    let average = weighted_average(&histogram);

    SalaryInsight { histogram, average }
}

fn bucket_count(value: &serde_json::Value) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    value
        .as_f64()
        .filter(|count| count.is_finite() && *count >= 0.0 && count.fract() == 0.0)
        .map(|count| count as u64)
}

/// `round(Σ(bucket · count) / Σcount)` over buckets whose key is numeric.
pub fn weighted_average(histogram: &BTreeMap<String, u64>) -> Option<i64> {
    let mut total_salary = 0.0_f64;
    let mut total_count = 0_u64;

    for (bucket, count) in histogram {
        let Some(value) = bucket.trim().parse::<f64>().ok().filter(|v| v.is_finite()) else {
            debug!(bucket, "skipping non-numeric salary bucket");
            continue;
        };
        let Some(next_count) = total_count.checked_add(*count) else {
            warn!(bucket, "salary histogram counts overflow; skipping average");
            return None;
        };
        total_salary += value * *count as f64;
        total_count = next_count;
    }

    (total_count > 0).then(|| (total_salary / total_count as f64).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn histogram(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries
            .iter()
            .map(|(bucket, count)| (bucket.to_string(), *count))
            .collect()
    }

    #[test]
    fn averages_equal_weighted_buckets() {
        let buckets = histogram(&[("30000", 2), ("40000", 2)]);
        assert_eq!(weighted_average(&buckets), Some(35000));
    }

    #[test]
    fn weights_by_count() {
        let buckets = histogram(&[("20000", 1), ("50000", 2)]);
        assert_eq!(weighted_average(&buckets), Some(40000));
    }

    #[test]
    fn non_numeric_buckets_are_skipped() {
        let buckets = histogram(&[("30000", 1), ("unknown", 40), ("50000", 1)]);
        assert_eq!(weighted_average(&buckets), Some(40000));
    }

    #[test]
    fn average_absent_without_numeric_buckets() {
        assert_eq!(weighted_average(&histogram(&[("n/a", 3), ("other", 1)])), None);
        assert_eq!(weighted_average(&histogram(&[("30000", 0)])), None);
        assert_eq!(weighted_average(&BTreeMap::new()), None);
    }

    #[test]
    fn average_stays_within_bucket_bounds() {
        let cases = [
            histogram(&[("10000", 1), ("90000", 7), ("55000", 3)]),
            histogram(&[("25000", 100), ("26000", 1)]),
            histogram(&[("70000", 5)]),
            histogram(&[("15000", 3), ("x", 9), ("120000", 1), ("60000", 0)]),
        ];

        for buckets in cases {
            let numeric: Vec<i64> = buckets
                .iter()
                .filter(|(_, count)| **count > 0)
                .filter_map(|(key, _)| key.parse::<i64>().ok())
                .collect();
            let min = *numeric.iter().min().expect("numeric bucket");
            let max = *numeric.iter().max().expect("numeric bucket");
            let average = weighted_average(&buckets).expect("average present");
            assert!(
                (min..=max).contains(&average),
                "{average} outside [{min}, {max}]"
            );
        }
    }

    #[test]
    fn overflowing_counts_leave_average_absent() {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_value(json!({ "30000": u64::MAX, "40000": 2 })).expect("raw histogram");

        let insight = summarize_histogram(raw);
        assert_eq!(
            insight.histogram,
            histogram(&[("30000", u64::MAX), ("40000", 2)])
        );
        assert_eq!(insight.average, None);
    }

    #[test]
    fn summarize_drops_unusable_counts() {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_value(json!({
            "30000": 2,
            "40000": 2.0,
            "50000": "many",
            "60000": -1,
        }))
        .expect("raw histogram");

        let insight = summarize_histogram(raw);
        assert_eq!(insight.histogram, histogram(&[("30000", 2), ("40000", 2)]));
        assert_eq!(insight.average, Some(35000));
    }
}
