// Alignment of independently timed series onto one shared time axis
use crate::domain::telemetry::{MergedRow, Sample};

/// Value of `series` at `time`: held flat before the first and after the
/// last sample, linearly interpolated in between. `series` must be sorted
/// by time and non-empty.
pub fn lerp_for_time(series: &[Sample], time: f64) -> f64 {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return f64::NAN;
    };
    if time <= first.time {
        return first.value;
    }
    if time >= last.time {
        return last.value;
    }

    // 0 < idx < len for sorted, finite times; a NaN anywhere breaks that.
    let idx = series.partition_point(|s| s.time < time);
    let (Some(a), Some(b)) = (idx.checked_sub(1).and_then(|i| series.get(i)), series.get(idx)) else {
        return first.value;
    };
    if b.time == time {
        return b.value;
    }
    a.value + (b.value - a.value) * (time - a.time) / (b.time - a.time)
}

/// Merge series into rows of `[time, v1, v2, ...]` over the sorted union of
/// their finite timestamps. Empty inputs contribute no column; a single
/// non-empty input is passed through unchanged.
pub fn merge(series_list: &[&[Sample]]) -> Vec<MergedRow> {
    let non_empty: Vec<&[Sample]> = series_list.iter().copied().filter(|s| !s.is_empty()).collect();

    match non_empty.len() {
        0 => {
            tracing::debug!("Merge called with {} empty series", series_list.len());
            return Vec::new();
        }
        1 => {
            tracing::debug!(
                "Merge called with a single non-empty series out of {}",
                series_list.len()
            );
            return non_empty[0]
                .iter()
                .filter(|s| s.time.is_finite())
                .map(|s| MergedRow::new(s.time, vec![s.value]))
                .collect();
        }
        n if n < series_list.len() => {
            tracing::debug!("Merging {} series, skipping {} empty", n, series_list.len() - n);
        }
        _ => {}
    }

    let mut times: Vec<f64> = non_empty
        .iter()
        .flat_map(|s| s.iter().map(|p| p.time))
        .filter(|t| t.is_finite())
        .collect();
    times.sort_by(f64::total_cmp);
    times.dedup();

    times
        .into_iter()
        .map(|time| {
            let values = non_empty.iter().map(|s| lerp_for_time(s, time)).collect();
            MergedRow::new(time, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(pairs: &[(f64, f64)]) -> Vec<Sample> {
        pairs.iter().copied().map(Sample::from).collect()
    }

    #[test]
    fn test_lerp_for_time() {
        let s = series(&[(1.0, 3.0), (3.0, 4.0), (5.0, 6.0)]);
        assert_eq!(lerp_for_time(&s, 0.0), 3.0);
        assert_eq!(lerp_for_time(&s, 2.0), 3.5);
        assert_eq!(lerp_for_time(&s, 3.0), 4.0);
        assert_eq!(lerp_for_time(&s, 4.0), 5.0);
        assert_eq!(lerp_for_time(&s, 9.0), 6.0);
        assert!(lerp_for_time(&[], 1.0).is_nan());
    }

    #[test]
    fn test_merge_alignment() {
        let a = series(&[(1.0, 3.0), (3.0, 4.0), (5.0, 6.0)]);
        let b = series(&[(1.0, 1.0), (2.0, 2.0)]);
        let rows = merge(&[a.as_slice(), b.as_slice()]);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], MergedRow::new(1.0, vec![3.0, 1.0]));
        assert_eq!(rows[1], MergedRow::new(2.0, vec![3.5, 2.0]));
        assert_eq!(rows[2], MergedRow::new(3.0, vec![4.0, 2.0]));
        assert_eq!(rows[3], MergedRow::new(5.0, vec![6.0, 2.0]));
    }

    #[test]
    fn test_merge_degenerate_inputs() {
        let a = series(&[(1.0, 3.0), (2.0, 5.0)]);
        let empty: Vec<Sample> = Vec::new();

        let rows = merge(&[empty.as_slice(), a.as_slice()]);
        assert_eq!(rows, vec![MergedRow::new(1.0, vec![3.0]), MergedRow::new(2.0, vec![5.0])]);

        assert!(merge(&[empty.as_slice(), empty.as_slice()]).is_empty());
        assert!(merge(&[]).is_empty());
    }

    #[test]
    fn test_nan_times_do_not_panic() {
        let live = series(&[(0.0, 1.0), (1.0, 3.0)]);
        let loaded = series(&[(0.0, 1.0), (f64::NAN, 2.0)]);

        assert!(lerp_for_time(&loaded, f64::NAN).is_finite());
        let rows = merge(&[live.as_slice(), loaded.as_slice()]);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.time.is_finite()));
        assert_eq!(rows[1].values[0], 3.0);

        let rows = merge(&[loaded.as_slice()]);
        assert_eq!(rows, vec![MergedRow::new(0.0, vec![1.0])]);
    }

    #[test]
    fn test_merge_three_series() {
        let a = series(&[(0.0, 0.0), (2.0, 2.0)]);
        let b = series(&[(1.0, 10.0)]);
        let c = series(&[(0.5, 5.0), (1.5, 7.0)]);
        let rows = merge(&[a.as_slice(), b.as_slice(), c.as_slice()]);

        let times: Vec<f64> = rows.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(rows[2].values, vec![1.0, 10.0, 6.0]);
        assert!(rows.iter().all(|r| r.values.len() == 3));
    }
}
