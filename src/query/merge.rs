//! Index-wise merge of per-device series
//!
//! When a data stream resolves to several devices, their series are merged
//! position by position through the stream's aggregation function. Devices
//! are expected to report on aligned timestamps; the merged point carries
//! the first contributing device's timestamp (documented compatibility
//! decision, see DESIGN.md).

use crate::types::{AggregationFunction, Point};

/// Merge per-device series index-wise through `function`
///
/// Empty series contribute nothing; the merge runs up to the shortest
/// non-empty series. With zero or one non-empty series the function is not
/// applied: the single series (or nothing) passes through.
pub fn merge_series(series: Vec<Vec<Point>>, function: AggregationFunction) -> Vec<Point> {
    let mut contributing: Vec<Vec<Point>> = series.into_iter().filter(|s| !s.is_empty()).collect();

    match contributing.len() {
        0 => Vec::new(),
        1 => contributing.pop().unwrap_or_default(),
        _ => {
            let len = contributing.iter().map(Vec::len).min().unwrap_or(0);
            let mut merged = Vec::with_capacity(len);
            let mut values = Vec::with_capacity(contributing.len());

            for i in 0..len {
                values.clear();
                values.extend(contributing.iter().map(|s| s[i].value));
                if let Some(value) = function.apply(&values) {
                    merged.push(Point::new(value, contributing[0][i].timestamp));
                }
            }
            merged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(f64, i64)]) -> Vec<Point> {
        points.iter().map(|&(v, t)| Point::new(v, t)).collect()
    }

    #[test]
    fn test_three_device_merge() {
        let devices = vec![
            series(&[(1.11, 1_111_111), (1.22, 2_222_222)]),
            series(&[(1.112, 1_111_111), (1.222, 2_222_222)]),
            series(&[(1.113, 1_111_111), (1.223, 2_222_222)]),
        ];

        let max = merge_series(devices.clone(), AggregationFunction::Max);
        assert_eq!(max, series(&[(1.113, 1_111_111), (1.223, 2_222_222)]));

        let min = merge_series(devices.clone(), AggregationFunction::Min);
        assert_eq!(min, series(&[(1.11, 1_111_111), (1.22, 2_222_222)]));

        let sum = merge_series(devices.clone(), AggregationFunction::Sum);
        assert!((sum[0].value - 3.335).abs() < 0.001);
        assert!((sum[1].value - 3.665).abs() < 0.001);

        let avg = merge_series(devices.clone(), AggregationFunction::Avg);
        assert!((avg[0].value - 1.1117).abs() < 0.001);
        assert!((avg[1].value - 1.2217).abs() < 0.001);

        let median = merge_series(devices, AggregationFunction::Median);
        assert_eq!(median, series(&[(1.112, 1_111_111), (1.222, 2_222_222)]));
    }

    #[test]
    fn test_single_series_passes_through() {
        let only = series(&[(5.0, 10), (6.0, 20)]);
        let merged = merge_series(vec![only.clone()], AggregationFunction::Max);
        assert_eq!(merged, only);
    }

    #[test]
    fn test_empty_series_do_not_blank_merge() {
        let devices = vec![
            series(&[(1.0, 10), (2.0, 20)]),
            Vec::new(),
            series(&[(3.0, 10), (4.0, 20)]),
        ];
        let merged = merge_series(devices, AggregationFunction::Max);
        assert_eq!(merged, series(&[(3.0, 10), (4.0, 20)]));
    }

    #[test]
    fn test_unequal_lengths_merge_to_shortest() {
        let devices = vec![
            series(&[(1.0, 10), (2.0, 20), (3.0, 30)]),
            series(&[(10.0, 10), (20.0, 20)]),
        ];
        let merged = merge_series(devices, AggregationFunction::Sum);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].value, 11.0);
        assert_eq!(merged[1].value, 22.0);
    }

    #[test]
    fn test_merged_timestamp_from_first_contributor() {
        let devices = vec![series(&[(1.0, 100)]), series(&[(2.0, 999)])];
        let merged = merge_series(devices, AggregationFunction::Avg);
        assert_eq!(merged[0].timestamp, 100);
    }

    #[test]
    fn test_all_empty() {
        assert!(merge_series(vec![Vec::new(), Vec::new()], AggregationFunction::Sum).is_empty());
        assert!(merge_series(Vec::new(), AggregationFunction::Sum).is_empty());
    }
}
