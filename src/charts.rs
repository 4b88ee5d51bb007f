//! Aggregation and chart inputs.
//!
//! The dashboard shows five fixed descriptive charts. Each chart's values
//! are column-wise arithmetic means over the currently filtered row subset,
//! rounded to two decimals. This module computes chart *inputs* (label/value
//! pairs plus chart-kind metadata); rendering belongs to whatever front end
//! consumes the view model.

use serde::Serialize;

use crate::columns;
use crate::error::DashboardError;
use crate::table::TableSlice;

/// How a chart's points are meant to be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Pie,
    HorizontalBar,
    Radar,
}

/// Static description of one dashboard chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartSpec {
    pub id: &'static str,
    pub kind: ChartKind,
    pub labels: &'static [&'static str],
    /// Fixed axis range, used by the radar charts.
    pub axis_range: Option<(f64, f64)>,
}

/// Sleep-time pie chart id; its third slice gets the double-count correction.
pub const SLEEP_TIME_CHART: &str = "sleep_time";

/// The five dashboard charts, in layout order.
pub const CHART_SPECS: [ChartSpec; 5] = [
    ChartSpec {
        id: SLEEP_TIME_CHART,
        kind: ChartKind::Pie,
        labels: &columns::SLEEP_TIME_LABELS,
        axis_range: None,
    },
    ChartSpec {
        id: "distance_steps",
        kind: ChartKind::HorizontalBar,
        labels: &columns::DISTANCE_STEP_LABELS,
        axis_range: None,
    },
    ChartSpec {
        id: "activity_time",
        kind: ChartKind::HorizontalBar,
        labels: &columns::ACTIVITY_TIME_LABELS,
        axis_range: None,
    },
    ChartSpec {
        id: "activity_score",
        kind: ChartKind::Radar,
        labels: &columns::ACTIVITY_SCORE_LABELS,
        axis_range: Some((0.0, 100.0)),
    },
    ChartSpec {
        id: "sleep_score",
        kind: ChartKind::Radar,
        labels: &columns::SLEEP_SCORE_LABELS,
        axis_range: Some((0.0, 100.0)),
    },
];

/// One labeled chart value. `None` means the filtered subset was empty and
/// the point renders blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: Option<f64>,
}

/// Computed inputs for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub id: String,
    pub kind: ChartKind,
    pub points: Vec<ChartPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis_range: Option<(f64, f64)>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute one chart's values over a filtered slice.
pub fn build_chart(
    slice: &TableSlice<'_>,
    spec: &ChartSpec,
) -> Result<ChartData, DashboardError> {
    let mut values = Vec::with_capacity(spec.labels.len());
    for label in spec.labels {
        values.push(slice.mean(label)?.map(round2));
    }

    if spec.id == SLEEP_TIME_CHART {
        // 잠 시간 counts deep and REM sleep inside the total; subtract both
        // so the pie slices do not double-count the overlap.
        if let (Some(deep), Some(rem), Some(total)) = (values[0], values[1], values[2]) {
            values[2] = Some(round2(total - deep - rem));
        }
    }

    let points = spec
        .labels
        .iter()
        .zip(values)
        .map(|(label, value)| ChartPoint {
            label: (*label).to_string(),
            value,
        })
        .collect();

    Ok(ChartData {
        id: spec.id.to_string(),
        kind: spec.kind,
        points,
        axis_range: spec.axis_range,
    })
}

/// Compute all five dashboard charts over a filtered slice.
pub fn build_all_charts(slice: &TableSlice<'_>) -> Result<Vec<ChartData>, DashboardError> {
    CHART_SPECS
        .iter()
        .map(|spec| build_chart(slice, spec))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{DateFilter, RecordTable};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sleep_time_table(rows: &[(f64, f64, f64)]) -> RecordTable {
        let mut csv = format!(
            "{},{},{},{},{}\n",
            columns::IDENTITY,
            columns::SUMMARY_DATE,
            columns::DEEP_SLEEP_TIME,
            columns::REM_SLEEP_TIME,
            columns::TOTAL_SLEEP_TIME
        );
        for (i, (deep, rem, total)) in rows.iter().enumerate() {
            csv.push_str(&format!(
                "a@x.com,2024-01-{:02},{deep},{rem},{total}\n",
                i + 1
            ));
        }
        RecordTable::from_reader(csv.as_bytes()).unwrap()
    }

    /// Table carrying every chart column, each filled with the same value.
    fn full_chart_table(value: f64) -> RecordTable {
        let mut header = format!("{},{}", columns::IDENTITY, columns::SUMMARY_DATE);
        let mut labels = Vec::new();
        for spec in &CHART_SPECS {
            for label in spec.labels {
                if !labels.contains(label) {
                    labels.push(*label);
                }
            }
        }
        for label in &labels {
            header.push(',');
            header.push_str(label);
        }
        let mut csv = header;
        csv.push('\n');
        csv.push_str("a@x.com,2024-01-01");
        for _ in &labels {
            csv.push_str(&format!(",{value}"));
        }
        csv.push('\n');
        RecordTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn pie_third_slice_subtracts_the_overlapping_stages() {
        let table = sleep_time_table(&[(1.0, 2.0, 5.0)]);
        let slice = table.filter("a@x.com", DateFilter::All);
        let chart = build_chart(&slice, &CHART_SPECS[0]).unwrap();
        let values: Vec<Option<f64>> = chart.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(2.0)]);
    }

    #[test]
    fn means_are_rounded_to_two_decimals() {
        let table = sleep_time_table(&[(1.111, 2.0, 7.0), (2.222, 2.0, 7.0)]);
        let slice = table.filter("a@x.com", DateFilter::All);
        let chart = build_chart(&slice, &CHART_SPECS[0]).unwrap();
        // mean(1.111, 2.222) = 1.6665 -> 1.67
        assert_eq!(chart.points[0].value, Some(1.67));
    }

    #[test]
    fn empty_subset_yields_blank_points() {
        let table = sleep_time_table(&[(1.0, 2.0, 5.0)]);
        let missing_day = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let slice = table.filter("a@x.com", DateFilter::On(missing_day));
        let chart = build_chart(&slice, &CHART_SPECS[0]).unwrap();
        assert!(chart.points.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn chart_column_missing_from_the_file_is_an_error() {
        let table = sleep_time_table(&[(1.0, 2.0, 5.0)]);
        let slice = table.filter("a@x.com", DateFilter::All);
        // The distance/steps chart references columns this file lacks.
        let err = build_chart(&slice, &CHART_SPECS[1]).unwrap_err();
        assert!(matches!(err, DashboardError::UnknownColumn(_)));
    }

    #[test]
    fn all_five_charts_come_back_in_layout_order() {
        let table = full_chart_table(50.0);
        let slice = table.filter("a@x.com", DateFilter::All);
        let charts = build_all_charts(&slice).unwrap();

        let ids: Vec<&str> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "sleep_time",
                "distance_steps",
                "activity_time",
                "activity_score",
                "sleep_score"
            ]
        );
        assert_eq!(charts[0].kind, ChartKind::Pie);
        assert_eq!(charts[1].kind, ChartKind::HorizontalBar);
        assert_eq!(charts[3].kind, ChartKind::Radar);
        assert_eq!(charts[3].axis_range, Some((0.0, 100.0)));
        assert_eq!(charts[4].points.len(), 6);
        // Uniform 50s everywhere; the pie's third slice becomes 50-50-50.
        assert_eq!(charts[0].points[2].value, Some(-50.0));
        assert_eq!(charts[3].points[0].value, Some(50.0));
    }
}
