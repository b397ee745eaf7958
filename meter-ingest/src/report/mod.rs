//! Consumption between two dates per house.
//!
//! Each metric's usage is the difference of the first reading found in the hour
//! after `end` and the first reading found in the hour after `start`.

pub mod spreadsheet;
pub mod table;

use std::collections::BTreeMap;

use elvaco_client::{
    domain::{ReportColumn, Series, SeriesClass},
    ApiError, MeteringApi,
};
use time::{Duration, OffsetDateTime};

use crate::filter::{is_eligible, HouseFilter};

pub use spreadsheet::{CsvSpreadsheet, XlsxSpreadsheet};
pub use table::ConsoleTable;

#[derive(thiserror::Error, Debug)]
pub enum DiffError {
    #[error("no reading within one hour after {at}")]
    FetchEmpty { at: OffsetDateTime },
    #[error(transparent)]
    Transport(#[from] ApiError),
}

/// Counter increase of `series_id` between `start` and `end`.
pub async fn range_diff(
    api: &dyn MeteringApi,
    series_id: i64,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<f64, DiffError> {
    let at_start = api
        .fetch_readings(series_id, start, start + Duration::HOUR)
        .await?;
    let at_end = api.fetch_readings(series_id, end, end + Duration::HOUR).await?;

    let first_end = at_end.first().ok_or(DiffError::FetchEmpty { at: end })?;
    let first_start = at_start.first().ok_or(DiffError::FetchEmpty { at: start })?;

    Ok(first_end.value - first_start.value)
}

/// Per-house usage, in report units (kWh and m3).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HouseTotals {
    pub electricity_kwh: f64,
    pub heat_kwh: f64,
    pub cold_water_m3: f64,
    pub hot_water_m3: f64,
}

impl HouseTotals {
    pub fn set(&mut self, column: ReportColumn, value: f64) {
        match column {
            ReportColumn::Electricity => self.electricity_kwh = value,
            ReportColumn::Heat => self.heat_kwh = value,
            ReportColumn::ColdWater => self.cold_water_m3 = value,
            ReportColumn::HotWater => self.hot_water_m3 = value,
        }
    }
}

/// House code to totals, ordered by code.
pub type UsageReport = BTreeMap<String, HouseTotals>;

/// Something that can present a finished usage report.
pub trait ReportEmitter {
    fn emit(&self, report: &UsageReport) -> anyhow::Result<()>;
}

/// Builds the usage report from the catalog.
///
/// A house row appears as soon as one eligible series sits in it. A metric whose
/// diff fails is logged and left at zero, the other series are still computed.
pub async fn build_usage_report(
    api: &dyn MeteringApi,
    catalog: &[Series],
    filter: &HouseFilter,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> UsageReport {
    let mut report = UsageReport::new();

    for series in catalog.iter().filter(|s| is_eligible(s, filter)) {
        let class = SeriesClass::of(series);
        let totals = report.entry(series.source_position.clone()).or_default();

        let Some(column) = class.report_column else {
            continue;
        };

        match range_diff(api, series.measurement_serie_id, start, end).await {
            Ok(diff) => totals.set(column, column.to_report_unit(diff)),
            Err(e) => {
                metrics::counter!("report_metric_errors_total").increment(1);
                tracing::error!(
                    error = %e,
                    house = %series.source_position,
                    metric = %class.metric,
                    series_id = series.measurement_serie_id,
                    "could not compute usage, leaving it at zero"
                );
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reading, series, FakeApi};
    use time::macros::datetime;

    const START: OffsetDateTime = datetime!(2015-01-01 00:00:00 UTC);
    const END: OffsetDateTime = datetime!(2015-02-01 00:00:00 UTC);

    fn counter(first: f64, last: f64) -> Vec<elvaco_client::domain::Reading> {
        vec![
            reading(START, first),
            reading(START + Duration::minutes(30), first + 0.5),
            reading(END + Duration::minutes(10), last),
            reading(END + Duration::minutes(40), last + 1.0),
        ]
    }

    #[tokio::test]
    async fn diff_uses_first_reading_of_each_window() {
        let api = FakeApi::default().with_readings(1, counter(100.0, 150.0));

        let diff = range_diff(&api, 1, START, END).await.unwrap();

        assert_eq!(diff, 50.0);
        assert_eq!(
            api.fetches(),
            vec![(1, START, START + Duration::HOUR), (1, END, END + Duration::HOUR)]
        );
    }

    #[tokio::test]
    async fn empty_end_window_is_fetch_empty() {
        let api = FakeApi::default().with_readings(1, vec![reading(START, 1.0)]);

        let err = range_diff(&api, 1, START, END).await.unwrap_err();
        assert!(matches!(err, DiffError::FetchEmpty { at } if at == END));
    }

    #[tokio::test]
    async fn empty_start_window_is_fetch_empty() {
        let api = FakeApi::default().with_readings(1, vec![reading(END, 1.0)]);

        let err = range_diff(&api, 1, START, END).await.unwrap_err();
        assert!(matches!(err, DiffError::FetchEmpty { at } if at == START));
    }

    #[tokio::test]
    async fn transport_failure_is_surfaced() {
        let api = FakeApi::default().failing_on(1);

        let err = range_diff(&api, 1, START, END).await.unwrap_err();
        assert!(matches!(err, DiffError::Transport(_)));
    }

    #[tokio::test]
    async fn report_fills_columns_and_converts_heat() {
        let catalog = vec![
            series(1, "103", "electricity", "energy", "kWh"),
            series(2, "103", "heat", "energy", "Wh"),
            series(3, "103", "water", "volume", "m3"),
            series(4, "103", "warm water (30°C-90°C)", "volume", "m3"),
            series(5, "205", "heat", "volume flow", "m3/h"),
        ];
        let api = FakeApi::default()
            .with_readings(1, counter(1000.0, 1250.5))
            .with_readings(2, counter(20_000.0, 25_000.0))
            .with_readings(3, counter(10.0, 12.25))
            .with_readings(4, counter(3.0, 4.0));

        let report = build_usage_report(&api, &catalog, &HouseFilter::parse("all"), START, END).await;

        assert_eq!(report.len(), 2);
        assert_eq!(
            report["103"],
            HouseTotals {
                electricity_kwh: 250.5,
                heat_kwh: 5.0,
                cold_water_m3: 2.25,
                hot_water_m3: 1.0,
            }
        );
        // house row exists even though none of its series feeds a column
        assert_eq!(report["205"], HouseTotals::default());
        assert!(api.fetches().iter().all(|(id, _, _)| *id != 5));
    }

    #[tokio::test]
    async fn failing_metric_stays_zero_and_others_continue() {
        let catalog = vec![
            series(1, "101", "electricity", "energy", "kWh"),
            series(2, "101", "water", "volume", "m3"),
            series(3, "102", "water", "volume", "m3"),
        ];
        let api = FakeApi::default()
            .with_readings(2, counter(5.0, 7.0))
            .with_readings(3, vec![reading(START, 1.0)]);

        let report = build_usage_report(&api, &catalog, &HouseFilter::parse("101,102"), START, END).await;

        assert_eq!(report["101"].electricity_kwh, 0.0);
        assert_eq!(report["101"].cold_water_m3, 2.0);
        assert_eq!(report["102"], HouseTotals::default());
    }

    #[tokio::test]
    async fn houses_outside_filter_are_ignored() {
        let catalog = vec![
            series(1, "101", "electricity", "energy", "kWh"),
            series(2, "301", "electricity", "energy", "kWh"),
        ];
        let api = FakeApi::default()
            .with_readings(1, counter(0.0, 1.0))
            .with_readings(2, counter(0.0, 2.0));

        let report = build_usage_report(&api, &catalog, &HouseFilter::parse("101"), START, END).await;

        assert_eq!(report.keys().collect::<Vec<_>>(), ["101"]);
    }
}
