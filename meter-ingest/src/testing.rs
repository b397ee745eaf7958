use std::{collections::HashMap, sync::Mutex};

use elvaco_client::{
    domain::{Reading, Series},
    ApiError, MeteringApi,
};
use time::{Duration, OffsetDateTime};

/// In-memory metering API: serves readings by window and records every fetch.
/// Like the device, it also returns the sample sitting exactly on the closing
/// boundary, which is what makes a complete hourly day 25 readings long.
#[derive(Default)]
pub struct FakeApi {
    pub series: Vec<Series>,
    pub readings: HashMap<i64, Vec<Reading>>,
    pub failing: Vec<i64>,
    pub calls: Mutex<Vec<(i64, OffsetDateTime, OffsetDateTime)>>,
}

impl FakeApi {
    pub fn with_readings(mut self, series_id: i64, readings: Vec<Reading>) -> Self {
        self.readings.insert(series_id, readings);
        self
    }

    pub fn failing_on(mut self, series_id: i64) -> Self {
        self.failing.push(series_id);
        self
    }

    pub fn fetches(&self) -> Vec<(i64, OffsetDateTime, OffsetDateTime)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MeteringApi for FakeApi {
    async fn list_series(&self) -> Result<Vec<Series>, ApiError> {
        Ok(self.series.clone())
    }

    async fn fetch_readings(
        &self,
        series_id: i64,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Reading>, ApiError> {
        self.calls.lock().unwrap().push((series_id, from, to));

        if self.failing.contains(&series_id) {
            return Err(ApiError::Status {
                url: format!("fake://{series_id}"),
                status: 503,
            });
        }

        Ok(self
            .readings
            .get(&series_id)
            .map(|all| {
                all.iter()
                    .filter(|r| r.effective_date >= from && r.effective_date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn reading(ts: OffsetDateTime, value: f64) -> Reading {
    Reading {
        value,
        effective_date: ts,
        status: 0,
        numeric: true,
    }
}

/// `count` valid hourly readings starting at `start`, value growing by `step`.
pub fn hourly(start: OffsetDateTime, count: usize, first: f64, step: f64) -> Vec<Reading> {
    (0..count)
        .map(|i| reading(start + Duration::hours(i as i64), first + step * i as f64))
        .collect()
}

pub fn series(id: i64, position: &str, device: &str, unit_type: &str, unit: &str) -> Series {
    Series {
        measurement_serie_id: id,
        source_position: position.to_string(),
        device_type_string: device.to_string(),
        unit_type_string: unit_type.to_string(),
        unit_string: unit.to_string(),
        api_identifier: "1.8.0.0.0.0".to_string(),
        ..Default::default()
    }
}
