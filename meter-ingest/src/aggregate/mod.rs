use std::sync::Arc;

use elvaco_client::{
    domain::{Point, PointBatch, PointKind, Reading, Series, SeriesClass},
    MeteringApi,
};
use futures::Stream;
use time::{Duration, OffsetDateTime};

use crate::{
    clock::Clock,
    pipeline::{Envelope, PipelineError},
};

/// Readings in a complete day of hourly samples: both midnights plus the 23 hours between.
pub const FULL_DAY_READINGS: usize = 25;

/// Suffix of the metric a day's consumption is written under.
pub const DAILY_SUFFIX: &str = "_daily";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Advancing,
    Done,
}

/// Day-by-day cursor over `[start, now)`. Only hands out days that have fully elapsed.
#[derive(Debug, Clone)]
pub struct DailyWindow {
    cursor: OffsetDateTime,
    state: WindowState,
}

impl DailyWindow {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            cursor: start,
            state: WindowState::Advancing,
        }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Next `(day_start, day_end)` window, or `None` once the day ending after `now`
    /// is reached. `Done` is terminal.
    pub fn advance(&mut self, now: OffsetDateTime) -> Option<(OffsetDateTime, OffsetDateTime)> {
        if self.state == WindowState::Done {
            return None;
        }

        let next = match self.cursor.checked_add(Duration::DAY) {
            Some(next) if next <= now => next,
            _ => {
                self.state = WindowState::Done;
                return None;
            }
        };

        let window = (self.cursor, next);
        self.cursor = next;
        Some(window)
    }
}

/// Turns one day of readings into points.
///
/// Cumulative metrics get a `_daily` delta (last minus first reading) dated at the
/// start of the day, but only for a complete day. Every valid reading becomes a raw point.
pub fn build_day_batch(
    series: &Series,
    class: &SeriesClass,
    day: OffsetDateTime,
    readings: &[Reading],
) -> PointBatch {
    let house = &series.source_position;
    let mut points = Vec::with_capacity(readings.len() + 1);

    if class.kind.is_cumulative() && readings.len() == FULL_DAY_READINGS {
        if let (Some(first), Some(last)) = (readings.first(), readings.last()) {
            points.push(Point {
                ts: day,
                metric: format!("{}{}", class.metric, DAILY_SUFFIX),
                house: house.clone(),
                value: last.value - first.value,
                kind: PointKind::DailyDelta,
            });
        }
    }

    let mut discarded = 0u64;
    for reading in readings {
        tracing::trace!(
            metric = %class.metric,
            ts = %reading.effective_date,
            value = reading.value,
            "reading"
        );

        if !reading.is_valid() {
            discarded += 1;
            continue;
        }

        points.push(Point {
            ts: reading.effective_date,
            metric: class.metric.clone(),
            house: house.clone(),
            value: reading.value,
            kind: PointKind::Raw,
        });
    }

    if discarded > 0 {
        metrics::counter!("elvaco_readings_discarded_total").increment(discarded);
    }

    PointBatch {
        series_id: series.measurement_serie_id,
        day,
        points,
    }
}

/// Walks `series` from `start` up to the last fully elapsed day, one fetch per day,
/// yielding each day's batch as soon as it is built.
///
/// A failed fetch yields an error item for that day and the walk moves on.
pub fn daily_batches(
    api: Arc<dyn MeteringApi>,
    clock: Arc<dyn Clock>,
    series: Series,
    start: OffsetDateTime,
) -> impl Stream<Item = Result<Envelope<PointBatch>, PipelineError>> + Send {
    async_stream::stream! {
        let class = SeriesClass::of(&series);
        let mut window = DailyWindow::new(start);

        while let Some((day, next)) = window.advance(clock.now()) {
            let readings = match api
                .fetch_readings(series.measurement_serie_id, day, next)
                .await
            {
                Ok(readings) => readings,
                Err(e) => {
                    metrics::counter!("elvaco_fetch_errors_total").increment(1);
                    yield Err(PipelineError::Source(format!(
                        "series {} ({}, house {}) day {}: {e}",
                        series.measurement_serie_id, class.metric, series.source_position, day
                    )));
                    continue;
                }
            };

            tracing::debug!(
                series_id = series.measurement_serie_id,
                metric = %class.metric,
                day = %day,
                readings = readings.len(),
                "fetched day"
            );

            yield Ok(Envelope::now(build_day_batch(&series, &class, day, &readings)));
        }
    }
}
