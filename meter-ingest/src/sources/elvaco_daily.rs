use std::sync::Arc;

use elvaco_client::{
    domain::{PointBatch, Series, SeriesClass},
    MeteringApi,
};
use futures::StreamExt;
use time::OffsetDateTime;

use crate::{
    aggregate::daily_batches,
    clock::Clock,
    filter::{is_eligible, HouseFilter},
    pipeline::{EnvelopeStream, Source},
};

/// Day-by-day readings of every eligible series in the catalog, one series after
/// the other. A day whose fetch fails is reported as an error item and skipped.
pub struct ElvacoDailySource {
    api: Arc<dyn MeteringApi>,
    clock: Arc<dyn Clock>,
    catalog: Vec<Series>,
    filter: HouseFilter,
    start: OffsetDateTime,
}

impl ElvacoDailySource {
    pub fn new(
        api: Arc<dyn MeteringApi>,
        clock: Arc<dyn Clock>,
        catalog: Vec<Series>,
        filter: HouseFilter,
        start: OffsetDateTime,
    ) -> Self {
        Self {
            api,
            clock,
            catalog,
            filter,
            start,
        }
    }
}

#[async_trait::async_trait]
impl Source<PointBatch> for ElvacoDailySource {
    async fn stream(&self) -> EnvelopeStream<PointBatch> {
        let api = self.api.clone();
        let clock = self.clock.clone();
        let catalog = self.catalog.clone();
        let filter = self.filter.clone();
        let start = self.start;

        let s = async_stream::stream! {
            for series in catalog {
                if !is_eligible(&series, &filter) {
                    metrics::counter!("elvaco_series_skipped_total").increment(1);
                    continue;
                }

                let class = SeriesClass::of(&series);
                tracing::info!(
                    series_id = series.measurement_serie_id,
                    house = %series.source_position,
                    metric = %class.metric,
                    kind = ?class.kind,
                    start = %start,
                    "ingesting series"
                );

                let mut days = Box::pin(daily_batches(api.clone(), clock.clone(), series, start));
                while let Some(item) = days.next().await {
                    yield item;
                }
            }
        };

        Box::pin(s)
    }
}
