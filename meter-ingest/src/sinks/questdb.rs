use std::time::Duration;

use elvaco_client::domain::PointBatch;
use futures::StreamExt;
use sqlx::{postgres::PgPool, Postgres, QueryBuilder};

use crate::pipeline::{Envelope, PipelineError, Sink};

/// Inserts each day batch into QuestDB over pgwire.
pub struct QuestDbSink {
    pool: PgPool,
    table: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl QuestDbSink {
    /// `table` is spliced into the statement, callers must pass a validated identifier.
    pub fn new(pool: PgPool, table: impl Into<String>, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            pool,
            table: table.into(),
            max_retries,
            retry_backoff,
        }
    }

    async fn flush_batch(&self, env: &Envelope<PointBatch>) -> Result<(), PipelineError> {
        let batch = &env.payload;
        if batch.is_empty() {
            return Ok(());
        }

        let mut attempt: u32 = 0;
        loop {
            let res = self.insert_batch(batch).await;
            match res {
                Ok(()) => {
                    metrics::counter!("questdb_ingested_records_total").increment(batch.len() as u64);

                    if let Ok(dur) = std::time::SystemTime::now().duration_since(env.received_at) {
                        metrics::histogram!("ingest_end_to_end_latency_seconds").record(dur.as_secs_f64());
                    }

                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "questdb sink flush failed, retrying with backoff"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, series_id = batch.series_id, day = %batch.day, "questdb sink flush failed, giving up");
                    metrics::counter!("questdb_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }
    }

    async fn insert_batch(&self, batch: &PointBatch) -> Result<(), sqlx::Error> {
        let mut builder = insert_statement(&self.table, batch);
        let query = builder.build();
        query.execute(&self.pool).await.map(|_| ())
    }
}

fn insert_statement<'a>(table: &str, batch: &'a PointBatch) -> QueryBuilder<'a, Postgres> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("INSERT INTO {table} (ts, metric, house, value) "));

    builder.push_values(&batch.points, |mut b, p| {
        b.push_bind(p.ts)
            .push_bind(&p.metric)
            .push_bind(&p.house)
            .push_bind(p.value);
    });

    builder
}

#[async_trait::async_trait]
impl Sink<PointBatch> for QuestDbSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<PointBatch>, PipelineError>> + Send + Unpin + 'static,
    {
        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream pipeline for QuestDbSink");
                    continue;
                }
            };

            self.flush_batch(&env).await?;
        }

        Ok(())
    }
}
