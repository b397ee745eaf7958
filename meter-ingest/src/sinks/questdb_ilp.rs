use std::{
    net::SocketAddr,
    time::{Duration, SystemTime},
};

use elvaco_client::domain::{Point, PointBatch};
use futures::StreamExt;
use time::OffsetDateTime;
use tokio::{io::AsyncWriteExt, net::TcpStream};

use crate::pipeline::{Envelope, PipelineError, Sink};

/// Escape measurement/tag keys/tag values/field keys for ILP.
///
/// ILP requires escaping commas, spaces and equals with a backslash.
fn ilp_escape_ident(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            ',' | ' ' | '=' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
}

fn push_tag(out: &mut String, key: &str, value: &str) {
    out.push(',');
    ilp_escape_ident(key, out);
    out.push('=');
    ilp_escape_ident(value, out);
}

fn ts_to_unix_nanos(ts: OffsetDateTime) -> i128 {
    ts.unix_timestamp_nanos()
}

pub trait IlpEncode {
    fn write_ilp_line(&self, table: &str, out: &mut String);
}

impl IlpEncode for Point {
    /// `{table},metric={metric},house={house} value={value} {nanos}`
    fn write_ilp_line(&self, table: &str, out: &mut String) {
        ilp_escape_ident(table, out);

        // tags (SYMBOL columns)
        push_tag(out, "metric", &self.metric);
        push_tag(out, "house", &self.house);

        out.push_str(" value=");
        out.push_str(&self.value.to_string());

        out.push(' ');
        out.push_str(&ts_to_unix_nanos(self.ts).to_string());
    }
}

/// Writes each day batch to QuestDB over one ILP/TCP connection held for the whole run.
pub struct QuestDbIlpSink {
    addr: SocketAddr,
    table: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl QuestDbIlpSink {
    pub fn new(addr: SocketAddr, table: impl Into<String>, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            addr,
            table: table.into(),
            max_retries,
            retry_backoff,
        }
    }

    async fn connect(&self) -> Result<TcpStream, PipelineError> {
        let stream = TcpStream::connect(self.addr)
            .await
            .map_err(|e| PipelineError::Sink(format!("failed to connect to QuestDB ILP: {e}")))?;
        let _ = stream.set_nodelay(true);
        Ok(stream)
    }

    fn encode_batch(&self, batch: &PointBatch) -> Vec<u8> {
        // Heuristic capacity: ~96 bytes per line.
        let mut s = String::with_capacity(batch.len().saturating_mul(96));
        for point in &batch.points {
            point.write_ilp_line(&self.table, &mut s);
            s.push('\n');
        }
        s.into_bytes()
    }

    async fn flush_batch(&self, stream: &mut TcpStream, env: &Envelope<PointBatch>) -> Result<(), PipelineError> {
        let batch = &env.payload;
        if batch.is_empty() {
            return Ok(());
        }

        let payload = self.encode_batch(batch);

        let mut attempt: u32 = 0;
        loop {
            match stream.write_all(&payload).await {
                Ok(()) => {
                    metrics::counter!("questdb_ingested_records_total").increment(batch.len() as u64);
                    metrics::counter!("questdb_ilp_bytes_total").increment(payload.len() as u64);

                    if let Ok(dur) = SystemTime::now().duration_since(env.received_at) {
                        metrics::histogram!("ingest_end_to_end_latency_seconds").record(dur.as_secs_f64());
                    }

                    tracing::debug!(
                        series_id = batch.series_id,
                        day = %batch.day,
                        points = batch.len(),
                        "day batch written"
                    );
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "QuestDB ILP flush failed, reconnecting and retrying"
                    );
                    metrics::counter!("questdb_ilp_retry_total").increment(1);

                    tokio::time::sleep(sleep_for).await;
                    *stream = self.connect().await?;
                }
                Err(e) => {
                    tracing::error!(error = %e, series_id = batch.series_id, day = %batch.day, "QuestDB ILP flush failed, giving up");
                    metrics::counter!("questdb_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(format!("ilp write failed: {e}")));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Sink<PointBatch> for QuestDbIlpSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<PointBatch>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut stream = self.connect().await?;

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream pipeline for QuestDbIlpSink");
                    continue;
                }
            };

            self.flush_batch(&mut stream, &env).await?;
        }

        // Best-effort flush.
        let _ = stream.shutdown().await;

        Ok(())
    }
}
