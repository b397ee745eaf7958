use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use elvaco_client::{domain::PointBatch, ElvacoClient, MeteringApi};
use meter_ingest::{
    clock::{Clock, SystemClock},
    config::{AppConfig, Overrides, RunMode, SinkKind},
    filter::HouseFilter,
    metrics_server, observability,
    pipeline::{Envelope, Pipeline, PipelineError, Sink},
    report::{build_usage_report, spreadsheet, ConsoleTable, ReportEmitter},
    sinks::{QuestDbIlpSink, QuestDbSink},
    sources::ElvacoDailySource,
};
use sqlx::postgres::PgPoolOptions;

/// Polls an Elvaco metering gateway. Without `--enddate` readings are pushed to
/// QuestDB day by day; with it a per-house usage report is printed and saved.
#[derive(Parser, Debug)]
#[command(name = "meter-ingest", version)]
struct Cli {
    /// TOML configuration file (default: $METER_INGEST_CONFIG or meter-ingest.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Comma separated house codes, or `all`.
    #[arg(long)]
    house: Option<String>,
    /// Start date, YYYY-MM-DD or a relative duration such as -48h.
    #[arg(long, allow_hyphen_values = true)]
    date: Option<String>,
    /// End date; switches to report mode.
    #[arg(long, allow_hyphen_values = true)]
    enddate: Option<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Elvaco gateway host or host:port.
    #[arg(long)]
    elvacoip: Option<String>,
    /// Where the report spreadsheet is written (`.csv` for CSV, xlsx otherwise).
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            server: self.elvacoip.clone(),
            username: self.user.clone(),
            password: self.password.clone(),
            house: self.house.clone(),
            start_date: self.date.clone(),
            end_date: self.enddate.clone(),
            report_path: self.report.as_ref().map(|p| p.display().to_string()),
        }
    }
}

enum PointSink {
    Ilp(QuestDbIlpSink),
    Pgwire(QuestDbSink),
}

#[async_trait::async_trait]
impl Sink<PointBatch> for PointSink {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<PointBatch>, PipelineError>> + Send + Unpin + 'static,
    {
        match self {
            Self::Ilp(s) => s.run(input).await,
            Self::Pgwire(s) => s.run(input).await,
        }
    }
}

async fn build_sink(cfg: &AppConfig) -> Result<PointSink> {
    let backoff = Duration::from_millis(cfg.sink.retry_backoff_ms);

    let sink = match cfg.sink.kind {
        SinkKind::Ilp => {
            let addr: SocketAddr = cfg
                .questdb
                .ilp_tcp_addr
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid questdb.ilp_tcp_addr: {e}"))?;
            PointSink::Ilp(QuestDbIlpSink::new(
                addr,
                cfg.questdb.table.clone(),
                cfg.sink.max_retries,
                backoff,
            ))
        }
        SinkKind::Pgwire => {
            let pool = PgPoolOptions::new()
                .max_connections(cfg.questdb.max_connections)
                .connect(&cfg.questdb.uri)
                .await
                .context("failed to connect to QuestDB over pgwire")?;
            PointSink::Pgwire(QuestDbSink::new(
                pool,
                cfg.questdb.table.clone(),
                cfg.sink.max_retries,
                backoff,
            ))
        }
    };

    Ok(sink)
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?.apply(cli.overrides());
    cfg.validate()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mode = cfg.mode(clock.as_ref())?;
    let filter = HouseFilter::parse(&cfg.run.house);

    let api: Arc<dyn MeteringApi> = Arc::new(ElvacoClient::new(
        &cfg.elvaco.server,
        cfg.elvaco.username.clone(),
        cfg.elvaco.password.clone(),
        Duration::from_secs(cfg.elvaco.request_timeout_secs),
    )?);

    let catalog = api
        .list_series()
        .await
        .with_context(|| format!("failed to list measurement series from {}", cfg.elvaco.server))?;
    tracing::info!(series = catalog.len(), houses = ?filter.entries(), "catalog loaded");

    match mode {
        RunMode::Ingest { start } => {
            let sink = build_sink(&cfg).await?;
            let source = ElvacoDailySource::new(api, clock, catalog, filter, start);

            let pipeline: Pipeline<_, PointBatch, _> = Pipeline::new(source, sink);
            pipeline.run().await?;
            tracing::info!("ingest finished");
        }
        RunMode::Report { start, end } => {
            let report = build_usage_report(api.as_ref(), &catalog, &filter, start, end).await;

            ConsoleTable.emit(&report)?;
            spreadsheet::for_path(&cfg.run.report_path).emit(&report)?;
        }
    }

    Ok(())
}
