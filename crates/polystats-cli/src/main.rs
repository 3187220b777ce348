mod output;

use anyhow::Context;
use clap::Parser;
use output::OutputFormat;
use polystats_worker::{Deadline, MergeStrategy, Pipeline, PipelineConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "polystats")]
#[command(about = "Fetch weighted polygons and aggregate their statistics", long_about = None)]
struct Args {
    /// Maximal processing time in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Number of polygons to process
    #[arg(long)]
    polygons_num: Option<usize>,

    /// Polygon endpoint
    #[arg(long)]
    source_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    request_timeout: Option<u64>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// How workers merge their results (partial_reduce, locked)
    #[arg(long)]
    merge_strategy: Option<MergeStrategy>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

impl Args {
    /// Defaults, then the config file, then flags
    fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path))?,
            None => PipelineConfig::default(),
        };

        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(polygons_num) = self.polygons_num {
            config.polygons_num = polygons_num;
        }
        if let Some(source_url) = &self.source_url {
            config.source_url = source_url.clone();
        }
        if let Some(request_timeout) = self.request_timeout {
            config.request_timeout_secs = request_timeout;
        }
        if let Some(workers) = self.workers {
            config.pool_size = workers;
        }
        if let Some(strategy) = self.merge_strategy {
            config.merge_strategy = strategy;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing; stdout is reserved for the result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = args.load_config()?;
    tracing::info!("Starting with config: {:?}", config);

    let pipeline = Pipeline::from_config(config)?;
    let deadline = Deadline::start(pipeline.config().timeout());

    // Ctrl-C expires the deadline early
    let shutdown = deadline.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            shutdown.cancel();
        }
    });

    let report = pipeline
        .run_with_deadline(&deadline)
        .await
        .context("Polygon processing failed")?;

    if !report.is_complete() {
        tracing::warn!(
            "Result is partial: {} of {} polygons skipped",
            report.tasks_skipped(),
            report.requested
        );
    }

    println!("{}", output::render(&report.aggregate, args.format)?);

    Ok(())
}
