use anyhow::{Context, Result};
use clap::Parser;
use job_harvester::config::{require_positive, HarvestConfig};
use job_harvester::export::export_records;
use job_harvester::harvest::{BrowserDriver, HarvestPipeline, HarvestReport, HarvestRequest};
use job_harvester::logging::init_logging;
use job_harvester::registry::SourceRegistry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "job-harvester")]
#[command(about = "Harvest job listings from several job boards into CSV and JSON")]
struct Cli {
    /// Search keyword, e.g. "sre" or "python developer"
    #[arg(short, long)]
    keyword: String,

    /// Locations to search; repeat the flag or separate with commas
    #[arg(short, long = "location", required = true, value_delimiter = ',')]
    locations: Vec<String>,

    /// Platforms to search (default: all)
    #[arg(
        short,
        long = "platform",
        value_delimiter = ',',
        value_parser = ["linkedin", "glassdoor", "naukri"],
        ignore_case = true
    )]
    platforms: Vec<String>,

    /// Maximum listings per platform and location
    #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
    limit: i64,

    /// Only keep listings posted within this many days
    #[arg(long, default_value_t = 7, allow_negative_numbers = true)]
    days: i64,

    /// Output file; the extension is replaced by .csv and .json
    #[arg(short, long, default_value = "jobs.csv")]
    output: PathBuf,

    /// Concurrent platform/location tasks
    #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
    workers: i64,

    /// Concurrent detail page fetches per task
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    detail_workers: i64,

    /// Extra passes over failed detail pages
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn request(&self) -> Result<HarvestRequest> {
        let limit = require_positive("limit", self.limit)?;
        let days = require_positive("days", self.days)?;
        let request = HarvestRequest::new(self.keyword.clone(), self.locations.clone())
            .with_platforms(self.platforms.iter().map(|p| p.to_lowercase()).collect())
            .with_limit(usize::try_from(limit).context("limit is too large")?)
            .with_lookback_days(u32::try_from(days).context("days is too large")?);
        request.validate()?;
        Ok(request)
    }

    fn config(&self) -> Result<HarvestConfig> {
        let workers = require_positive("workers", self.workers)?;
        let detail_workers = require_positive("detail-workers", self.detail_workers)?;
        let config = HarvestConfig::default()
            .with_platform_workers(usize::try_from(workers).context("workers is too large")?)
            .with_detail_workers(
                usize::try_from(detail_workers).context("detail-workers is too large")?,
            )
            .with_max_retries(self.max_retries);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "chromium")]
async fn launch_driver(headful: bool) -> Result<Arc<dyn BrowserDriver>> {
    let driver = job_harvester::harvest::chromium::ChromiumDriver::launch(!headful)
        .await
        .context("Failed to launch Chromium")?;
    Ok(Arc::new(driver))
}

#[cfg(not(feature = "chromium"))]
async fn launch_driver(_headful: bool) -> Result<Arc<dyn BrowserDriver>> {
    anyhow::bail!("No browser backend compiled in; rebuild with `--features chromium`")
}

async fn run(cli: &Cli) -> Result<HarvestReport> {
    let request = cli.request().context("Invalid arguments")?;
    let config = cli.config().context("Invalid arguments")?;

    let driver = launch_driver(cli.headful).await?;
    let registry = SourceRegistry::with_browser(driver, config.browser.clone());
    let pipeline = HarvestPipeline::new(registry).with_config(config);

    let report = pipeline.execute(&request).await?;
    report.log_summary();

    if !report.is_empty() {
        let paths = export_records(&report.records, &cli.output)
            .with_context(|| format!("Failed to export to {}", cli.output.display()))?;
        info!(
            csv = %paths.csv.display(),
            json = %paths.json.display(),
            "Results saved"
        );
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(&cli).await {
        Ok(report) if report.is_empty() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
