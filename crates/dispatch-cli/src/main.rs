mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use time::OffsetDateTime;

use dispatch_core::completion_log::{
    CompletionLog, FanoutCompletionLog, MemoryCompletionLog, TracingCompletionLog,
};
use dispatch_core::config::{DispatchConfig, load_config, load_config_file};
use dispatch_core::input::load_tasks;
use dispatch_core::orchestration::{BatchSummary, DispatchContext, run_lines};

const DEFAULT_CONFIG_FILE: &str = "dispatch.toml";

#[derive(Parser)]
#[command(
    name = "dispatch",
    version,
    about = "Run a batch of integral, derivative and thesis tasks"
)]
struct Cli {
    /// Task file, one task per line.
    tasks: PathBuf,

    /// TOML config file; must exist when given. Without it, `dispatch.toml`
    /// is read if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for ledger and counter files (overrides the config file).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Maximum number of tasks evaluating at once (overrides the config file).
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = resolve_config(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(max_in_flight) = cli.max_in_flight {
        config.max_in_flight = max_in_flight;
    }
    config.validate().context("validate config")?;

    dispatch_core::logging::init(&config.log_filter, config.log_file.as_deref())
        .context("initialize logging")?;

    let tasks = load_tasks(&cli.tasks).context("load tasks")?;
    tracing::info!(tasks = tasks.len(), path = %cli.tasks.display(), "tasks loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    let started_at = OffsetDateTime::now_utc();
    let records = Arc::new(MemoryCompletionLog::with_capacity(tasks.len()));
    let (outcomes, counter_total) = runtime.block_on(async {
        let completion_log: Arc<dyn CompletionLog> = Arc::new(FanoutCompletionLog::new([
            Arc::new(TracingCompletionLog) as Arc<dyn CompletionLog>,
            records.clone() as Arc<dyn CompletionLog>,
        ]));
        let context = DispatchContext::from_config(&config)
            .await
            .context("open storage")?
            .with_completion_log(completion_log);

        let outcomes = run_lines(&context, &tasks).await;
        let counter_total = context
            .counter()
            .current()
            .await
            .context("read aggregate counter")?;
        anyhow::Ok((outcomes, counter_total))
    })?;

    let report = report::BatchReport {
        started_at,
        data_dir: config.data_dir.clone(),
        max_in_flight: config.max_in_flight,
        summary: BatchSummary::from_outcomes(&outcomes),
        counter_total,
        completions: records.records(),
    };

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text()?);
    }
    Ok(())
}

fn resolve_config(explicit: Option<&Path>) -> Result<DispatchConfig> {
    match explicit {
        Some(path) => {
            load_config_file(path).with_context(|| format!("load config '{}'", path.display()))
        }
        None => load_config(Path::new(DEFAULT_CONFIG_FILE)).context("load config"),
    }
}
