use actix::prelude::*;
use anyhow::Context;
use indexfetch::cli::Args;
use indexfetch::core::http::TcpTransport;
use indexfetch::core::Orchestrator;
use indexfetch::ui::{self, ProgressManager, RunReport, RunSummary};
use indexfetch::utils::logger::{Flush, LoggerActor, LoggerExt};
use log::LevelFilter;
use std::sync::Arc;
use std::time::Instant;

#[actix::main]
async fn main() -> anyhow::Result<()> {
    let (args, config) = match Args::parse_args() {
        Ok(parsed) => parsed,
        Err(e) => {
            ui::print_error(&format!("invalid arguments or config: {}", e));
            std::process::exit(2);
        }
    };

    if args.init_config {
        config
            .save_with_tutorial(&args.config)
            .with_context(|| format!("writing {}", args.config))?;
        ui::print_success(&format!("config written to {}", args.config));
        return Ok(());
    }
    let Some(index_url) = args.index_url.clone() else {
        anyhow::bail!("no index URL given");
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level)).init();
    let level: LevelFilter = config.log_level.parse().unwrap_or(LevelFilter::Info);
    let logger = LoggerActor::new(&config.log_file, level, config.log_max_size)
        .with_context(|| format!("opening run log {}", config.log_file))?
        .start();

    let mode = args.download_mode(&config);
    logger.info(&format!("index {} mode {:?}", index_url, mode));
    logger.debug(&config.get_summary());
    println!("URL of the index file: {}", index_url);
    println!("Mode: {:?}", mode);

    let transport = Arc::new(TcpTransport::new(config.connect_timeout(), config.read_timeout()));
    let progress = if config.show_progress { ProgressManager::new() } else { ProgressManager::hidden() };
    let orchestrator = Orchestrator::new(transport, config.download_options(mode), progress);

    let started = Instant::now();
    let started_at = chrono::Utc::now();
    let result = orchestrator
        .run(&index_url, |position, outcome| {
            ui::print_outcome(position, outcome);
            logger.info(&format!("{}. {}", position, outcome));
        })
        .await;

    let outcomes = match result {
        Ok(outcomes) => outcomes,
        Err(e) => {
            ui::print_error(&format!("{}", e));
            logger.error(&format!("run aborted: {}", e));
            let _ = logger.send(Flush).await;
            std::process::exit(1);
        }
    };

    let summary = RunSummary::from_outcomes(&outcomes, started.elapsed());
    println!("{}", summary);
    logger.info(&format!(
        "done: {} downloaded, {} failed of {}",
        summary.downloaded, summary.failed, summary.total_files
    ));

    if let Some(path) = &args.report {
        RunReport::new(&index_url, started_at, outcomes)
            .write_to(path)
            .with_context(|| format!("writing report {}", path))?;
        ui::print_success(&format!("report written to {}", path));
    }

    if let Ok(Err(e)) = logger.send(Flush).await {
        eprintln!("failed to flush run log: {}", e);
    }
    Ok(())
}
