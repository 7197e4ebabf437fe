use frame_sieve_common::config::Config;
use frame_sieve_consumer::{process_video, Aggregator, CancelToken, Summary, TracingSink};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Serialize)]
struct Output<'a> {
    #[serde(flatten)]
    summary: &'a Summary,
    recent: Vec<&'a str>,
    cancelled: bool,
    stopped_by: Option<String>,
}

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(video) = args.next().map(PathBuf::from) else {
        eprintln!("usage: frame-sieve <video> [config.toml]");
        std::process::exit(2);
    };

    let config = match args.next().map(PathBuf::from) {
        Some(config_path) => match Config::load(&config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {e}", config_path.display());
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        video = %video.display(),
        similarity_threshold = config.selection.similarity_threshold,
        initial_interval_secs = config.selection.initial_interval_secs,
        max_interval_secs = config.selection.max_interval_secs,
        clock = ?config.source.clock,
        "starting frame-sieve"
    );

    let mut sink = TracingSink::new(Aggregator::new(&config.report));
    let report = match process_video(&video, &config, &mut sink, CancelToken::new()) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "processing failed");
            std::process::exit(1);
        }
    };

    let aggregator = sink.aggregator();
    let snapshot = aggregator.snapshot();
    let output = Output {
        summary: report.summary().unwrap_or(&snapshot),
        recent: aggregator.recent().collect(),
        cancelled: report.is_cancelled(),
        stopped_by: report.stopped_by.as_ref().map(ToString::to_string),
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!(error = %e, "failed to serialize summary");
            std::process::exit(1);
        }
    }
}
