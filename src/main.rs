use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use compliance_copilot::config::PipelineConfig;
use compliance_copilot::pipeline::gemini::{AiTagger, GeminiClient};
use compliance_copilot::pipeline::runner::Pipeline;
use compliance_copilot::report::RunReport;

/// Chunk, tag, and verify compliance document text.
#[derive(Parser, Debug)]
#[command(name = "compliance-copilot", version, about)]
struct Args {
    /// Merged extraction blob or JSON item list to process.
    #[arg(long, default_value = "downloads/merged_output.txt")]
    input_file: PathBuf,

    /// Where the verified records are written.
    #[arg(long, default_value = "data/verified_results.json")]
    output_file: PathBuf,

    /// Optional aggregate report destination.
    #[arg(long)]
    report_file: Option<PathBuf>,

    /// Use the Gemini API when GEMINI_API_KEY is set. Without the key this
    /// flag has no effect and the run stays rule-based.
    #[arg(long)]
    live: bool,

    /// Process and print the first record without writing any files.
    #[arg(long)]
    dry_run: bool,

    /// Target chunk size in characters.
    #[arg(long, default_value_t = 1200)]
    chunk_size: usize,

    /// Discard chunks shorter than this after trimming.
    #[arg(long, default_value_t = 50)]
    chunk_floor: usize,

    /// Escalating waits between retries of one model, in seconds.
    /// N waits allow N + 1 attempts per model.
    #[arg(long, value_delimiter = ',', default_values_t = [15u64, 30, 60])]
    backoff_secs: Vec<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = PipelineConfig {
        chunk_target_chars: args.chunk_size,
        chunk_floor_chars: args.chunk_floor,
        backoff_secs: args.backoff_secs.clone(),
        ..Default::default()
    };

    let tagger = if args.live {
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                tracing::info!("GEMINI_API_KEY found, AI tagging enabled");
                let client = GeminiClient::new(key.trim(), config.request_timeout_secs);
                AiTagger::live(Box::new(client), &config)
            }
            _ => {
                tracing::warn!("--live requested but GEMINI_API_KEY is not set, staying rule-based");
                AiTagger::offline()
            }
        }
    } else {
        tracing::info!("offline mode, rule-based tagging only");
        AiTagger::offline()
    };

    let raw = fs::read_to_string(&args.input_file)
        .with_context(|| format!("failed to read input file {}", args.input_file.display()))?;

    let pipeline = Pipeline::new(config, tagger);

    let records = if looks_like_json(&args.input_file, &raw) {
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("input {} is not valid JSON", args.input_file.display()))?;
        pipeline.run_items(&value)
    } else {
        pipeline.run_merged_text(&raw)
    };

    let report = RunReport::from_records(&records);
    report.log_summary();

    if args.dry_run {
        match records.first() {
            Some(first) => println!("{}", serde_json::to_string_pretty(first)?),
            None => tracing::warn!("dry run produced no records"),
        }
        return Ok(());
    }

    if let Some(parent) = args.output_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let serialized = serde_json::to_string_pretty(&records)?;
    fs::write(&args.output_file, serialized)
        .with_context(|| format!("failed to write {}", args.output_file.display()))?;
    tracing::info!(
        records = records.len(),
        output = %args.output_file.display(),
        "verified records written"
    );

    if let Some(report_path) = &args.report_file {
        if let Some(parent) = report_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        fs::write(report_path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write {}", report_path.display()))?;
        tracing::info!(report = %report_path.display(), "run report written");
    }

    Ok(())
}

/// JSON inputs are detected by extension or by a leading bracket.
fn looks_like_json(path: &std::path::Path, raw: &str) -> bool {
    if path.extension().is_some_and(|e| e == "json") {
        return true;
    }
    matches!(raw.trim_start().chars().next(), Some('[' | '{'))
}
