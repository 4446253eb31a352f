use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};

use evidence_trust::aggregate::write_result;
use evidence_trust::clock::{Clock, TokioClock};
use evidence_trust::config::{PipelineConfig, SearchCredentials};
use evidence_trust::fetch::ContentFetcher;
use evidence_trust::input::{load_perspectives, load_run_input};
use evidence_trust::llm::{ChatModel, LlmClient};
use evidence_trust::oracle::{LlmRelevanceJudge, LlmRephraser, LlmTrustJudge};
use evidence_trust::pipeline::{EvidencePipeline, Stages};
use evidence_trust::rate_limit::RateLimiter;
use evidence_trust::search::WebSearch;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Gather web evidence for perspective claims and score source trust.
#[derive(Parser, Debug)]
#[command(name = "evidence-trust", version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Folder holding input.json and the perspective files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Folder the ranked results are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Perspective file to process (repeatable); defaults to the configured list
    #[arg(short, long = "perspective")]
    perspectives: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let _ = dotenv::dotenv();

    // Everything that can be rejected is loaded before the first oracle call.
    let mut config = PipelineConfig::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.data_folder = Some(dir);
    }
    if let Some(dir) = cli.output_dir {
        config.output.output_folder = dir;
    }
    if !cli.perspectives.is_empty() {
        config.perspectives = Some(cli.perspectives);
    }

    let data_folder = config.data_folder();
    let input = load_run_input(&data_folder)?;
    let files = load_perspectives(&data_folder, &config.perspective_files())?;
    let credentials = SearchCredentials::from_env()?;

    let llm_client = LlmClient::from_env(&config.llm.model)?;
    info!(model = llm_client.model(), "LLM client initialized");
    let llm: Arc<dyn ChatModel> = Arc::new(llm_client);
    let search = WebSearch::new(
        credentials.api_key,
        credentials.engine_id,
        config.search.endpoint.clone(),
        SEARCH_TIMEOUT,
    )?;
    info!("Oracle clients initialized");

    let clock: Arc<dyn Clock> = Arc::new(TokioClock);
    let stages = Stages {
        rephraser: LlmRephraser::new(llm.clone()),
        search,
        relevance: LlmRelevanceJudge::new(llm.clone(), config.llm.temperature),
        trust: LlmTrustJudge::new(llm, config.llm.temperature),
        fetcher: ContentFetcher::open(clock.clone()),
    };
    let limiter = RateLimiter::new(config.rate_limit(), clock.clone());
    let pipeline = EvidencePipeline::new(stages, config.pipeline_settings(), limiter, clock);

    let output = tokio::select! {
        output = pipeline.run(&input, &files) => output,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, no results written");
            return Ok(());
        }
    };
    pipeline.into_stages().fetcher.close();

    let mut summary = output.summary;
    if config.output.save_results {
        for result in &output.results {
            let path = write_result(&config.output.output_folder, result)
                .with_context(|| format!("Failed to save results for {}", result.source_file))?;
            summary.set_output_path(&result.source_file, path);
        }
    } else {
        info!("Saving disabled, results not written");
    }
    summary.log();

    Ok(())
}
