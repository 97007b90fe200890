use anyhow::Result;
use clap::Parser;

use comment_drift::cli::{Cli, Commands};
use comment_drift::config::{Config, ConfigService};
use comment_drift::embedding::{self, Embedder, EmbeddingBackend};
use comment_drift::error::{DriftError, ErrorCode};
use comment_drift::models::record::RecordFormat;
use comment_drift::models::report::PipelineMode;
use comment_drift::service::AppService;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let (code, message) = classify_error(&e);
        let error = serde_json::json!({
            "error": { "code": code, "message": message }
        });
        println!("{error}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn classify_error(e: &anyhow::Error) -> (String, String) {
    if let Some(de) = e.downcast_ref::<DriftError>() {
        (de.code.to_string(), de.message.clone())
    } else {
        ("IO_ERROR".to_string(), format!("{e:#}"))
    }
}

fn serialize_output(value: &impl serde::Serialize, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

fn run(cli: Cli) -> Result<()> {
    let pretty = cli.pretty;

    if let Commands::Init { path } = &cli.command {
        let config_path = match path {
            Some(p) => {
                ConfigService::generate_at(p)?;
                p.clone()
            }
            None => {
                ConfigService::generate_default()?;
                ConfigService::default_path()
            }
        };
        eprintln!("Configuration file created at: {}", config_path.display());
        return Ok(());
    }

    let config = ConfigService::load(cli.config.as_deref())?;

    // Flushes the log writer when dropped at the end of the command.
    let _log_guard = if cli.debug || config.debug {
        Some(comment_drift::logger::init(&config)?)
    } else {
        None
    };

    match cli.command {
        Commands::Analyze {
            dir,
            mode,
            workers,
            backend,
            text,
        } => cmd_analyze(config, &dir, mode, workers, backend, text, pretty),
        Commands::Parse { path, format } => cmd_parse(config, &path, format, pretty),
        Commands::Changes { dir } => cmd_changes(config, &dir, pretty),
        Commands::Init { .. } => unreachable!("handled above"),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_analyze(
    mut config: Config,
    dir: &str,
    mode: Option<PipelineMode>,
    workers: Option<usize>,
    backend: Option<EmbeddingBackend>,
    text: bool,
    pretty: bool,
) -> Result<()> {
    let mode = mode.unwrap_or(config.pipeline.mode);
    let workers = workers.unwrap_or(config.pipeline.workers);
    if let Some(backend) = backend {
        config.embedding.backend = backend;
    }
    let backend = config.embedding.backend;
    if !backend.is_available() {
        anyhow::bail!(DriftError::new(
            ErrorCode::InvalidRequest,
            format!("Embedding backend {backend:?} is not available in this build"),
        ));
    }
    // Fetch model weights once up front so workers do not race on the download.
    if backend == EmbeddingBackend::MiniLm && mode == PipelineMode::Parallel {
        embedding::load(&config.embedding)?;
    }

    let embedding_config = config.embedding.clone();
    let service = AppService::new(config);
    let report = service.analyze(dir, mode, workers, || -> Result<Box<dyn Embedder>> {
        Ok(embedding::load(&embedding_config)?)
    })?;

    if text {
        print!("{}", report.render_text());
    } else {
        println!("{}", serialize_output(&report, pretty)?);
    }
    Ok(())
}

fn cmd_parse(config: Config, path: &str, format: Option<RecordFormat>, pretty: bool) -> Result<()> {
    let service = AppService::new(config);
    let record = service.parse_record(path, format)?;
    println!("{}", serialize_output(&record, pretty)?);
    Ok(())
}

fn cmd_changes(config: Config, dir: &str, pretty: bool) -> Result<()> {
    let service = AppService::new(config);
    let distribution = service.change_distribution(dir)?;
    println!("{}", serialize_output(&distribution, pretty)?);
    Ok(())
}
