use anyhow::{Result, bail};
use camino::Utf8Path;
use rayon::prelude::*;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embedding::Embedder;
use crate::engine::aggregate::Aggregator;
use crate::engine::discover::{self, TaggedFile};
use crate::engine::{change_info, format_a, format_b, similarity, source};
use crate::error::{DriftError, ErrorCode};
use crate::models::change_info::ChangeDistribution;
use crate::models::feature::{FeatureResult, SkipReason};
use crate::models::record::{ChangeRecord, LabelSource, RecordFormat};
use crate::models::report::{AnalysisReport, PipelineMode, RunCounters};

// ---------------------------------------------------------------------------
// AppService: the record pipeline behind every CLI command
// ---------------------------------------------------------------------------

pub struct AppService {
    config: Config,
}

/// What happened to one record file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Feature(FeatureResult),
    ReadFailed,
    ParseFailed,
    Skipped(SkipReason),
    /// Processing this file panicked.
    WorkerFailed,
}

/// An embedder created on first use and reused afterwards.
pub struct LazyEmbedder<'f, E, F> {
    factory: &'f F,
    cell: OnceLock<Option<E>>,
}

impl<'f, E, F> LazyEmbedder<'f, E, F>
where
    E: Embedder,
    F: Fn() -> Result<E>,
{
    pub fn new(factory: &'f F) -> Self {
        Self {
            factory,
            cell: OnceLock::new(),
        }
    }

    /// The embedder, or `None` if it could not be loaded.
    pub fn get(&self) -> Option<&E> {
        self.cell
            .get_or_init(|| match (self.factory)() {
                Ok(embedder) => {
                    debug!(embedder = embedder.name(), "embedder loaded");
                    Some(embedder)
                }
                Err(e) => {
                    warn!(error = %e, "failed to load embedder");
                    None
                }
            })
            .as_ref()
    }

    fn loaded_name(&self) -> Option<String> {
        self.cell
            .get()
            .and_then(|e| e.as_ref())
            .map(|e| e.name().to_string())
    }
}

impl AppService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Parse record text with the given layout.
    pub fn parse_text(&self, text: &str, format: RecordFormat) -> Result<ChangeRecord, DriftError> {
        let text = source::normalize_newlines(text);
        match format {
            RecordFormat::A => format_a::parse(&text, &self.config.normalize),
            RecordFormat::B => format_b::parse(&text, &self.config.format_b, &self.config.normalize),
        }
    }

    /// Read and parse one record file. The format is inferred from the
    /// discovery rules when not given.
    pub fn parse_record(&self, path: &str, format: Option<RecordFormat>) -> Result<ChangeRecord> {
        debug!(path, ?format, "parse_record called");
        let utf8_path = Utf8Path::new(path);
        let format = match format.or_else(|| discover::format_for(utf8_path, &self.config.discovery))
        {
            Some(f) => f,
            None => bail!(DriftError::unknown_format(path)),
        };
        let buf = source::read_file(utf8_path)?;
        let text = source::decode(utf8_path, &buf)?;
        Ok(self.parse_text(&text, format)?)
    }

    // -----------------------------------------------------------------------
    // Per-file processing
    // -----------------------------------------------------------------------

    /// `process_file` with a panic turned into `FileOutcome::WorkerFailed`.
    pub fn process_file_guarded<E, F>(
        &self,
        file: &TaggedFile,
        embedder: &LazyEmbedder<'_, E, F>,
    ) -> FileOutcome
    where
        E: Embedder,
        F: Fn() -> Result<E>,
    {
        catch_unwind(AssertUnwindSafe(|| self.process_file(file, embedder))).unwrap_or_else(|_| {
            warn!(path = %file.path, "panicked while processing file");
            FileOutcome::WorkerFailed
        })
    }

    /// Read, parse and score one file. Never fails: every problem is folded
    /// into the returned outcome.
    pub fn process_file<E, F>(&self, file: &TaggedFile, embedder: &LazyEmbedder<'_, E, F>) -> FileOutcome
    where
        E: Embedder,
        F: Fn() -> Result<E>,
    {
        debug!(path = %file.path, format = %file.format, "processing record file");

        let buf = match source::read_file(&file.path) {
            Ok(buf) => buf,
            Err(e) => {
                warn!(path = %file.path, error = %e, "failed to read record file");
                return FileOutcome::ReadFailed;
            }
        };
        let text = match source::decode(&file.path, &buf) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %file.path, error = %e, "failed to decode record file");
                return FileOutcome::ReadFailed;
            }
        };

        let record = match self.parse_text(&text, file.format) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %file.path, error = %e, "could not parse record");
                return FileOutcome::ParseFailed;
            }
        };

        let prepared = match similarity::prepare(&record) {
            Ok(prepared) => prepared,
            Err(reason) => {
                debug!(path = %file.path, %reason, "record skipped");
                return FileOutcome::Skipped(reason);
            }
        };

        let Some(embedder) = embedder.get() else {
            return FileOutcome::Skipped(SkipReason::Embedding("embedder unavailable".to_string()));
        };

        match prepared.score(embedder) {
            Ok(feature) => FileOutcome::Feature(feature),
            Err(reason) => {
                debug!(path = %file.path, %reason, "record skipped");
                FileOutcome::Skipped(reason)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Analysis
    // -----------------------------------------------------------------------

    /// Discover record files under `dir` and aggregate their features.
    pub fn analyze<E, F>(
        &self,
        dir: &str,
        mode: PipelineMode,
        workers: usize,
        factory: F,
    ) -> Result<AnalysisReport>
    where
        E: Embedder,
        F: Fn() -> Result<E> + Sync,
    {
        let root = Path::new(dir);
        if !root.is_dir() {
            bail!(DriftError::new(
                ErrorCode::FileNotFound,
                format!("Directory not found: {dir}"),
            ));
        }
        let files = discover::collect_files(root, &self.config.discovery)?;
        info!(dir, files = files.len(), ?mode, "starting analysis");

        let (aggregator, counters, embedder) = match mode {
            PipelineMode::Streaming => self.run_streaming(&files, &factory),
            PipelineMode::Parallel => self.run_parallel(&files, resolve_workers(workers), &factory)?,
        };

        let report = AnalysisReport {
            mode,
            embedder: embedder.unwrap_or_else(|| "unavailable".to_string()),
            counters,
            labels: aggregator.summaries(),
            overall: aggregator.overall().summary(),
        };
        info!(
            processed = report.counters.processed,
            files = report.counters.files,
            "analysis finished"
        );
        Ok(report)
    }

    /// One file at a time, folding each feature into the running means in
    /// discovery order.
    pub fn run_streaming<E, F>(
        &self,
        files: &[TaggedFile],
        factory: &F,
    ) -> (Aggregator, RunCounters, Option<String>)
    where
        E: Embedder,
        F: Fn() -> Result<E>,
    {
        let embedder = LazyEmbedder::new(factory);
        let mut aggregator = Aggregator::new();
        let mut counters = RunCounters::default();

        for file in files {
            let outcome = self.process_file_guarded(file, &embedder);
            tally(&mut counters, &outcome);
            if let FileOutcome::Feature(feature) = &outcome {
                aggregator.update(feature);
            }
        }

        (aggregator, counters, embedder.loaded_name())
    }

    /// Process files on a dedicated pool of `workers` threads, each with its
    /// own embedder, then reduce the collected features once.
    pub fn run_parallel<E, F>(
        &self,
        files: &[TaggedFile],
        workers: usize,
        factory: &F,
    ) -> Result<(Aggregator, RunCounters, Option<String>)>
    where
        E: Embedder,
        F: Fn() -> Result<E> + Sync,
    {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("drift-worker-{i}"))
            .build()?;
        debug!(workers, files = files.len(), "worker pool ready");

        // One slot per pool thread; a slot is only touched by its own thread.
        let slots: Vec<LazyEmbedder<'_, E, F>> =
            (0..workers).map(|_| LazyEmbedder::new(factory)).collect();

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let slot = &slots[rayon::current_thread_index().unwrap_or(0) % workers];
                    self.process_file_guarded(file, slot)
                })
                .collect()
        });

        let mut counters = RunCounters::default();
        for outcome in &outcomes {
            tally(&mut counters, outcome);
        }
        let aggregator = Aggregator::reduce(outcomes.iter().filter_map(|o| match o {
            FileOutcome::Feature(f) => Some(f),
            _ => None,
        }));
        let name = slots.iter().find_map(|s| s.loaded_name());

        Ok((aggregator, counters, name))
    }

    // -----------------------------------------------------------------------
    // Change-size distribution
    // -----------------------------------------------------------------------

    /// Change-size histograms over the Format A files under `dir`.
    pub fn change_distribution(&self, dir: &str) -> Result<ChangeDistribution> {
        let root = Path::new(dir);
        if !root.is_dir() {
            bail!(DriftError::new(
                ErrorCode::FileNotFound,
                format!("Directory not found: {dir}"),
            ));
        }
        let files = discover::collect_files(root, &self.config.discovery)?;

        let infos: Vec<_> = files
            .par_iter()
            .filter(|f| f.format == RecordFormat::A)
            .filter_map(|f| {
                let buf = source::read_file(&f.path)
                    .inspect_err(|e| warn!(path = %f.path, error = %e, "failed to read record file"))
                    .ok()?;
                let text = source::decode(&f.path, &buf).ok()?;
                Some(change_info::parse_change_info(&text))
            })
            .collect();

        Ok(change_info::distribution(&infos))
    }
}

/// Worker count for parallel mode: the requested number, or one less than the
/// available parallelism (minimum 1) when 0.
pub fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

fn tally(counters: &mut RunCounters, outcome: &FileOutcome) {
    counters.files += 1;
    match outcome {
        FileOutcome::Feature(feature) => {
            counters.parsed += 1;
            counters.processed += 1;
            match feature.label_source {
                LabelSource::Explicit => counters.explicit_labels += 1,
                LabelSource::Derived => counters.derived_labels += 1,
            }
        }
        FileOutcome::ReadFailed => counters.read_failures += 1,
        FileOutcome::ParseFailed => counters.parse_failures += 1,
        FileOutcome::Skipped(reason) => {
            counters.parsed += 1;
            match reason {
                SkipReason::Unlabeled => counters.unlabeled += 1,
                SkipReason::NotEnoughText { .. } => counters.not_enough_text += 1,
                SkipReason::Embedding(_) => counters.embedding_failures += 1,
            }
        }
        FileOutcome::WorkerFailed => counters.worker_failures += 1,
    }
}
