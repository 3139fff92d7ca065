//! Pipeline orchestrator for Reelsmith.
//!
//! Sequences fetch → filter → per-item (cache check → download → transcribe
//! → analyze) → strategy synthesis → script generation, and owns the
//! failure policy: per-item failures are recorded and excluded from
//! aggregation; only fetch, aggregation, and generation failures abort a
//! run.

use crate::audio::{AudioFetcher, YtDlpAudio};
use crate::cache::CacheStore;
use crate::config::{Prompts, Settings};
use crate::error::{ReelsmithError, Result};
use crate::export::{load_strategy, ArtifactWriter, RunId};
use crate::fetch::{filter_reels, ApifyFetcher, FetchSource, Reel, Target};
use crate::insight::{InsightModel, OpenAIInsight, ReelAnalysis, Script, Strategy};
use crate::retry::RetryPolicy;
use crate::transcription::{Transcriber, WhisperTranscriber};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A pipeline stage, used to tag per-item failures and report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Filter,
    CacheCheck,
    Download,
    Transcribe,
    Analyze,
    Aggregate,
    Generate,
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Filter => "filter",
            Stage::CacheCheck => "cache check",
            Stage::Download => "download",
            Stage::Transcribe => "transcribe",
            Stage::Analyze => "analyze",
            Stage::Aggregate => "aggregate",
            Stage::Generate => "generate",
            Stage::Write => "write",
        };
        write!(f, "{}", name)
    }
}

/// A recorded, non-fatal failure of one item at one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

impl StageFailure {
    fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// One reel moving through the pipeline, with its derived artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineItem {
    #[serde(flatten)]
    pub reel: Reel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ReelAnalysis>,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

impl PipelineItem {
    fn new(reel: Reel) -> Self {
        Self {
            reel,
            audio_path: None,
            transcript: None,
            analysis: None,
            from_cache: false,
            failure: None,
        }
    }
}

/// Options for one pipeline run. CLI flags and config defaults resolve into
/// this before the orchestrator is invoked.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Scrape targets; falls back to configured defaults when None.
    pub targets: Option<Vec<String>>,
    /// Niche label used in prompts and artifact names.
    pub niche: String,
    pub min_views: Option<u64>,
    pub max_reels: Option<usize>,
    pub script_count: Option<usize>,
    /// Free-text steering instructions forwarded to the insight model.
    pub instructions: String,
    /// Re-download and re-transcribe even when cached.
    pub force_refresh: bool,
    /// Skip the download stage; only cached items proceed.
    pub skip_download: bool,
    /// Previously saved strategy; skips fetching through aggregation.
    pub strategy_file: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(niche: &str) -> Self {
        Self {
            niche: niche.to_string(),
            ..Default::default()
        }
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = Some(targets);
        self
    }
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub niche: String,
    /// Candidates returned by the fetch adapter.
    pub fetched: usize,
    /// Candidates kept after filtering.
    pub kept: usize,
    pub cache_hits: usize,
    pub transcribed: usize,
    pub analyzed: usize,
    pub items: Vec<PipelineItem>,
    pub strategy: Option<Strategy>,
    pub scripts: Vec<Script>,
    pub scripts_generated: usize,
    /// Paths of artifacts written for this run.
    pub artifacts: Vec<PathBuf>,
    /// Artifact writes that failed (non-fatal).
    pub write_failures: Vec<String>,
}

impl RunReport {
    fn new(run: &RunId, niche: &str) -> Self {
        Self {
            run_id: run.to_string(),
            niche: niche.to_string(),
            fetched: 0,
            kept: 0,
            cache_hits: 0,
            transcribed: 0,
            analyzed: 0,
            items: Vec::new(),
            strategy: None,
            scripts: Vec::new(),
            scripts_generated: 0,
            artifacts: Vec::new(),
            write_failures: Vec::new(),
        }
    }

    /// Items that recorded a per-item failure.
    pub fn failed_items(&self) -> Vec<(&str, &StageFailure)> {
        self.items
            .iter()
            .filter_map(|i| {
                i.failure
                    .as_ref()
                    .map(|f| (i.reel.shortcode.as_str(), f))
            })
            .collect()
    }
}

/// The main orchestrator for the Reelsmith pipeline.
pub struct Orchestrator {
    settings: Settings,
    /// Built lazily on the scrape path; generation-only runs never need
    /// the Apify token.
    fetcher: Option<Arc<dyn FetchSource>>,
    audio: Arc<dyn AudioFetcher>,
    transcriber: Arc<dyn Transcriber>,
    insight: Arc<dyn InsightModel>,
    cache: Arc<CacheStore>,
    writer: ArtifactWriter,
    retry: RetryPolicy,
}

impl Orchestrator {
    /// Create an orchestrator with the default backends (Apify, yt-dlp,
    /// Whisper, OpenAI chat). The Apify fetch backend is constructed on
    /// first use, so a missing `APIFY_API_TOKEN` only fails runs that
    /// actually scrape.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let audio: Arc<dyn AudioFetcher> = Arc::new(YtDlpAudio::new());
        let transcriber: Arc<dyn Transcriber> =
            Arc::new(WhisperTranscriber::with_model(&settings.transcription.model));
        let insight: Arc<dyn InsightModel> = Arc::new(OpenAIInsight::new(
            settings.analysis.clone(),
            settings.generation.clone(),
            prompts,
        ));
        let cache = Arc::new(CacheStore::new(&settings.cache_dir())?);
        let writer = ArtifactWriter::new(&settings.output_dir());
        let retry = RetryPolicy::from_settings(&settings.retry);

        Ok(Self {
            settings,
            fetcher: None,
            audio,
            transcriber,
            insight,
            cache,
            writer,
            retry,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        fetcher: Arc<dyn FetchSource>,
        audio: Arc<dyn AudioFetcher>,
        transcriber: Arc<dyn Transcriber>,
        insight: Arc<dyn InsightModel>,
        cache: Arc<CacheStore>,
    ) -> Result<Self> {
        let writer = ArtifactWriter::new(&settings.output_dir());
        let retry = RetryPolicy::from_settings(&settings.retry);

        Ok(Self {
            settings,
            fetcher: Some(fetcher),
            audio,
            transcriber,
            insight,
            cache,
            writer,
            retry,
        })
    }

    /// The configured fetch backend, or the default Apify backend.
    fn fetch_source(&self) -> Result<Arc<dyn FetchSource>> {
        match &self.fetcher {
            Some(fetcher) => Ok(fetcher.clone()),
            None => Ok(Arc::new(ApifyFetcher::new(&self.settings.scrape)?)),
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the full pipeline (or the generation-only side path when a
    /// strategy file is supplied).
    #[instrument(skip(self, options), fields(niche = %options.niche))]
    pub async fn run(&self, options: RunOptions) -> Result<RunReport> {
        // Side path: a saved strategy skips fetching through aggregation.
        if let Some(path) = &options.strategy_file {
            info!("Loading saved strategy from {}", path.display());
            let strategy = load_strategy(path).map_err(|e| {
                ReelsmithError::InvalidInput(format!(
                    "Cannot load strategy file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            return self.generate_from_strategy(strategy, &options).await;
        }

        let run = RunId::new(&options.niche);
        let mut report = RunReport::new(&run, &options.niche);

        let targets = Target::parse_list(
            options
                .targets
                .as_ref()
                .unwrap_or(&self.settings.scrape.targets),
        );
        if targets.is_empty() {
            return Err(ReelsmithError::InvalidInput(
                "No scrape targets given and none configured".to_string(),
            ));
        }

        let min_views = options.min_views.unwrap_or(self.settings.scrape.min_views);
        let max_reels = options.max_reels.unwrap_or(self.settings.scrape.max_reels);

        // FETCHING
        let fetcher = self.fetch_source()?;
        info!("Fetching candidates from {} target(s)", targets.len());
        eprintln!("  Fetching candidates...");
        let candidates = self
            .retry
            .run("fetch", || fetcher.fetch(&targets, max_reels))
            .await?;
        report.fetched = candidates.len();

        if candidates.is_empty() {
            return Err(ReelsmithError::Fetch(
                "No candidates found. Try lowering min_views or adding more targets.".to_string(),
            ));
        }

        // FILTERING
        let reels = filter_reels(candidates, min_views, max_reels);
        report.kept = reels.len();
        info!(
            "{} of {} candidates kept after filtering (min_views {})",
            report.kept, report.fetched, min_views
        );

        // Per-item stages
        eprintln!("  Processing {} reels...", reels.len());
        report.items = self.process_items(reels, &options).await;
        report.cache_hits = report.items.iter().filter(|i| i.from_cache).count();
        report.transcribed = report
            .items
            .iter()
            .filter(|i| i.transcript.is_some())
            .count();
        report.analyzed = report.items.iter().filter(|i| i.analysis.is_some()).count();
        eprintln!(
            "  Transcribed {}/{} ({} from cache)",
            report.transcribed,
            report.items.len(),
            report.cache_hits
        );

        // Record fetch metadata and analyses even when aggregation can't
        // proceed; the write is non-fatal.
        match self.writer.write_reels(&run, &report.items) {
            Ok(path) => report.artifacts.push(path),
            Err(e) => {
                warn!("Failed to write reels artifact: {}", e);
                report.write_failures.push(format!("reels: {}", e));
            }
        }

        // AGGREGATING
        let analyses: Vec<ReelAnalysis> = report
            .items
            .iter()
            .filter_map(|i| i.analysis.clone())
            .collect();

        if analyses.is_empty() {
            return Err(ReelsmithError::Aggregation(
                "No items survived analysis; nothing to synthesize a strategy from".to_string(),
            ));
        }

        info!("Synthesizing strategy from {} analyses", analyses.len());
        eprintln!("  Synthesizing strategy from {} reels...", analyses.len());
        let strategy = self
            .retry
            .run("strategy synthesis", || {
                self.insight
                    .synthesize_strategy(&analyses, &options.niche, &options.instructions)
            })
            .await
            .map_err(into_aggregation)?;

        match self.writer.write_strategy(&run, &strategy) {
            Ok(path) => report.artifacts.push(path),
            Err(e) => {
                warn!("Failed to write strategy artifact: {}", e);
                report.write_failures.push(format!("strategy: {}", e));
            }
        }
        report.strategy = Some(strategy.clone());

        // GENERATING
        eprintln!("  Generating scripts...");
        self.generate_phase(&run, &strategy, &options, &mut report)
            .await?;

        Ok(report)
    }

    /// Generation-only path: produce scripts from an existing strategy
    /// without touching the fetch, audio, or transcription adapters.
    #[instrument(skip(self, strategy, options), fields(niche = %options.niche))]
    pub async fn generate_from_strategy(
        &self,
        strategy: Strategy,
        options: &RunOptions,
    ) -> Result<RunReport> {
        let run = RunId::new(&options.niche);
        let mut report = RunReport::new(&run, &options.niche);
        report.strategy = Some(strategy.clone());

        self.generate_phase(&run, &strategy, options, &mut report)
            .await?;

        Ok(report)
    }

    /// Process items through cache check, download, transcription, and
    /// analysis with bounded concurrency, preserving input order.
    async fn process_items(&self, reels: Vec<Reel>, options: &RunOptions) -> Vec<PipelineItem> {
        let max_concurrent = self.settings.transcription.max_concurrent_items.max(1);

        let mut results: Vec<(usize, PipelineItem)> = stream::iter(reels.into_iter().enumerate())
            .map(|(idx, reel)| async move {
                let item = self.process_item(reel, options).await;
                (idx, item)
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, item)| item).collect()
    }

    /// Run one reel through the per-item stages. Failures are recorded on
    /// the returned item, never propagated.
    async fn process_item(&self, reel: Reel, options: &RunOptions) -> PipelineItem {
        let mut item = PipelineItem::new(reel);
        let id = item.reel.shortcode.clone();

        // CHECK_CACHE
        if !options.force_refresh {
            match self.cache.get(&id) {
                Ok(Some(entry)) => match entry.read_transcript() {
                    Ok(text) => {
                        info!("Cache hit for {}", id);
                        item.audio_path = Some(entry.audio_path);
                        item.transcript = Some(text);
                        item.from_cache = true;
                    }
                    Err(e) => warn!("Unreadable cache entry for {}: {}", id, e),
                },
                Ok(None) => {}
                Err(e) => warn!("Cache lookup failed for {}: {}", id, e),
            }
        }

        if item.transcript.is_none() {
            // DOWNLOADING
            if options.skip_download {
                item.failure = Some(StageFailure::new(
                    Stage::Download,
                    "download skipped (skip_download) and no cache entry",
                ));
                return item;
            }

            let reel = item.reel.clone();
            let audio = match self
                .retry
                .run("audio download", || self.audio.fetch_audio(&reel))
                .await
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Download failed for {}: {}", id, e);
                    item.failure = Some(StageFailure::new(Stage::Download, e.to_string()));
                    return item;
                }
            };

            // TRANSCRIBING
            let transcript = match self.transcribe_audio(&audio).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Transcription failed for {}: {}", id, e);
                    item.failure = Some(StageFailure::new(Stage::Transcribe, e.to_string()));
                    return item;
                }
            };

            match self.cache.put(&id, &audio, &transcript) {
                Ok(entry) => item.audio_path = Some(entry.audio_path),
                Err(e) => warn!("Failed to cache {}: {}", id, e),
            }
            item.transcript = Some(transcript);
        }

        // ANALYZING
        let reel = item.reel.clone();
        let transcript = item.transcript.clone().unwrap_or_default();
        match self
            .retry
            .run("reel analysis", || {
                self.insight.analyze_reel(&reel, &transcript)
            })
            .await
        {
            Ok(analysis) => item.analysis = Some(analysis),
            Err(e) => {
                warn!("Analysis failed for {}: {}", id, e);
                item.failure = Some(StageFailure::new(Stage::Analyze, e.to_string()));
            }
        }

        item
    }

    /// Stage audio bytes to a temp file and transcribe them.
    async fn transcribe_audio(&self, audio: &[u8]) -> Result<String> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("audio.mp3");
        tokio::fs::write(&path, audio).await?;

        self.retry
            .run("transcription", || self.transcriber.transcribe(&path))
            .await
    }

    /// Generate scripts and write the script artifacts into the report.
    async fn generate_phase(
        &self,
        run: &RunId,
        strategy: &Strategy,
        options: &RunOptions,
        report: &mut RunReport,
    ) -> Result<()> {
        let count = options
            .script_count
            .unwrap_or(self.settings.generation.scripts);

        info!("Generating {} scripts for '{}'", count, options.niche);
        let scripts = self
            .generate_with_floor(strategy, &options.niche, count, &options.instructions)
            .await?;

        match self.writer.write_scripts(run, &scripts, &options.niche) {
            Ok((json_path, text_path)) => {
                report.artifacts.push(json_path);
                report.artifacts.push(text_path);
            }
            Err(e) => {
                warn!("Failed to write scripts artifact: {}", e);
                report.write_failures.push(format!("scripts: {}", e));
            }
        }

        report.scripts_generated = scripts.len();
        report.scripts = scripts;
        Ok(())
    }

    /// Generate at least `count` scripts, topping up when the model returns
    /// fewer than requested. The count is a floor, enforced within a
    /// bounded number of attempts.
    async fn generate_with_floor(
        &self,
        strategy: &Strategy,
        niche: &str,
        count: usize,
        instructions: &str,
    ) -> Result<Vec<Script>> {
        let max_attempts = self.settings.generation.max_attempts.max(1);
        let mut scripts: Vec<Script> = Vec::new();

        for attempt in 1..=max_attempts {
            let remaining = count - scripts.len();
            let batch = self
                .retry
                .run("script generation", || {
                    self.insight
                        .generate_scripts(strategy, niche, remaining, instructions)
                })
                .await
                .map_err(into_generation)?;

            scripts.extend(batch);
            if scripts.len() >= count {
                break;
            }

            warn!(
                "Model returned {}/{} scripts (attempt {}/{}), requesting {} more",
                scripts.len(),
                count,
                attempt,
                max_attempts,
                count - scripts.len()
            );
        }

        if scripts.len() < count {
            return Err(ReelsmithError::Generation(format!(
                "Produced only {} of {} requested scripts after {} attempts",
                scripts.len(),
                count,
                max_attempts
            )));
        }

        scripts.truncate(count);
        for (i, script) in scripts.iter_mut().enumerate() {
            script.index = i + 1;
        }
        Ok(scripts)
    }
}

/// Wrap an aggregation-stage error so the caller sees which stage failed.
fn into_aggregation(e: ReelsmithError) -> ReelsmithError {
    match e {
        e @ ReelsmithError::Aggregation(_) => e,
        other => ReelsmithError::Aggregation(other.to_string()),
    }
}

/// Wrap a generation-stage error so it is reported distinctly from
/// earlier-stage failures.
fn into_generation(e: ReelsmithError) -> ReelsmithError {
    match e {
        e @ ReelsmithError::Generation(_) => e,
        other => ReelsmithError::Generation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::test_reel;
    use async_trait::async_trait;
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockFetcher {
        reels: Vec<Reel>,
        calls: AtomicUsize,
    }

    impl MockFetcher {
        fn new(reels: Vec<Reel>) -> Self {
            Self {
                reels,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FetchSource for MockFetcher {
        async fn fetch(&self, _targets: &[Target], _limit: usize) -> Result<Vec<Reel>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reels.clone())
        }
    }

    struct MockAudio {
        calls: Mutex<Vec<String>>,
        fail_for: HashSet<String>,
    }

    impl MockAudio {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_for: HashSet::new(),
            }
        }

        fn failing_for(ids: &[&str]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_for: ids.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn downloaded(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AudioFetcher for MockAudio {
        async fn fetch_audio(&self, reel: &Reel) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(reel.shortcode.clone());
            if self.fail_for.contains(&reel.shortcode) {
                return Err(ReelsmithError::Download("geo-blocked".to_string()));
            }
            Ok(format!("audio-{}", reel.shortcode).into_bytes())
        }
    }

    struct MockTranscriber {
        calls: AtomicUsize,
        fail_for: HashSet<String>,
    }

    impl MockTranscriber {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_for: HashSet::new(),
            }
        }

        fn failing_for(ids: &[&str]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_for: ids.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe(&self, audio_path: &std::path::Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // The mock audio fetcher embeds the shortcode in the bytes.
            let content = std::fs::read_to_string(audio_path).unwrap_or_default();
            for id in &self.fail_for {
                if content.contains(id.as_str()) {
                    return Err(ReelsmithError::Transcription("garbled audio".to_string()));
                }
            }
            Ok(format!("transcript of {}", content))
        }
    }

    struct MockInsight {
        fail_analysis_for: HashSet<String>,
        /// Scripts returned per generate call; empty = honor the request.
        generation_schedule: Mutex<VecDeque<usize>>,
        generate_calls: AtomicUsize,
        analyze_calls: AtomicUsize,
    }

    impl MockInsight {
        fn new() -> Self {
            Self {
                fail_analysis_for: HashSet::new(),
                generation_schedule: Mutex::new(VecDeque::new()),
                generate_calls: AtomicUsize::new(0),
                analyze_calls: AtomicUsize::new(0),
            }
        }

        fn failing_analysis_for(ids: &[&str]) -> Self {
            Self {
                fail_analysis_for: ids.iter().map(|s| s.to_string()).collect(),
                ..Self::new()
            }
        }

        fn with_generation_schedule(counts: &[usize]) -> Self {
            Self {
                generation_schedule: Mutex::new(counts.iter().copied().collect()),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl InsightModel for MockInsight {
        async fn analyze_reel(&self, reel: &Reel, _transcript: &str) -> Result<ReelAnalysis> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_analysis_for.contains(&reel.shortcode) {
                return Err(ReelsmithError::Analysis("model refused".to_string()));
            }
            Ok(ReelAnalysis {
                hook: format!("hook of {}", reel.shortcode),
                ..Default::default()
            })
        }

        async fn synthesize_strategy(
            &self,
            analyses: &[ReelAnalysis],
            niche: &str,
            _instructions: &str,
        ) -> Result<Strategy> {
            Ok(Strategy {
                niche: niche.to_string(),
                winning_formula: format!("synthesized from {} analyses", analyses.len()),
                ..Default::default()
            })
        }

        async fn generate_scripts(
            &self,
            _strategy: &Strategy,
            _niche: &str,
            count: usize,
            _instructions: &str,
        ) -> Result<Vec<Script>> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            let produced = self
                .generation_schedule
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(count);
            Ok((0..produced)
                .map(|i| Script {
                    hook: format!("hook {}", i),
                    ..Default::default()
                })
                .collect())
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        fetcher: Arc<MockFetcher>,
        audio: Arc<MockAudio>,
        transcriber: Arc<MockTranscriber>,
        insight: Arc<MockInsight>,
        cache: Arc<CacheStore>,
        _dir: tempfile::TempDir,
        output_dir: PathBuf,
    }

    fn harness(
        fetcher: MockFetcher,
        audio: MockAudio,
        transcriber: MockTranscriber,
        insight: MockInsight,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("output");

        let mut settings = Settings::default();
        settings.general.cache_dir = dir.path().join("cache").display().to_string();
        settings.general.output_dir = output_dir.display().to_string();
        settings.retry.initial_delay_ms = 1;

        let fetcher = Arc::new(fetcher);
        let audio = Arc::new(audio);
        let transcriber = Arc::new(transcriber);
        let insight = Arc::new(insight);
        let cache = Arc::new(CacheStore::new(&settings.cache_dir()).unwrap());

        let orchestrator = Orchestrator::with_components(
            settings,
            fetcher.clone(),
            audio.clone(),
            transcriber.clone(),
            insight.clone(),
            cache.clone(),
        )
        .unwrap();

        Harness {
            orchestrator,
            fetcher,
            audio,
            transcriber,
            insight,
            cache,
            _dir: dir,
            output_dir,
        }
    }

    fn output_files(h: &Harness, prefix: &str) -> Vec<String> {
        match std::fs::read_dir(&h.output_dir) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|n| n.starts_with(prefix))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_cached_items_skip_download_and_transcription() {
        let reels = vec![
            test_reel("A", Some(2_000_000)),
            test_reel("B", Some(2_000_000)),
            test_reel("C", Some(2_000_000)),
        ];
        let h = harness(
            MockFetcher::new(reels),
            MockAudio::new(),
            MockTranscriber::new(),
            MockInsight::new(),
        );

        h.cache.put("A", b"audio-A", "cached transcript A").unwrap();
        h.cache.put("B", b"audio-B", "cached transcript B").unwrap();

        let report = h.orchestrator.run(RunOptions::new("fitness")).await.unwrap();

        assert_eq!(h.audio.downloaded(), vec!["C".to_string()]);
        assert_eq!(h.transcriber.call_count(), 1);
        assert_eq!(report.cache_hits, 2);
        assert_eq!(report.analyzed, 3);
        assert_eq!(
            report.items[0].transcript.as_deref(),
            Some("cached transcript A")
        );
    }

    #[tokio::test]
    async fn test_zero_survivors_is_fatal_and_writes_no_strategy() {
        let reels = vec![test_reel("A", Some(2_000_000)), test_reel("B", Some(2_000_000))];
        let h = harness(
            MockFetcher::new(reels),
            MockAudio::new(),
            MockTranscriber::new(),
            MockInsight::failing_analysis_for(&["A", "B"]),
        );

        let result = h.orchestrator.run(RunOptions::new("fitness")).await;
        assert!(matches!(result, Err(ReelsmithError::Aggregation(_))));

        assert!(output_files(&h, "strategy_").is_empty());
        assert!(output_files(&h, "scripts_").is_empty());
        // Fetch metadata is still recorded for observability.
        assert_eq!(output_files(&h, "reels_").len(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_redownloads_and_supersedes_cache() {
        let reels = vec![test_reel("A", Some(2_000_000))];
        let h = harness(
            MockFetcher::new(reels),
            MockAudio::new(),
            MockTranscriber::new(),
            MockInsight::new(),
        );

        let before = h.cache.put("A", b"stale", "stale transcript").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));

        let mut options = RunOptions::new("fitness");
        options.force_refresh = true;
        let report = h.orchestrator.run(options).await.unwrap();

        assert_eq!(h.audio.downloaded(), vec!["A".to_string()]);
        assert_eq!(h.transcriber.call_count(), 1);
        assert_eq!(report.cache_hits, 0);

        let after = h.cache.get("A").unwrap().unwrap();
        assert!(after.cached_at > before.cached_at);
        assert_eq!(
            report.items[0].transcript.as_deref(),
            Some("transcript of audio-A")
        );
    }

    #[tokio::test]
    async fn test_worked_example_with_one_transcription_failure() {
        // 8 candidates, 2 below the view threshold, truncated to 5, one
        // fails transcription; aggregation runs on 4 and generation still
        // produces the requested 10 scripts.
        let reels = vec![
            test_reel("r1", Some(5_000_000)),
            test_reel("r2", Some(4_000_000)),
            test_reel("r3", Some(900_000)),
            test_reel("r4", Some(3_000_000)),
            test_reel("r5", Some(2_000_000)),
            test_reel("r6", Some(500_000)),
            test_reel("r7", Some(1_500_000)),
            test_reel("r8", Some(1_200_000)),
        ];
        let h = harness(
            MockFetcher::new(reels),
            MockAudio::new(),
            MockTranscriber::failing_for(&["r4"]),
            MockInsight::new(),
        );

        let mut options = RunOptions::new("fitness motivation");
        options.min_views = Some(1_000_000);
        options.max_reels = Some(5);
        options.script_count = Some(10);

        let report = h.orchestrator.run(options).await.unwrap();

        assert_eq!(report.fetched, 8);
        assert_eq!(report.kept, 5);
        assert_eq!(report.transcribed, 4);
        assert_eq!(report.analyzed, 4);
        assert_eq!(report.scripts_generated, 10);
        assert_eq!(report.scripts.len(), 10);
        assert!(report
            .strategy
            .as_ref()
            .unwrap()
            .winning_formula
            .contains("4 analyses"));

        let failed = report.failed_items();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "r4");
        assert_eq!(failed[0].1.stage, Stage::Transcribe);
    }

    #[tokio::test]
    async fn test_strategy_file_bypasses_fetch_and_transcription() {
        let h = harness(
            MockFetcher::new(vec![test_reel("A", Some(2_000_000))]),
            MockAudio::new(),
            MockTranscriber::new(),
            MockInsight::new(),
        );

        let strategy_path = h._dir.path().join("strategy.json");
        let strategy = Strategy {
            niche: "fitness".to_string(),
            winning_formula: "saved".to_string(),
            ..Default::default()
        };
        std::fs::write(
            &strategy_path,
            serde_json::to_string_pretty(&strategy).unwrap(),
        )
        .unwrap();

        let mut options = RunOptions::new("fitness");
        options.strategy_file = Some(strategy_path);
        options.script_count = Some(6);

        let report = h.orchestrator.run(options).await.unwrap();

        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(h.audio.downloaded().is_empty());
        assert_eq!(h.transcriber.call_count(), 0);
        assert!(report.scripts_generated >= 6);
        assert_eq!(output_files(&h, "scripts_").len(), 2);
    }

    #[tokio::test]
    async fn test_generation_count_is_a_floor_with_top_up() {
        let h = harness(
            MockFetcher::new(vec![test_reel("A", Some(2_000_000))]),
            MockAudio::new(),
            MockTranscriber::new(),
            MockInsight::with_generation_schedule(&[7, 3]),
        );

        let mut options = RunOptions::new("fitness");
        options.script_count = Some(10);
        let report = h.orchestrator.run(options).await.unwrap();

        assert_eq!(h.insight.generate_calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.scripts.len(), 10);
        let indexes: Vec<usize> = report.scripts.iter().map(|s| s.index).collect();
        assert_eq!(indexes, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_generation_shortfall_fails_after_bounded_attempts() {
        let h = harness(
            MockFetcher::new(vec![test_reel("A", Some(2_000_000))]),
            MockAudio::new(),
            MockTranscriber::new(),
            MockInsight::with_generation_schedule(&[2, 0, 0, 0]),
        );

        let mut options = RunOptions::new("fitness");
        options.script_count = Some(10);
        let result = h.orchestrator.run(options).await;

        assert!(matches!(result, Err(ReelsmithError::Generation(_))));
        // Default bound is 3 attempts.
        assert_eq!(h.insight.generate_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_skip_download_fails_uncached_items_only() {
        let reels = vec![test_reel("A", Some(2_000_000)), test_reel("B", Some(2_000_000))];
        let h = harness(
            MockFetcher::new(reels),
            MockAudio::new(),
            MockTranscriber::new(),
            MockInsight::new(),
        );
        h.cache.put("A", b"audio-A", "cached A").unwrap();

        let mut options = RunOptions::new("fitness");
        options.skip_download = true;
        let report = h.orchestrator.run(options).await.unwrap();

        assert!(h.audio.downloaded().is_empty());
        assert_eq!(report.analyzed, 1);
        let failed = report.failed_items();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "B");
        assert_eq!(failed[0].1.stage, Stage::Download);
    }

    #[tokio::test]
    async fn test_download_failure_excludes_item_but_run_continues() {
        let reels = vec![test_reel("A", Some(2_000_000)), test_reel("B", Some(2_000_000))];
        let h = harness(
            MockFetcher::new(reels),
            MockAudio::failing_for(&["B"]),
            MockTranscriber::new(),
            MockInsight::new(),
        );

        let report = h.orchestrator.run(RunOptions::new("fitness")).await.unwrap();

        assert_eq!(report.analyzed, 1);
        assert!(report
            .strategy
            .as_ref()
            .unwrap()
            .winning_formula
            .contains("1 analyses"));
        assert_eq!(report.failed_items()[0].1.stage, Stage::Download);
    }

    #[tokio::test]
    async fn test_construction_succeeds_without_apify_token() {
        std::env::remove_var("APIFY_API_TOKEN");

        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.data_dir = dir.path().display().to_string();
        settings.general.cache_dir = dir.path().join("cache").display().to_string();
        settings.general.output_dir = dir.path().join("output").display().to_string();

        // Generation-only use must not demand the scrape credential.
        let orchestrator = Orchestrator::new(settings).unwrap();

        // The token is demanded only once a run actually scrapes.
        let result = orchestrator.run(RunOptions::new("fitness")).await;
        match result {
            Err(ReelsmithError::Config(msg)) => assert!(msg.contains("APIFY_API_TOKEN")),
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_fetch_is_fatal() {
        let h = harness(
            MockFetcher::new(Vec::new()),
            MockAudio::new(),
            MockTranscriber::new(),
            MockInsight::new(),
        );

        let result = h.orchestrator.run(RunOptions::new("fitness")).await;
        assert!(matches!(result, Err(ReelsmithError::Fetch(_))));
    }
}
