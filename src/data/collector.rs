//! Batch collection: scrape many matches, checkpoint, clean and report

use super::scrapers::{page_delay, CommentaryScraper};
use super::save_entries;
use crate::commentary::{deduplicate, QualityFilter, QualityMetrics};
use crate::stop::StopFlag;
use crate::{CommentaryEntry, Config, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const RAW_FILE: &str = "raw_commentary.json";
pub const FILTERED_FILE: &str = "filtered_commentary.json";
pub const STATS_FILE: &str = "data_stats.json";
pub const PROGRESS_FILE: &str = "batch_progress.json";

/// Read one URL per line, ignoring blank lines and `#` comments
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Deduplicate, then apply the quality filter
pub fn clean(entries: Vec<CommentaryEntry>, filter: &QualityFilter) -> Vec<CommentaryEntry> {
    let original = entries.len();
    let unique = deduplicate(entries);
    let after_dedup = unique.len();
    let filtered = filter.filter_batch(unique);

    log::info!("Filtering complete:");
    log::info!("  Original: {}", original);
    log::info!("  After deduplication: {}", after_dedup);
    log::info!("  After quality filter: {}", filtered.len());
    filtered
}

/// Checkpoint of a batch: finished match URLs and everything scraped so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    #[serde(default)]
    pub completed_urls: Vec<String>,
    #[serde(default)]
    pub entries: Vec<CommentaryEntry>,
}

impl BatchProgress {
    /// Load a checkpoint; a missing file is an empty batch.
    ///
    /// A bare entry array from older runs counts every URL it mentions as
    /// finished.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(BatchProgress::default());
        }

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        if value.is_array() {
            let entries: Vec<CommentaryEntry> = serde_json::from_value(value)?;
            let mut completed_urls: Vec<String> = Vec::new();
            for url in entries.iter().filter_map(|e| e.url.as_ref()) {
                if !completed_urls.contains(url) {
                    completed_urls.push(url.clone());
                }
            }
            return Ok(BatchProgress { completed_urls, entries });
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_completed(&self, url: &str) -> bool {
        self.completed_urls.iter().any(|done| done == url)
    }
}

pub struct Collector {
    scraper: CommentaryScraper,
    config: Config,
    stop: StopFlag,
}

impl Collector {
    pub fn new(scraper: CommentaryScraper, config: &Config) -> Self {
        Collector {
            scraper,
            config: config.clone(),
            stop: StopFlag::new(),
        }
    }

    /// Stop between matches once `stop` is raised
    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    fn progress_path(&self) -> std::path::PathBuf {
        self.config.data.path(PROGRESS_FILE)
    }

    /// Scrape every URL not yet in the checkpoint, saving it after each match.
    ///
    /// Returns the number of entries added.
    pub fn collect_urls(&self, label: &str, urls: &[String], progress: &mut BatchProgress) -> Result<usize> {
        let pending: Vec<&String> = urls.iter().filter(|url| !progress.is_completed(url)).collect();
        if pending.len() < urls.len() {
            log::info!("Skipping {} {} matches already in the checkpoint", urls.len() - pending.len(), label);
        }
        log::info!("Collecting from {}: {} matches", label, pending.len());
        let before = progress.entries.len();
        let path = self.progress_path();

        for (i, url) in pending.iter().enumerate() {
            if i > 0 && !self.stop.sleep(page_delay(&self.config.scraper)) {
                break;
            }
            if self.stop.is_stopped() {
                break;
            }
            log::info!("Processing {} match {}/{}: {}", label, i + 1, pending.len(), url);
            progress.entries.extend(self.scraper.scrape_match(url));
            progress.completed_urls.push(url.to_string());
            progress.save(&path)?;
        }

        let collected = progress.entries.len() - before;
        log::info!("Collected {} entries from {}", collected, label);
        Ok(collected)
    }

    /// Collect both sites and save the raw accumulator.
    ///
    /// With `resume`, starts from the checkpoint and skips finished matches.
    pub fn collect_all(&self, lequipe_urls: &[String], rmc_urls: &[String], resume: bool) -> Result<Vec<CommentaryEntry>> {
        let mut progress = if resume {
            let progress = BatchProgress::load(&self.progress_path())?;
            log::info!(
                "Resuming: {} matches done, {} entries checkpointed",
                progress.completed_urls.len(),
                progress.entries.len()
            );
            progress
        } else {
            BatchProgress::default()
        };

        if !lequipe_urls.is_empty() {
            self.collect_urls("L'Équipe", lequipe_urls, &mut progress)?;
        }
        if !rmc_urls.is_empty() {
            self.collect_urls("RMC Sport", rmc_urls, &mut progress)?;
        }
        if self.stop.is_stopped() {
            log::warn!("Collection interrupted; rerun with --resume to continue");
        }

        log::info!("Total collected: {} entries", progress.entries.len());
        let raw = self.config.data.path(RAW_FILE);
        save_entries(&raw, &progress.entries)?;
        log::info!("Saved raw data to {}", raw.display());
        Ok(progress.entries)
    }

    pub fn filter_and_deduplicate(&self, entries: Vec<CommentaryEntry>) -> Result<Vec<CommentaryEntry>> {
        let filtered = clean(entries, &QualityFilter::from_config(&self.config.filter));
        let path = self.config.data.path(FILTERED_FILE);
        save_entries(&path, &filtered)?;
        log::info!("Saved filtered data to {}", path.display());
        Ok(filtered)
    }

    pub fn report(&self, entries: &[CommentaryEntry]) -> Result<QualityMetrics> {
        write_report(entries, &self.config.data.path(STATS_FILE))
    }

    /// Raw collection, cleaning and report in one pass
    pub fn run(&self, lequipe_urls: &[String], rmc_urls: &[String], resume: bool) -> Result<QualityMetrics> {
        let raw = self.collect_all(lequipe_urls, rmc_urls, resume)?;
        let filtered = self.filter_and_deduplicate(raw)?;
        self.report(&filtered)
    }
}

/// Compute, log and persist dataset metrics
pub fn write_report(entries: &[CommentaryEntry], path: &Path) -> Result<QualityMetrics> {
    let metrics = QualityMetrics::compute(entries);
    metrics.log_summary();
    metrics.save(path)?;
    log::info!("Saved report to {}", path.display());
    Ok(metrics)
}
