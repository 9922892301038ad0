//! Persistent progress ledger for the enrichment pipeline
//!
//! Progress is a JSON file mapping each input URL to its current stage, a
//! per-stage completion ledger, and the intermediate artifacts produced so
//! far. A resumed run consults the ledger to skip stages that already
//! succeeded instead of redoing them.

use crate::error::{Error, Result};
use crate::extract::ExtractedTool;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Lifecycle stage of one URL in the pipeline
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Extracting,
    Extracted,
    CapturingScreenshot,
    ScreenshotCaptured,
    Uploading,
    Uploaded,
    Saving,
    Completed,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Extracting => "extracting",
            Stage::Extracted => "extracted",
            Stage::CapturingScreenshot => "capturing_screenshot",
            Stage::ScreenshotCaptured => "screenshot_captured",
            Stage::Uploading => "uploading",
            Stage::Uploaded => "uploaded",
            Stage::Saving => "saving",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Stage::Pending),
            "extracting" => Ok(Stage::Extracting),
            "extracted" => Ok(Stage::Extracted),
            "capturing_screenshot" => Ok(Stage::CapturingScreenshot),
            "screenshot_captured" => Ok(Stage::ScreenshotCaptured),
            "uploading" => Ok(Stage::Uploading),
            "uploaded" => Ok(Stage::Uploaded),
            "saving" => Ok(Stage::Saving),
            "completed" => Ok(Stage::Completed),
            "failed" => Ok(Stage::Failed),
            _ => Err(Error::Other(format!("Unknown stage: {}", s))),
        }
    }
}

/// Record of one stage finishing for one URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMark {
    pub timestamp: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageMark {
    fn ok() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            success: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            success: false,
            error: Some(error),
        }
    }
}

/// Progress record for one input URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlProgress {
    pub status: Stage,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Extraction output, retained so resumed runs can skip re-extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_path: Option<String>,
    /// Completion ledger keyed by the checkpoint stages
    #[serde(default)]
    pub stages: BTreeMap<Stage, StageMark>,
}

impl Default for UrlProgress {
    fn default() -> Self {
        Self {
            status: Stage::Pending,
            attempts: 0,
            last_attempt: None,
            error: None,
            extracted: None,
            screenshot_path: None,
            asset_path: None,
            stages: BTreeMap::new(),
        }
    }
}

/// How a run treats prior progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Ignore prior progress and process everything from scratch
    Fresh,
    /// Skip completed URLs and completed stages of partial URLs
    Resume,
    /// Reprocess URLs that failed or were never attempted
    RetryFailed,
}

/// The whole progress file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    pub started_at: String,
    pub last_save: String,
    #[serde(default)]
    pub urls: BTreeMap<String, UrlProgress>,
}

impl ProgressState {
    pub fn new() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            started_at: now.clone(),
            last_save: now,
            urls: BTreeMap::new(),
        }
    }

    /// Load the ledger from disk; a missing file yields a fresh state
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No progress file at {:?}, starting fresh", path);
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let state: ProgressState = serde_json::from_str(&content)?;
        debug!("Loaded progress for {} URLs from {:?}", state.urls.len(), path);
        Ok(state)
    }

    /// Save the ledger atomically (write-then-rename)
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_save = Utc::now().to_rfc3339();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn entry(&mut self, url: &str) -> &mut UrlProgress {
        self.urls.entry(url.to_string()).or_default()
    }

    /// Whether a checkpoint stage already succeeded for this URL
    pub fn stage_done(&self, url: &str, stage: Stage) -> bool {
        self.urls
            .get(url)
            .and_then(|p| p.stages.get(&stage))
            .map(|m| m.success)
            .unwrap_or(false)
    }

    /// Move a URL into a stage, recording the attempt timestamp
    pub fn enter_stage(&mut self, url: &str, stage: Stage) {
        let entry = self.entry(url);
        entry.status = stage;
        entry.last_attempt = Some(Utc::now().to_rfc3339());
    }

    /// Record a checkpoint stage as succeeded
    pub fn mark_done(&mut self, url: &str, stage: Stage) {
        let entry = self.entry(url);
        entry.status = stage;
        entry.error = None;
        entry.stages.insert(stage, StageMark::ok());
    }

    /// Record a URL as failed, marking the stage it was in.
    ///
    /// A successful mark is never clobbered, so resumed runs still skip the
    /// stages that worked before the failure.
    pub fn mark_failed(&mut self, url: &str, error: String) {
        let entry = self.entry(url);
        let at = entry.status;
        entry.status = Stage::Failed;
        entry.attempts += 1;
        entry.error = Some(error.clone());
        let already_succeeded = entry
            .stages
            .get(&at)
            .map(|m| m.success)
            .unwrap_or(false);
        if !already_succeeded {
            entry.stages.insert(at, StageMark::failed(error));
        }
    }

    pub fn completed_count(&self) -> usize {
        self.urls
            .values()
            .filter(|p| p.status == Stage::Completed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.urls
            .values()
            .filter(|p| p.status == Stage::Failed)
            .count()
    }

    /// Select which of the input URLs this run should process
    pub fn urls_to_process<'a>(&self, input: &'a [String], mode: RunMode) -> Vec<&'a String> {
        match mode {
            RunMode::Fresh => input.iter().collect(),
            RunMode::Resume => input
                .iter()
                .filter(|url| {
                    self.urls
                        .get(url.as_str())
                        .map(|p| p.status != Stage::Completed)
                        .unwrap_or(true)
                })
                .collect(),
            // A URL with no ledger entry (or one that never got past pending)
            // was never attempted, so it counts as failed here.
            RunMode::RetryFailed => input
                .iter()
                .filter(|url| {
                    self.urls
                        .get(url.as_str())
                        .map(|p| matches!(p.status, Stage::Failed | Stage::Pending))
                        .unwrap_or(true)
                })
                .collect(),
        }
    }

    /// Drop ledger entries for a fresh run so no stale stage marks survive
    pub fn reset_urls(&mut self, input: &[String]) {
        for url in input {
            self.urls.remove(url);
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}
