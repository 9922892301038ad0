//! Batch enrichment command

use crate::capture::{is_capture_available, BrowserCapturer, DryRunCapturer, ScreenshotCapturer};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{DryRunExtractor, ExtractClient, Extractor};
use crate::pipeline::{
    read_url_file, DryRunWriter, Pipeline, PipelineReport, RunMode, ToolWriter,
};
use crate::storage::{AssetUploader, DryRunUploader, StorageClient};
use crate::store::CatalogDb;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub url_file: PathBuf,
    pub mode: RunMode,
    pub dry_run: bool,
    pub batch_size: Option<usize>,
}

/// Run the enrichment pipeline over a URL file
pub async fn cmd_process(
    config: &Config,
    db: &CatalogDb,
    options: ProcessOptions,
) -> Result<PipelineReport> {
    let urls = read_url_file(&options.url_file)?;
    if urls.is_empty() {
        return Err(Error::Config(format!(
            "No URLs found in {}",
            options.url_file.display()
        )));
    }
    info!("Loaded {} URLs from {}", urls.len(), options.url_file.display());

    let mut pipeline_config = config.pipeline.clone();
    if let Some(batch_size) = options.batch_size {
        if batch_size == 0 {
            return Err(Error::Config("batch size must be positive".to_string()));
        }
        pipeline_config.batch_size = batch_size;
    }

    let (extractor, capturer, uploader, writer): (
        Arc<dyn Extractor>,
        Arc<dyn ScreenshotCapturer>,
        Arc<dyn AssetUploader>,
        Arc<dyn ToolWriter>,
    ) = if options.dry_run {
        info!("Dry run: no network calls, no writes");
        (
            Arc::new(DryRunExtractor),
            Arc::new(DryRunCapturer),
            Arc::new(DryRunUploader),
            Arc::new(DryRunWriter),
        )
    } else {
        if !is_capture_available() {
            warn!("Built without browser capture; screenshot stages will fail");
        }
        let api_key = config.extract_api_key().ok_or_else(|| {
            Error::Config(format!(
                "{} is not set; export it or use --dry-run",
                config.extract.api_key_env
            ))
        })?;
        (
            Arc::new(ExtractClient::new(&config.extract, api_key)?),
            Arc::new(BrowserCapturer::new(config.capture.clone())),
            Arc::new(StorageClient::new(&config.storage)?),
            Arc::new(db.clone()),
        )
    };

    let pipeline = Pipeline::new(
        extractor,
        capturer,
        uploader,
        writer,
        pipeline_config,
        config.paths.screenshot_dir.clone(),
        config.paths.progress_file.clone(),
    );

    // Ctrl-C requests a clean stop at the next URL boundary
    let cancel = pipeline.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let report = pipeline.run(&urls, options.mode).await?;
    info!("Catalog now holds {} tools", db.tool_count().await?);

    std::fs::write(
        &config.paths.results_file,
        serde_json::to_string_pretty(&report)?,
    )?;

    if report.interrupted {
        warn!(
            "Run interrupted; progress saved to {}",
            config.paths.progress_file.display()
        );
    }

    Ok(report)
}

pub fn print_report(report: &PipelineReport) {
    println!("\nProcessing complete");
    println!("  URLs in file:   {}", report.input_count);
    println!("  Selected:       {}", report.selected_count);
    println!("  Skipped:        {}", report.skipped_count);
    println!("  Completed:      {}", report.completed);
    println!("  Failed:         {}", report.failed);
    if report.failed > 0 {
        println!("\nRerun with --retry-failed to reprocess failures.");
    }
    if report.interrupted {
        println!("\nRun was interrupted. Rerun with --resume to continue.");
    }
}
