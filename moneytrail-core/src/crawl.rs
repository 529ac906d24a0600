use crate::error::Result;
use crate::evidence::extract_indicators;
use crate::findings::{Finding, FindingsLog};
use indicatif::{ProgressBar, ProgressStyle};
use moneytrail_scanner::archive::PageCapture;
use moneytrail_scanner::driver::{Authenticator, Credentials, PageDriver};
use moneytrail_scanner::result::{MappingResult, PageRecord};
use moneytrail_scanner::{CrawlPolicy, Crawler, MappingInputs};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tracing::{info, warn};

/// Options for a single mapping run
pub struct MappingOptions {
    pub start_url: String,
    pub run_id: String,
    /// Run directory; receives artifacts, `mapping.json` and findings.
    pub output_dir: PathBuf,
    pub credentials: Credentials,
    pub max_pages: usize,
    pub max_depth: usize,
    pub allow_external: bool,
    pub policy: CrawlPolicy,
    /// Run extraction on every archived page as the crawl goes.
    pub extract: bool,
    pub show_progress_bars: bool,
}

/// Callback for reporting crawl progress
pub type MappingProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct InlineFindings {
    pub findings_path: String,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingOutcome {
    pub mapping: MappingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<InlineFindings>,
}

fn page_findings(
    log: &StdMutex<FindingsLog>,
    output_dir: &std::path::Path,
    record: &PageRecord,
    capture: &PageCapture,
) {
    let Some(ref html) = capture.html else {
        return;
    };
    let page_path = record
        .content_path
        .as_ref()
        .map(|name| output_dir.join(name).display().to_string())
        .unwrap_or_default();
    let indicators = extract_indicators(
        html,
        Some(&record.url),
        record.content_path.as_deref(),
        &capture.supplementary,
    );
    if indicators.is_empty() {
        return;
    }
    match log.lock() {
        Ok(mut log) => {
            let added = log.record_page(indicators, &page_path);
            if added > 0 {
                info!("{} new indicators on {}", added, record.url);
            }
        }
        Err(_) => warn!("Findings log unavailable; dropping indicators for {}", record.url),
    }
}

/// Execute a mapping run with the given options.
///
/// The crawl itself never fails; the only error is failing to persist inline
/// findings.
pub async fn execute_mapping<D, A>(
    options: MappingOptions,
    driver: &mut D,
    authenticator: &A,
    progress_callback: Option<MappingProgressCallback>,
) -> Result<MappingOutcome>
where
    D: PageDriver,
    A: Authenticator,
{
    let MappingOptions {
        start_url,
        run_id,
        output_dir,
        credentials,
        max_pages,
        max_depth,
        allow_external,
        policy,
        extract,
        show_progress_bars,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Starting mapping...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let visited_count = Arc::new(AtomicUsize::new(0));
    let pb_clone = progress_bar.clone();
    let count_clone = visited_count.clone();
    let callback_clone = progress_callback.clone();
    let internal_progress: moneytrail_scanner::ProgressCallback =
        Arc::new(move |depth: usize, url: String| {
            let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref pb) = pb_clone {
                pb.set_message(format!("[{}] depth {} {}", count, depth, url));
                pb.tick();
            }
            if let Some(ref callback) = callback_clone {
                callback(format!("Visiting (depth {}): {}", depth, url));
            }
        });

    let mut crawler = Crawler::new()
        .with_policy(policy)
        .with_max_pages(max_pages)
        .with_max_depth(max_depth)
        .with_allow_external(allow_external)
        .with_progress_callback(internal_progress);

    let findings_log = Arc::new(StdMutex::new(FindingsLog::new()));
    if extract {
        let log_clone = findings_log.clone();
        let dir_clone = output_dir.clone();
        let page_cb: moneytrail_scanner::PageCallback =
            Arc::new(move |record: &PageRecord, capture: &PageCapture| {
                page_findings(&log_clone, &dir_clone, record, capture);
            });
        crawler = crawler.with_page_callback(page_cb);
    }

    let inputs = MappingInputs {
        run_id,
        start_url,
        output_dir: output_dir.clone(),
        credentials,
    };
    let mapping = crawler.run(driver, authenticator, &inputs).await;

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Mapping {}: {} pages recorded",
            mapping.status.as_str(),
            mapping.pages.len()
        ));
    }

    let extraction = if extract {
        let log = std::mem::take(
            &mut *findings_log
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        let path = log.write_to(&output_dir)?;
        info!(
            "Wrote {} inline findings to {}",
            log.len(),
            path.display()
        );
        Some(InlineFindings {
            findings_path: path.display().to_string(),
            findings: log.into_findings(),
        })
    } else {
        None
    };

    Ok(MappingOutcome {
        mapping,
        extraction,
    })
}
