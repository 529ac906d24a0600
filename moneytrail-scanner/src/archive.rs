use crate::driver::{PageDriver, bounded};
use crate::result::PageRecord;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Artifacts captured for an archived page, handed to page callbacks.
#[derive(Debug, Clone, Default)]
pub struct PageCapture {
    pub html: Option<String>,
    pub supplementary: Vec<(String, String)>,
}

/// Saves page markup and screenshots into a run directory.
///
/// Artifacts are named `{counter:02}_page.html` / `.png`; the counter starts at
/// 1 and only advances when a page is archived.
#[derive(Debug)]
pub struct PageArchiver {
    dir: PathBuf,
    counter: usize,
    timeout: Duration,
}

impl PageArchiver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: 1,
            timeout: Duration::from_millis(crate::policy::DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn archived_count(&self) -> usize {
        self.counter - 1
    }

    /// Capture the driver's current page. HTML and screenshot failures are
    /// recorded independently; the first failure is kept in `error`.
    pub async fn archive<D: PageDriver>(
        &mut self,
        driver: &mut D,
        mut record: PageRecord,
    ) -> (PageRecord, PageCapture) {
        let base_label = format!("{:02}_page", self.counter);
        self.counter += 1;

        let mut capture = PageCapture::default();
        let mut error: Option<String> = None;

        match bounded(self.timeout, "reading page content", driver.content()).await {
            Ok(html) => {
                let file_name = format!("{}.html", base_label);
                match self.save_text(&file_name, &html) {
                    Ok(()) => record.content_path = Some(file_name),
                    Err(e) => {
                        debug!("Unable to save HTML for {}: {}", record.url, e);
                        error = Some(format!("html_capture_failed: {}", e));
                    }
                }
                capture.html = Some(html);
            }
            Err(e) => {
                debug!("Unable to save HTML for {}: {}", record.url, e);
                error = Some(format!("html_capture_failed: {}", e));
            }
        }

        if driver.supports_screenshots() {
            let file_name = format!("{}.png", base_label);
            let path = self.dir.join(&file_name);
            let shot = match fs::create_dir_all(&self.dir) {
                Ok(()) => bounded(self.timeout, "taking screenshot", driver.screenshot(&path)).await,
                Err(e) => Err(e.into()),
            };
            match shot {
                Ok(()) => record.screenshot_path = Some(file_name),
                Err(e) => {
                    debug!("Unable to capture screenshot for {}: {}", record.url, e);
                    if error.is_none() {
                        error = Some(format!("screenshot_failed: {}", e));
                    }
                }
            }
        }

        if capture.html.is_some() {
            match bounded(self.timeout, "reading supplementary strings", driver.supplementary_strings())
                .await
            {
                Ok(strings) => capture.supplementary = strings,
                Err(e) => debug!("No supplementary strings for {}: {}", record.url, e),
            }
        }

        record.error = error;
        (record, capture)
    }

    fn save_text(&self, file_name: &str, content: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(file_name), content)
    }
}
