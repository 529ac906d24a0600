use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MAPPING_FILE: &str = "mapping.json";

/// One navigation attempt. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Final (post-redirect) URL, or the target URL when navigation failed.
    pub url: String,
    pub original_url: String,
    pub status_code: Option<u16>,
    pub content_path: Option<String>,
    pub screenshot_path: Option<String>,
    pub depth: usize,
    pub error: Option<String>,
}

impl PageRecord {
    pub fn archived(
        final_url: String,
        original_url: String,
        status_code: Option<u16>,
        depth: usize,
    ) -> Self {
        Self {
            url: final_url,
            original_url,
            status_code,
            content_path: None,
            screenshot_path: None,
            depth,
            error: None,
        }
    }

    pub fn with_error(url: String, original_url: String, depth: usize, error: String) -> Self {
        Self {
            url,
            original_url,
            status_code: None,
            content_path: None,
            screenshot_path: None,
            depth,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.content_path.is_none() && self.screenshot_path.is_none() && self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Complete,
    Partial,
    Error,
}

impl MappingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingStatus::Complete => "complete",
            MappingStatus::Partial => "partial",
            MappingStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingResult {
    pub run_id: String,
    pub start_url: String,
    pub pages: Vec<PageRecord>,
    pub status: MappingStatus,
    pub notes: String,
}

impl MappingResult {
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write `mapping.json` into `dir`, returning the file path.
    pub fn write_to(&self, dir: &Path) -> crate::error::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(MAPPING_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn archived_count(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_failed()).count()
    }
}

/// Accumulates the pieces of a [`MappingResult`] while a run is in flight.
#[derive(Debug)]
pub struct ResultBuilder {
    run_id: String,
    start_url: String,
    pages: Vec<PageRecord>,
    notes: Vec<String>,
    page_limit_hit: bool,
}

impl ResultBuilder {
    pub fn new(run_id: impl Into<String>, start_url: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_url: start_url.into(),
            pages: Vec::new(),
            notes: Vec::new(),
            page_limit_hit: false,
        }
    }

    pub fn set_start_url(&mut self, start_url: impl Into<String>) {
        self.start_url = start_url.into();
    }

    pub fn push_page(&mut self, record: PageRecord) {
        self.pages.push(record);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn mark_page_limit_hit(&mut self) {
        self.page_limit_hit = true;
    }

    /// Derive the status and produce the final result. Pages collected so far
    /// are always kept.
    pub fn finish(mut self) -> MappingResult {
        let status = if self.pages.is_empty() {
            if self.notes.is_empty() {
                self.notes.push("No pages were archived during mapping.".to_string());
            }
            MappingStatus::Error
        } else if self.page_limit_hit {
            self.notes.push("Reached page crawl limit.".to_string());
            MappingStatus::Partial
        } else {
            MappingStatus::Complete
        };

        MappingResult {
            run_id: self.run_id,
            start_url: self.start_url,
            pages: self.pages,
            status,
            notes: self.notes.join(" | "),
        }
    }
}
