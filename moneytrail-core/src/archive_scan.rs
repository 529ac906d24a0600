//! Offline extraction over a finished mapping run.

use crate::error::ExtractError;
use crate::evidence::extract_indicators;
use crate::findings::{FINDINGS_FILE, Finding, FindingsLog};
use moneytrail_scanner::result::{MAPPING_FILE, MappingResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveScanStatus {
    Complete,
    NoMatches,
    Error,
}

impl ArchiveScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveScanStatus::Complete => "complete",
            ArchiveScanStatus::NoMatches => "no_matches",
            ArchiveScanStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveScanResult {
    pub archive_dir: String,
    pub run_id: Option<String>,
    pub findings_path: String,
    pub findings: Vec<Finding>,
    pub status: ArchiveScanStatus,
    pub notes: String,
}

impl ArchiveScanResult {
    fn failed(archive_dir: &Path, error: ExtractError) -> Self {
        error!("{}", error);
        Self {
            archive_dir: archive_dir.display().to_string(),
            run_id: None,
            findings_path: archive_dir.join(FINDINGS_FILE).display().to_string(),
            findings: Vec::new(),
            status: ArchiveScanStatus::Error,
            notes: error.to_string(),
        }
    }
}

/// Locate an archived artifact named in `mapping.json`.
///
/// Absolute paths and paths that exist relative to the working directory are
/// used as given; otherwise the file name is looked up inside the archive.
pub fn resolve_artifact(raw: &str, archive_dir: &Path) -> PathBuf {
    let candidate = PathBuf::from(raw);
    if candidate.is_absolute() || candidate.exists() {
        return candidate;
    }
    if let Some(name) = candidate.file_name() {
        let alt = archive_dir.join(name);
        if alt.exists() {
            return alt;
        }
    }
    candidate
}

fn load_mapping(archive_dir: &Path) -> Result<MappingResult, ExtractError> {
    let mapping_path = archive_dir.join(MAPPING_FILE);
    if !mapping_path.exists() {
        return Err(ExtractError::MissingMapping(archive_dir.to_path_buf()));
    }
    debug!("Loading {} from {}", MAPPING_FILE, mapping_path.display());
    let content = fs::read_to_string(&mapping_path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Re-run extraction over every archived page of a mapping run and write
/// `extraction_results.json` next to `mapping.json`.
///
/// Missing or unreadable artifacts are skipped. Only a missing or unreadable
/// `mapping.json` yields an error result, and in that case nothing is written.
pub fn scan_archive(archive_dir: &Path) -> ArchiveScanResult {
    let mapping = match load_mapping(archive_dir) {
        Ok(mapping) => mapping,
        Err(e) => return ArchiveScanResult::failed(archive_dir, e),
    };

    let mut log = FindingsLog::new();
    for page in &mapping.pages {
        let Some(ref content_path) = page.content_path else {
            continue;
        };
        let html_path = resolve_artifact(content_path, archive_dir);
        if !html_path.exists() {
            debug!("Skipping missing HTML artifact: {}", html_path.display());
            continue;
        }
        let html = match fs::read(&html_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!("Unable to read {}: {}", html_path.display(), e);
                continue;
            }
        };

        let indicators = extract_indicators(&html, Some(&page.url), Some(content_path), &[]);
        let added = log.record_page(indicators, &html_path.display().to_string());
        if added > 0 {
            debug!("{} findings from {}", added, page.url);
        }
    }

    let status = if log.is_empty() {
        ArchiveScanStatus::NoMatches
    } else {
        ArchiveScanStatus::Complete
    };

    let findings_path = match log.write_to(archive_dir) {
        Ok(path) => path,
        Err(e) => {
            return ArchiveScanResult {
                run_id: Some(mapping.run_id),
                ..ArchiveScanResult::failed(archive_dir, e)
            };
        }
    };
    info!(
        "Archived extraction results to {} ({} findings)",
        findings_path.display(),
        log.len()
    );

    ArchiveScanResult {
        archive_dir: archive_dir.display().to_string(),
        run_id: Some(mapping.run_id),
        findings_path: findings_path.display().to_string(),
        findings: log.into_findings(),
        status,
        notes: String::new(),
    }
}
