use crate::error::Result;
use crate::evidence::Indicator;
use crate::patterns::IndicatorType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const FINDINGS_FILE: &str = "extraction_results.json";

/// An indicator as persisted in `extraction_results.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: IndicatorType,
    pub value: String,
    pub context: String,
    pub page_path: String,
    pub source_url: Option<String>,
}

impl Finding {
    pub fn from_indicator(indicator: Indicator, page_path: impl Into<String>) -> Self {
        Self {
            kind: indicator.kind,
            value: indicator.value,
            context: indicator.context,
            page_path: page_path.into(),
            source_url: indicator.source_url,
        }
    }
}

/// Run-wide findings, unique by (type, value, source_url), in discovery order.
#[derive(Debug, Default)]
pub struct FindingsLog {
    findings: Vec<Finding>,
    seen: HashSet<(IndicatorType, String, Option<String>)>,
}

impl FindingsLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equivalent finding was already recorded.
    pub fn record(&mut self, finding: Finding) -> bool {
        let key = (finding.kind, finding.value.clone(), finding.source_url.clone());
        if !self.seen.insert(key) {
            return false;
        }
        self.findings.push(finding);
        true
    }

    /// Record every indicator found on one archived page. Returns how many were new.
    pub fn record_page(&mut self, indicators: Vec<Indicator>, page_path: &str) -> usize {
        indicators
            .into_iter()
            .map(|indicator| self.record(Finding::from_indicator(indicator, page_path)))
            .filter(|added| *added)
            .count()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    /// Write `extraction_results.json` into `dir`, returning the file path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        write_findings(dir, &self.findings)
    }
}

pub fn write_findings(dir: &Path, findings: &[Finding]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(FINDINGS_FILE);
    fs::write(&path, serde_json::to_string_pretty(findings)?)?;
    Ok(path)
}
