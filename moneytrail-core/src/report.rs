// Text summaries for mapping runs and extraction results

use crate::findings::Finding;
use crate::patterns::IndicatorType;
use moneytrail_scanner::result::{MappingResult, PageRecord};
use std::collections::BTreeMap;
use url::Url;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let mut path = u.path().to_string();
            if path.is_empty() {
                path = "/".to_string();
            }
            if let Some(query) = u.query() {
                path.push('?');
                path.push_str(query);
            }
            path
        })
        .unwrap_or_else(|| url.to_string())
}

fn status_label(record: &PageRecord) -> String {
    match record.status_code {
        Some(code @ 100..=199) => format!("\x1b[37m{}\x1b[0m", code), // White
        Some(code @ 200..=299) => format!("\x1b[32m{}\x1b[0m", code), // Green
        Some(code @ 300..=399) => format!("\x1b[36m{}\x1b[0m", code), // Cyan
        Some(code @ 400..=499) => format!("\x1b[33m{}\x1b[0m", code), // Orange/Yellow
        Some(code @ 500..=599) => format!("\x1b[31m{}\x1b[0m", code), // Red
        Some(code) => format!("{}", code),
        None => "\x1b[31mERR\x1b[0m".to_string(),
    }
}

/// Generate a mapping report: run summary, then pages grouped by host in crawl order.
pub fn generate_mapping_report(result: &MappingResult) -> String {
    let failed = result.pages.iter().filter(|p| p.is_failed()).count();

    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n# Summary:\n");
    report.push_str(&format!("  Run ID: {}\n", result.run_id));
    report.push_str(&format!("  Start URL: {}\n", result.start_url));
    report.push_str(&format!("  Status: {}\n", result.status.as_str()));
    report.push_str(&format!("  Pages recorded: {}\n", result.pages.len()));
    report.push_str(&format!("  Pages archived: {}\n", result.archived_count()));
    report.push_str(&format!("  Failed navigations: {}\n", failed));
    if !result.notes.is_empty() {
        report.push_str(&format!("  Notes: {}\n", result.notes));
    }
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    let mut hosts: Vec<String> = Vec::new();
    let mut by_host: BTreeMap<String, Vec<&PageRecord>> = BTreeMap::new();
    for page in &result.pages {
        let host = Url::parse(&page.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        if !by_host.contains_key(&host) {
            hosts.push(host.clone());
        }
        by_host.entry(host).or_default().push(page);
    }

    for host in &hosts {
        let pages = &by_host[host];
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} pages\n\n", pages.len()));

        for page in pages {
            let mut line = format!(
                "  {} d{} {}",
                status_label(page),
                page.depth,
                extract_url_path(&page.url)
            );
            if let Some(ref artifact) = page.content_path {
                line.push_str(&format!(" \x1b[90m{}\x1b[0m", artifact));
            }
            if let Some(ref error) = page.error {
                line.push_str(&format!(" \x1b[31m({})\x1b[0m", error));
            }
            report.push_str(&line);
            report.push('\n');
        }
        report.push('\n');
    }

    report
}

/// Generate an extraction report grouped by indicator type.
pub fn generate_findings_report(findings: &[Finding]) -> String {
    let mut by_type: BTreeMap<IndicatorType, Vec<&Finding>> = BTreeMap::new();
    for finding in findings {
        by_type.entry(finding.kind).or_default().push(finding);
    }

    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n# Findings:\n");
    report.push_str(&format!("  Total: {}\n", findings.len()));
    for (kind, items) in &by_type {
        report.push_str(&format!("  {}: {}\n", kind, items.len()));
    }
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    if findings.is_empty() {
        report.push_str("No payout identifiers found.\n");
        return report;
    }

    for (kind, items) in &by_type {
        report.push_str(&format!("## {}\n", kind));
        for finding in items {
            report.push_str(&format!("  \x1b[32m{}\x1b[0m\n", finding.value));
            if let Some(ref url) = finding.source_url {
                report.push_str(&format!("    source:  {}\n", url));
            }
            report.push_str(&format!("    context: {}\n", finding.context));
        }
        report.push('\n');
    }

    report
}
