pub mod archive_scan;
pub mod crawl;
pub mod dom;
pub mod error;
pub mod evidence;
pub mod findings;
pub mod patterns;
pub mod report;

pub use archive_scan::{ArchiveScanResult, ArchiveScanStatus, scan_archive};
pub use crawl::{MappingOptions, MappingOutcome, execute_mapping};
pub use error::ExtractError;
pub use evidence::{Indicator, extract_from_html, extract_indicators};
pub use findings::{FINDINGS_FILE, Finding, FindingsLog};
pub use patterns::IndicatorType;

pub fn print_banner() {
    eprintln!(
        r#"
  moneytrail {}
  payout evidence from scam sites
  For authorized investigative use only.
"#,
        env!("CARGO_PKG_VERSION")
    );
}
