use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use colored::Colorize;
use moneytrail_core::archive_scan::{ArchiveScanStatus, scan_archive};
use moneytrail_core::crawl::{MappingOptions, MappingOutcome, execute_mapping};
use moneytrail_core::report::{generate_findings_report, generate_mapping_report};
use moneytrail_scanner::result::{MAPPING_FILE, MappingStatus};
use moneytrail_scanner::{AnonymousSession, CrawlPolicy, Credentials, HttpDriver};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use url::Url;

/// Subdirectory of a run that holds the mapping artifacts.
pub const MAP_STEP_DIR: &str = "map";

/// Run identifier `YYYYMMDD-HHMMSS-xxxx` (UTC timestamp, four random hex digits).
pub fn generate_run_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.format("%Y%m%d-%H%M%S"), &suffix[..4])
}

/// Directory of one run: `<base>/<run_id>`, with `~` expanded.
pub fn run_directory(base: &str, run_id: &str) -> PathBuf {
    let expanded = shellexpand::tilde(base);
    Path::new(expanded.as_ref()).join(run_id)
}

/// Load a crawl policy file, or the built-in defaults when none is given.
pub fn load_policy(path: Option<&PathBuf>) -> Result<CrawlPolicy> {
    match path {
        Some(path) => CrawlPolicy::from_file(path)
            .with_context(|| format!("Failed to load policy file {}", path.display())),
        None => Ok(CrawlPolicy::default()),
    }
}

/// Parse a target, trying https:// when the scheme is missing
pub fn parse_target_url(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("https://{}", line);
    if Url::parse(&with_scheme).is_ok_and(|url| url.has_host()) {
        return Some(with_scheme);
    }

    None
}

pub fn log_level(verbose: bool, quiet: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    }
}

pub fn init_logging(verbose: bool, quiet: bool) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose, quiet))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Directory holding `mapping.json` for `scan`: the given directory, or its
/// `map/` step directory when only that one has a mapping.
pub fn resolve_scan_dir(dir: &Path) -> PathBuf {
    let step_dir = dir.join(MAP_STEP_DIR);
    if !dir.join(MAPPING_FILE).exists() && step_dir.join(MAPPING_FILE).exists() {
        return step_dir;
    }
    dir.to_path_buf()
}

fn write_summary<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn print_status_line(label: &str, ok: bool, detail: &str) {
    if ok {
        eprintln!("{} {} {}", "✓".green().bold(), label.bright_white(), detail);
    } else {
        eprintln!("{} {} {}", "✗".red().bold(), label.bright_white(), detail);
    }
}

pub async fn handle_map(args: &ArgMatches, quiet: bool) -> Result<MappingOutcome> {
    let url = args
        .get_one::<String>("url")
        .context("--url is required")?
        .clone();
    let email = args.get_one::<String>("email").cloned().unwrap_or_default();
    let secret = args.get_one::<String>("secret").cloned().unwrap_or_default();
    let max_pages = *args.get_one::<usize>("max-pages").unwrap_or(&100);
    let max_depth = *args.get_one::<usize>("max-depth").unwrap_or(&3);
    let allow_external = args.get_flag("allow-external");
    let extract = args.get_flag("extract");
    let policy = load_policy(args.get_one::<PathBuf>("policy"))?;
    let output = args
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or("./data");
    let run_id = args
        .get_one::<String>("run-id")
        .cloned()
        .unwrap_or_else(|| generate_run_id(Utc::now()));

    let run_dir = run_directory(output, &run_id);
    let step_dir = run_dir.join(MAP_STEP_DIR);
    fs::create_dir_all(&step_dir)
        .with_context(|| format!("Failed to create run directory {}", step_dir.display()))?;

    if !quiet {
        eprintln!("\n{} {}", "Mapping".bright_cyan().bold(), url.bright_white());
        eprintln!("Run ID: {}", run_id);
        eprintln!("Max pages: {}  Max depth: {}", max_pages, max_depth);
        eprintln!(
            "External domains: {}\n",
            if allow_external { "allowlisted only" } else { "disabled" }
        );
    }

    let options = MappingOptions {
        start_url: url,
        run_id,
        output_dir: step_dir,
        credentials: Credentials::new(email, secret),
        max_pages,
        max_depth,
        allow_external,
        extract,
        show_progress_bars: !quiet,
        policy: policy.clone(),
    };
    let mut driver = HttpDriver::with_timeout(policy.navigation_timeout());
    let outcome = execute_mapping(options, &mut driver, &AnonymousSession, None).await?;

    write_summary(&run_dir.join("map.json"), &outcome)?;

    if !quiet {
        let mapping = &outcome.mapping;
        eprintln!("{}", generate_mapping_report(mapping));
        if let Some(ref extraction) = outcome.extraction {
            eprintln!("{}", generate_findings_report(&extraction.findings));
        }
        print_status_line(
            "Mapping",
            mapping.status != MappingStatus::Error,
            &format!("{} ({} pages)", mapping.status.as_str(), mapping.pages.len()),
        );
    }

    Ok(outcome)
}

pub fn handle_scan(args: &ArgMatches, quiet: bool) -> Result<moneytrail_core::ArchiveScanResult> {
    let dir = args
        .get_one::<PathBuf>("DIR")
        .context("a run directory is required")?;
    let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
    let dir = resolve_scan_dir(Path::new(&expanded));

    let result = scan_archive(&dir);

    if !quiet {
        if result.status != ArchiveScanStatus::Error {
            eprintln!("{}", generate_findings_report(&result.findings));
        }
        print_status_line(
            "Scan",
            result.status != ArchiveScanStatus::Error,
            &format!("{} ({} findings)", result.status.as_str(), result.findings.len()),
        );
    }

    Ok(result)
}
