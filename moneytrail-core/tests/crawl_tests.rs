// Tests for mapping runs with inline extraction

use moneytrail_core::crawl::{MappingOptions, execute_mapping};
use moneytrail_core::findings::FINDINGS_FILE;
use moneytrail_core::patterns::IndicatorType;
use moneytrail_scanner::driver::{AnonymousSession, Credentials};
use moneytrail_scanner::result::{MAPPING_FILE, MappingResult, MappingStatus};
use moneytrail_scanner::{CrawlPolicy, HttpDriver};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const ETH: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
const BTC: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(format!("<html><body>{}</body></html>", body))
}

async fn scam_site() -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/deposit">Deposit</a>
               <a href="/logout">Log out</a>
               <a href="https://partner.example/promo">Partner</a>
               <a href="/assets/logo.png">logo</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/deposit"))
        .respond_with(html(&format!(
            r#"<script>var fallback = "{btc}";</script>
               <label>Your deposit address</label>
               <input class="form-control" readonly value="{eth}">
               <a href="/">Home</a>"#,
            btc = BTC,
            eth = ETH
        )))
        .mount(&mock_server)
        .await;

    mock_server
}

fn options(start_url: String, output_dir: &Path, extract: bool) -> MappingOptions {
    MappingOptions {
        start_url,
        run_id: "20250301-101500-beef".to_string(),
        output_dir: output_dir.to_path_buf(),
        credentials: Credentials::default(),
        max_pages: 10,
        max_depth: 3,
        allow_external: false,
        policy: CrawlPolicy::default(),
        extract,
        show_progress_bars: false,
    }
}

#[tokio::test]
async fn test_mapping_with_inline_extraction() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = scam_site().await;
    let dir = tempdir()?;
    let mut driver = HttpDriver::with_timeout(Duration::from_secs(5));

    let outcome = execute_mapping(
        options(mock_server.uri(), dir.path(), true),
        &mut driver,
        &AnonymousSession,
        None,
    )
    .await?;

    let mapping = &outcome.mapping;
    assert_eq!(mapping.status, MappingStatus::Complete);
    let urls: Vec<String> = mapping.pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", mock_server.uri()),
            format!("{}/deposit", mock_server.uri()),
        ]
    );
    assert_eq!(mapping.pages[1].content_path.as_deref(), Some("02_page.html"));
    assert!(mapping.pages[1].screenshot_path.is_none());

    let extraction = outcome.extraction.expect("inline extraction enabled");
    assert_eq!(extraction.findings.len(), 1);
    let finding = &extraction.findings[0];
    assert_eq!(finding.kind, IndicatorType::Eth);
    assert_eq!(finding.value, ETH);
    assert_eq!(
        finding.source_url.as_deref(),
        Some(format!("{}/deposit", mock_server.uri()).as_str())
    );
    assert!(finding.page_path.ends_with("02_page.html"));

    let on_disk = MappingResult::load(&dir.path().join(MAPPING_FILE))?;
    assert_eq!(&on_disk, mapping);
    assert!(dir.path().join(FINDINGS_FILE).exists());
    assert!(dir.path().join("01_page.html").exists());
    Ok(())
}

#[tokio::test]
async fn test_mapping_without_extraction_writes_no_findings() -> Result<(), Box<dyn std::error::Error>>
{
    let mock_server = scam_site().await;
    let dir = tempdir()?;
    let mut driver = HttpDriver::with_timeout(Duration::from_secs(5));
    let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let messages_clone = messages.clone();

    let outcome = execute_mapping(
        options(mock_server.uri(), dir.path(), false),
        &mut driver,
        &AnonymousSession,
        Some(Arc::new(move |msg: String| {
            messages_clone.lock().unwrap().push(msg);
        })),
    )
    .await?;

    assert!(outcome.extraction.is_none());
    assert!(!dir.path().join(FINDINGS_FILE).exists());
    assert_eq!(messages.lock().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_site_yields_error_result() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut driver = HttpDriver::with_timeout(Duration::from_secs(2));

    let outcome = execute_mapping(
        options("http://127.0.0.1:9/".to_string(), dir.path(), true),
        &mut driver,
        &AnonymousSession,
        None,
    )
    .await?;

    assert_eq!(outcome.mapping.status, MappingStatus::Error);
    assert!(outcome.mapping.pages.is_empty());
    assert!(!outcome.mapping.notes.is_empty());
    assert!(dir.path().join(MAPPING_FILE).exists());
    Ok(())
}
