use crate::archive::{PageArchiver, PageCapture};
use crate::domain::{is_same_site, normalize, registrable_domain};
use crate::driver::{Authenticator, Credentials, PageDriver, bounded};
use crate::error::{Result, ScanError};
use crate::links::{LinkScope, extract_links};
use crate::policy::CrawlPolicy;
use crate::result::{MappingResult, PageRecord, ResultBuilder};
use crate::sentinel::{AuthWallSentinel, AuthWallVerdict, BlockedDomains, display_domain};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Called with `(depth, url)` each time a target is dequeued for navigation.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
/// Called after every archived page with its record and captured artifacts.
pub type PageCallback = Arc<dyn Fn(&PageRecord, &PageCapture) + Send + Sync>;

/// Per-run inputs for [`Crawler::run`].
#[derive(Debug, Clone)]
pub struct MappingInputs {
    pub run_id: String,
    pub start_url: String,
    /// Directory receiving page artifacts and `mapping.json`.
    pub output_dir: PathBuf,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueKind {
    SameSite,
    External,
}

impl QueueKind {
    fn label(&self) -> &'static str {
        match self {
            QueueKind::SameSite => "same-site",
            QueueKind::External => "external",
        }
    }
}

/// Everything the crawl loop mutates. Owned by a single run.
struct Frontier {
    same_site: VecDeque<CrawlTarget>,
    external: VecDeque<CrawlTarget>,
    visited: HashSet<String>,
    blocked: BlockedDomains,
    sentinel: AuthWallSentinel,
}

impl Frontier {
    fn new(auth_wall_threshold: u32) -> Self {
        Self {
            same_site: VecDeque::new(),
            external: VecDeque::new(),
            visited: HashSet::new(),
            blocked: BlockedDomains::new(),
            sentinel: AuthWallSentinel::new(auth_wall_threshold),
        }
    }

    fn has_pending(&self) -> bool {
        !self.same_site.is_empty() || !self.external.is_empty()
    }

    /// Same-site targets always drain before any external target.
    fn pop(&mut self) -> Option<(CrawlTarget, QueueKind)> {
        if let Some(target) = self.same_site.pop_front() {
            return Some((target, QueueKind::SameSite));
        }
        self.external
            .pop_front()
            .map(|target| (target, QueueKind::External))
    }

    fn enqueue(&mut self, url: String, depth: usize, home_domain: &str) {
        let target = CrawlTarget { url, depth };
        if is_same_site(&target.url, home_domain) {
            self.same_site.push_back(target);
        } else {
            self.external.push_back(target);
        }
    }
}

pub struct Crawler {
    policy: CrawlPolicy,
    max_pages: usize,
    max_depth: usize,
    allow_external: bool,
    progress_callback: Option<ProgressCallback>,
    page_callback: Option<PageCallback>,
}

impl Crawler {
    pub fn new() -> Self {
        Self {
            policy: CrawlPolicy::default(),
            max_pages: 100,
            max_depth: 3,
            allow_external: false,
            progress_callback: None,
            page_callback: None,
        }
    }

    pub fn with_policy(mut self, policy: CrawlPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_allow_external(mut self, allow_external: bool) -> Self {
        self.allow_external = allow_external;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_page_callback(mut self, callback: PageCallback) -> Self {
        self.page_callback = Some(callback);
        self
    }

    /// Map a site and write `mapping.json` into the run directory.
    ///
    /// Never fails: session or login problems become an `error` result with the
    /// reason in `notes`, and every page record gathered before a failure is
    /// kept. The driver session is closed on every path.
    pub async fn run<D, A>(
        &self,
        driver: &mut D,
        authenticator: &A,
        inputs: &MappingInputs,
    ) -> MappingResult
    where
        D: PageDriver,
        A: Authenticator,
    {
        let start_url = normalize(&inputs.start_url).unwrap_or_else(|| inputs.start_url.clone());
        let mut builder = ResultBuilder::new(inputs.run_id.clone(), start_url);

        info!(
            "Starting site mapping from {} (max_pages={}, max_depth={}, allow_external={})",
            inputs.start_url, self.max_pages, self.max_depth, self.allow_external
        );

        let timeout = self.policy.navigation_timeout();
        match bounded(timeout, "opening session", driver.open()).await {
            Ok(()) => {
                if let Err(e) = self.crawl(driver, authenticator, inputs, &mut builder).await {
                    error!("Mapping run failed: {}", e);
                    builder.note(e.to_string());
                }
            }
            Err(e) => {
                let e = ScanError::SessionSetup(e);
                error!("Mapping run failed: {}", e);
                builder.note(e.to_string());
            }
        }
        driver.close().await;

        let result = builder.finish();
        match result.write_to(&inputs.output_dir) {
            Ok(path) => info!("Wrote mapping to {}", path.display()),
            Err(e) => error!(
                "Failed to write mapping.json to {}: {}",
                inputs.output_dir.display(),
                e
            ),
        }
        result
    }

    async fn crawl<D, A>(
        &self,
        driver: &mut D,
        authenticator: &A,
        inputs: &MappingInputs,
        builder: &mut ResultBuilder,
    ) -> Result<()>
    where
        D: PageDriver,
        A: Authenticator,
    {
        let entry_url = normalize(&inputs.start_url)
            .ok_or_else(|| ScanError::InvalidUrl(inputs.start_url.clone()))?;
        let timeout = self.policy.navigation_timeout();

        bounded(timeout, "loading entry page", driver.goto(&entry_url)).await?;
        debug!("Loaded entry page {}", entry_url);

        debug!("Attempting authentication");
        let login = authenticator.perform_login(driver, &inputs.credentials).await;

        let landed = driver.current_url().unwrap_or_else(|| entry_url.clone());
        let start_url = normalize(&landed).unwrap_or(landed);
        let home_domain = registrable_domain(&start_url);
        builder.set_start_url(start_url.clone());

        let logged_in = login.success;
        if !logged_in {
            return Err(ScanError::Authentication {
                status: login.status,
                notes: login.notes.join(" | "),
            });
        }
        info!(
            "Authentication gate passed ({}), home domain {}",
            login.status,
            display_domain(&home_domain)
        );

        let mut frontier = Frontier::new(self.policy.auth_wall_threshold);
        let mut archiver = PageArchiver::new(&inputs.output_dir).with_timeout(timeout);
        frontier.enqueue(start_url, 0, &home_domain);

        while frontier.has_pending() && builder.page_count() < self.max_pages {
            let Some((target, queue)) = frontier.pop() else {
                break;
            };
            let CrawlTarget { url: target_url, depth } = target;

            let Some(normalized) = normalize(&target_url) else {
                debug!("Skipping invalid URL: {}", target_url);
                continue;
            };
            if !frontier.visited.insert(normalized.clone()) {
                continue;
            }
            let domain = registrable_domain(&normalized);
            if self.policy.is_infra_domain(&domain, &home_domain) {
                debug!(
                    "Skipping infra domain before navigation ({}): {}",
                    display_domain(&domain),
                    normalized
                );
                continue;
            }
            if frontier.blocked.contains(&domain) {
                debug!(
                    "Skipping URL on blocked auth-wall domain {}: {}",
                    display_domain(&domain),
                    normalized
                );
                continue;
            }

            info!("Crawling depth {} {} URL: {}", depth, queue.label(), normalized);
            if let Some(ref callback) = self.progress_callback {
                callback(depth, normalized.clone());
            }

            let navigation = match bounded(timeout, "navigating", driver.goto(&normalized)).await {
                Ok(navigation) => navigation,
                Err(e) => {
                    if e.is_timeout() {
                        warn!("Navigation timeout for {} (depth {}): {}", normalized, depth, e);
                    } else {
                        warn!("Navigation error for {} (depth {}): {}", normalized, depth, e);
                    }
                    builder.push_page(PageRecord::with_error(
                        normalized,
                        target_url,
                        depth,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            let final_url = normalize(&navigation.final_url).unwrap_or(navigation.final_url);
            let final_domain = registrable_domain(&final_url);
            frontier.visited.insert(final_url.clone());

            if final_domain != home_domain && frontier.blocked.contains(&final_domain) {
                warn!(
                    "{} redirected to blocked auth-wall domain {}; not archiving",
                    normalized,
                    display_domain(&final_domain)
                );
                builder.push_page(PageRecord::with_error(
                    normalized,
                    target_url,
                    depth,
                    format!(
                        "redirected to blocked auth-wall domain {}",
                        display_domain(&final_domain)
                    ),
                ));
                continue;
            }

            let verdict = frontier.sentinel.observe(
                &final_url,
                &final_domain,
                &home_domain,
                self.policy.looks_like_login(&final_url),
                &mut frontier.blocked,
            );

            let record = PageRecord::archived(
                final_url.clone(),
                target_url,
                navigation.status_code,
                depth,
            );
            let (record, capture) = archiver.archive(driver, record).await;
            info!(
                "Archived {} (status={:?}, depth={})",
                record.url, record.status_code, depth
            );
            if let Some(ref callback) = self.page_callback {
                callback(&record, &capture);
            }
            builder.push_page(record);

            if depth >= self.max_depth || verdict == AuthWallVerdict::SuppressLinks {
                continue;
            }

            let raw_targets =
                match bounded(timeout, "enumerating anchors", driver.anchor_targets()).await {
                    Ok(targets) => targets,
                    Err(e) => {
                        debug!("Failed to enumerate anchors on {}: {}", final_url, e);
                        continue;
                    }
                };

            let links = extract_links(
                &raw_targets,
                &LinkScope {
                    base_url: &final_url,
                    home_domain: &home_domain,
                    allow_external: self.allow_external,
                    avoid_auth_links: logged_in,
                    policy: &self.policy,
                    blocked_domains: &frontier.blocked,
                },
            );

            for link in links {
                if frontier.visited.contains(&link) {
                    continue;
                }
                let link_domain = registrable_domain(&link);
                if frontier.blocked.contains(&link_domain) {
                    debug!(
                        "Not enqueueing URL on blocked auth-wall domain {}: {}",
                        display_domain(&link_domain),
                        link
                    );
                    continue;
                }
                frontier.enqueue(link, depth + 1, &home_domain);
            }
        }

        if builder.page_count() >= self.max_pages {
            builder.mark_page_limit_hit();
        }

        info!(
            "Crawl complete. Recorded {} pages ({} archived), {} auth-wall domains blocked",
            builder.page_count(),
            archiver.archived_count(),
            frontier.blocked.len()
        );
        Ok(())
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}
