use crate::domain::{is_same_site, normalize, registrable_domain};
use crate::policy::CrawlPolicy;
use crate::sentinel::{BlockedDomains, display_domain};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Everything the link filter needs to know about the page being expanded.
pub struct LinkScope<'a> {
    pub base_url: &'a str,
    pub home_domain: &'a str,
    pub allow_external: bool,
    pub avoid_auth_links: bool,
    pub policy: &'a CrawlPolicy,
    pub blocked_domains: &'a BlockedDomains,
}

/// Raw `href` values of every anchor in a document, in document order.
pub fn collect_anchor_targets(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

fn resolve(base_url: &str, href: &str) -> Option<String> {
    match Url::parse(base_url) {
        Ok(base) => base.join(href).ok().map(|u| u.to_string()),
        Err(_) => Some(href.to_string()),
    }
}

/// Filter raw anchor targets down to crawlable, normalized URLs.
///
/// Output preserves first-seen order and contains no duplicates.
pub fn extract_links<S: AsRef<str>>(raw_targets: &[S], scope: &LinkScope<'_>) -> Vec<String> {
    let policy = scope.policy;
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for href in raw_targets.iter().map(AsRef::as_ref) {
        let Some(absolute) = resolve(scope.base_url, href) else {
            continue;
        };
        let Some(normalized) = normalize(&absolute) else {
            continue;
        };
        if seen.contains(&normalized) {
            continue;
        }

        let domain = registrable_domain(&normalized);
        if scope.blocked_domains.contains(&domain) {
            debug!(
                "Skipping URL on blocked auth-wall domain {}: {}",
                display_domain(&domain),
                normalized
            );
            continue;
        }
        if policy.is_infra_domain(&domain, scope.home_domain) {
            debug!(
                "Skipping infra domain link ({}): {}",
                display_domain(&domain),
                normalized
            );
            continue;
        }
        if policy.is_static_asset(&normalized) {
            debug!("Skipping static asset link: {}", normalized);
            continue;
        }
        if policy.looks_like_logout(&normalized) {
            debug!("Skipping potential logout link: {}", normalized);
            continue;
        }
        if scope.avoid_auth_links
            && (policy.looks_like_login(&normalized) || policy.looks_like_register(&normalized))
        {
            debug!("Skipping auth-related link: {}", normalized);
            continue;
        }
        if !is_same_site(&normalized, scope.home_domain) {
            if !scope.allow_external {
                debug!("Skipping external URL (same-site only): {}", normalized);
                continue;
            }
            if !policy.is_allowlisted(&domain) {
                debug!("Skipping external URL (domain not allowlisted): {}", normalized);
                continue;
            }
        }

        seen.insert(normalized.clone());
        candidates.push(normalized);
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope<'a>(
        policy: &'a CrawlPolicy,
        blocked: &'a BlockedDomains,
        allow_external: bool,
    ) -> LinkScope<'a> {
        LinkScope {
            base_url: "https://home.example/account/",
            home_domain: "home.example",
            allow_external,
            avoid_auth_links: true,
            policy,
            blocked_domains: blocked,
        }
    }

    #[test]
    fn test_relative_links_resolved_and_deduplicated() {
        let policy = CrawlPolicy::default();
        let blocked = BlockedDomains::new();
        let raw = ["deposit", "/deposit#top", "https://WWW.home.example/account/deposit", "../faq"];

        let links = extract_links(&raw, &scope(&policy, &blocked, false));
        assert_eq!(
            links,
            vec![
                "https://home.example/account/deposit".to_string(),
                "https://home.example/deposit".to_string(),
                "https://home.example/faq".to_string(),
            ]
        );
    }

    #[test]
    fn test_filters_assets_auth_and_non_http() {
        let policy = CrawlPolicy::default();
        let blocked = BlockedDomains::new();
        let raw = [
            "/static/logo.png",
            "/logout",
            "/login",
            "/register",
            "mailto:support@home.example",
            "tel:+100",
            "javascript:void(0)",
            "/withdraw",
        ];

        let links = extract_links(&raw, &scope(&policy, &blocked, false));
        assert_eq!(links, vec!["https://home.example/withdraw".to_string()]);
    }

    #[test]
    fn test_auth_links_kept_when_not_avoiding() {
        let policy = CrawlPolicy::default();
        let blocked = BlockedDomains::new();
        let mut link_scope = scope(&policy, &blocked, false);
        link_scope.avoid_auth_links = false;

        let links = extract_links(&["/login", "/logout"], &link_scope);
        assert_eq!(links, vec!["https://home.example/login".to_string()]);
    }

    #[test]
    fn test_external_requires_flag_and_allowlist() {
        let policy = CrawlPolicy::default().with_external_allowlist(["partner.example"]);
        let blocked = BlockedDomains::new();
        let raw = ["https://partner.example/pay", "https://other.example/pay"];

        assert!(extract_links(&raw, &scope(&policy, &blocked, false)).is_empty());
        assert_eq!(
            extract_links(&raw, &scope(&policy, &blocked, true)),
            vec!["https://partner.example/pay".to_string()]
        );
    }

    #[test]
    fn test_infra_and_blocked_domains_dropped() {
        let policy = CrawlPolicy::default()
            .with_infra_blocklist(["evil-infra.example"])
            .with_external_allowlist(["evil-infra.example", "walled.example"]);
        let mut blocked = BlockedDomains::new();
        blocked.block("walled.example");

        let raw = ["https://evil-infra.example/x", "https://walled.example/y", "/ok"];
        let links = extract_links(&raw, &scope(&policy, &blocked, true));
        assert_eq!(links, vec!["https://home.example/ok".to_string()]);
    }

    #[test]
    fn test_collect_anchor_targets() {
        let html = r#"<html><body>
            <a href="/a">A</a><a>no href</a><a href="  ">blank</a>
            <a href="https://x.example/b">B</a>
        </body></html>"#;
        assert_eq!(
            collect_anchor_targets(html),
            vec!["/a".to_string(), "https://x.example/b".to_string()]
        );
    }
}
