use crate::domain::contains_hint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_AUTH_WALL_THRESHOLD: u32 = 2;
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 20_000;

const LOGIN_PATH_HINTS: &[&str] = &["login", "signin", "sign-in", "sign_in"];
const LOGOUT_PATH_HINTS: &[&str] = &["logout", "log-out", "signout", "sign-out", "logoff"];
const REGISTER_PATH_HINTS: &[&str] = &[
    "register",
    "signup",
    "sign-up",
    "create-account",
    "create_account",
];
const SKIP_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".css", ".js", ".ico", ".pdf", ".zip", ".rar",
    ".7z", ".tar", ".gz", ".mp4", ".mp3", ".webm", ".webp",
];
const INFRA_DOMAIN_BLOCKLIST: &[&str] = &[
    "google.com",
    "google.ch",
    "consent.google.com",
    "policies.google.com",
    "about.google.com",
    "about.google",
    "youtube.com",
    "consent.youtube.com",
    "accounts.google.com",
    "g.co",
    "goo.gl",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
];

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Traversal policy handed to the crawler at construction.
///
/// Every list has a built-in default; a JSON policy file only needs the fields
/// it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlPolicy {
    /// Registrable domains that are never navigated (unless they are the home site).
    pub infra_blocklist: HashSet<String>,
    /// External registrable domains worth following when external crawling is on.
    pub external_allowlist: HashSet<String>,
    pub login_hints: Vec<String>,
    pub logout_hints: Vec<String>,
    pub register_hints: Vec<String>,
    pub skip_extensions: Vec<String>,
    /// Login redirects on one foreign domain before it is blocked for the run.
    pub auth_wall_threshold: u32,
    pub navigation_timeout_ms: u64,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            infra_blocklist: INFRA_DOMAIN_BLOCKLIST.iter().map(|s| s.to_string()).collect(),
            external_allowlist: HashSet::new(),
            login_hints: to_strings(LOGIN_PATH_HINTS),
            logout_hints: to_strings(LOGOUT_PATH_HINTS),
            register_hints: to_strings(REGISTER_PATH_HINTS),
            skip_extensions: to_strings(SKIP_EXTENSIONS),
            auth_wall_threshold: DEFAULT_AUTH_WALL_THRESHOLD,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }
}

impl CrawlPolicy {
    /// Load a policy from a JSON file, filling missing fields with defaults.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_infra_blocklist<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.infra_blocklist = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_external_allowlist<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external_allowlist = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn looks_like_login(&self, url: &str) -> bool {
        contains_hint(url, &self.login_hints)
    }

    pub fn looks_like_logout(&self, url: &str) -> bool {
        contains_hint(url, &self.logout_hints)
    }

    pub fn looks_like_register(&self, url: &str) -> bool {
        contains_hint(url, &self.register_hints)
    }

    pub fn is_static_asset(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        self.skip_extensions
            .iter()
            .any(|ext| lowered.ends_with(&ext.to_lowercase()))
    }

    /// Infra domains are blocklisted domains other than the home site itself.
    pub fn is_infra_domain(&self, domain: &str, home_domain: &str) -> bool {
        !domain.is_empty() && domain != home_domain && self.infra_blocklist.contains(domain)
    }

    pub fn is_allowlisted(&self, domain: &str) -> bool {
        self.external_allowlist.contains(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_policy_lists() {
        let policy = CrawlPolicy::default();
        assert!(policy.infra_blocklist.contains("facebook.com"));
        assert!(policy.external_allowlist.is_empty());
        assert_eq!(policy.auth_wall_threshold, 2);
        assert_eq!(policy.navigation_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_auth_heuristics() {
        let policy = CrawlPolicy::default();
        assert!(policy.looks_like_login("https://example.com/account/sign-in"));
        assert!(policy.looks_like_logout("https://example.com/logout"));
        assert!(policy.looks_like_register("https://example.com/?action=signup"));
        assert!(!policy.looks_like_login("https://example.com/deposit"));
    }

    #[test]
    fn test_static_asset_detection() {
        let policy = CrawlPolicy::default();
        assert!(policy.is_static_asset("https://example.com/logo.PNG"));
        assert!(policy.is_static_asset("https://example.com/app.js"));
        assert!(!policy.is_static_asset("https://example.com/json"));
    }

    #[test]
    fn test_infra_domain_never_matches_home() {
        let policy = CrawlPolicy::default();
        assert!(policy.is_infra_domain("google.com", "example.com"));
        assert!(!policy.is_infra_domain("google.com", "google.com"));
        assert!(!policy.is_infra_domain("", "example.com"));
    }

    #[test]
    fn test_from_file_overrides_only_given_fields() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"{{"external_allowlist": ["partner.example"], "navigation_timeout_ms": 5000}}"#
        )?;

        let policy = CrawlPolicy::from_file(file.path())?;
        assert!(policy.is_allowlisted("partner.example"));
        assert_eq!(policy.navigation_timeout(), Duration::from_secs(5));
        assert!(policy.infra_blocklist.contains("x.com"));
        assert_eq!(policy.auth_wall_threshold, 2);
        Ok(())
    }
}
