use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Domains excluded for the rest of a run. Grows monotonically; there is no way
/// to unblock a domain once added.
#[derive(Debug, Default, Clone)]
pub struct BlockedDomains {
    domains: HashSet<String>,
}

impl BlockedDomains {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the domain was newly blocked.
    pub fn block(&mut self, domain: &str) -> bool {
        self.domains.insert(domain.to_string())
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// What the crawler should do with the page it just landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthWallVerdict {
    Expand,
    SuppressLinks,
}

/// Counts login-page landings per registrable domain and blocks foreign
/// domains that keep bouncing the crawler to a login form.
#[derive(Debug)]
pub struct AuthWallSentinel {
    threshold: u32,
    redirect_counts: HashMap<String, u32>,
}

impl AuthWallSentinel {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            redirect_counts: HashMap::new(),
        }
    }

    pub fn redirect_count(&self, domain: &str) -> u32 {
        self.redirect_counts.get(domain).copied().unwrap_or(0)
    }

    /// Inspect a completed navigation.
    ///
    /// `is_login_page` is the login-path heuristic applied to `final_url`.
    /// The home domain is never blocked, its own login prompts are only logged.
    pub fn observe(
        &mut self,
        final_url: &str,
        final_domain: &str,
        home_domain: &str,
        is_login_page: bool,
        blocked: &mut BlockedDomains,
    ) -> AuthWallVerdict {
        if !is_login_page {
            if blocked.contains(final_domain) {
                debug!(
                    "Final URL {} is on blocked auth-wall domain {}; not expanding links",
                    final_url,
                    display_domain(final_domain)
                );
                return AuthWallVerdict::SuppressLinks;
            }
            return AuthWallVerdict::Expand;
        }

        let count = self
            .redirect_counts
            .entry(final_domain.to_string())
            .or_insert(0);
        *count += 1;
        let count = *count;

        if !final_domain.is_empty() && final_domain != home_domain && count >= self.threshold {
            blocked.block(final_domain);
            warn!(
                "Repeated login redirection detected on external domain {} (count={}); blocking further navigation",
                display_domain(final_domain),
                count
            );
            AuthWallVerdict::SuppressLinks
        } else if count > 1 {
            warn!(
                "Repeated login redirection detected (count={}) at {}",
                count, final_url
            );
            AuthWallVerdict::Expand
        } else {
            info!("Encountered login-like page at {}", final_url);
            AuthWallVerdict::Expand
        }
    }
}

pub(crate) fn display_domain(domain: &str) -> &str {
    if domain.is_empty() { "<unknown>" } else { domain }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_domain_blocked_at_threshold() {
        let mut sentinel = AuthWallSentinel::new(2);
        let mut blocked = BlockedDomains::new();
        let url = "https://sso.partner.example/login";

        let first = sentinel.observe(url, "partner.example", "home.example", true, &mut blocked);
        assert_eq!(first, AuthWallVerdict::Expand);
        assert!(!blocked.contains("partner.example"));

        let second = sentinel.observe(url, "partner.example", "home.example", true, &mut blocked);
        assert_eq!(second, AuthWallVerdict::SuppressLinks);
        assert!(blocked.contains("partner.example"));
        assert_eq!(sentinel.redirect_count("partner.example"), 2);
    }

    #[test]
    fn test_home_domain_never_blocked() {
        let mut sentinel = AuthWallSentinel::new(2);
        let mut blocked = BlockedDomains::new();
        for _ in 0..5 {
            let verdict = sentinel.observe(
                "https://home.example/login",
                "home.example",
                "home.example",
                true,
                &mut blocked,
            );
            assert_eq!(verdict, AuthWallVerdict::Expand);
        }
        assert!(blocked.is_empty());
        assert_eq!(sentinel.redirect_count("home.example"), 5);
    }

    #[test]
    fn test_non_login_page_on_blocked_domain_is_not_expanded() {
        let mut sentinel = AuthWallSentinel::new(2);
        let mut blocked = BlockedDomains::new();
        blocked.block("partner.example");

        let verdict = sentinel.observe(
            "https://partner.example/news",
            "partner.example",
            "home.example",
            false,
            &mut blocked,
        );
        assert_eq!(verdict, AuthWallVerdict::SuppressLinks);
        assert_eq!(sentinel.redirect_count("partner.example"), 0);
    }

    #[test]
    fn test_blocked_domains_are_monotonic() {
        let mut blocked = BlockedDomains::new();
        assert!(blocked.block("a.example"));
        assert!(!blocked.block("a.example"));
        assert_eq!(blocked.len(), 1);
    }
}
