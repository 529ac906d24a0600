//! URL canonicalization and site identity.
//!
//! Every same-site, external and blocklist comparison in the crawler goes
//! through [`registrable_domain`], so two hosts belong to the same site when
//! they share a public-suffix registrable domain (`shop.example.co.uk` and
//! `example.co.uk` do, `example.co.uk` and `other.co.uk` do not).

use url::{Host, Url};

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Canonicalize a candidate URL.
///
/// Returns `None` for scheme-less input, `mailto:`/`tel:` and any other
/// non-http(s) scheme, or when the URL has no host. The result has a lower-case
/// scheme and host, no leading `www.`, no default port and no fragment.
pub fn normalize(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    let mut url = Url::parse(candidate).ok()?;
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return None;
    }

    let host = url.host_str()?.to_lowercase();
    let stripped = strip_www(&host);
    if stripped.is_empty() {
        return None;
    }
    if stripped != host {
        url.set_host(Some(stripped)).ok()?;
    }

    url.set_fragment(None);
    Some(url.to_string())
}

/// Registrable domain (domain label + public suffix) of a URL.
///
/// IP literals and hosts the suffix list cannot resolve fall back to the bare
/// host. Unparseable input yields an empty string.
pub fn registrable_domain(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };

    match parsed.host() {
        Some(Host::Domain(domain)) => {
            let host = domain.to_lowercase();
            let host = strip_www(&host);
            match psl::domain_str(host) {
                Some(registrable) => registrable.to_string(),
                None => host.to_string(),
            }
        }
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
            parsed.host_str().unwrap_or_default().to_string()
        }
        None => String::new(),
    }
}

/// True when `url` resolves to `home_domain`. An empty home domain never matches.
pub fn is_same_site(url: &str, home_domain: &str) -> bool {
    if home_domain.is_empty() {
        return false;
    }
    registrable_domain(url) == home_domain
}

/// Lower-cased path and query of a URL, empty strings when it does not parse.
pub fn path_and_query(url: &str) -> (String, String) {
    match Url::parse(url) {
        Ok(parsed) => (
            parsed.path().to_lowercase(),
            parsed.query().unwrap_or_default().to_lowercase(),
        ),
        Err(_) => (String::new(), String::new()),
    }
}

/// True when any non-empty hint occurs in the URL's path or query.
pub fn contains_hint<S: AsRef<str>>(url: &str, hints: &[S]) -> bool {
    let (path, query) = path_and_query(url);
    hints.iter().map(AsRef::as_ref).any(|hint| {
        let hint = hint.to_lowercase();
        !hint.is_empty() && (path.contains(&hint) || query.contains(&hint))
    })
}
