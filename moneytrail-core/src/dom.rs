//! Context classification for crypto address hits.
//!
//! A document is replayed as start-tag / text / end-tag events into a small
//! automaton. Each crypto match becomes an [`Observation`] tagged as
//! `positive` (visible, user-facing placement) and/or `infra` (an attribute
//! pointing at a known third-party CDN or payment processor). A value is kept
//! only when at least one observation is positive and not infra.

use crate::patterns::{IndicatorType, crypto_matches};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use url::Url;

const BLOCKED_TAGS: &[&str] = &["script", "style", "iframe"];
const BLOCKED_ATTR_TAGS: &[&str] = &["script", "style", "iframe", "link", "meta"];
const INFRA_ATTR_NAMES: &[&str] = &["src", "href", "integrity", "content"];
const VISIBLE_TEXT_TAGS: &[&str] = &[
    "a", "b", "code", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6", "i", "label", "li", "p",
    "pre", "span", "strong", "td", "th",
];
const INFRA_DOMAIN_KEYWORDS: &[&str] = &[
    "stripe.com",
    "stripe.network",
    "js.stripe.com",
    "code.jquery.com",
    "jquery.com",
    "googleapis.com",
    "gstatic.com",
    "bootstrapcdn.com",
    "cdn.jsdelivr.net",
    "cloudflare.com",
];
const INPUT_POSITIVE_CLASS_HINTS: &[&str] = &[
    "copy",
    "clipboard",
    "address",
    "wallet",
    "readonly",
    "deposit",
    "payment",
];
const BENIGN_INPUT_TYPES: &[&str] = &["text", "tel", "hidden", ""];
/// Elements the parser synthesizes around loose text.
const DOCUMENT_WRAPPERS: &[&str] = &["html", "body"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Normal,
    /// Inside this many nested script/style/iframe elements.
    Blocked(usize),
}

/// Where a crypto match was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Text { tag: Option<String> },
    Attribute { tag: String, attr: String },
    Extra { label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub origin: Origin,
    /// Full text the match was found in, used for context.
    pub source: String,
    pub positive: bool,
    pub infra: bool,
}

impl Observation {
    pub fn qualifies(&self) -> bool {
        self.positive && !self.infra
    }
}

#[derive(Debug)]
struct Frame {
    tag: String,
    attrs: HashMap<String, String>,
}

/// Per-value observations in first-seen order.
#[derive(Debug, Default)]
pub struct Observations {
    order: Vec<(IndicatorType, String)>,
    by_key: HashMap<(IndicatorType, String), Vec<Observation>>,
}

impl Observations {
    fn record(&mut self, kind: IndicatorType, value: &str, observation: Observation) {
        let key = (kind, value.to_string());
        match self.by_key.get_mut(&key) {
            Some(list) => list.push(observation),
            None => {
                self.order.push(key.clone());
                self.by_key.insert(key, vec![observation]);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, kind: IndicatorType, value: &str) -> &[Observation] {
        self.by_key
            .get(&(kind, value.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Values with at least one qualifying observation, paired with the first
    /// such observation.
    pub fn retained(&self) -> impl Iterator<Item = (IndicatorType, &str, &Observation)> + '_ {
        self.order.iter().filter_map(|key| {
            let first = self.by_key.get(key)?.iter().find(|o| o.qualifies())?;
            Some((key.0, key.1.as_str(), first))
        })
    }
}

#[derive(Debug)]
pub struct DomScanner {
    state: ScanState,
    stack: Vec<Frame>,
    observations: Observations,
}

impl DomScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Normal,
            stack: Vec::new(),
            observations: Observations::default(),
        }
    }

    /// Parse `html` and replay it through a fresh scanner.
    pub fn scan_document(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut scanner = Self::new();
        scanner.walk(document.root_element());
        scanner
    }

    fn walk(&mut self, element: ElementRef<'_>) {
        let el = element.value();
        let attrs: Vec<(&str, &str)> = el.attrs().collect();
        self.start_tag(el.name(), &attrs);
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.walk(child);
                    }
                }
                _ => {}
            }
        }
        self.end_tag(el.name());
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn observations(&self) -> &Observations {
        &self.observations
    }

    pub fn start_tag(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        let tag = tag.to_ascii_lowercase();
        let attr_map: HashMap<String, String> = attrs
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
            .collect();

        if BLOCKED_TAGS.contains(&tag.as_str()) {
            self.state = match self.state {
                ScanState::Normal => ScanState::Blocked(1),
                ScanState::Blocked(depth) => ScanState::Blocked(depth + 1),
            };
        }

        let skip_attrs =
            matches!(self.state, ScanState::Blocked(_)) || BLOCKED_ATTR_TAGS.contains(&tag.as_str());
        if !skip_attrs {
            for (name, value) in attrs {
                if name.is_empty() {
                    continue;
                }
                let name = name.to_ascii_lowercase();
                let infra = INFRA_ATTR_NAMES.contains(&name.as_str()) && is_infra_url(value);
                let positive = is_positive_attribute(&tag, &name, &attr_map);
                self.record_matches(
                    value,
                    Origin::Attribute {
                        tag: tag.clone(),
                        attr: name,
                    },
                    positive,
                    infra,
                );
            }
        }

        self.stack.push(Frame { tag, attrs: attr_map });
    }

    pub fn end_tag(&mut self, tag: &str) {
        let tag = tag.to_ascii_lowercase();
        if BLOCKED_TAGS.contains(&tag.as_str()) {
            self.state = match self.state {
                ScanState::Blocked(depth) if depth > 1 => ScanState::Blocked(depth - 1),
                _ => ScanState::Normal,
            };
        }
        self.stack.pop();
    }

    pub fn text(&mut self, data: &str) {
        if data.trim().is_empty() {
            return;
        }
        if matches!(self.state, ScanState::Blocked(_)) {
            return;
        }
        let tag = self
            .stack
            .last()
            .map(|frame| frame.tag.as_str())
            .filter(|tag| !DOCUMENT_WRAPPERS.contains(tag));
        if tag.is_some_and(|tag| BLOCKED_ATTR_TAGS.contains(&tag)) {
            return;
        }
        let positive = tag.is_none_or(|tag| VISIBLE_TEXT_TAGS.contains(&tag));
        let tag = tag.map(str::to_string);
        self.record_matches(data, Origin::Text { tag }, positive, false);
    }

    /// Strings the page rendered outside its markup. Always positive.
    pub fn extra(&mut self, label: &str, text: &str) {
        if text.is_empty() {
            return;
        }
        self.record_matches(
            text,
            Origin::Extra {
                label: label.to_string(),
            },
            true,
            false,
        );
    }

    fn record_matches(&mut self, text: &str, origin: Origin, positive: bool, infra: bool) {
        for m in crypto_matches(text) {
            self.observations.record(
                m.kind,
                m.value,
                Observation {
                    origin: origin.clone(),
                    source: text.to_string(),
                    positive,
                    infra,
                },
            );
        }
    }

    /// Attributes of the innermost open element.
    pub fn current_attrs(&self) -> Option<&HashMap<String, String>> {
        self.stack.last().map(|frame| &frame.attrs)
    }
}

impl Default for DomScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Only `input[value]` attributes count as user-facing.
fn is_positive_attribute(tag: &str, attr: &str, attrs: &HashMap<String, String>) -> bool {
    if tag != "input" || attr != "value" {
        return false;
    }
    let input_type = attrs
        .get("type")
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_default();
    if input_type == "password" {
        return false;
    }
    let class = attrs
        .get("class")
        .map(|c| c.to_ascii_lowercase())
        .unwrap_or_default();

    attrs.contains_key("readonly")
        || attrs.contains_key("disabled")
        || INPUT_POSITIVE_CLASS_HINTS.iter().any(|hint| class.contains(hint))
        || BENIGN_INPUT_TYPES.contains(&input_type.as_str())
}

/// True when the value is a URL whose host mentions an infrastructure provider.
fn is_infra_url(value: &str) -> bool {
    let value = value.trim();
    let parsed = if value.starts_with("//") {
        Url::parse(&format!("http:{}", value))
    } else {
        Url::parse(value)
    };
    let Some(host) = parsed.ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) else {
        return false;
    };
    INFRA_DOMAIN_KEYWORDS.iter().any(|keyword| host.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETH: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
    const BTC: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";

    fn retained(html: &str) -> Vec<(IndicatorType, String)> {
        DomScanner::scan_document(html)
            .observations()
            .retained()
            .map(|(kind, value, _)| (kind, value.to_string()))
            .collect()
    }

    #[test]
    fn test_script_body_is_ignored() {
        let html = format!("<html><body><script>const w = '{}';</script></body></html>", ETH);
        assert!(retained(&html).is_empty());
    }

    #[test]
    fn test_readonly_input_is_positive() {
        let html = format!(
            r#"<html><body><input type="email" readonly value="{}"></body></html>"#,
            ETH
        );
        assert_eq!(retained(&html), vec![(IndicatorType::Eth, ETH.to_string())]);
    }

    #[test]
    fn test_password_input_is_never_positive() {
        let html = format!(
            r#"<html><body><input type="password" class="wallet" readonly value="{}"></body></html>"#,
            ETH
        );
        assert!(retained(&html).is_empty());
    }

    #[test]
    fn test_input_class_hint_and_benign_type() {
        let hinted = format!(r#"<input type="email" class="Copy-Target" value="{}">"#, ETH);
        assert_eq!(retained(&hinted).len(), 1);

        let hidden = format!(r#"<input type="hidden" value="{}">"#, ETH);
        assert_eq!(retained(&hidden).len(), 1);

        let plain = format!(r#"<input type="email" value="{}">"#, ETH);
        assert!(retained(&plain).is_empty());
    }

    #[test]
    fn test_visible_tag_text_is_positive() {
        let html = format!("<div><span>Deposit to {}</span></div>", BTC);
        assert_eq!(retained(&html), vec![(IndicatorType::Btc, BTC.to_string())]);
    }

    #[test]
    fn test_loose_text_counts_as_visible() {
        assert_eq!(retained(&format!("Send to {}", BTC)).len(), 1);
    }

    #[test]
    fn test_non_visible_tag_text_is_dropped() {
        let html = format!("<section>{}</section>", BTC);
        assert!(retained(&html).is_empty());
    }

    #[test]
    fn test_infra_attribute_does_not_qualify() {
        let html = format!(
            r#"<a href="https://js.stripe.com/v3/{}">pay</a>"#,
            ETH
        );
        let scanner = DomScanner::scan_document(&html);
        let observations = scanner.observations().get(IndicatorType::Eth, ETH);
        assert_eq!(observations.len(), 1);
        assert!(observations[0].infra);
        assert!(!observations[0].positive);
        assert!(scanner.observations().retained().next().is_none());
    }

    #[test]
    fn test_protocol_relative_infra_url() {
        assert!(is_infra_url("//cdn.jsdelivr.net/npm/x.js"));
        assert!(!is_infra_url("/static/app.js"));
        assert!(!is_infra_url("https://home.example/pay"));
    }

    #[test]
    fn test_one_positive_observation_retains_value() {
        let html = format!(
            "<html><body><script>var a='{eth}';</script><section>{eth}</section><p>Pay {eth}</p></body></html>",
            eth = ETH
        );
        let scanner = DomScanner::scan_document(&html);
        assert_eq!(scanner.observations().get(IndicatorType::Eth, ETH).len(), 2);
        let (_, _, first) = scanner.observations().retained().next().unwrap();
        assert_eq!(first.source, format!("Pay {}", ETH));
        assert_eq!(first.origin, Origin::Text { tag: Some("p".to_string()) });
    }

    #[test]
    fn test_extra_strings_always_positive() {
        let mut scanner = DomScanner::new();
        scanner.extra("clipboard", &format!("copied {}", BTC));
        let retained: Vec<_> = scanner.observations().retained().collect();
        assert_eq!(retained.len(), 1);
        assert!(matches!(retained[0].2.origin, Origin::Extra { .. }));
    }

    #[test]
    fn test_blocked_depth_tracks_nesting() {
        let mut scanner = DomScanner::new();
        scanner.start_tag("iframe", &[]);
        scanner.start_tag("script", &[]);
        assert_eq!(scanner.state(), ScanState::Blocked(2));
        scanner.end_tag("script");
        assert_eq!(scanner.state(), ScanState::Blocked(1));
        scanner.text(BTC);
        scanner.end_tag("iframe");
        assert_eq!(scanner.state(), ScanState::Normal);
        assert!(scanner.observations().is_empty());

        scanner.start_tag("p", &[("class", "note")]);
        assert_eq!(
            scanner.current_attrs().and_then(|a| a.get("class")).map(String::as_str),
            Some("note")
        );
        scanner.text(BTC);
        scanner.end_tag("p");
        assert_eq!(scanner.observations().len(), 1);
    }
}
