use crate::dom::DomScanner;
use crate::patterns::{IndicatorType, banking_matches, context_snippet, find_context, strip_html};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// A payout identifier found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    #[serde(rename = "type")]
    pub kind: IndicatorType,
    pub value: String,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Archived file the page content came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl Indicator {
    fn new(kind: IndicatorType, value: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            context: context.into(),
            source_url: None,
            artifact: None,
        }
    }
}

fn crypto_indicators(html: &str, extra_strings: &[(String, String)]) -> Vec<Indicator> {
    let mut scanner = DomScanner::scan_document(html);
    for (label, text) in extra_strings {
        scanner.extra(label, text);
    }

    scanner
        .observations()
        .retained()
        .map(|(kind, value, observation)| {
            let context = find_context(&observation.source, value)
                .or_else(|| find_context(html, value))
                .unwrap_or_else(|| value.to_string());
            Indicator::new(kind, value, context)
        })
        .collect()
}

fn banking_indicators(corpus: &str) -> Vec<Indicator> {
    banking_matches(corpus)
        .into_iter()
        .map(|m| {
            Indicator::new(
                m.kind,
                m.value.trim(),
                context_snippet(corpus, m.start, m.end),
            )
        })
        .collect()
}

/// Keep the first indicator per (type, value); drop empty values.
fn deduplicate(indicators: Vec<Indicator>) -> Vec<Indicator> {
    let mut seen: HashSet<(IndicatorType, String)> = HashSet::new();
    indicators
        .into_iter()
        .filter(|indicator| {
            !indicator.value.is_empty()
                && seen.insert((indicator.kind, indicator.value.clone()))
        })
        .collect()
}

/// Extract payout identifiers from one page.
///
/// Crypto addresses go through DOM context classification. IBANs and
/// beneficiary/bank names are matched over the visible text, the
/// entity-decoded markup, and each extra string as `"label: text"`.
pub fn extract_from_html(html: &str, extra_strings: &[(String, String)]) -> Vec<Indicator> {
    let mut corpora = vec![
        strip_html(html),
        html_escape::decode_html_entities(html).into_owned(),
    ];
    for (label, text) in extra_strings {
        if text.is_empty() {
            continue;
        }
        if label.is_empty() {
            corpora.push(text.clone());
        } else {
            corpora.push(format!("{}: {}", label, text));
        }
    }

    let mut found = crypto_indicators(html, extra_strings);
    for corpus in &corpora {
        found.extend(banking_indicators(corpus));
    }

    let indicators = deduplicate(found);
    debug!("Extracted {} indicators", indicators.len());
    indicators
}

/// [`extract_from_html`] with provenance attached to each indicator.
pub fn extract_indicators(
    html: &str,
    source_url: Option<&str>,
    artifact: Option<&str>,
    extra_strings: &[(String, String)],
) -> Vec<Indicator> {
    extract_from_html(html, extra_strings)
        .into_iter()
        .map(|mut indicator| {
            indicator.source_url = source_url.map(str::to_string);
            indicator.artifact = artifact.map(str::to_string);
            indicator
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BTC: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";

    #[test]
    fn test_crypto_context_comes_from_source_text() {
        let html = format!(
            "<html><body><p>Send your deposit to {} within 24 hours</p></body></html>",
            BTC
        );
        let indicators = extract_from_html(&html, &[]);
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].kind, IndicatorType::Btc);
        assert_eq!(
            indicators[0].context,
            format!("Send your deposit to {} within 24 hours", BTC)
        );
    }

    #[test]
    fn test_labelled_extra_string_feeds_banking_patterns() {
        let extras = vec![("Beneficiary".to_string(), "Northwind Holdings".to_string())];
        let indicators = extract_from_html("<html><body></body></html>", &extras);
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].kind, IndicatorType::BeneficiaryName);
        assert_eq!(indicators[0].value, "Northwind Holdings");
    }

    #[test]
    fn test_entity_encoded_iban_is_found() {
        let html = "<div data-iban=\"GB&#56;2WEST12345698765432\"></div>";
        let indicators = extract_from_html(html, &[]);
        let ibans: Vec<&str> = indicators
            .iter()
            .filter(|i| i.kind == IndicatorType::Iban)
            .map(|i| i.value.as_str())
            .collect();
        assert_eq!(ibans, vec!["GB82WEST12345698765432"]);
    }

    #[test]
    fn test_beneficiary_value_is_trimmed() {
        let html = "<p>Recipient:   Jane Roe   </p>";
        let indicators = extract_from_html(html, &[]);
        assert!(
            indicators
                .iter()
                .any(|i| i.kind == IndicatorType::BeneficiaryName && i.value == "Jane Roe")
        );
    }

    #[test]
    fn test_extract_indicators_attaches_provenance() {
        let html = format!("<p>{}</p>", BTC);
        let indicators = extract_indicators(
            &html,
            Some("https://home.example/deposit"),
            Some("02_page.html"),
            &[],
        );
        assert_eq!(indicators[0].source_url.as_deref(), Some("https://home.example/deposit"));
        assert_eq!(indicators[0].artifact.as_deref(), Some("02_page.html"));
    }

    #[test]
    fn test_indicator_type_serializes_upper_case() {
        let indicator = Indicator::new(IndicatorType::BankName, "First Bank", "Bank: First Bank");
        let json = serde_json::to_value(&indicator).unwrap();
        assert_eq!(json["type"], "BANK_NAME");
        assert!(json.get("source_url").is_none());
    }
}
