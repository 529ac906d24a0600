//! Matchers for payout identifiers and the text helpers they run over.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Characters kept on each side of a match in a context snippet.
pub const CONTEXT_RADIUS: usize = 80;

static BTC_LEGACY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[13][A-HJ-NP-Za-km-z1-9]{25,34}\b").expect("valid regex"));
static BTC_BECH32: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bbc1[qpzry9x8gf2tvdw0s3jn54khce6mua7l]{11,71}\b").expect("valid regex")
});
static ETH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b0x[a-fA-F0-9]{40}\b").expect("valid regex"));
static TRON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bT[1-9A-HJ-NP-Za-km-z]{33}\b").expect("valid regex"));

static IBAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2}[0-9]{2}[A-Z0-9]{10,30}\b").expect("valid regex"));
static BENEFICIARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:Beneficiary(?: Name)?|Account Name|Recipient|Payee)\s*[:\-]\s*([A-Za-z0-9 ,.'&()-]{3,120})",
    )
    .expect("valid regex")
});
static BANK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Bank Name|Bank|Beneficiary Bank)\s*[:\-]\s*([A-Za-z0-9 ,.'&()-]{3,120})")
        .expect("valid regex")
});

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>").expect("valid regex"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style.*?</style>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorType {
    Btc,
    Eth,
    Tron,
    Iban,
    BeneficiaryName,
    BankName,
}

impl IndicatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::Btc => "BTC",
            IndicatorType::Eth => "ETH",
            IndicatorType::Tron => "TRON",
            IndicatorType::Iban => "IBAN",
            IndicatorType::BeneficiaryName => "BENEFICIARY_NAME",
            IndicatorType::BankName => "BANK_NAME",
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pattern hit with byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch<'t> {
    pub kind: IndicatorType,
    pub value: &'t str,
    pub start: usize,
    pub end: usize,
}

/// Bech32 strings are case-insensitive but must not mix cases.
pub fn is_bech32_case_valid(value: &str) -> bool {
    let has_lower = value.chars().any(char::is_lowercase);
    let has_upper = value.chars().any(char::is_uppercase);
    !(has_lower && has_upper)
}

/// Crypto address matches in `text`: BTC (legacy, then bech32), ETH, TRON.
pub fn crypto_matches(text: &str) -> Vec<PatternMatch<'_>> {
    let mut matches = Vec::new();
    if text.is_empty() {
        return matches;
    }

    for m in BTC_LEGACY.find_iter(text) {
        matches.push(PatternMatch {
            kind: IndicatorType::Btc,
            value: m.as_str(),
            start: m.start(),
            end: m.end(),
        });
    }
    for m in BTC_BECH32.find_iter(text) {
        if !is_bech32_case_valid(m.as_str()) {
            continue;
        }
        matches.push(PatternMatch {
            kind: IndicatorType::Btc,
            value: m.as_str(),
            start: m.start(),
            end: m.end(),
        });
    }
    for (kind, pattern) in [(IndicatorType::Eth, &*ETH), (IndicatorType::Tron, &*TRON)] {
        for m in pattern.find_iter(text) {
            matches.push(PatternMatch {
                kind,
                value: m.as_str(),
                start: m.start(),
                end: m.end(),
            });
        }
    }
    matches
}

/// IBAN, beneficiary and bank name matches in `text`.
///
/// Labelled patterns report the captured name span, not the label.
pub fn banking_matches(text: &str) -> Vec<PatternMatch<'_>> {
    let mut matches = Vec::new();
    for m in IBAN.find_iter(text) {
        matches.push(PatternMatch {
            kind: IndicatorType::Iban,
            value: m.as_str(),
            start: m.start(),
            end: m.end(),
        });
    }
    for (kind, pattern) in [
        (IndicatorType::BeneficiaryName, &*BENEFICIARY),
        (IndicatorType::BankName, &*BANK),
    ] {
        for caps in pattern.captures_iter(text) {
            if let Some(name) = caps.get(1) {
                matches.push(PatternMatch {
                    kind,
                    value: name.as_str(),
                    start: name.start(),
                    end: name.end(),
                });
            }
        }
    }
    matches
}

/// Up to [`CONTEXT_RADIUS`] characters either side of `text[start..end]`, trimmed.
///
/// Offsets are byte offsets on char boundaries, as produced by the matchers.
pub fn context_snippet(text: &str, start: usize, end: usize) -> String {
    let start = start.min(text.len());
    let end = end.clamp(start, text.len());

    let from = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    text[from..to].trim().to_string()
}

/// Snippet around the first occurrence of `value` in `text`, if any.
pub fn find_context(text: &str, value: &str) -> Option<String> {
    text.find(value)
        .map(|idx| context_snippet(text, idx, idx + value.len()))
}

/// Visible text of a document: script and style bodies removed, tags replaced
/// by spaces, entities decoded, whitespace collapsed.
pub fn strip_html(raw_html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(raw_html, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = html_escape::decode_html_entities(&text);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}
