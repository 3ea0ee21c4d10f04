//! Regex extraction of contact details and company hints from posting text.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email regex")
});

static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // international, optionally parenthesised leading group
        r"\+?\(?\d{1,4}\)?[\s-]?\(?\d{2,4}\)?[\s-]?[\d\s-]{6,15}",
        // (XXX) XXX-XXXX
        r"\(\d{3}\)[\s-]?\d{3}[\s-]?\d{4}",
        // XXX-XXX-XXXX
        r"\d{3}[\s-]?\d{3}[\s-]?\d{4}",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("phone regex"))
    .collect()
});

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"https?://[-\w.]+(?::\d+)?(?:/[\w/.\-]*(?:\?[\w&=%.\-]*)?(?:#[\w.\-]*)?)?",
    )
    .expect("url regex")
});

static WWW_DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"www\.[-\w.]+\.[a-zA-Z]{2,4}").expect("www regex"));

static COMPANY_HIRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z][A-Za-z&]*(?:\s+[A-Z][A-Za-z&]*)*?)\s+(?:Inc|LLC|Corp|Ltd|Co)\.?\s+is\s+hiring")
        .expect("company hiring regex")
});

static COMPANY_PREPOSITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:at|join|with)\s+([A-Z][A-Za-z&]*(?:\s+[A-Z][A-Za-z&]*)*)")
        .expect("company preposition regex")
});

const LEGAL_SUFFIXES: &[&str] = &["Inc", "LLC", "Corp", "Ltd", "Co"];

/// First email address in the text.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// First phone number, trying international, parenthesised and dashed forms in order.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_PATTERNS
        .iter()
        .find_map(|regex| regex.find(text))
        .map(|m| m.as_str().trim().to_string())
        .filter(|phone| !phone.is_empty())
}

/// First `http(s)://` URL, or a bare `www.` domain prefixed with `https://`.
pub fn extract_website(text: &str) -> Option<String> {
    if let Some(url) = URL.find(text) {
        return Some(url.as_str().trim_end_matches('.').to_string());
    }
    WWW_DOMAIN
        .find(text)
        .map(|m| format!("https://{}", m.as_str()))
}

/// Company name from `<Name> Inc is hiring` or `at|join|with <Name>` phrasing.
pub fn extract_company_name(text: &str) -> Option<String> {
    let captured = COMPANY_HIRING
        .captures(text)
        .or_else(|| COMPANY_PREPOSITION.captures(text))
        .and_then(|caps| caps.get(1))?;
    let mut words: Vec<_> = captured.as_str().split_whitespace().collect();
    while words.len() > 1
        && words
            .last()
            .is_some_and(|word| LEGAL_SUFFIXES.contains(&word.trim_end_matches('.')))
    {
        words.pop();
    }
    let name = words.join(" ");
    (!name.is_empty()).then_some(name)
}

/// Digits of a phone number, used for registry comparisons.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}
