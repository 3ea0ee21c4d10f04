use anyhow::{bail, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::contacts::phone_digits;
use crate::risk::ScamCheckResult;

pub mod csv_store;

pub use csv_store::CsvScamStore;

/// One reported scam contact. Either field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScamContact {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl ScamContact {
    pub fn new(email: Option<&str>, phone: Option<&str>) -> Self {
        Self {
            email: email.map(str::trim).unwrap_or_default().to_string(),
            phone: phone.map(str::trim).unwrap_or_default().to_string(),
        }
    }
}

/// Fewest digits accepted in a reported phone number.
pub const MIN_PHONE_DIGITS: usize = 10;

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email shape regex")
});

/// Reasons a user-submitted scam report is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportScamError {
    #[error("either an email or a phone number must be provided")]
    MissingContact,
    #[error("invalid email format: `{email}`")]
    InvalidEmail { email: String },
    #[error("invalid phone number `{phone}`: expected at least {minimum} digits")]
    InvalidPhone { phone: String, minimum: usize },
}

/// Check a report before it reaches a store. Blank fields count as absent.
pub fn validate_report(
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<ScamContact, ReportScamError> {
    let email = email.map(str::trim).filter(|value| !value.is_empty());
    let phone = phone.map(str::trim).filter(|value| !value.is_empty());
    if email.is_none() && phone.is_none() {
        return Err(ReportScamError::MissingContact);
    }
    if let Some(email) = email.filter(|email| !EMAIL_SHAPE.is_match(email)) {
        return Err(ReportScamError::InvalidEmail {
            email: email.to_string(),
        });
    }
    if let Some(phone) = phone.filter(|phone| phone_digits(phone).len() < MIN_PHONE_DIGITS) {
        return Err(ReportScamError::InvalidPhone {
            phone: phone.to_string(),
            minimum: MIN_PHONE_DIGITS,
        });
    }
    Ok(ScamContact::new(email, phone))
}

/// Outcome of reporting a contact to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Added,
    AlreadyKnown,
}

/// Registry of contacts previously reported as scams.
#[async_trait]
pub trait ScamContactStore: Send + Sync {
    /// Email matches ignore case; phones compare digits only. Empty values never match.
    async fn lookup(&self, email: Option<&str>, phone: Option<&str>) -> Result<ScamCheckResult>;

    /// Add a contact unless its email or phone is already known.
    async fn record(&self, email: Option<&str>, phone: Option<&str>) -> Result<RecordOutcome>;
}

/// Normalized view over reported contacts used by every store.
#[derive(Debug, Default, Clone)]
pub(crate) struct ContactIndex {
    contacts: Vec<ScamContact>,
}

impl ContactIndex {
    pub(crate) fn new(contacts: Vec<ScamContact>) -> Self {
        Self { contacts }
    }

    pub(crate) fn len(&self) -> usize {
        self.contacts.len()
    }

    fn email_known(&self, email: Option<&str>) -> bool {
        let Some(needle) = normalize_email(email) else {
            return false;
        };
        self.contacts.iter().any(|contact| {
            normalize_email(Some(contact.email.as_str())).as_deref() == Some(needle.as_str())
        })
    }

    fn phone_known(&self, phone: Option<&str>) -> bool {
        let Some(needle) = normalize_phone(phone) else {
            return false;
        };
        self.contacts.iter().any(|contact| {
            normalize_phone(Some(contact.phone.as_str())).as_deref() == Some(needle.as_str())
        })
    }

    pub(crate) fn check(&self, email: Option<&str>, phone: Option<&str>) -> ScamCheckResult {
        ScamCheckResult {
            email_flagged: self.email_known(email),
            phone_flagged: self.phone_known(phone),
        }
    }

    /// Returns the contact to persist, or `None` when it is already known.
    /// The index is left untouched until [`ContactIndex::commit`].
    pub(crate) fn pending(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<ScamContact>> {
        if normalize_email(email).is_none() && normalize_phone(phone).is_none() {
            bail!("either an email or a phone number must be provided");
        }
        if self.email_known(email) || self.phone_known(phone) {
            info!("scam contact already recorded");
            return Ok(None);
        }
        Ok(Some(ScamContact::new(email, phone)))
    }

    pub(crate) fn commit(&mut self, contact: ScamContact) {
        info!(email = %contact.email, phone = %contact.phone, "recorded scam contact");
        self.contacts.push(contact);
    }
}

fn normalize_email(email: Option<&str>) -> Option<String> {
    email
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

fn normalize_phone(phone: Option<&str>) -> Option<String> {
    phone
        .map(phone_digits)
        .filter(|digits| !digits.is_empty())
}

/// Process-local registry, handy for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryScamStore {
    index: RwLock<ContactIndex>,
}

impl InMemoryScamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contacts(contacts: Vec<ScamContact>) -> Self {
        Self {
            index: RwLock::new(ContactIndex::new(contacts)),
        }
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }
}

#[async_trait]
impl ScamContactStore for InMemoryScamStore {
    async fn lookup(&self, email: Option<&str>, phone: Option<&str>) -> Result<ScamCheckResult> {
        Ok(self.index.read().await.check(email, phone))
    }

    async fn record(&self, email: Option<&str>, phone: Option<&str>) -> Result<RecordOutcome> {
        let mut index = self.index.write().await;
        Ok(match index.pending(email, phone)? {
            Some(contact) => {
                index.commit(contact);
                RecordOutcome::Added
            }
            None => RecordOutcome::AlreadyKnown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemoryScamStore {
        InMemoryScamStore::with_contacts(vec![
            ScamContact::new(Some("Recruiter@Scam.example"), None),
            ScamContact::new(None, Some("+1 (555) 010-9999")),
        ])
    }

    #[tokio::test]
    async fn lookup_matches_email_case_insensitively() {
        let store = seeded();
        let result = store
            .lookup(Some("recruiter@scam.EXAMPLE"), None)
            .await
            .unwrap();
        assert!(result.email_flagged);
        assert!(!result.phone_flagged);
    }

    #[tokio::test]
    async fn lookup_matches_phone_digits_only() {
        let store = seeded();
        let result = store.lookup(None, Some("1-555-010-9999")).await.unwrap();
        assert_eq!(
            result,
            ScamCheckResult {
                email_flagged: false,
                phone_flagged: true,
            }
        );
    }

    #[tokio::test]
    async fn empty_inputs_never_match() {
        let store = InMemoryScamStore::with_contacts(vec![ScamContact::default()]);
        let result = store.lookup(Some("  "), Some("n/a")).await.unwrap();
        assert_eq!(result, ScamCheckResult::default());
    }

    #[tokio::test]
    async fn record_skips_known_contacts() {
        let store = seeded();
        let outcome = store
            .record(Some("RECRUITER@scam.example"), Some("555-0000"))
            .await
            .unwrap();
        assert_eq!(outcome, RecordOutcome::AlreadyKnown);
        assert_eq!(store.len().await, 2);

        let outcome = store.record(Some("new@scam.example"), None).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Added);
        assert!(store
            .lookup(Some("new@scam.example"), None)
            .await
            .unwrap()
            .email_flagged);
    }

    #[test]
    fn validate_report_checks_shapes() {
        assert_eq!(
            validate_report(Some(" "), None),
            Err(ReportScamError::MissingContact)
        );
        assert!(matches!(
            validate_report(Some("not-an-email"), None),
            Err(ReportScamError::InvalidEmail { .. })
        ));
        assert_eq!(
            validate_report(None, Some("555-0199")),
            Err(ReportScamError::InvalidPhone {
                phone: "555-0199".into(),
                minimum: MIN_PHONE_DIGITS,
            })
        );
        let contact = validate_report(Some(" hr@fastjobs.example "), Some("(415) 555-0199")).unwrap();
        assert_eq!(contact.email, "hr@fastjobs.example");
        assert_eq!(contact.phone, "(415) 555-0199");
    }

    #[tokio::test]
    async fn record_requires_a_contact() {
        let store = InMemoryScamStore::new();
        let err = store.record(None, Some("---")).await.unwrap_err();
        assert!(err.to_string().contains("email or a phone"));
    }
}
