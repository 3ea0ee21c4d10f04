use anyhow::Result;
use async_trait::async_trait;

use super::{RedFlagRule, RuleKind, RuleRepository};

/// `(id, description, kind, pattern)` for the rules compiled into the binary.
const BUILTIN_RULES: &[(&str, &str, RuleKind, &str)] = &[
    (
        "messaging_app_contact",
        "Asks to contact on Telegram/WhatsApp",
        RuleKind::Regex,
        r"Telegram|WhatsApp",
    ),
    (
        "unrealistic_salary_no_experience",
        "Unrealistic salary for no experience",
        RuleKind::Regex,
        r"(?is)no experience.*high salary|high salary.*no experience",
    ),
    (
        "upfront_personal_info",
        "Requests personal info upfront",
        RuleKind::Keyword,
        "send your details to",
    ),
    (
        "crypto_payment",
        "Mentions Bitcoin or crypto payments",
        RuleKind::Regex,
        r"Bitcoin|(?i:crypto)",
    ),
    (
        "free_email_domain",
        "Uses free/public email instead of company domain",
        RuleKind::Regex,
        r"(?i)\b(?:gmail\.com|yahoo\.com|outlook\.com)\b",
    ),
    (
        "unrealistic_salary",
        "Unrealistic salary offered (e.g. $3000/week)",
        RuleKind::Regex,
        r"\$\d{3,4}/week|\$\d{4,}/day|earn \$\d{3,4}",
    ),
    (
        "personal_details_request",
        "Asking for personal details or resume upfront",
        RuleKind::Regex,
        r"(?i)send\s+details|send\s+resume|contact\s+info|personal\s+information",
    ),
    (
        "suspicious_domain",
        "Suspicious top-level domain in website URL",
        RuleKind::Regex,
        r"\.(?:xyz|top|club|work|space|online|tk|ml)\b",
    ),
    (
        "urgency_tactics",
        "Uses urgency tactics to pressure quick decisions",
        RuleKind::Regex,
        r"(?i)urgent|immediate|asap|hurry|limited time|act now",
    ),
    (
        "too_good_to_be_true",
        "Too good to be true work-from-home offer",
        RuleKind::Regex,
        r"(?is)work from home|easy money|no experience required.*high pay",
    ),
];

/// Repository serving the default job-scam rule table.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinRuleRepository;

impl BuiltinRuleRepository {
    pub fn rules() -> Result<Vec<RedFlagRule>> {
        BUILTIN_RULES
            .iter()
            .map(|&(id, description, kind, pattern)| {
                RedFlagRule::new(id, description, kind, pattern).map_err(Into::into)
            })
            .collect()
    }
}

#[async_trait]
impl RuleRepository for BuiltinRuleRepository {
    async fn load_rules(&self) -> Result<Vec<RedFlagRule>> {
        Self::rules()
    }

    async fn get_rule(&self, rule_id: &str) -> Result<Option<RedFlagRule>> {
        Ok(Self::rules()?.into_iter().find(|rule| rule.id == rule_id))
    }
}
