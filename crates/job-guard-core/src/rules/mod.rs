use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod builtin;
pub mod checker;
pub mod file_repository;

/// Byte span within the checked text `(start, end)` where `start <= end`.
pub type Span = (usize, usize);

/// Distinguishes between literal keyword and regular-expression rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// ASCII case-insensitive literal phrase.
    Keyword,
    /// Regex source; case sensitivity is controlled by inline flags.
    Regex,
}

/// Definition of a single red-flag heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlagRule {
    /// Unique identifier, reported as the red-flag label (e.g. `urgency_tactics`).
    pub id: String,
    /// Human-readable summary shown in reports.
    pub description: String,
    pub kind: RuleKind,
    /// Pattern literal or regex source.
    pub pattern: String,
}

impl RedFlagRule {
    /// Construct a new rule, validating invariants before returning.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        kind: RuleKind,
        pattern: impl Into<String>,
    ) -> Result<Self, RuleValidationError> {
        let rule = Self {
            id: id.into(),
            description: description.into(),
            kind,
            pattern: pattern.into(),
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.id.trim().is_empty() {
            return Err(RuleValidationError::EmptyId);
        }
        if self.pattern.is_empty() {
            return Err(RuleValidationError::EmptyPattern {
                rule_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

/// Errors emitted while validating rule definitions.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleValidationError {
    #[error("rule id must not be blank")]
    EmptyId,
    #[error("rule `{rule_id}` pattern must not be empty")]
    EmptyPattern { rule_id: String },
}

/// A rule that fired on a posting, anchored at its first match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlag {
    pub rule_id: String,
    pub description: String,
    pub span: Span,
    pub excerpt: String,
}

/// Abstraction over rule loading so different backends (builtin table, files) can be swapped.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Retrieve the full rule set currently active.
    async fn load_rules(&self) -> AnyResult<Vec<RedFlagRule>>;

    /// Fetch a single rule by identifier if it exists.
    async fn get_rule(&self, rule_id: &str) -> AnyResult<Option<RedFlagRule>>;
}

/// Turns raw posting text into the red flags it triggers.
#[async_trait]
pub trait RedFlagDetector: Send + Sync {
    async fn detect(&self, text: &str) -> AnyResult<Vec<RedFlag>>;
}
