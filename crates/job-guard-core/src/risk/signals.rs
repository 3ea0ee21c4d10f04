use serde::{Deserialize, Serialize};

use super::{LegitimacyResult, LlmJudgment, RedFlagSet, ScamCheckResult};

/// A collaborator result that either arrived or could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Signal<T> {
    Observed { value: T },
    Unavailable { reason: String },
}

impl<T> Signal<T> {
    pub fn observed(value: T) -> Self {
        Self::Observed { value }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn as_observed(&self) -> Option<&T> {
        match self {
            Self::Observed { value } => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, Self::Observed { .. })
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Self::Observed { .. } => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}

impl<T: Clone + Default> Signal<T> {
    /// Observed value, or the type's neutral default when unavailable.
    pub fn value_or_default(&self) -> T {
        self.as_observed().cloned().unwrap_or_default()
    }
}

impl<T> From<anyhow::Result<T>> for Signal<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Self::observed(value),
            Err(err) => Self::unavailable(format!("{err:#}")),
        }
    }
}

/// All inputs to one aggregation, each tagged with whether it was obtained.
///
/// The orchestrator decides what goes in; the aggregator only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub red_flags: Signal<RedFlagSet>,
    pub llm: Signal<LlmJudgment>,
    pub scam: Signal<ScamCheckResult>,
    pub legitimacy: Signal<LegitimacyResult>,
}

impl SignalBundle {
    /// Bundle with every signal marked unavailable.
    pub fn neutral() -> Self {
        Self {
            red_flags: Signal::unavailable("not collected"),
            llm: Signal::unavailable("not requested"),
            scam: Signal::unavailable("not checked"),
            legitimacy: Signal::unavailable("not checked"),
        }
    }

    pub fn with_red_flags(mut self, flags: RedFlagSet) -> Self {
        self.red_flags = Signal::observed(flags);
        self
    }

    pub fn with_llm(mut self, judgment: LlmJudgment) -> Self {
        self.llm = Signal::observed(judgment);
        self
    }

    pub fn with_scam(mut self, result: ScamCheckResult) -> Self {
        self.scam = Signal::observed(result);
        self
    }

    pub fn with_legitimacy(mut self, result: LegitimacyResult) -> Self {
        self.legitimacy = Signal::observed(result);
        self
    }

    /// LLM reasoning text, empty when no judgment is available.
    pub fn reasoning(&self) -> &str {
        self.llm
            .as_observed()
            .map(|judgment| judgment.reasoning.as_str())
            .unwrap_or("")
    }

    /// Names and reasons of the signals that fell back to neutral values.
    pub fn degraded(&self) -> Vec<(&'static str, &str)> {
        [
            ("red_flags", self.red_flags.unavailable_reason()),
            ("llm", self.llm.unavailable_reason()),
            ("scam", self.scam.unavailable_reason()),
            ("legitimacy", self.legitimacy.unavailable_reason()),
        ]
        .into_iter()
        .filter_map(|(name, reason)| reason.map(|reason| (name, reason)))
        .collect()
    }
}

impl Default for SignalBundle {
    fn default() -> Self {
        Self::neutral()
    }
}
