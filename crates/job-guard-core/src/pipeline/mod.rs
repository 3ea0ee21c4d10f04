use std::{fmt, str::FromStr, sync::Arc};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    contacts,
    legitimacy::LegitimacyProbe,
    llm::LlmClient,
    risk::{
        LegitimacyResult, LlmJudgment, RiskAggregator, RiskAssessment, ScamCheckResult,
        ScoreBreakdown, Signal, SignalBundle,
    },
    rules::{RedFlag, RedFlagDetector},
    scam_db::ScamContactStore,
};

mod recommendations;

pub use recommendations::recommendations;

/// Shortest posting text accepted for analysis, in characters.
pub const MIN_POSTING_CHARS: usize = 50;

/// A job posting plus the contact details used by the external checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub text: String,
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl JobPosting {
    /// Build a posting and fill its contact fields from the text itself.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            company_name: contacts::extract_company_name(&text),
            website: contacts::extract_website(&text),
            email: contacts::extract_email(&text),
            phone: contacts::extract_phone(&text),
            text,
        }
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = non_blank(name.into());
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = non_blank(website.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = non_blank(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = non_blank(phone.into());
        self
    }

    pub fn validate(&self) -> Result<(), PostingError> {
        let length = self.text.trim().chars().count();
        if length < MIN_POSTING_CHARS {
            return Err(PostingError::TooShort {
                length,
                minimum: MIN_POSTING_CHARS,
            });
        }
        Ok(())
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reasons a posting is rejected before any analysis runs.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostingError {
    #[error("job description too short ({length} characters, minimum {minimum})")]
    TooShort { length: usize, minimum: usize },
}

/// How much work an analysis performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Rules, scam registry and legitimacy probe.
    #[default]
    Quick,
    /// Everything in `Quick` plus the LLM judgment.
    Detailed,
}

impl FromStr for AnalysisMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "detailed" => Ok(Self::Detailed),
            other => bail!("unknown analysis mode `{other}` (expected quick or detailed)"),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Quick => "quick",
            Self::Detailed => "detailed",
        })
    }
}

/// Which path actually produced the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Quick,
    Detailed,
    /// Detailed analysis was requested but no LLM judgment could be obtained.
    QuickFallback,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Quick => "quick",
            Self::Detailed => "detailed",
            Self::QuickFallback => "quick_fallback",
        })
    }
}

/// Company details surfaced alongside the score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompanyInfo {
    pub name: Option<String>,
    pub website: Option<String>,
}

/// Everything produced by one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub mode: AnalysisMode,
    pub detection_method: DetectionMethod,
    pub assessment: RiskAssessment,
    pub breakdown: ScoreBreakdown,
    pub is_scam: bool,
    pub red_flags: Vec<RedFlag>,
    pub company: CompanyInfo,
    pub signals: SignalBundle,
    pub recommendations: Vec<String>,
}

impl AnalysisReport {
    /// Reasoning from the LLM, when a judgment was obtained.
    pub fn llm_reasoning(&self) -> Option<&str> {
        self.signals
            .llm
            .as_observed()
            .map(|judgment| judgment.reasoning.as_str())
    }
}

/// Runs the collaborators for a posting and aggregates their signals.
///
/// Only the red-flag detector is mandatory. Missing or failing collaborators
/// leave their signal unavailable, which the aggregator scores as neutral.
pub struct JobAnalyzer {
    detector: Arc<dyn RedFlagDetector>,
    scam_store: Option<Arc<dyn ScamContactStore>>,
    probe: Option<Arc<dyn LegitimacyProbe>>,
    llm: Option<Arc<dyn LlmClient>>,
    aggregator: RiskAggregator,
}

impl JobAnalyzer {
    pub fn new(detector: Arc<dyn RedFlagDetector>) -> Self {
        Self {
            detector,
            scam_store: None,
            probe: None,
            llm: None,
            aggregator: RiskAggregator::default(),
        }
    }

    pub fn with_scam_store(mut self, store: Arc<dyn ScamContactStore>) -> Self {
        self.scam_store = Some(store);
        self
    }

    pub fn with_legitimacy_probe(mut self, probe: Arc<dyn LegitimacyProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_llm(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(client);
        self
    }

    pub fn with_aggregator(mut self, aggregator: RiskAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    #[instrument(
        name = "analyze_posting",
        skip(self, posting, mode),
        fields(mode = %mode, text_len = posting.text.len())
    )]
    pub async fn analyze(&self, posting: &JobPosting, mode: AnalysisMode) -> Result<AnalysisReport> {
        posting.validate()?;

        let (flags, llm, scam, legitimacy) = tokio::join!(
            self.detector.detect(&posting.text),
            self.judge(posting, mode),
            self.lookup_contacts(posting),
            self.probe_company(posting),
        );
        let red_flags = flags.context("red flag detection failed")?;
        debug!(flag_count = red_flags.len(), "red flags collected");

        let signals = SignalBundle {
            red_flags: Signal::observed(
                red_flags
                    .iter()
                    .map(|flag| flag.description.clone())
                    .collect(),
            ),
            llm,
            scam,
            legitimacy,
        };

        let detection_method = match mode {
            AnalysisMode::Quick => DetectionMethod::Quick,
            AnalysisMode::Detailed if signals.llm.is_observed() => DetectionMethod::Detailed,
            AnalysisMode::Detailed => DetectionMethod::QuickFallback,
        };

        let breakdown = self.aggregator.explain(&signals);
        let assessment = breakdown.assessment;
        let recommendations = recommendations(&assessment, &signals, detection_method);

        info!(
            %detection_method,
            score = assessment.score(),
            verdict = %assessment.verdict(),
            degraded = signals.degraded().len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            mode,
            detection_method,
            assessment,
            breakdown,
            is_scam: assessment.is_scam(),
            red_flags,
            company: CompanyInfo {
                name: posting.company_name.clone(),
                website: posting.website.clone(),
            },
            signals,
            recommendations,
        })
    }

    async fn judge(&self, posting: &JobPosting, mode: AnalysisMode) -> Signal<LlmJudgment> {
        if mode == AnalysisMode::Quick {
            return Signal::unavailable("quick mode");
        }
        let Some(client) = &self.llm else {
            return Signal::unavailable("no LLM client configured");
        };
        observe("llm", client.judge(&posting.text).await)
    }

    async fn lookup_contacts(&self, posting: &JobPosting) -> Signal<ScamCheckResult> {
        let Some(store) = &self.scam_store else {
            return Signal::unavailable("no scam store configured");
        };
        observe(
            "scam",
            store
                .lookup(posting.email.as_deref(), posting.phone.as_deref())
                .await,
        )
    }

    async fn probe_company(&self, posting: &JobPosting) -> Signal<LegitimacyResult> {
        let Some(probe) = &self.probe else {
            return Signal::unavailable("legitimacy probe disabled");
        };
        observe(
            "legitimacy",
            probe
                .check(posting.company_name.as_deref(), posting.website.as_deref())
                .await,
        )
    }
}

fn observe<T>(signal: &'static str, result: Result<T>) -> Signal<T> {
    if let Err(err) = &result {
        warn!(signal, error = %format!("{err:#}"), "collaborator failed; scoring it as neutral");
    }
    Signal::from(result)
}
