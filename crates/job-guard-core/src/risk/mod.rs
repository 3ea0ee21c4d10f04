use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod signals;

pub use signals::{Signal, SignalBundle};

/// Points contributed by each triggered red flag.
pub const RED_FLAG_POINTS: u32 = 15;
/// Upper bound shared by every sub-score and the final score.
pub const SCORE_MAX: u8 = 100;
/// Scores at or above this value are classified as high risk.
pub const HIGH_THRESHOLD: u8 = 70;
/// Scores at or above this value (and below [`HIGH_THRESHOLD`]) are medium risk.
pub const MEDIUM_THRESHOLD: u8 = 40;
/// Minimum final score once the LLM reasoning reports high risk.
pub const HIGH_LLM_FLOOR: u8 = 60;
/// Final scores at or above this value are treated as scams by callers.
pub const SCAM_THRESHOLD: u8 = 60;

/// Labels of the heuristic rules that fired for a posting. Only the count is scored.
pub type RedFlagSet = Vec<String>;

/// Result of looking up a posting's contact details in the scam registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScamCheckResult {
    pub email_flagged: bool,
    pub phone_flagged: bool,
}

/// Whether the company's public presence could be verified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegitimacyResult {
    pub website_exists: bool,
    pub linkedin_exists: bool,
}

/// Untrusted judgment returned by an LLM.
///
/// Only `reasoning` takes part in aggregation; the structured fields are kept
/// for reporting and may be missing or out of range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmJudgment {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub risk_score: Option<i64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
}

impl LlmJudgment {
    pub fn from_reasoning(reasoning: impl Into<String>) -> Self {
        Self {
            reasoning: reasoning.into(),
            ..Self::default()
        }
    }

    /// The model's own numeric score, clamped into `0..=100`.
    pub fn normalized_score(&self) -> Option<u8> {
        self.risk_score
            .map(|score| score.clamp(0, SCORE_MAX as i64) as u8)
    }
}

/// Qualitative risk bucket derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Map a final score into a risk level using the fixed 40/70 thresholds.
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Find the first risk tier mentioned in free text, checking `high`, then
    /// `medium`, then `low` (case-insensitive substring match).
    pub fn mentioned_in(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        if lowered.contains("high") {
            Some(Self::High)
        } else if lowered.contains("medium") {
            Some(Self::Medium)
        } else if lowered.contains("low") {
            Some(Self::Low)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
        }
    }

}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Human-readable verdict derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AppearsLegitimate,
    PossiblyFraudulent,
    LikelyFraudulent,
}

impl Verdict {
    pub fn from_level(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => Self::AppearsLegitimate,
            RiskLevel::Medium => Self::PossiblyFraudulent,
            RiskLevel::High => Self::LikelyFraudulent,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AppearsLegitimate => "Appears Legitimate",
            Self::PossiblyFraudulent => "Possibly Fraudulent",
            Self::LikelyFraudulent => "Likely Fraudulent",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final, immutable outcome of one risk aggregation.
///
/// `level` and `verdict` are always derived from `score`; there is no way to
/// set them independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    score: u8,
    level: RiskLevel,
    verdict: Verdict,
}

impl RiskAssessment {
    /// Classify an arbitrary score, clamping it into `0..=100` first.
    pub fn from_score(score: i64) -> Self {
        let score = score.clamp(0, SCORE_MAX as i64) as u8;
        let level = RiskLevel::from_score(score);
        Self {
            score,
            level,
            verdict: Verdict::from_level(level),
        }
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn level(&self) -> RiskLevel {
        self.level
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn is_scam(&self) -> bool {
        self.score >= SCAM_THRESHOLD
    }
}

/// Sub-score weights as integer percentages. They always sum to 100, which
/// keeps the weighted total inside `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedWeights")]
pub struct RiskWeights {
    red_flags: u8,
    llm: u8,
    scam_contacts: u8,
    legitimacy: u8,
}

impl RiskWeights {
    /// 25% red flags, 30% LLM, 20% scam contacts, 25% legitimacy.
    pub const CANONICAL: Self = Self {
        red_flags: 25,
        llm: 30,
        scam_contacts: 20,
        legitimacy: 25,
    };

    pub fn new(
        red_flags: u8,
        llm: u8,
        scam_contacts: u8,
        legitimacy: u8,
    ) -> Result<Self, WeightValidationError> {
        let sum = u32::from(red_flags)
            + u32::from(llm)
            + u32::from(scam_contacts)
            + u32::from(legitimacy);
        if sum != 100 {
            return Err(WeightValidationError::InvalidSum { sum });
        }
        Ok(Self {
            red_flags,
            llm,
            scam_contacts,
            legitimacy,
        })
    }

    pub fn red_flags(&self) -> u8 {
        self.red_flags
    }

    pub fn llm(&self) -> u8 {
        self.llm
    }

    pub fn scam_contacts(&self) -> u8 {
        self.scam_contacts
    }

    pub fn legitimacy(&self) -> u8 {
        self.legitimacy
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self::CANONICAL
    }
}

#[derive(Deserialize)]
struct UncheckedWeights {
    red_flags: u8,
    llm: u8,
    scam_contacts: u8,
    legitimacy: u8,
}

impl TryFrom<UncheckedWeights> for RiskWeights {
    type Error = WeightValidationError;

    fn try_from(raw: UncheckedWeights) -> Result<Self, Self::Error> {
        Self::new(raw.red_flags, raw.llm, raw.scam_contacts, raw.legitimacy)
    }
}

/// Errors emitted while validating custom weights.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightValidationError {
    #[error("risk weights must sum to 100 percent (got {sum})")]
    InvalidSum { sum: u32 },
}

/// The four component scores before weighting.
///
/// Fields are signed so that values from a misbehaving producer can be
/// represented; [`SubScores::clamped`] brings them back into range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub red_flags: i32,
    pub llm: i32,
    pub scam_contacts: i32,
    pub legitimacy: i32,
}

impl SubScores {
    pub fn clamped(self) -> Self {
        let clamp = |value: i32| value.clamp(0, i32::from(SCORE_MAX));
        Self {
            red_flags: clamp(self.red_flags),
            llm: clamp(self.llm),
            scam_contacts: clamp(self.scam_contacts),
            legitimacy: clamp(self.legitimacy),
        }
    }
}

/// Explainable trace of a single aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub sub_scores: SubScores,
    pub weights: RiskWeights,
    /// Weighted sum before the floor rule and rounding.
    pub weighted_total: f64,
    pub floor_applied: bool,
    pub assessment: RiskAssessment,
}

/// `min(n * 15, 100)` for `n` triggered red flags.
pub fn red_flag_score(flag_count: usize) -> u8 {
    let points = u32::try_from(flag_count)
        .unwrap_or(u32::MAX)
        .saturating_mul(RED_FLAG_POINTS);
    points.min(u32::from(SCORE_MAX)) as u8
}

/// 40 / 25 / 10 / 0 depending on the first tier mentioned in the reasoning.
pub fn llm_score(reasoning: &str) -> u8 {
    match RiskLevel::mentioned_in(reasoning) {
        Some(RiskLevel::High) => 40,
        Some(RiskLevel::Medium) => 25,
        Some(RiskLevel::Low) => 10,
        None => 0,
    }
}

/// 50 points per flagged contact channel.
pub fn scam_contact_score(result: &ScamCheckResult) -> u8 {
    let mut score = 0u8;
    if result.email_flagged {
        score += 50;
    }
    if result.phone_flagged {
        score += 50;
    }
    score.min(SCORE_MAX)
}

/// Starts at 100 and drops 40 per verified presence; both verified leaves 20.
pub fn legitimacy_score(result: &LegitimacyResult) -> u8 {
    let mut score = i32::from(SCORE_MAX);
    if result.website_exists {
        score -= 40;
    }
    if result.linkedin_exists {
        score -= 40;
    }
    score.max(0) as u8
}

/// Whether the reasoning triggers the high-risk floor.
pub fn reasoning_is_high(reasoning: &str) -> bool {
    reasoning.to_lowercase().contains("high")
}

/// Stateless weighted aggregation of the four signal families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskAggregator {
    weights: RiskWeights,
}

impl RiskAggregator {
    pub fn new(weights: RiskWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> RiskWeights {
        self.weights
    }

    /// Compute each sub-score independently from its signal. Unavailable
    /// signals contribute their neutral value.
    pub fn sub_scores(&self, bundle: &SignalBundle) -> SubScores {
        let flag_count = bundle.red_flags.as_observed().map_or(0, Vec::len);
        let scam = bundle.scam.value_or_default();
        let legitimacy = bundle.legitimacy.value_or_default();
        SubScores {
            red_flags: i32::from(red_flag_score(flag_count)),
            llm: i32::from(llm_score(bundle.reasoning())),
            scam_contacts: i32::from(scam_contact_score(&scam)),
            legitimacy: i32::from(legitimacy_score(&legitimacy)),
        }
    }

    /// Weight precomputed sub-scores, apply the floor rule, round half-up and classify.
    pub fn aggregate(&self, sub_scores: SubScores, llm_high: bool) -> ScoreBreakdown {
        let sub_scores = sub_scores.clamped();
        let weights = self.weights;
        // Exact arithmetic in hundredths of a point; max is 100 * 100.
        let weighted = sub_scores.red_flags as u32 * u32::from(weights.red_flags)
            + sub_scores.llm as u32 * u32::from(weights.llm)
            + sub_scores.scam_contacts as u32 * u32::from(weights.scam_contacts)
            + sub_scores.legitimacy as u32 * u32::from(weights.legitimacy);

        let floor = u32::from(HIGH_LLM_FLOOR) * 100;
        let floor_applied = llm_high && weighted < floor;
        let floored = if llm_high { weighted.max(floor) } else { weighted };
        let rounded = (floored + 50) / 100;

        ScoreBreakdown {
            sub_scores,
            weights,
            weighted_total: f64::from(weighted) / 100.0,
            floor_applied,
            assessment: RiskAssessment::from_score(i64::from(rounded)),
        }
    }

    pub fn explain(&self, bundle: &SignalBundle) -> ScoreBreakdown {
        self.aggregate(self.sub_scores(bundle), reasoning_is_high(bundle.reasoning()))
    }

    pub fn assess(&self, bundle: &SignalBundle) -> RiskAssessment {
        self.explain(bundle).assessment
    }
}

/// Aggregate raw signals with the canonical weights.
pub fn assess_risk<S: AsRef<str>>(
    red_flags: &[S],
    llm_reasoning: &str,
    email_flagged: bool,
    phone_flagged: bool,
    website_exists: bool,
    linkedin_exists: bool,
) -> RiskAssessment {
    let bundle = SignalBundle::neutral()
        .with_red_flags(red_flags.iter().map(|flag| flag.as_ref().to_string()).collect())
        .with_llm(LlmJudgment::from_reasoning(llm_reasoning))
        .with_scam(ScamCheckResult {
            email_flagged,
            phone_flagged,
        })
        .with_legitimacy(LegitimacyResult {
            website_exists,
            linkedin_exists,
        });
    RiskAggregator::default().assess(&bundle)
}
