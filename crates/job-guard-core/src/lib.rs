pub mod contacts;
pub mod legitimacy;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod risk;
pub mod rules;
pub mod scam_db;

pub use legitimacy::{HttpLegitimacyProbe, LegitimacyProbe};
pub use llm::{build_client, LlmClient, LlmSettings, NoopLlmClient};
pub use pipeline::{
    AnalysisMode, AnalysisReport, DetectionMethod, JobAnalyzer, JobPosting, PostingError,
};
pub use report::{render_assessment, render_report, OutputFormat};
pub use risk::{
    assess_risk, LegitimacyResult, LlmJudgment, RiskAggregator, RiskAssessment, RiskLevel,
    RiskWeights, ScamCheckResult, ScoreBreakdown, Signal, SignalBundle, SubScores, Verdict,
    WeightValidationError,
};
pub use rules::{
    builtin::BuiltinRuleRepository, checker::RedFlagChecker, file_repository::FileRuleRepository,
    RedFlag, RedFlagDetector, RedFlagRule, RuleKind, RuleRepository, RuleValidationError, Span,
};
pub use scam_db::{
    validate_report, CsvScamStore, InMemoryScamStore, RecordOutcome, ReportScamError, ScamContact,
    ScamContactStore,
};
