use std::{fs, path::PathBuf, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use insta::assert_json_snapshot;
use job_guard_core::{
    AnalysisMode, FileRuleRepository, InMemoryScamStore, JobAnalyzer, JobPosting,
    LegitimacyProbe, LegitimacyResult, LlmClient, LlmJudgment, RedFlagChecker, ScamContact,
};
use serde_json::json;

/// Treats any supplied website or company name as verified.
struct PresenceProbe;

#[async_trait]
impl LegitimacyProbe for PresenceProbe {
    async fn check(
        &self,
        company_name: Option<&str>,
        website: Option<&str>,
    ) -> Result<LegitimacyResult> {
        Ok(LegitimacyResult {
            website_exists: website.is_some(),
            linkedin_exists: company_name.is_some(),
        })
    }
}

struct CannedLlm;

#[async_trait]
impl LlmClient for CannedLlm {
    async fn judge(&self, _posting: &str) -> Result<LlmJudgment> {
        Ok(LlmJudgment::from_reasoning(
            "High risk: guaranteed pay for no experience",
        ))
    }
}

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn analyzer() -> JobAnalyzer {
    let repo = Arc::new(FileRuleRepository::new(workspace_root().join("rules")));
    let store = InMemoryScamStore::with_contacts(vec![ScamContact::new(
        Some("HR.FastJobs@gmail.com"),
        None,
    )]);
    JobAnalyzer::new(Arc::new(RedFlagChecker::new(repo)))
        .with_scam_store(Arc::new(store))
        .with_legitimacy_probe(Arc::new(PresenceProbe))
        .with_llm(Arc::new(CannedLlm))
}

async fn analyze_fixture(name: &str, mode: AnalysisMode) -> serde_json::Value {
    let fixture_path = fixture_dir().join(name);
    let input = fs::read_to_string(&fixture_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {err}", fixture_path.display()));

    let report = analyzer()
        .analyze(&JobPosting::from_text(input), mode)
        .await
        .unwrap_or_else(|err| panic!("analysis failed for fixture {name}: {err:#}"));

    json!({
        "fixture": name,
        "mode": report.mode,
        "detection_method": report.detection_method,
        "score": report.assessment.score(),
        "level": report.assessment.level(),
        "verdict": report.assessment.verdict(),
        "is_scam": report.is_scam,
        "floor_applied": report.breakdown.floor_applied,
        "sub_scores": report.breakdown.sub_scores,
        "red_flags": report.red_flags.iter().map(|flag| flag.rule_id.as_str()).collect::<Vec<_>>(),
        "recommendations": report.recommendations,
    })
}

#[tokio::test(flavor = "current_thread")]
async fn clean_posting_quick_snapshot() {
    let snapshot = analyze_fixture("clean_posting.txt", AnalysisMode::Quick).await;
    assert_json_snapshot!("clean_posting_quick", snapshot);
}

#[tokio::test(flavor = "current_thread")]
async fn scam_posting_quick_snapshot() {
    let snapshot = analyze_fixture("scam_posting.txt", AnalysisMode::Quick).await;
    assert_json_snapshot!("scam_posting_quick", snapshot);
}

#[tokio::test(flavor = "current_thread")]
async fn scam_posting_detailed_snapshot() {
    let snapshot = analyze_fixture("scam_posting.txt", AnalysisMode::Detailed).await;
    assert_json_snapshot!("scam_posting_detailed", snapshot);
}
