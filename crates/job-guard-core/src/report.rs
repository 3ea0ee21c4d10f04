use std::fmt::Write;

use crate::{
    pipeline::AnalysisReport,
    risk::{RiskAssessment, ScoreBreakdown},
};

/// Format styles supported by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Produce a report string from an `AnalysisReport` using the desired format.
pub fn render_report(report: &AnalysisReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(report),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(report)?),
    }
}

/// Render a bare assessment, as produced by `assess_risk`.
pub fn render_assessment(
    assessment: &RiskAssessment,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => {
            let mut out = String::new();
            write_headline(&mut out, assessment)?;
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(assessment)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(assessment)?),
    }
}

fn write_headline(out: &mut String, assessment: &RiskAssessment) -> std::fmt::Result {
    writeln!(
        out,
        "Risk Score: {}/100 ({})",
        assessment.score(),
        assessment.level()
    )?;
    writeln!(out, "Verdict: {}", assessment.verdict())
}

fn render_human(report: &AnalysisReport) -> anyhow::Result<String> {
    let mut out = String::new();
    write_headline(&mut out, &report.assessment)?;
    writeln!(
        out,
        "Detection: {} (requested {})",
        report.detection_method, report.mode
    )?;
    if let Some(name) = &report.company.name {
        match &report.company.website {
            Some(website) => writeln!(out, "Company: {name} ({website})")?,
            None => writeln!(out, "Company: {name}")?,
        }
    }
    writeln!(out)?;

    write_breakdown(&mut out, &report.breakdown)?;
    writeln!(out)?;

    if report.red_flags.is_empty() {
        writeln!(out, "No red flags detected.")?;
    } else {
        writeln!(out, "Red Flags:")?;
        for flag in &report.red_flags {
            writeln!(
                out,
                "  - {id}: {description} @ {start}..{end}",
                id = flag.rule_id,
                description = flag.description,
                start = flag.span.0,
                end = flag.span.1,
            )?;
            if !flag.excerpt.trim().is_empty() {
                writeln!(out, "    \"{}\"", sanitize_excerpt(&flag.excerpt))?;
            }
        }
    }

    if let Some(reasoning) = report.llm_reasoning().filter(|text| !text.trim().is_empty()) {
        writeln!(out, "\nLLM Reasoning: {}", sanitize_excerpt(reasoning))?;
    }

    let degraded = report.signals.degraded();
    if !degraded.is_empty() {
        writeln!(out, "\nUnavailable Signals (scored neutral):")?;
        for (name, reason) in degraded {
            writeln!(out, "  - {name}: {reason}")?;
        }
    }

    if !report.recommendations.is_empty() {
        writeln!(out, "\nRecommendations:")?;
        for line in &report.recommendations {
            writeln!(out, "  - {line}")?;
        }
    }

    Ok(out)
}

fn write_breakdown(out: &mut String, breakdown: &ScoreBreakdown) -> std::fmt::Result {
    let sub = breakdown.sub_scores;
    let weights = breakdown.weights;
    writeln!(out, "Sub-scores:")?;
    for (label, score, weight) in [
        ("red flags", sub.red_flags, weights.red_flags()),
        ("llm", sub.llm, weights.llm()),
        ("scam contacts", sub.scam_contacts, weights.scam_contacts()),
        ("legitimacy", sub.legitimacy, weights.legitimacy()),
    ] {
        writeln!(out, "  - {label:>13}: {score:>3} x {weight}%")?;
    }
    write!(out, "Weighted total: {:.2}", breakdown.weighted_total)?;
    if breakdown.floor_applied {
        write!(out, " (raised to the high-risk LLM floor)")?;
    }
    writeln!(out)
}

fn sanitize_excerpt(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::{AnalysisMode, CompanyInfo, DetectionMethod},
        risk::{RiskAggregator, SignalBundle},
        rules::RedFlag,
    };

    fn sample_report() -> AnalysisReport {
        let signals = SignalBundle::neutral()
            .with_red_flags(vec!["Uses urgency tactics".into()])
            .with_llm(crate::risk::LlmJudgment::from_reasoning("High risk\nfee requested"));
        let breakdown = RiskAggregator::default().explain(&signals);
        AnalysisReport {
            mode: AnalysisMode::Detailed,
            detection_method: DetectionMethod::Detailed,
            assessment: breakdown.assessment,
            breakdown,
            is_scam: breakdown.assessment.is_scam(),
            red_flags: vec![RedFlag {
                rule_id: "urgency_tactics".into(),
                description: "Uses urgency tactics".into(),
                span: (0, 6),
                excerpt: "URGENT\nhiring".into(),
            }],
            company: CompanyInfo {
                name: Some("Acme".into()),
                website: None,
            },
            signals,
            recommendations: vec!["Exercise extreme caution with this opportunity".into()],
        }
    }

    #[test]
    fn human_report_lists_scores_flags_and_advice() {
        let output = render_report(&sample_report(), OutputFormat::Human).unwrap();
        assert!(output.starts_with("Risk Score: 60/100 (Medium Risk)\nVerdict: Possibly Fraudulent"));
        assert!(output.contains("Company: Acme\n"));
        assert!(output.contains("      llm:  40 x 30%"));
        assert!(output.contains("raised to the high-risk LLM floor"));
        assert!(output.contains("urgency_tactics: Uses urgency tactics @ 0..6"));
        assert!(output.contains("\"URGENT hiring\""));
        assert!(output.contains("LLM Reasoning: High risk fee requested"));
        assert!(output.contains("  - scam: not checked"));
        assert!(output.contains("Recommendations:\n  - Exercise extreme caution"));
    }

    #[test]
    fn json_report_serializes() {
        let output = render_report(&sample_report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["assessment"]["score"], 60);
        assert_eq!(value["assessment"]["verdict"], "possibly_fraudulent");
        assert_eq!(value["detection_method"], "detailed");
        assert_eq!(value["signals"]["scam"]["status"], "unavailable");
        assert!(value["red_flags"].is_array());
    }

    #[test]
    fn yaml_report_serializes() {
        let output = render_report(&sample_report(), OutputFormat::Yaml).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();
        assert_eq!(value["is_scam"], serde_yaml::Value::Bool(true));
        assert_eq!(value["mode"], serde_yaml::Value::String("detailed".into()));
    }

    #[test]
    fn assessment_renders_headline() {
        let assessment = RiskAssessment::from_score(40);
        let human = render_assessment(&assessment, OutputFormat::Human).unwrap();
        assert_eq!(human, "Risk Score: 40/100 (Medium Risk)\nVerdict: Possibly Fraudulent\n");
        let json = render_assessment(&assessment, OutputFormat::Json).unwrap();
        assert!(json.contains("\"level\": \"medium\""));
    }
}
