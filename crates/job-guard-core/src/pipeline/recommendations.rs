use crate::risk::{RiskAssessment, SignalBundle, HIGH_THRESHOLD, MEDIUM_THRESHOLD, SCAM_THRESHOLD};

use super::DetectionMethod;

/// Advice shown to the job seeker, ordered from most to least severe.
pub fn recommendations(
    assessment: &RiskAssessment,
    bundle: &SignalBundle,
    method: DetectionMethod,
) -> Vec<String> {
    let score = assessment.score();
    let mut advice = Vec::new();

    if score >= HIGH_THRESHOLD {
        advice.push("Do not proceed with this job opportunity");
        advice.push("Report this posting to the job board immediately");
    } else if score >= SCAM_THRESHOLD {
        advice.push("Exercise extreme caution with this opportunity");
    }

    if bundle
        .red_flags
        .as_observed()
        .is_some_and(|flags| !flags.is_empty())
    {
        advice.push("Multiple red flags detected - verify all information independently");
    }

    let legitimacy = bundle.legitimacy.value_or_default();
    if !legitimacy.website_exists {
        advice.push("Company website could not be verified");
    }
    if !legitimacy.linkedin_exists {
        advice.push("Company LinkedIn page not found");
    }

    let scam = bundle.scam.value_or_default();
    if scam.email_flagged || scam.phone_flagged {
        advice.push("Contact information flagged in scam database");
    }

    if score < MEDIUM_THRESHOLD {
        advice.push("Job posting appears legitimate, but always verify independently");
        advice.push("Research the company thoroughly before applying");
        advice.push("Verify company details through official channels");
    }

    // borderline quick scans only; a fallback already tried the LLM
    if method == DetectionMethod::Quick && (MEDIUM_THRESHOLD..HIGH_THRESHOLD).contains(&score) {
        advice.push("Consider running a detailed analysis for more accurate results");
    }

    advice.into_iter().map(String::from).collect()
}
