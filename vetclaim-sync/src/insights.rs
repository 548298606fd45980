//! Basic (non-AI) claim insights
//!
//! Returned with every intercepted claim so the caller always has something
//! to render, whether or not the backend accepted the record.

use vetclaim_common::commands::{BasicInsights, InsightTimeline, Recommendation, Risk, Severity};
use vetclaim_common::model::Claim;

const DEFAULT_DAYS_TO_DECISION: u32 = 90;
const NATIONAL_WORK_QUEUE: &str = "National Work Queue";

/// Average days left in a claim at the given phase
pub fn days_to_decision(phase: Option<u8>) -> u32 {
    match phase {
        Some(1) => 120,
        Some(2) => 90,
        Some(3) => 60,
        Some(4) => 30,
        Some(5) => 14,
        Some(6) => 7,
        Some(7) => 0,
        _ => DEFAULT_DAYS_TO_DECISION,
    }
}

pub fn basic_risks(claim: &Claim) -> Vec<Risk> {
    let mut risks = Vec::new();

    if claim.documents_needed {
        risks.push(Risk {
            title: "Documents Required".into(),
            description: "VA is waiting for additional documentation from you.".into(),
            severity: Severity::High,
            action: Some("check-documents".into()),
            action_text: Some("View Requirements".into()),
        });
    }

    if claim.jurisdiction.as_deref() == Some(NATIONAL_WORK_QUEUE) {
        risks.push(Risk {
            title: NATIONAL_WORK_QUEUE.into(),
            description: "Claims in the national queue typically take longer to process.".into(),
            severity: Severity::Medium,
            action: None,
            action_text: None,
        });
    }

    risks
}

pub fn basic_insights(claim: &Claim) -> BasicInsights {
    BasicInsights {
        claim_id: claim.claim_id.clone(),
        status: "basic".into(),
        confidence_score: 50,
        timeline: InsightTimeline {
            days_to_decision: days_to_decision(claim.phase),
            approval_probability: 70,
            similar_claims: 0,
            key_factors: vec!["Based on average processing times".into()],
        },
        risks: basic_risks(claim),
        recommendations: vec![Recommendation {
            title: "Get AI-Powered Analysis".into(),
            description: "Log in to VetClaim Services for predictive timelines, risk assessment, and personalized recommendations.".into(),
            impact: Severity::High,
            action: "login".into(),
            button_text: "Log In".into(),
        }],
        missing_benefits: Vec::new(),
        is_basic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_by_phase() {
        assert_eq!(days_to_decision(Some(1)), 120);
        assert_eq!(days_to_decision(Some(3)), 60);
        assert_eq!(days_to_decision(Some(7)), 0);
        assert_eq!(days_to_decision(Some(8)), 90);
        assert_eq!(days_to_decision(None), 90);
    }

    #[test]
    fn test_insights_for_quiet_claim() {
        let claim = Claim {
            claim_id: "600123456".into(),
            phase: Some(2),
            ..Default::default()
        };
        let insights = basic_insights(&claim);

        assert_eq!(insights.claim_id, "600123456");
        assert_eq!(insights.status, "basic");
        assert_eq!(insights.confidence_score, 50);
        assert_eq!(insights.timeline.days_to_decision, 90);
        assert!(insights.risks.is_empty());
        assert_eq!(insights.recommendations.len(), 1);
        assert!(insights.is_basic);
    }

    #[test]
    fn test_risks() {
        let claim = Claim {
            documents_needed: true,
            jurisdiction: Some("National Work Queue".into()),
            ..Default::default()
        };
        let risks = basic_risks(&claim);

        assert_eq!(risks.len(), 2);
        assert_eq!(risks[0].severity, Severity::High);
        assert_eq!(risks[0].action.as_deref(), Some("check-documents"));
        assert_eq!(risks[1].severity, Severity::Medium);
        assert!(risks[1].action.is_none());
    }

    #[test]
    fn test_insights_wire_shape() {
        let value = serde_json::to_value(basic_insights(&Claim::default())).unwrap();
        assert_eq!(value["timeline"]["approvalProbability"], 70);
        assert_eq!(value["recommendations"][0]["buttonText"], "Log In");
        assert_eq!(value["recommendations"][0]["impact"], "high");
        assert_eq!(value["isBasic"], true);
    }
}
