//! Deterministic claim validation against the aggregated rule collections.
//!
//! Evaluation is a pure function over one claim plus the working rule
//! collection: technical rules are walked first, then medical rules, and the
//! order affects only violation-message ordering, never the classification.

use serde::{Deserialize, Serialize};

use super::domain::{Claim, ClaimId, ClaimStatus, ErrorCategory};
use super::rules::{RuleCollection, RuleEntry};

pub const RESUBMIT_ACTION: &str = "Please review errors and resubmit with corrections.";
pub const PAYMENT_ACTION: &str = "Proceed to payment.";
pub const NO_ERRORS_EXPLANATION: &str = "No errors found.";

/// Fixed policy data mapping facility types to the service codes they may
/// bill. Not derived from uploaded rules; facility-restriction entries only
/// decide which facility ids resolve to which type. Unknown facility types
/// resolve to an empty allow-list.
const FACILITY_SERVICE_ALLOW_LIST: &[(&str, &[&str])] = &[
    ("MATERNITY_HOSPITAL", &["SRV2008"]),
    ("DIALYSIS_CENTER", &["SRV1003", "SRV2010"]),
    ("CARDIOLOGY_CENTER", &["SRV2001", "SRV2011"]),
    (
        "GENERAL_HOSPITAL",
        &[
            "SRV1001", "SRV1002", "SRV1003", "SRV2001", "SRV2002", "SRV2003", "SRV2004", "SRV2006",
            "SRV2007", "SRV2008", "SRV2010", "SRV2011",
        ],
    ),
];

pub(crate) fn allowed_services(facility_type: &str) -> &'static [&'static str] {
    FACILITY_SERVICE_ALLOW_LIST
        .iter()
        .find(|(candidate, _)| *candidate == facility_type)
        .map(|(_, services)| *services)
        .unwrap_or(&[])
}

/// One human-readable finding produced when a claim fails one rule check,
/// tagged with the catalog the failing rule came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub category: super::rules::RuleCategory,
    pub message: String,
}

/// Classification produced for a single claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub claim_id: ClaimId,
    pub status: ClaimStatus,
    pub error_category: ErrorCategory,
    pub violations: Vec<Violation>,
    /// Always non-empty: the joined violation lines, or the fixed
    /// no-errors message.
    pub explanation: String,
    pub recommended_action: String,
}

impl ValidationOutcome {
    /// Write the classification back onto the claim record.
    pub fn apply_to(&self, claim: &mut Claim) {
        claim.status = self.status;
        claim.error_category = self.error_category;
        claim.error_explanation = Some(self.explanation.clone());
        claim.recommended_action = Some(self.recommended_action.clone());
    }
}

/// Evaluate one claim against the full rule collection.
pub fn validate(claim: &Claim, rules: &RuleCollection) -> ValidationOutcome {
    let mut violations = Vec::new();

    for rule in &rules.technical {
        check_technical(claim, rule, &mut violations);
    }
    for rule in &rules.medical {
        check_medical(claim, rule, &mut violations);
    }

    assemble_outcome(claim, violations)
}

fn check_technical(claim: &Claim, rule: &RuleEntry, violations: &mut Vec<Violation>) {
    use super::rules::RuleCategory::Technical;

    match rule {
        RuleEntry::ServiceApproval {
            service_code,
            requires_approval,
            ..
        } => {
            if claim.service_code == *service_code && *requires_approval && !claim.has_approval() {
                violations.push(Violation {
                    category: Technical,
                    message: format!("Service {} requires prior approval.", claim.service_code),
                });
            }
        }
        RuleEntry::DiagnosisApproval {
            diagnosis_code,
            requires_approval,
            ..
        } => {
            // Evaluated independently per diagnosis code on the claim;
            // multiple matches produce multiple violation lines.
            for code in &claim.diagnosis_codes {
                if code == diagnosis_code && *requires_approval && !claim.has_approval() {
                    violations.push(Violation {
                        category: Technical,
                        message: format!("Diagnosis {code} requires prior approval."),
                    });
                }
            }
        }
        RuleEntry::AmountThreshold { max_amount, .. } => {
            // An approval number waives the threshold regardless of amount.
            if claim.paid_amount_aed > *max_amount && !claim.has_approval() {
                violations.push(Violation {
                    category: Technical,
                    message: format!(
                        "Paid amount {} exceeds threshold {} AED.",
                        claim.paid_amount_aed, max_amount
                    ),
                });
            }
        }
        RuleEntry::IdFormatting { .. } => {
            if !is_uppercase_alphanumeric(&claim.national_id) {
                violations.push(Violation {
                    category: Technical,
                    message: "National ID must be uppercase alphanumeric.".to_string(),
                });
            }
            if claim
                .unique_id
                .as_deref()
                .is_some_and(|unique_id| !unique_id.is_empty() && !unique_id.contains('-'))
            {
                violations.push(Violation {
                    category: Technical,
                    message: "Unique ID format invalid (expected hyphen-separated).".to_string(),
                });
            }
        }
        // Medical rule kinds filed under the technical catalog never fire.
        _ => {}
    }
}

fn check_medical(claim: &Claim, rule: &RuleEntry, violations: &mut Vec<Violation>) {
    use super::rules::RuleCategory::Medical;

    match rule {
        RuleEntry::EncounterRestriction {
            encounter,
            services,
            ..
        } => {
            if services.contains(&claim.service_code) {
                let expected = encounter.label();
                if claim
                    .encounter_type
                    .as_deref()
                    .is_some_and(|kind| !kind.is_empty() && kind.to_lowercase() != expected)
                {
                    violations.push(Violation {
                        category: Medical,
                        message: format!(
                            "Service {} only allowed for {expected} encounter.",
                            claim.service_code
                        ),
                    });
                }
            }
        }
        RuleEntry::FacilityRestriction { facilities, .. } => {
            // A facility id missing from the mapping silently skips the rule.
            let facility_type = facilities
                .get(&claim.facility_id)
                .filter(|kind| !kind.is_empty());
            if let Some(facility_type) = facility_type {
                if !allowed_services(facility_type).contains(&claim.service_code.as_str()) {
                    violations.push(Violation {
                        category: Medical,
                        message: format!(
                            "Service {} not permitted for facility type {} (Facility {}).",
                            claim.service_code, facility_type, claim.facility_id
                        ),
                    });
                }
            }
        }
        RuleEntry::DiagnosisService {
            diagnosis_code,
            required_service,
            ..
        } => {
            for code in &claim.diagnosis_codes {
                if code == diagnosis_code && claim.service_code != *required_service {
                    violations.push(Violation {
                        category: Medical,
                        message: format!(
                            "Diagnosis {code} requires {required_service}, not {}.",
                            claim.service_code
                        ),
                    });
                }
            }
        }
        RuleEntry::MutuallyExclusive { diagnoses, .. } => {
            if diagnoses.len() >= 2
                && diagnoses
                    .iter()
                    .all(|code| claim.diagnosis_codes.contains(code))
            {
                violations.push(Violation {
                    category: Medical,
                    message: format!(
                        "Diagnoses {} and {} cannot coexist.",
                        diagnoses[0], diagnoses[1]
                    ),
                });
            }
        }
        _ => {}
    }
}

fn assemble_outcome(claim: &Claim, violations: Vec<Violation>) -> ValidationOutcome {
    use super::rules::RuleCategory;

    if violations.is_empty() {
        return ValidationOutcome {
            claim_id: claim.claim_id.clone(),
            status: ClaimStatus::Validated,
            error_category: ErrorCategory::None,
            violations,
            explanation: NO_ERRORS_EXPLANATION.to_string(),
            recommended_action: PAYMENT_ACTION.to_string(),
        };
    }

    let technical = violations
        .iter()
        .any(|violation| violation.category == RuleCategory::Technical);
    let medical = violations
        .iter()
        .any(|violation| violation.category == RuleCategory::Medical);

    let explanation = violations
        .iter()
        .map(|violation| violation.message.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    ValidationOutcome {
        claim_id: claim.claim_id.clone(),
        status: ClaimStatus::NotValidated,
        error_category: ErrorCategory::from_flags(technical, medical),
        violations,
        explanation,
        recommended_action: RESUBMIT_ACTION.to_string(),
    }
}

/// Every character must be alphanumeric, at least one letter must be
/// present, and none lowercase.
fn is_uppercase_alphanumeric(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric())
        && value.chars().any(|c| c.is_ascii_alphabetic())
        && !value.chars().any(|c| c.is_ascii_lowercase())
}
