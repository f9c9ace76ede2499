use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for adjudicable claims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId(pub String);

/// Lifecycle status of a claim. A claim is created `Pending` and moves to a
/// terminal status exactly once per validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Pending,
    Validated,
    NotValidated,
}

impl ClaimStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ClaimStatus::Pending => "PENDING",
            ClaimStatus::Validated => "VALIDATED",
            ClaimStatus::NotValidated => "NOT_VALIDATED",
        }
    }
}

/// Which rule catalog(s) produced violations for a claim.
///
/// `Both` holds exactly when at least one technical and at least one medical
/// violation fired; `None` holds when zero violations fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    None,
    Technical,
    Medical,
    Both,
}

impl ErrorCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorCategory::None => "NONE",
            ErrorCategory::Technical => "TECHNICAL",
            ErrorCategory::Medical => "MEDICAL",
            ErrorCategory::Both => "BOTH",
        }
    }

    pub(crate) fn from_flags(technical: bool, medical: bool) -> Self {
        match (technical, medical) {
            (true, true) => ErrorCategory::Both,
            (true, false) => ErrorCategory::Technical,
            (false, true) => ErrorCategory::Medical,
            (false, false) => ErrorCategory::None,
        }
    }
}

/// One adjudicable claim record.
///
/// The clinical and administrative fields are set at ingestion and never
/// change afterwards; the outcome fields (`status`, `error_category`,
/// `error_explanation`, `recommended_action`) are written only by the
/// validation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: ClaimId,
    pub encounter_type: Option<String>,
    pub service_date: Option<NaiveDate>,
    pub national_id: String,
    pub member_id: String,
    pub facility_id: String,
    pub unique_id: Option<String>,
    /// Ordered diagnosis codes; duplicates are kept as submitted.
    pub diagnosis_codes: Vec<String>,
    pub service_code: String,
    pub paid_amount_aed: f64,
    pub approval_number: Option<String>,
    pub status: ClaimStatus,
    pub error_category: ErrorCategory,
    pub error_explanation: Option<String>,
    pub recommended_action: Option<String>,
}

impl Claim {
    /// True when the claim carries a non-blank approval number. A present
    /// approval waives the approval-requirement and amount-threshold checks.
    pub fn has_approval(&self) -> bool {
        self.approval_number
            .as_deref()
            .is_some_and(|number| !number.trim().is_empty())
    }

    pub fn is_terminal(&self) -> bool {
        self.status != ClaimStatus::Pending
    }
}
