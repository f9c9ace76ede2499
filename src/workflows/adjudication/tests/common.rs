use std::collections::BTreeMap;
use std::sync::Arc;

use axum::response::Response;
use chrono::Utc;
use serde_json::{json, Value};

use crate::workflows::adjudication::domain::{Claim, ClaimId, ClaimStatus, ErrorCategory};
use crate::workflows::adjudication::repository::{
    ClaimRepository, InMemoryClaimStore, InMemoryRuleStore, RepositoryError,
    RuleDocumentRepository,
};
use crate::workflows::adjudication::rules::{
    EncounterKind, RuleCategory, RuleCollection, RuleDocument, RuleEntry,
};
use crate::workflows::adjudication::service::{AdjudicationService, AdjudicationSettings};

pub(super) const TECHNICAL_DOC: &str = "\
Technical Rules Catalog

Services requiring prior approval
SRV1001 MRI Brain Scan YES
SRV1002 Basic Consultation NO

Diagnoses requiring prior approval
E11.9 Type 2 diabetes mellitus YES

Amount threshold
Claims require approval when paid_amount_aed > AED 1000
";

pub(super) const MEDICAL_DOC: &str = "\
Medical Rules Catalog

Inpatient-only services
SRV2001
SRV2002

Outpatient-only services
SRV1001
SRV1003

Facility Registry
FAC00001 DIALYSIS_CENTER
FAC00002 MATERNITY_HOSPITAL

Diagnosis service mappings
E11.9 maps to: SRV1003

Mutually exclusive diagnoses
E10.1 cannot coexist with E11.2
";

pub(super) const CLAIMS_CSV: &str = "\
claim_id,encounter_type,service_date,national_id,member_id,facility_id,unique_id,diagnosis_codes,service_code,paid_amount_aed,approval_number
CLM-001,outpatient,03/15/24,ABC1234567,MBR1234567,FAC00001,ABC1-1234-0001,\"E11.9\",SRV1003,400.00,AP-123
CLM-002,inpatient,15/03/24,abc1234567,MBR7654321,FAC00002,ABC112340001,\"E10.1, E11.2\",SRV2008,1500.00,
CLM-003,outpatient,,XYZ7654321,MBR0000001,FAC99999,XYZ7-0000-9999,,SRV1002,250.00,AP-778
";

pub(super) fn claim(id: &str) -> Claim {
    Claim {
        claim_id: ClaimId(id.to_string()),
        encounter_type: Some("outpatient".to_string()),
        service_date: None,
        national_id: "ABC1234567".to_string(),
        member_id: "MBR1234567".to_string(),
        facility_id: "FAC00001".to_string(),
        unique_id: Some("ABC1-1234-0001".to_string()),
        diagnosis_codes: Vec::new(),
        service_code: "SRV1003".to_string(),
        paid_amount_aed: 400.0,
        approval_number: None,
        status: ClaimStatus::Pending,
        error_category: ErrorCategory::None,
        error_explanation: None,
        recommended_action: None,
    }
}

pub(super) fn service_approval_rule(service_code: &str, requires_approval: bool) -> RuleEntry {
    RuleEntry::ServiceApproval {
        id: format!("{service_code}_APPROVAL"),
        service_code: service_code.to_string(),
        description: "prior approval".to_string(),
        requires_approval,
    }
}

pub(super) fn diagnosis_approval_rule(diagnosis_code: &str, requires_approval: bool) -> RuleEntry {
    RuleEntry::DiagnosisApproval {
        id: format!("{diagnosis_code}_APPROVAL"),
        diagnosis_code: diagnosis_code.to_string(),
        description: "prior approval".to_string(),
        requires_approval,
    }
}

pub(super) fn amount_threshold_rule(max_amount: f64) -> RuleEntry {
    RuleEntry::AmountThreshold {
        id: "AMOUNT_THRESHOLD".to_string(),
        max_amount,
    }
}

pub(super) fn id_formatting_rule() -> RuleEntry {
    RuleEntry::IdFormatting {
        id: "ID_FORMATTING".to_string(),
        requirements: vec!["All IDs must be uppercase alphanumeric".to_string()],
    }
}

pub(super) fn encounter_rule(encounter: EncounterKind, services: &[&str]) -> RuleEntry {
    RuleEntry::EncounterRestriction {
        id: match encounter {
            EncounterKind::Inpatient => "INPATIENT_SERVICES".to_string(),
            EncounterKind::Outpatient => "OUTPATIENT_SERVICES".to_string(),
        },
        encounter,
        services: services.iter().map(|code| code.to_string()).collect(),
    }
}

pub(super) fn facility_rule(pairs: &[(&str, &str)]) -> RuleEntry {
    let facilities: BTreeMap<String, String> = pairs
        .iter()
        .map(|(id, kind)| (id.to_string(), kind.to_string()))
        .collect();
    RuleEntry::FacilityRestriction {
        id: "FACILITY_RESTRICTIONS".to_string(),
        facilities,
    }
}

pub(super) fn diagnosis_service_rule(diagnosis_code: &str, required_service: &str) -> RuleEntry {
    RuleEntry::DiagnosisService {
        id: format!("{diagnosis_code}_SERVICE_MAP"),
        diagnosis_code: diagnosis_code.to_string(),
        required_service: required_service.to_string(),
    }
}

pub(super) fn exclusion_rule(first: &str, second: &str) -> RuleEntry {
    RuleEntry::MutuallyExclusive {
        id: format!("{first}_{second}_EXCLUSION"),
        diagnoses: vec![first.to_string(), second.to_string()],
    }
}

pub(super) fn collection(technical: Vec<RuleEntry>, medical: Vec<RuleEntry>) -> RuleCollection {
    RuleCollection { technical, medical }
}

pub(super) fn document(name: &str, category: RuleCategory, entries: &[RuleEntry]) -> RuleDocument {
    RuleDocument {
        name: name.to_string(),
        category,
        payload: json!({ "type": category.label(), "rules": entries }),
        uploaded_at: Utc::now(),
    }
}

pub(super) fn raw_document(name: &str, category: RuleCategory, payload: Value) -> RuleDocument {
    RuleDocument {
        name: name.to_string(),
        category,
        payload,
        uploaded_at: Utc::now(),
    }
}

pub(super) fn build_service() -> (
    AdjudicationService<InMemoryClaimStore, InMemoryRuleStore>,
    Arc<InMemoryClaimStore>,
    Arc<InMemoryRuleStore>,
) {
    build_service_with(AdjudicationSettings::default())
}

pub(super) fn build_service_with(
    settings: AdjudicationSettings,
) -> (
    AdjudicationService<InMemoryClaimStore, InMemoryRuleStore>,
    Arc<InMemoryClaimStore>,
    Arc<InMemoryRuleStore>,
) {
    let claims = Arc::new(InMemoryClaimStore::default());
    let rules = Arc::new(InMemoryRuleStore::default());
    let service = AdjudicationService::new(claims.clone(), rules.clone(), settings);
    (service, claims, rules)
}

pub(super) struct UnavailableClaimStore;

impl ClaimRepository for UnavailableClaimStore {
    fn insert(&self, _claim: Claim) -> Result<Claim, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _claim: Claim) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ClaimId) -> Result<Option<Claim>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn pending(&self) -> Result<Vec<Claim>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Claim>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct UnavailableRuleStore;

impl RuleDocumentRepository for UnavailableRuleStore {
    fn insert(&self, _document: RuleDocument) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<RuleDocument>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
