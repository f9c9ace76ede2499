use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use super::common::*;
use crate::workflows::adjudication::domain::{ClaimId, ClaimStatus, ErrorCategory};
use crate::workflows::adjudication::ingest::parse_service_date_for_tests;
use crate::workflows::adjudication::repository::RepositoryError;
use crate::workflows::adjudication::rules::RuleCategory;
use crate::workflows::adjudication::service::{
    AdjudicationError, AdjudicationService, AdjudicationSettings, RuleSubmission,
};

#[test]
fn ingest_stores_rows_as_pending_claims_in_order() {
    let (service, _, _) = build_service();

    let ids = service.ingest_claims(CLAIMS_CSV.as_bytes()).expect("ingest");

    assert_eq!(
        ids,
        vec![
            ClaimId("CLM-001".to_string()),
            ClaimId("CLM-002".to_string()),
            ClaimId("CLM-003".to_string()),
        ]
    );

    let claims = service.claim_results().expect("claims");
    assert_eq!(claims.len(), 3);
    assert!(claims
        .iter()
        .all(|claim| claim.status == ClaimStatus::Pending));

    let first = &claims[0];
    assert_eq!(
        first.service_date,
        NaiveDate::from_ymd_opt(2024, 3, 15)
    );
    assert_eq!(first.diagnosis_codes, vec!["E11.9".to_string()]);
    assert_eq!(first.paid_amount_aed, 400.0);
    assert_eq!(first.approval_number.as_deref(), Some("AP-123"));

    let second = &claims[1];
    assert_eq!(second.diagnosis_codes.len(), 2);
    assert!(second.approval_number.is_none());

    let third = &claims[2];
    assert!(third.service_date.is_none());
    assert!(third.diagnosis_codes.is_empty());
}

#[test]
fn service_dates_parse_american_format_first_then_day_first() {
    assert_eq!(
        parse_service_date_for_tests("03/15/24"),
        NaiveDate::from_ymd_opt(2024, 3, 15)
    );
    assert_eq!(
        parse_service_date_for_tests("15/03/24"),
        NaiveDate::from_ymd_opt(2024, 3, 15)
    );
    assert_eq!(parse_service_date_for_tests("not a date"), None);
    assert_eq!(parse_service_date_for_tests("  "), None);
}

#[test]
fn listings_preserve_ingestion_order_for_unsorted_external_ids() {
    let (service, _, _) = build_service();
    let csv = "\
claim_id,national_id,service_code,paid_amount_aed
CLM-B,ABC1234567,SRV1001,100.00
CLM-A,XYZ7654321,SRV1002,200.00
";

    let ids = service.ingest_claims(csv.as_bytes()).expect("ingest");
    assert_eq!(
        ids,
        vec![ClaimId("CLM-B".to_string()), ClaimId("CLM-A".to_string())]
    );

    let claims = service.claim_results().expect("claims");
    assert_eq!(claims[0].claim_id, ClaimId("CLM-B".to_string()));
    assert_eq!(claims[1].claim_id, ClaimId("CLM-A".to_string()));

    // Pending listings feed validation runs and must walk the same order.
    use crate::workflows::adjudication::repository::ClaimRepository;
    let (_, store, _) = build_service();
    store.insert(claim("CLM-B")).expect("insert CLM-B");
    store.insert(claim("CLM-A")).expect("insert CLM-A");
    let pending = store.pending().expect("pending");
    assert_eq!(pending[0].claim_id, ClaimId("CLM-B".to_string()));
    assert_eq!(pending[1].claim_id, ClaimId("CLM-A".to_string()));
}

#[test]
fn rows_without_a_claim_id_get_a_generated_one() {
    let (service, _, _) = build_service();
    let csv = "\
claim_id,national_id,service_code,paid_amount_aed
,ABC1234567,SRV1001,100.00
";

    let ids = service.ingest_claims(csv.as_bytes()).expect("ingest");

    assert_eq!(ids.len(), 1);
    assert!(ids[0].0.starts_with("clm-"));
}

#[test]
fn reingesting_the_same_claim_id_is_a_conflict() {
    let (service, _, _) = build_service();

    service.ingest_claims(CLAIMS_CSV.as_bytes()).expect("first ingest");
    let error = service
        .ingest_claims(CLAIMS_CSV.as_bytes())
        .expect_err("duplicate ingest");

    assert!(matches!(
        error,
        AdjudicationError::Repository(RepositoryError::Conflict)
    ));
}

#[test]
fn text_uploads_run_through_the_extractor() {
    let (service, _, _) = build_service();

    let view = service
        .upload_rules(
            "technical.txt",
            RuleCategory::Technical,
            RuleSubmission::Text(TECHNICAL_DOC.to_string()),
        )
        .expect("upload");

    assert_eq!(view.name, "technical.txt");
    assert_eq!(view.category, "TECHNICAL");
    assert_eq!(view.entries.len(), 5);
}

#[test]
fn structured_uploads_are_stored_verbatim() {
    let (service, _, rules) = build_service();
    let payload = json!({
        "type": "TECHNICAL",
        "rules": [{
            "rule_type": "amount_threshold",
            "id": "AMOUNT_THRESHOLD",
            "max_amount": 2000.0
        }]
    });

    let view = service
        .upload_rules(
            "structured.json",
            RuleCategory::Technical,
            RuleSubmission::Structured(payload.clone()),
        )
        .expect("upload");
    assert_eq!(view.entries.len(), 1);

    use crate::workflows::adjudication::repository::RuleDocumentRepository;
    let stored = rules.all().expect("documents");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payload, payload);
}

#[test]
fn unsupported_uploads_become_empty_marker_documents() {
    let (service, _, _) = build_service();

    let view = service
        .upload_rules(
            "rules.pdf",
            RuleCategory::Medical,
            RuleSubmission::Unsupported,
        )
        .expect("upload");
    assert!(view.entries.is_empty());

    let summary = service.rule_summary().expect("summary");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].name, "rules.pdf");
    assert_eq!(summary[0].category, "MEDICAL");
    assert!(summary[0].entries.is_empty());
}

#[test]
fn validation_run_classifies_every_pending_claim() {
    let (service, _, _) = build_service();
    load_fixture_catalogs(&service);
    service.ingest_claims(CLAIMS_CSV.as_bytes()).expect("ingest");

    let summary = service.run_validation().expect("run");

    assert_eq!(summary.evaluated, 3);
    assert_eq!(summary.validated, 2);
    assert_eq!(summary.not_validated, 1);
    assert_eq!(summary.technical_errors, 0);
    assert_eq!(summary.medical_errors, 0);
    assert_eq!(summary.both_errors, 1);

    let claims = service.claim_results().expect("claims");
    assert_eq!(claims[0].status, ClaimStatus::Validated);
    assert_eq!(claims[0].error_category, ErrorCategory::None);
    assert_eq!(
        claims[0].recommended_action.as_deref(),
        Some("Proceed to payment.")
    );

    assert_eq!(claims[1].status, ClaimStatus::NotValidated);
    assert_eq!(claims[1].error_category, ErrorCategory::Both);
    assert_eq!(
        claims[1].recommended_action.as_deref(),
        Some("Please review errors and resubmit with corrections.")
    );
    let explanation = claims[1].error_explanation.as_deref().expect("explanation");
    assert!(explanation.contains("National ID must be uppercase alphanumeric."));
    assert!(explanation.contains("Diagnoses E10.1 and E11.2 cannot coexist."));

    assert_eq!(claims[2].status, ClaimStatus::Validated);
}

#[test]
fn validation_with_no_rules_marks_claims_validated() {
    let (service, _, _) = build_service();
    service.ingest_claims(CLAIMS_CSV.as_bytes()).expect("ingest");

    let summary = service.run_validation().expect("run");

    assert_eq!(summary.evaluated, 3);
    assert_eq!(summary.validated, 3);
}

#[test]
fn terminal_claims_are_skipped_unless_revalidation_is_enabled() {
    let (service, _, _) = build_service();
    load_fixture_catalogs(&service);
    service.ingest_claims(CLAIMS_CSV.as_bytes()).expect("ingest");

    let first = service.run_validation().expect("first run");
    assert_eq!(first.evaluated, 3);

    let second = service.run_validation().expect("second run");
    assert_eq!(second.evaluated, 0);

    let (revalidating, _, _) =
        build_service_with(AdjudicationSettings {
            revalidate_terminal: true,
        });
    load_fixture_catalogs(&revalidating);
    revalidating
        .ingest_claims(CLAIMS_CSV.as_bytes())
        .expect("ingest");

    let first = revalidating.run_validation().expect("first run");
    assert_eq!(first.evaluated, 3);
    let second = revalidating.run_validation().expect("second run");
    assert_eq!(second.evaluated, 3);
}

#[test]
fn error_breakdown_uses_the_fixed_category_order() {
    let (service, _, _) = build_service();
    load_fixture_catalogs(&service);
    service.ingest_claims(CLAIMS_CSV.as_bytes()).expect("ingest");
    service.run_validation().expect("run");

    let breakdown = service.error_breakdown().expect("breakdown");

    assert_eq!(
        breakdown.error_categories,
        vec!["TECHNICAL", "MEDICAL", "BOTH", "NONE"]
    );
    assert_eq!(breakdown.claim_counts, vec![0, 0, 1, 2]);
    assert_eq!(breakdown.paid_amounts, vec![0.0, 0.0, 1500.0, 650.0]);
}

#[test]
fn rule_summary_lists_documents_in_upload_order() {
    let (service, _, _) = build_service();
    load_fixture_catalogs(&service);

    let summary = service.rule_summary().expect("summary");

    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].name, "technical.txt");
    assert_eq!(summary[0].category, "TECHNICAL");
    assert_eq!(summary[0].entries.len(), 5);
    assert_eq!(summary[1].name, "medical.txt");
    assert_eq!(summary[1].category, "MEDICAL");
    assert_eq!(summary[1].entries.len(), 5);
}

#[test]
fn fetching_an_unknown_claim_is_not_found() {
    let (service, _, _) = build_service();

    let error = service
        .claim(&ClaimId("missing".to_string()))
        .expect_err("missing claim");

    assert!(matches!(
        error,
        AdjudicationError::Repository(RepositoryError::NotFound)
    ));
}

#[test]
fn repository_outages_surface_as_repository_errors() {
    let service = AdjudicationService::new(
        Arc::new(UnavailableClaimStore),
        Arc::new(UnavailableRuleStore),
        AdjudicationSettings::default(),
    );

    let error = service
        .ingest_claims(CLAIMS_CSV.as_bytes())
        .expect_err("unavailable store");
    assert!(matches!(
        error,
        AdjudicationError::Repository(RepositoryError::Unavailable(_))
    ));

    let error = service.run_validation().expect_err("unavailable store");
    assert!(matches!(
        error,
        AdjudicationError::Repository(RepositoryError::Unavailable(_))
    ));
}

#[test]
fn malformed_csv_is_an_import_error() {
    let (service, _, _) = build_service();
    let csv = "\
claim_id,national_id
CLM-001,ABC1234567,unexpected-extra-field
";

    let error = service.ingest_claims(csv.as_bytes()).expect_err("bad csv");

    assert!(matches!(error, AdjudicationError::ClaimImport(_)));
}

fn load_fixture_catalogs<C, R>(service: &AdjudicationService<C, R>)
where
    C: crate::workflows::adjudication::repository::ClaimRepository + 'static,
    R: crate::workflows::adjudication::repository::RuleDocumentRepository + 'static,
{
    service
        .upload_rules(
            "technical.txt",
            RuleCategory::Technical,
            RuleSubmission::Text(TECHNICAL_DOC.to_string()),
        )
        .expect("technical upload");
    service
        .upload_rules(
            "medical.txt",
            RuleCategory::Medical,
            RuleSubmission::Text(MEDICAL_DOC.to_string()),
        )
        .expect("medical upload");
}
