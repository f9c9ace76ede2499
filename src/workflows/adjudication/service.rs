use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{Claim, ClaimId, ClaimStatus, ErrorCategory};
use super::engine;
use super::extraction;
use super::ingest;
use super::repository::{ClaimRepository, RepositoryError, RuleDocumentRepository};
use super::rules::{self, RuleCategory, RuleDocument, RuleEntry};

/// Knobs for a validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjudicationSettings {
    /// When set, a run re-evaluates already classified claims instead of
    /// processing only pending ones.
    pub revalidate_terminal: bool,
}

/// One inbound rule artifact. Structured payloads bypass extraction entirely
/// and are stored as submitted; raw text goes through the extractor with the
/// caller-declared category; anything else becomes a marker document with no
/// entries (a graceful no-op, not an error).
#[derive(Debug, Clone)]
pub enum RuleSubmission {
    Structured(Value),
    Text(String),
    Unsupported,
}

/// Error raised by the adjudication service.
#[derive(Debug, thiserror::Error)]
pub enum AdjudicationError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("invalid claims csv: {0}")]
    ClaimImport(#[from] csv::Error),
}

/// Counters describing one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRunSummary {
    pub evaluated: usize,
    pub validated: usize,
    pub not_validated: usize,
    pub technical_errors: usize,
    pub medical_errors: usize,
    pub both_errors: usize,
}

/// Per-document view over the stored catalogs, with entries decoded
/// best-effort (empty for unparsable payloads).
#[derive(Debug, Clone, Serialize)]
pub struct RuleDocumentView {
    pub name: String,
    pub category: &'static str,
    pub uploaded_at: DateTime<Utc>,
    pub entries: Vec<RuleEntry>,
}

/// Claim counts and summed paid amounts per error category, in the fixed
/// TECHNICAL, MEDICAL, BOTH, NONE presentation order.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBreakdown {
    pub error_categories: Vec<&'static str>,
    pub claim_counts: Vec<usize>,
    pub paid_amounts: Vec<f64>,
}

/// Service composing the claim and rule stores with the pure extraction,
/// aggregation, and validation core.
pub struct AdjudicationService<C, R> {
    claims: Arc<C>,
    rules: Arc<R>,
    settings: AdjudicationSettings,
}

impl<C, R> AdjudicationService<C, R>
where
    C: ClaimRepository + 'static,
    R: RuleDocumentRepository + 'static,
{
    pub fn new(claims: Arc<C>, rules: Arc<R>, settings: AdjudicationSettings) -> Self {
        Self {
            claims,
            rules,
            settings,
        }
    }

    /// Parse a claims CSV and store each row as a pending claim.
    pub fn ingest_claims<Rd: Read>(&self, reader: Rd) -> Result<Vec<ClaimId>, AdjudicationError> {
        let claims = ingest::parse_claims(reader)?;
        let mut ids = Vec::with_capacity(claims.len());

        for claim in claims {
            let stored = self.claims.insert(claim)?;
            ids.push(stored.claim_id);
        }

        info!(imported = ids.len(), "claims ingested");
        Ok(ids)
    }

    /// Store one uploaded rule artifact. Extraction happens exactly once,
    /// here; the document payload is immutable afterwards.
    pub fn upload_rules(
        &self,
        name: &str,
        category: RuleCategory,
        submission: RuleSubmission,
    ) -> Result<RuleDocumentView, AdjudicationError> {
        let payload = match submission {
            RuleSubmission::Structured(payload) => payload,
            RuleSubmission::Text(text) => {
                let entries = extraction::extract(&text, category);
                json!({ "type": category.label(), "rules": entries })
            }
            RuleSubmission::Unsupported => {
                warn!(document = name, "unsupported rule submission stored as empty marker");
                json!({ "note": "Unsupported format" })
            }
        };

        let document = RuleDocument {
            name: name.to_string(),
            category,
            payload,
            uploaded_at: Utc::now(),
        };
        let view = document_view(&document);
        self.rules.insert(document)?;

        info!(
            document = name,
            category = category.label(),
            entries = view.entries.len(),
            "rule document stored"
        );
        Ok(view)
    }

    /// Rebuild the working rule collection from every stored document and
    /// classify each pending claim (each stored claim when the re-validation
    /// flag is set), persisting outcomes as they are produced.
    pub fn run_validation(&self) -> Result<ValidationRunSummary, AdjudicationError> {
        let documents = self.rules.all()?;
        let collection = rules::aggregate(&documents);

        let candidates = if self.settings.revalidate_terminal {
            self.claims.all()?
        } else {
            self.claims.pending()?
        };

        let mut summary = ValidationRunSummary::default();
        for mut claim in candidates {
            let outcome = engine::validate(&claim, &collection);
            outcome.apply_to(&mut claim);
            self.claims.update(claim)?;

            summary.evaluated += 1;
            match outcome.status {
                ClaimStatus::Validated => summary.validated += 1,
                ClaimStatus::NotValidated => summary.not_validated += 1,
                ClaimStatus::Pending => {}
            }
            match outcome.error_category {
                ErrorCategory::Technical => summary.technical_errors += 1,
                ErrorCategory::Medical => summary.medical_errors += 1,
                ErrorCategory::Both => summary.both_errors += 1,
                ErrorCategory::None => {}
            }
        }

        info!(
            evaluated = summary.evaluated,
            validated = summary.validated,
            not_validated = summary.not_validated,
            rules = collection.len(),
            "validation run completed"
        );
        Ok(summary)
    }

    pub fn claim(&self, id: &ClaimId) -> Result<Claim, AdjudicationError> {
        let claim = self.claims.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(claim)
    }

    /// Every stored claim, in ingestion order.
    pub fn claim_results(&self) -> Result<Vec<Claim>, AdjudicationError> {
        Ok(self.claims.all()?)
    }

    /// Per-document rule summary across both catalogs, in upload order.
    pub fn rule_summary(&self) -> Result<Vec<RuleDocumentView>, AdjudicationError> {
        let documents = self.rules.all()?;
        Ok(documents.iter().map(document_view).collect())
    }

    /// Claim counts and paid totals per error category for dashboards.
    pub fn error_breakdown(&self) -> Result<ErrorBreakdown, AdjudicationError> {
        const CATEGORIES: [ErrorCategory; 4] = [
            ErrorCategory::Technical,
            ErrorCategory::Medical,
            ErrorCategory::Both,
            ErrorCategory::None,
        ];

        let claims = self.claims.all()?;
        let mut breakdown = ErrorBreakdown {
            error_categories: Vec::with_capacity(CATEGORIES.len()),
            claim_counts: Vec::with_capacity(CATEGORIES.len()),
            paid_amounts: Vec::with_capacity(CATEGORIES.len()),
        };

        for category in CATEGORIES {
            let matching = claims
                .iter()
                .filter(|claim| claim.error_category == category);
            let (count, total) = matching.fold((0usize, 0.0f64), |(count, total), claim| {
                (count + 1, total + claim.paid_amount_aed)
            });

            breakdown.error_categories.push(category.label());
            breakdown.claim_counts.push(count);
            breakdown.paid_amounts.push(total);
        }

        Ok(breakdown)
    }
}

fn document_view(document: &RuleDocument) -> RuleDocumentView {
    RuleDocumentView {
        name: document.name.clone(),
        category: document.category.label(),
        uploaded_at: document.uploaded_at,
        entries: document.entries(),
    }
}
