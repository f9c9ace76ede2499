//! Claim adjudication workflow: rule extraction, rule aggregation, and the
//! validation engine, plus the thin storage/HTTP collaborators around them.
//!
//! Extraction and validation are pure functions over immutable inputs; all
//! I/O lives behind the repository traits and the router. The working rule
//! collection is rebuilt from every stored document on each validation run
//! so results always reflect the latest uploads.

pub mod domain;
pub mod engine;
pub mod extraction;
pub(crate) mod ingest;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{Claim, ClaimId, ClaimStatus, ErrorCategory};
pub use engine::{validate, ValidationOutcome, Violation};
pub use extraction::extract;
pub use repository::{
    ClaimRepository, InMemoryClaimStore, InMemoryRuleStore, RepositoryError,
    RuleDocumentRepository,
};
pub use router::adjudication_router;
pub use rules::{
    aggregate, EncounterKind, RuleCategory, RuleCollection, RuleDocument, RuleEntry,
};
pub use service::{
    AdjudicationError, AdjudicationService, AdjudicationSettings, ErrorBreakdown,
    RuleDocumentView, RuleSubmission, ValidationRunSummary,
};
