use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{Claim, ClaimId};
use super::rules::RuleDocument;

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for claim records so the service and engine can be
/// exercised without a concrete backend.
pub trait ClaimRepository: Send + Sync {
    fn insert(&self, claim: Claim) -> Result<Claim, RepositoryError>;
    fn update(&self, claim: Claim) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ClaimId) -> Result<Option<Claim>, RepositoryError>;
    /// Claims still awaiting classification, in ingestion order.
    fn pending(&self) -> Result<Vec<Claim>, RepositoryError>;
    fn all(&self) -> Result<Vec<Claim>, RepositoryError>;
}

/// Storage abstraction for uploaded rule documents. Documents are immutable
/// once stored; there is no update operation by design.
pub trait RuleDocumentRepository: Send + Sync {
    fn insert(&self, document: RuleDocument) -> Result<(), RepositoryError>;
    /// Every stored document, in upload order.
    fn all(&self) -> Result<Vec<RuleDocument>, RepositoryError>;
}

/// In-memory claim store used by the binary and the test suites. Claims are
/// kept in insertion order; claim ids may be externally assigned, so listing
/// order must not depend on id ordering.
#[derive(Default, Clone)]
pub struct InMemoryClaimStore {
    records: Arc<Mutex<ClaimRecords>>,
}

#[derive(Default)]
struct ClaimRecords {
    claims: Vec<Claim>,
    index: HashMap<ClaimId, usize>,
}

impl ClaimRepository for InMemoryClaimStore {
    fn insert(&self, claim: Claim) -> Result<Claim, RepositoryError> {
        let mut guard = self.records.lock().expect("claim store mutex poisoned");
        let records = &mut *guard;
        if records.index.contains_key(&claim.claim_id) {
            return Err(RepositoryError::Conflict);
        }
        records.index.insert(claim.claim_id.clone(), records.claims.len());
        records.claims.push(claim.clone());
        Ok(claim)
    }

    fn update(&self, claim: Claim) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("claim store mutex poisoned");
        let Some(&position) = guard.index.get(&claim.claim_id) else {
            return Err(RepositoryError::NotFound);
        };
        guard.claims[position] = claim;
        Ok(())
    }

    fn fetch(&self, id: &ClaimId) -> Result<Option<Claim>, RepositoryError> {
        let guard = self.records.lock().expect("claim store mutex poisoned");
        let claim = guard
            .index
            .get(id)
            .map(|&position| guard.claims[position].clone());
        Ok(claim)
    }

    fn pending(&self) -> Result<Vec<Claim>, RepositoryError> {
        let guard = self.records.lock().expect("claim store mutex poisoned");
        Ok(guard
            .claims
            .iter()
            .filter(|claim| !claim.is_terminal())
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<Claim>, RepositoryError> {
        let guard = self.records.lock().expect("claim store mutex poisoned");
        Ok(guard.claims.clone())
    }
}

/// In-memory rule document store preserving upload order.
#[derive(Default, Clone)]
pub struct InMemoryRuleStore {
    documents: Arc<Mutex<Vec<RuleDocument>>>,
}

impl RuleDocumentRepository for InMemoryRuleStore {
    fn insert(&self, document: RuleDocument) -> Result<(), RepositoryError> {
        let mut guard = self.documents.lock().expect("rule store mutex poisoned");
        guard.push(document);
        Ok(())
    }

    fn all(&self) -> Result<Vec<RuleDocument>, RepositoryError> {
        let guard = self.documents.lock().expect("rule store mutex poisoned");
        Ok(guard.clone())
    }
}
