use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The two independently maintained rule catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCategory {
    Technical,
    Medical,
}

impl RuleCategory {
    pub const fn label(self) -> &'static str {
        match self {
            RuleCategory::Technical => "TECHNICAL",
            RuleCategory::Medical => "MEDICAL",
        }
    }
}

/// Encounter kind an encounter-restriction rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncounterKind {
    Inpatient,
    Outpatient,
}

impl EncounterKind {
    pub const fn label(self) -> &'static str {
        match self {
            EncounterKind::Inpatient => "inpatient",
            EncounterKind::Outpatient => "outpatient",
        }
    }
}

/// One typed, atomic constraint extracted or declared from a rule document.
///
/// The serde representation matches the structured upload format exactly
/// (`rule_type` tag plus the submitted field names), so pre-parsed rule sets
/// deserialize without a translation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleEntry {
    ServiceApproval {
        id: String,
        service_code: String,
        #[serde(default)]
        description: String,
        requires_approval: bool,
    },
    DiagnosisApproval {
        id: String,
        diagnosis_code: String,
        #[serde(default)]
        description: String,
        requires_approval: bool,
    },
    AmountThreshold {
        id: String,
        max_amount: f64,
    },
    /// Static policy entry; the requirement strings are informational, the
    /// actual checks are fixed engine logic.
    IdFormatting {
        id: String,
        requirements: Vec<String>,
    },
    EncounterRestriction {
        id: String,
        encounter: EncounterKind,
        services: Vec<String>,
    },
    FacilityRestriction {
        id: String,
        facilities: BTreeMap<String, String>,
    },
    DiagnosisService {
        id: String,
        diagnosis_code: String,
        required_service: String,
    },
    MutuallyExclusive {
        id: String,
        diagnoses: Vec<String>,
    },
}

impl RuleEntry {
    /// Stable identifier composed from the rule's defining fields.
    pub fn id(&self) -> &str {
        match self {
            RuleEntry::ServiceApproval { id, .. }
            | RuleEntry::DiagnosisApproval { id, .. }
            | RuleEntry::AmountThreshold { id, .. }
            | RuleEntry::IdFormatting { id, .. }
            | RuleEntry::EncounterRestriction { id, .. }
            | RuleEntry::FacilityRestriction { id, .. }
            | RuleEntry::DiagnosisService { id, .. }
            | RuleEntry::MutuallyExclusive { id, .. } => id,
        }
    }

    /// Catalog this rule kind belongs to.
    pub fn category(&self) -> RuleCategory {
        match self {
            RuleEntry::ServiceApproval { .. }
            | RuleEntry::DiagnosisApproval { .. }
            | RuleEntry::AmountThreshold { .. }
            | RuleEntry::IdFormatting { .. } => RuleCategory::Technical,
            RuleEntry::EncounterRestriction { .. }
            | RuleEntry::FacilityRestriction { .. }
            | RuleEntry::DiagnosisService { .. }
            | RuleEntry::MutuallyExclusive { .. } => RuleCategory::Medical,
        }
    }
}

/// One uploaded rule artifact, immutable once stored. The payload is kept
/// exactly as uploaded (or as produced by extraction); it is decoded fresh
/// on every aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub name: String,
    pub category: RuleCategory,
    pub payload: Value,
    pub uploaded_at: DateTime<Utc>,
}

impl RuleDocument {
    /// Best-effort decode of the payload's top-level `rules` array.
    ///
    /// A payload without a `rules` array contributes nothing; entries that do
    /// not match any known rule kind are skipped individually so one foreign
    /// entry does not discard the rest of the document.
    pub fn entries(&self) -> Vec<RuleEntry> {
        let Some(rules) = self.payload.get("rules").and_then(Value::as_array) else {
            return Vec::new();
        };

        rules
            .iter()
            .filter_map(|raw| match serde_json::from_value(raw.clone()) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::warn!(document = %self.name, %error, "skipping undecodable rule entry");
                    None
                }
            })
            .collect()
    }
}

/// Working union of rule entries across every stored document, one flat
/// sequence per catalog, in document-upload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCollection {
    pub technical: Vec<RuleEntry>,
    pub medical: Vec<RuleEntry>,
}

impl RuleCollection {
    pub fn is_empty(&self) -> bool {
        self.technical.is_empty() && self.medical.is_empty()
    }

    pub fn len(&self) -> usize {
        self.technical.len() + self.medical.len()
    }
}

/// Concatenate the entries of every document into per-category collections.
///
/// Deliberately no conflict detection and no de-duplication: contradictory
/// rules from different documents are all retained and all evaluated, so a
/// claim must satisfy the union of every uploaded constraint.
pub fn aggregate<'a, I>(documents: I) -> RuleCollection
where
    I: IntoIterator<Item = &'a RuleDocument>,
{
    let mut collection = RuleCollection::default();

    for document in documents {
        let entries = document.entries();
        match document.category {
            RuleCategory::Technical => collection.technical.extend(entries),
            RuleCategory::Medical => collection.medical.extend(entries),
        }
    }

    collection
}
