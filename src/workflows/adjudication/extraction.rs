//! Pattern-based rule extraction from free-text rule documents.
//!
//! The source documents follow a fixed template, and the extraction is
//! intentionally position- and pattern-based rather than a general document
//! parser; brittleness under format drift is an accepted contract. Unmatched
//! pattern families simply contribute no entries, so extraction never fails.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::rules::{EncounterKind, RuleCategory, RuleEntry};

const INPATIENT_MARKER: &str = "Inpatient-only services";
const OUTPATIENT_MARKER: &str = "Outpatient-only services";
const OUTPATIENT_SPLIT: &str = "Outpatient-only";
const FACILITY_MARKER: &str = "Facility Registry";

fn service_approval_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(SRV\d+)\s+(.+?)\s+(YES|NO)").expect("static pattern compiles"))
}

fn diagnosis_approval_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Z]\d+\.\d+)\s+(.+?)\s+(YES|NO)").expect("static pattern compiles")
    })
}

fn amount_threshold_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"paid_amount_aed > AED (\d+)").expect("static pattern compiles"))
}

fn service_code_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"SRV\d+").expect("static pattern compiles"))
}

fn facility_pair_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Z0-9]{8})\s+([A-Z_]+)").expect("static pattern compiles"))
}

fn diagnosis_service_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Z]\d+\.\d+).+?:\s+(SRV\d+)").expect("static pattern compiles")
    })
}

fn mutual_exclusion_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Z]\d+\.\d+).+?cannot coexist with\s+([A-Z]\d+\.\d+)")
            .expect("static pattern compiles")
    })
}

/// Extract every rule entry the declared catalog's pattern families match in
/// `text`. Deterministic: identical text yields an identical entry sequence,
/// ids included.
pub fn extract(text: &str, category: RuleCategory) -> Vec<RuleEntry> {
    match category {
        RuleCategory::Technical => extract_technical(text),
        RuleCategory::Medical => extract_medical(text),
    }
}

fn extract_technical(text: &str) -> Vec<RuleEntry> {
    let mut entries = Vec::new();

    for captures in service_approval_pattern().captures_iter(text) {
        let service_code = captures[1].to_string();
        entries.push(RuleEntry::ServiceApproval {
            id: format!("{service_code}_APPROVAL"),
            service_code,
            description: captures[2].trim().to_string(),
            requires_approval: &captures[3] == "YES",
        });
    }

    for captures in diagnosis_approval_pattern().captures_iter(text) {
        let diagnosis_code = captures[1].to_string();
        entries.push(RuleEntry::DiagnosisApproval {
            id: format!("{diagnosis_code}_APPROVAL"),
            diagnosis_code,
            description: captures[2].trim().to_string(),
            requires_approval: &captures[3] == "YES",
        });
    }

    if let Some(captures) = amount_threshold_pattern().captures(text) {
        // Capture group is digits only.
        let max_amount = captures[1].parse::<f64>().unwrap_or(0.0);
        entries.push(RuleEntry::AmountThreshold {
            id: "AMOUNT_THRESHOLD".to_string(),
            max_amount,
        });
    }

    // Static policy entry, emitted unconditionally regardless of document text.
    entries.push(RuleEntry::IdFormatting {
        id: "ID_FORMATTING".to_string(),
        requirements: vec![
            "All IDs must be uppercase alphanumeric".to_string(),
            "unique_id structure: first4(National ID) – middle4(Member ID) – last4(Facility ID)"
                .to_string(),
            "Segments must be hyphen-separated".to_string(),
        ],
    });

    entries
}

fn extract_medical(text: &str) -> Vec<RuleEntry> {
    let mut entries = Vec::new();

    // Both encounter rules key off the same split point: the document layout
    // places inpatient content before the "Outpatient-only" marker and
    // outpatient content after it.
    if text.contains(INPATIENT_MARKER) {
        let before = text
            .split_once(OUTPATIENT_SPLIT)
            .map(|(before, _)| before)
            .unwrap_or(text);
        entries.push(RuleEntry::EncounterRestriction {
            id: "INPATIENT_SERVICES".to_string(),
            encounter: EncounterKind::Inpatient,
            services: service_codes(before),
        });
    }

    if text.contains(OUTPATIENT_MARKER) {
        let after = text
            .split_once(OUTPATIENT_SPLIT)
            .map(|(_, after)| after)
            .unwrap_or("");
        entries.push(RuleEntry::EncounterRestriction {
            id: "OUTPATIENT_SERVICES".to_string(),
            encounter: EncounterKind::Outpatient,
            services: service_codes(after),
        });
    }

    if text.contains(FACILITY_MARKER) {
        let mut facilities = BTreeMap::new();
        for captures in facility_pair_pattern().captures_iter(text) {
            // Later matches for the same facility id overwrite earlier ones.
            facilities.insert(captures[1].to_string(), captures[2].to_string());
        }
        entries.push(RuleEntry::FacilityRestriction {
            id: "FACILITY_RESTRICTIONS".to_string(),
            facilities,
        });
    }

    for captures in diagnosis_service_pattern().captures_iter(text) {
        let diagnosis_code = captures[1].to_string();
        entries.push(RuleEntry::DiagnosisService {
            id: format!("{diagnosis_code}_SERVICE_MAP"),
            diagnosis_code,
            required_service: captures[2].to_string(),
        });
    }

    for captures in mutual_exclusion_pattern().captures_iter(text) {
        let first = captures[1].to_string();
        let second = captures[2].to_string();
        entries.push(RuleEntry::MutuallyExclusive {
            id: format!("{first}_{second}_EXCLUSION"),
            diagnoses: vec![first, second],
        });
    }

    entries
}

fn service_codes(text: &str) -> Vec<String> {
    service_code_pattern()
        .find_iter(text)
        .map(|code| code.as_str().to_string())
        .collect()
}
