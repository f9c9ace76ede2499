use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};

use super::domain::{Claim, ClaimId, ClaimStatus, ErrorCategory};

static CLAIM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_claim_id() -> ClaimId {
    let id = CLAIM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ClaimId(format!("clm-{id:06}"))
}

/// Parse a claims CSV export into `Pending` claim records.
///
/// Rows without a `claim_id` column get a generated identifier. Unparsable
/// service dates are left empty rather than rejecting the row.
pub(crate) fn parse_claims<R: Read>(reader: R) -> Result<Vec<Claim>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut claims = Vec::new();

    for record in csv_reader.deserialize::<ClaimRow>() {
        let row = record?;
        claims.push(row.into_claim());
    }

    Ok(claims)
}

#[derive(Debug, Deserialize)]
struct ClaimRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    claim_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    encounter_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    service_date: Option<String>,
    #[serde(default)]
    national_id: String,
    #[serde(default)]
    member_id: String,
    #[serde(default)]
    facility_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    unique_id: Option<String>,
    #[serde(default)]
    diagnosis_codes: String,
    #[serde(default)]
    service_code: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    paid_amount_aed: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    approval_number: Option<String>,
}

impl ClaimRow {
    fn into_claim(self) -> Claim {
        let claim_id = self.claim_id.map(ClaimId).unwrap_or_else(next_claim_id);
        let service_date = self.service_date.as_deref().and_then(parse_service_date);
        let diagnosis_codes = diagnosis_list(&self.diagnosis_codes);
        let paid_amount_aed = self
            .paid_amount_aed
            .as_deref()
            .and_then(|raw| raw.parse::<f64>().ok())
            .unwrap_or(0.0);

        Claim {
            claim_id,
            encounter_type: self.encounter_type,
            service_date,
            national_id: self.national_id,
            member_id: self.member_id,
            facility_id: self.facility_id,
            unique_id: self.unique_id,
            diagnosis_codes,
            service_code: self.service_code,
            paid_amount_aed,
            approval_number: self.approval_number,
            status: ClaimStatus::Pending,
            error_category: ErrorCategory::None,
            error_explanation: None,
            recommended_action: None,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_service_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%m/%d/%y") {
        return Some(date);
    }

    NaiveDate::parse_from_str(trimmed, "%d/%m/%y").ok()
}

fn diagnosis_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) fn parse_service_date_for_tests(value: &str) -> Option<NaiveDate> {
    parse_service_date(value)
}
