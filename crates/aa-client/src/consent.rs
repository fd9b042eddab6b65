//! # Consent Payload Builder
//!
//! Assembles the `POST /Consent` document from a customer's identifiers
//! and the fixed business policy (purpose, FI types, data range, frequency,
//! filters). Pure construction: no IO, no error conditions.
//!
//! Each document gets a fresh transaction id (UUID v4) and a consent window
//! of exactly 24 hours starting at construction time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{FiDataRange, API_VERSION};

/// Length of the consent window.
pub const CONSENT_WINDOW_HOURS: i64 = 24;

// -- Inputs -------------------------------------------------------------------

/// Identifiers a customer supplies when starting a consent flow.
///
/// Only `mobile` reaches the AA API. PAN, email and Aadhaar are accepted at
/// the boundary and not forwarded.
#[derive(Debug, Clone, Default)]
pub struct CustomerIdentifiers {
    pub mobile: String,
    pub pan: Option<String>,
    pub email: Option<String>,
    pub aadhar: Option<String>,
}

impl CustomerIdentifiers {
    pub fn with_mobile(mobile: impl Into<String>) -> Self {
        Self {
            mobile: mobile.into(),
            ..Self::default()
        }
    }
}

/// Fixed business configuration applied to every consent document.
#[derive(Debug, Clone)]
pub struct ConsentPolicy {
    pub consent_mode: String,
    pub fetch_type: String,
    pub consent_types: Vec<String>,
    pub fi_types: Vec<String>,
    pub data_consumer: DataConsumer,
    /// AA customer id (`<vua>@<aa-handle>`) placed in `Customer.id`.
    pub customer_id: String,
    pub purpose: Purpose,
    pub fi_data_range: FiDataRange,
    pub data_life: UnitValue,
    pub frequency: UnitValue,
    pub data_filter: Vec<DataFilter>,
}

impl Default for ConsentPolicy {
    fn default() -> Self {
        Self {
            consent_mode: "VIEW".into(),
            fetch_type: "ONETIME".into(),
            consent_types: vec!["PROFILE".into()],
            fi_types: vec!["DEPOSIT".into()],
            data_consumer: DataConsumer {
                id: "DC1".into(),
                kind: "FIU".into(),
            },
            customer_id: "customer1@identifier2.io".into(),
            purpose: Purpose {
                code: "101".into(),
                ref_uri: "https://api.rebit.org.in/aa/purpose/101.xml".into(),
                text: "Wealth management service".into(),
                category: PurposeCategory {
                    kind: "string".into(),
                },
            },
            fi_data_range: FiDataRange {
                from: fixed_instant("2019-12-06T11:39:57.153Z"),
                to: fixed_instant("2023-07-06T11:39:57.153Z"),
            },
            data_life: UnitValue {
                unit: "MONTH".into(),
                value: 0,
            },
            frequency: UnitValue {
                unit: "HOUR".into(),
                value: 1,
            },
            data_filter: vec![DataFilter {
                kind: "TRANSACTIONAMOUNT".into(),
                operator: ">=".into(),
                value: "1000".into(),
            }],
        }
    }
}

fn fixed_instant(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

// -- Document types (AA `POST /Consent` schema) -------------------------------

/// The consent-creation request. Immutable once sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentDocument {
    pub ver: String,
    pub timestamp: DateTime<Utc>,
    pub txnid: String,
    #[serde(rename = "ConsentDetail")]
    pub consent_detail: ConsentDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentDetail {
    pub consent_start: DateTime<Utc>,
    pub consent_expiry: DateTime<Utc>,
    pub consent_mode: String,
    pub fetch_type: String,
    pub consent_types: Vec<String>,
    pub fi_types: Vec<String>,
    #[serde(rename = "DataConsumer")]
    pub data_consumer: DataConsumer,
    #[serde(rename = "Customer")]
    pub customer: Customer,
    #[serde(rename = "Purpose")]
    pub purpose: Purpose,
    #[serde(rename = "FIDataRange")]
    pub fi_data_range: FiDataRange,
    #[serde(rename = "DataLife")]
    pub data_life: UnitValue,
    #[serde(rename = "Frequency")]
    pub frequency: UnitValue,
    #[serde(rename = "DataFilter", default, skip_serializing_if = "Vec::is_empty")]
    pub data_filter: Vec<DataFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConsumer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(rename = "Identifiers")]
    pub identifiers: Vec<CustomerIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purpose {
    pub code: String,
    pub ref_uri: String,
    pub text: String,
    #[serde(rename = "Category")]
    pub category: PurposeCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeCategory {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitValue {
    pub unit: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFilter {
    #[serde(rename = "type")]
    pub kind: String,
    pub operator: String,
    pub value: String,
}

// -- Builder ------------------------------------------------------------------

/// Builds consent documents under a fixed [`ConsentPolicy`].
#[derive(Debug, Clone, Default)]
pub struct ConsentPayloadBuilder {
    policy: ConsentPolicy,
}

impl ConsentPayloadBuilder {
    pub fn new(policy: ConsentPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ConsentPolicy {
        &self.policy
    }

    /// Build a document stamped with the current time.
    pub fn build(&self, customer: &CustomerIdentifiers) -> ConsentDocument {
        self.build_at(customer, Utc::now())
    }

    /// Build a document as of `now`. The window is `[now, now + 24h]`.
    pub fn build_at(&self, customer: &CustomerIdentifiers, now: DateTime<Utc>) -> ConsentDocument {
        let p = &self.policy;
        ConsentDocument {
            ver: API_VERSION.to_string(),
            timestamp: now,
            txnid: Uuid::new_v4().to_string(),
            consent_detail: ConsentDetail {
                consent_start: now,
                consent_expiry: now + Duration::hours(CONSENT_WINDOW_HOURS),
                consent_mode: p.consent_mode.clone(),
                fetch_type: p.fetch_type.clone(),
                consent_types: p.consent_types.clone(),
                fi_types: p.fi_types.clone(),
                data_consumer: p.data_consumer.clone(),
                customer: Customer {
                    id: p.customer_id.clone(),
                    identifiers: vec![CustomerIdentifier {
                        kind: "MOBILE".into(),
                        value: customer.mobile.clone(),
                    }],
                },
                purpose: p.purpose.clone(),
                fi_data_range: p.fi_data_range.clone(),
                data_life: p.data_life.clone(),
                frequency: p.frequency.clone(),
                data_filter: p.data_filter.clone(),
            },
        }
    }
}
