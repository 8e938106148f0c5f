//! # HIE Types
//!
//! Canonical domain records shared across the HIE workspace:
//! - `Patient`: the normalised output of an identity query, whichever wire
//!   dialect produced it
//! - `Event`: a correlated document-registry notification
//! - `Subscription`: a broker subscription tracked by this system
//! - `Workflow` / `DefinitionRow`: persistence rows for workflow documents
//!   and their definitions
//! - workflow/task status enums and the IHE wire constants
//!
//! **No I/O concerns**: wire execution, parsing and persistence belong in
//! `hie-wire`, `hie-pdq`, `hie-dsub` and `hie-store`.

pub mod consts;
pub mod status;

pub use status::{TaskStatus, WorkflowStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A patient as resolved by an identity query.
///
/// Holds the three identifier pairs the regional community deals in: the
/// local (MRN) id, the regional/XDS id and the national id, each with its
/// assigning-authority OID, plus the demographics the query dialect exposed.
/// Fields the dialect does not carry stay empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default)]
    pub local_id: String,
    #[serde(default)]
    pub local_oid: String,
    #[serde(default)]
    pub regional_id: String,
    #[serde(default)]
    pub regional_oid: String,
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub national_oid: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub gender: String,
    /// Compact HL7 date (`YYYYMMDD`); dashes are stripped at the boundary.
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub country: String,
}

impl Patient {
    /// True when the resolved national id has the expected 10-digit shape.
    pub fn has_valid_national_id(&self) -> bool {
        self.national_id.len() == 10 && self.national_id.chars().all(|c| c.is_ascii_digit())
    }
}

/// A broker subscription tracked by this system.
///
/// Created when a workflow definition is registered; deleted when the
/// definition is replaced; looked up by `broker_ref` when a notification
/// arrives. `id` is assigned by the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub broker_ref: String,
    #[serde(default)]
    pub pathway: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub expression: String,
}

/// A canonical notification record, one per matched (notification ×
/// subscription) pair. Immutable after creation; `id` is assigned by the
/// store and is monotonic, so replaying `id`-descending yields
/// latest-event-first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub doc_name: String,
    #[serde(default)]
    pub class_code: String,
    #[serde(default)]
    pub conf_code: String,
    #[serde(default)]
    pub format_code: String,
    #[serde(default)]
    pub facility_code: String,
    #[serde(default)]
    pub practice_code: String,
    /// The classification value the broker filter matched (the document
    /// type code), compared against workflow slot names.
    #[serde(default)]
    pub expression: String,
    /// Subject patient id local to the XDS community (before `^^^`).
    #[serde(default)]
    pub xds_pid: String,
    #[serde(default)]
    pub xds_doc_entry_uid: String,
    #[serde(default)]
    pub repository_unique_id: String,
    /// National id resolved lazily once a live subscription match is
    /// confirmed.
    #[serde(default)]
    pub nhs_id: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub pathway: String,
    #[serde(default)]
    pub broker_ref: String,
}

/// A persisted workflow-document row.
///
/// `xdw_key` is `PATHWAY + national id`; the document and its definition are
/// carried as JSON text so the store stays schema-agnostic. `version` is the
/// optimistic-concurrency token checked on update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub xdw_key: String,
    #[serde(default)]
    pub xdw_uid: String,
    #[serde(default)]
    pub xdw_doc: String,
    #[serde(default)]
    pub xdw_def: String,
    #[serde(default)]
    pub version: i64,
}

/// A persisted workflow-definition row, keyed by the definition's ref name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRow {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub xdw: String,
}

impl Workflow {
    /// Split an `xdw_key` back into `(pathway, national id)`.
    ///
    /// The national id is the 10-digit suffix; everything before it is the
    /// pathway name.
    pub fn split_key(key: &str) -> Option<(&str, &str)> {
        if key.len() <= 10 {
            return None;
        }
        let (pathway, nhs) = key.split_at(key.len() - 10);
        if nhs.chars().all(|c| c.is_ascii_digit()) {
            Some((pathway, nhs))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_id_shape_is_ten_digits() {
        let mut pat = Patient {
            national_id: "9999999468".into(),
            ..Patient::default()
        };
        assert!(pat.has_valid_national_id());
        pat.national_id = "999999946".into();
        assert!(!pat.has_valid_national_id());
        pat.national_id = "99999994AB".into();
        assert!(!pat.has_valid_national_id());
    }

    #[test]
    fn splits_xdw_key_into_pathway_and_nhs() {
        assert_eq!(
            Workflow::split_key("LUNGPATHWAY9999999468"),
            Some(("LUNGPATHWAY", "9999999468"))
        );
        assert_eq!(Workflow::split_key("SHORT"), None);
        assert_eq!(Workflow::split_key("LUNGPATHWAYNOTDIGITSX"), None);
    }
}
