//! # HIE PDQ
//!
//! Patient identity resolver. A [`PatientQuery`] names the subject by up to
//! three identifier pairs (MRN, national, regional) and a target server
//! variant; resolution renders the protocol-specific request, executes it
//! through the wire client and normalizes the response into canonical
//! [`Patient`] records.
//!
//! Three server variants are supported:
//! - [`ServerVariant::Pdqv3`]: HL7v3 Patient Demographics Query over SOAP
//!   (PRPA_IN201305UV02 / PRPA_IN201306UV02).
//! - [`ServerVariant::Pixv3`]: HL7v3 Patient Identifier Cross-reference
//!   over SOAP (PRPA_IN201309UV02 / PRPA_IN201310UV02).
//! - [`ServerVariant::Pixm`]: FHIR REST patient query returning a JSON
//!   `Bundle`.
//!
//! The resolver is stateless; an optional [`cache::PatientCache`] can
//! short-circuit repeat queries within one process lifetime.

pub mod cache;
mod fhir;
mod hl7v3;
mod templates;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use hie_types::consts::{NHS_OID_DEFAULT, SOAP_ACTION_PDQV3, SOAP_ACTION_PIXV3};
use hie_types::Patient;
use hie_wire::{render, SoapRequest, WireClient, DEFAULT_TIMEOUT};

pub use cache::PatientCache;

#[derive(Debug, thiserror::Error)]
pub enum PdqError {
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error(transparent)]
    Transport(#[from] hie_wire::WireError),
    #[error("remote system rejected the query: acknowledgement code {0}")]
    ProtocolNack(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type PdqResult<T> = Result<T, PdqError>;

/// The identity-server dialects a query can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerVariant {
    Pdqv3,
    Pixv3,
    Pixm,
}

impl ServerVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerVariant::Pdqv3 => "pdqv3",
            ServerVariant::Pixv3 => "pixv3",
            ServerVariant::Pixm => "pixm",
        }
    }
}

impl fmt::Display for ServerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerVariant {
    type Err = PdqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdqv3" => Ok(ServerVariant::Pdqv3),
            "pixv3" => Ok(ServerVariant::Pixv3),
            "pixm" => Ok(ServerVariant::Pixm),
            _ => Err(PdqError::InvalidRequest("unknown identity server variant")),
        }
    }
}

/// An identity query. At least one identifier pair must be populated;
/// which pair is used follows the precedence MRN, then national, then
/// regional.
#[derive(Clone, Debug, Default)]
pub struct PatientQuery {
    pub server: Option<ServerVariant>,
    pub server_url: String,
    pub mrn_id: String,
    pub mrn_oid: String,
    pub nhs_id: String,
    pub nhs_oid: String,
    pub reg_id: String,
    pub reg_oid: String,
    pub timeout: Duration,
    /// Skip the cache read for this query. The outcome is still cached.
    pub fresh: bool,
}

impl PatientQuery {
    /// Resolve the identifier pair the query will use. Fails with
    /// [`PdqError::InvalidRequest`] before any network activity if the
    /// query cannot be executed.
    pub fn used_identifier(&self) -> PdqResult<(String, String)> {
        if self.server_url.is_empty() {
            return Err(PdqError::InvalidRequest("identity server url is not set"));
        }
        if self.reg_oid.is_empty() {
            return Err(PdqError::InvalidRequest("regional authority oid is not set"));
        }
        let nhs_oid = if self.nhs_oid.is_empty() {
            NHS_OID_DEFAULT
        } else {
            self.nhs_oid.as_str()
        };
        if !self.mrn_id.is_empty() && !self.mrn_oid.is_empty() {
            return Ok((self.mrn_id.clone(), self.mrn_oid.clone()));
        }
        if !self.nhs_id.is_empty() {
            return Ok((self.nhs_id.clone(), nhs_oid.to_string()));
        }
        if !self.reg_id.is_empty() {
            return Ok((self.reg_id.clone(), self.reg_oid.clone()));
        }
        Err(PdqError::InvalidRequest(
            "no usable identifier pair found for identity query",
        ))
    }

    fn timeout_or_default(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    fn nhs_oid_or_default(&self) -> &str {
        if self.nhs_oid.is_empty() {
            NHS_OID_DEFAULT
        } else {
            &self.nhs_oid
        }
    }
}

/// The result of one identity query.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct QueryOutcome {
    pub patients: Vec<Patient>,
    pub count: i64,
    pub status: u16,
}

/// Executes identity queries against the configured server variant.
#[derive(Clone, Debug)]
pub struct PdqClient {
    wire: WireClient,
    cache: Option<PatientCache>,
}

impl PdqClient {
    pub fn new(wire: WireClient) -> Self {
        Self { wire, cache: None }
    }

    pub fn with_cache(wire: WireClient, cache: PatientCache) -> Self {
        Self {
            wire,
            cache: Some(cache),
        }
    }

    pub async fn query(&self, query: &PatientQuery) -> PdqResult<QueryOutcome> {
        let (used_id, used_oid) = query.used_identifier()?;
        let server = query
            .server
            .ok_or(PdqError::InvalidRequest("identity server variant is not set"))?;
        let cache_key = format!("{server}:{used_oid}|{used_id}");
        if !query.fresh {
            if let Some(cache) = &self.cache {
                if let Some(hit) = cache.get(&cache_key) {
                    tracing::debug!(key = %cache_key, "identity cache hit");
                    return Ok(hit);
                }
            }
        }
        let outcome = match server {
            ServerVariant::Pdqv3 => self.query_pdqv3(query, &used_id).await?,
            ServerVariant::Pixv3 => self.query_pixv3(query, &used_id, &used_oid).await?,
            ServerVariant::Pixm => self.query_pixm(query, &used_id, &used_oid).await?,
        };
        tracing::info!(
            server = %server,
            count = outcome.count,
            status = outcome.status,
            "identity query complete"
        );
        if let Some(cache) = &self.cache {
            cache.put(&cache_key, &outcome);
        }
        Ok(outcome)
    }

    async fn query_pdqv3(&self, query: &PatientQuery, used_id: &str) -> PdqResult<QueryOutcome> {
        let body = render(
            templates::PDQ_V3_REQUEST,
            &[
                ("server_url", &query.server_url),
                ("message_id", &uuid::Uuid::new_v4().to_string()),
                ("creation_time", &now_compact()),
                ("used_id", used_id),
            ],
        );
        let resp = self
            .wire
            .soap(&SoapRequest {
                url: query.server_url.clone(),
                action: Some(SOAP_ACTION_PDQV3.to_string()),
                body,
                timeout: query.timeout_or_default(),
            })
            .await?;
        outcome_from_hl7v3(&resp.body, resp.status, true)
    }

    async fn query_pixv3(
        &self,
        query: &PatientQuery,
        used_id: &str,
        used_oid: &str,
    ) -> PdqResult<QueryOutcome> {
        let body = render(
            templates::PIX_V3_REQUEST,
            &[
                ("server_url", &query.server_url),
                ("message_id", &uuid::Uuid::new_v4().to_string()),
                ("creation_time", &now_compact()),
                ("used_id", used_id),
                ("used_oid", used_oid),
            ],
        );
        let resp = self
            .wire
            .soap(&SoapRequest {
                url: query.server_url.clone(),
                action: Some(SOAP_ACTION_PIXV3.to_string()),
                body,
                timeout: query.timeout_or_default(),
            })
            .await?;
        outcome_from_hl7v3(&resp.body, resp.status, false)
    }

    async fn query_pixm(
        &self,
        query: &PatientQuery,
        used_id: &str,
        used_oid: &str,
    ) -> PdqResult<QueryOutcome> {
        let url = format!(
            "{}?identifier={}%7C{}&_format=json&_pretty=true",
            query.server_url, used_oid, used_id
        );
        let resp = self
            .wire
            .get_json(&url, query.timeout_or_default())
            .await?;
        let patients =
            fhir::patients_from_bundle(&resp.body, &query.reg_oid, query.nhs_oid_or_default())?;
        Ok(QueryOutcome {
            count: patients.1,
            patients: patients.0,
            status: resp.status,
        })
    }
}

fn now_compact() -> String {
    chrono::Utc::now().format("%Y%m%d%H%M%S").to_string()
}

/// Shared decoding for the two HL7v3 SOAP dialects. Anything other than an
/// AA acknowledgement is a [`PdqError::ProtocolNack`]. The cross-reference
/// response carries name only, so `demographics` selects how much of the
/// extract is kept.
fn outcome_from_hl7v3(body: &str, status: u16, demographics: bool) -> PdqResult<QueryOutcome> {
    let extract = hl7v3::extract(body)?;
    if extract.ack_code != "AA" {
        return Err(PdqError::ProtocolNack(extract.ack_code));
    }
    let mut outcome = QueryOutcome {
        count: extract.total,
        status,
        ..QueryOutcome::default()
    };
    if outcome.count > 0 {
        let mut patient = Patient {
            given_name: extract.given,
            family_name: extract.family,
            ..Patient::default()
        };
        if demographics {
            patient.birth_date = extract.birth_time;
            patient.street = extract.street;
            patient.city = extract.city;
            patient.state = extract.state;
            patient.postcode = extract.postcode;
        }
        outcome.patients.push(patient);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_query() -> PatientQuery {
        PatientQuery {
            server: Some(ServerVariant::Pdqv3),
            server_url: "http://identity.example/pdq".to_string(),
            reg_oid: "2.16.840.1.113883.2.1.3.9".to_string(),
            ..PatientQuery::default()
        }
    }

    #[test]
    fn mrn_takes_precedence_over_national_id() {
        let mut q = base_query();
        q.mrn_id = "MRN001".to_string();
        q.mrn_oid = "1.2.3.4".to_string();
        q.nhs_id = "9999999468".to_string();
        let (id, oid) = q.used_identifier().expect("usable identifier");
        assert_eq!(id, "MRN001");
        assert_eq!(oid, "1.2.3.4");
    }

    #[test]
    fn national_id_used_when_mrn_absent() {
        let mut q = base_query();
        q.nhs_id = "9999999468".to_string();
        q.reg_id = "REG001".to_string();
        let (id, oid) = q.used_identifier().expect("usable identifier");
        assert_eq!(id, "9999999468");
        assert_eq!(oid, NHS_OID_DEFAULT);
    }

    #[test]
    fn regional_id_used_last() {
        let mut q = base_query();
        q.reg_id = "REG001".to_string();
        let (id, oid) = q.used_identifier().expect("usable identifier");
        assert_eq!(id, "REG001");
        assert_eq!(oid, "2.16.840.1.113883.2.1.3.9");
    }

    #[test]
    fn query_without_identifiers_is_invalid() {
        let q = base_query();
        assert!(matches!(q.used_identifier(), Err(PdqError::InvalidRequest(_))));
    }

    #[test]
    fn query_without_endpoint_is_invalid() {
        let mut q = base_query();
        q.server_url.clear();
        q.nhs_id = "9999999468".to_string();
        assert!(matches!(q.used_identifier(), Err(PdqError::InvalidRequest(_))));
    }

    #[test]
    fn mrn_with_missing_oid_falls_through() {
        let mut q = base_query();
        q.mrn_id = "MRN001".to_string();
        q.nhs_id = "9999999468".to_string();
        let (id, _) = q.used_identifier().expect("usable identifier");
        assert_eq!(id, "9999999468");
    }

    #[test]
    fn server_variant_parses_case_insensitively() {
        assert_eq!(
            "PIXm".parse::<ServerVariant>().expect("variant parses"),
            ServerVariant::Pixm
        );
        assert!("hl7v2".parse::<ServerVariant>().is_err());
    }

    const HL7V3_MATCH: &str = "<Envelope><Body><PRPA_IN201306UV02>\
        <acknowledgement><typeCode code='AA'/></acknowledgement>\
        <controlActProcess>\
        <subject><registrationEvent><subject1><patient><patientPerson>\
        <name><given>Ada</given><family>Lovelace</family></name>\
        <birthTime value='19860312'/>\
        <addr><streetAddressLine>1 High St</streetAddressLine>\
        <city>Leeds</city><postalCode>LS1 4AP</postalCode></addr>\
        </patientPerson></patient></subject1></registrationEvent></subject>\
        <queryAck><resultTotalQuantity value='1'/></queryAck>\
        </controlActProcess></PRPA_IN201306UV02></Body></Envelope>";

    #[test]
    fn hl7v3_error_acknowledgement_is_a_protocol_nack() {
        let body = "<Envelope><Body><PRPA_IN201306UV02>\
            <acknowledgement><typeCode code='AE'/></acknowledgement>\
            </PRPA_IN201306UV02></Body></Envelope>";
        let err = outcome_from_hl7v3(body, 200, true).expect_err("AE is rejected");
        assert!(matches!(err, PdqError::ProtocolNack(code) if code == "AE"));
    }

    #[test]
    fn hl7v3_empty_result_carries_no_patients() {
        let body = "<Envelope><Body><PRPA_IN201306UV02>\
            <acknowledgement><typeCode code='AA'/></acknowledgement>\
            <controlActProcess><queryAck>\
            <resultTotalQuantity value='0'/>\
            </queryAck></controlActProcess>\
            </PRPA_IN201306UV02></Body></Envelope>";
        let outcome = outcome_from_hl7v3(body, 200, true).expect("AA decodes");
        assert_eq!(outcome.count, 0);
        assert!(outcome.patients.is_empty());
        assert_eq!(outcome.status, 200);
    }

    #[test]
    fn hl7v3_demographics_decode_into_one_patient() {
        let outcome = outcome_from_hl7v3(HL7V3_MATCH, 200, true).expect("AA decodes");
        assert_eq!(outcome.count, 1);
        let patient = &outcome.patients[0];
        assert_eq!(patient.given_name, "Ada");
        assert_eq!(patient.family_name, "Lovelace");
        assert_eq!(patient.birth_date, "19860312");
        assert_eq!(patient.city, "Leeds");
        assert_eq!(patient.postcode, "LS1 4AP");
    }

    #[test]
    fn hl7v3_cross_reference_keeps_name_only() {
        let outcome = outcome_from_hl7v3(HL7V3_MATCH, 200, false).expect("AA decodes");
        let patient = &outcome.patients[0];
        assert_eq!(patient.given_name, "Ada");
        assert_eq!(patient.family_name, "Lovelace");
        assert!(patient.birth_date.is_empty());
        assert!(patient.city.is_empty());
    }
}
