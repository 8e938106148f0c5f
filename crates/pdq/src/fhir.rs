//! FHIR `Bundle` decoding for the PIXm query variant. Only the fields the
//! resolver consumes are modelled; everything else in the bundle is ignored
//! by serde.

use serde::Deserialize;

use hie_types::consts::URN_OID_PREFIX;
use hie_types::Patient;

use crate::PdqError;

#[derive(Debug, Deserialize)]
struct Bundle {
    #[serde(default)]
    total: i64,
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    resource: Resource,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(default)]
    identifier: Vec<Identifier>,
    #[serde(default)]
    name: Vec<HumanName>,
    #[serde(default)]
    gender: String,
    #[serde(default, rename = "birthDate")]
    birth_date: String,
    #[serde(default)]
    address: Vec<Address>,
}

#[derive(Debug, Deserialize)]
struct Identifier {
    #[serde(default)]
    system: String,
    #[serde(default)]
    value: String,
    #[serde(default, rename = "use")]
    use_code: String,
}

#[derive(Debug, Deserialize)]
struct HumanName {
    #[serde(default)]
    family: String,
    #[serde(default)]
    given: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(default)]
    line: Vec<String>,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
    #[serde(default, rename = "postalCode")]
    postal_code: String,
}

/// Decode a PIXm response body into canonical patients plus the bundle total.
///
/// Identifiers are classified by system URI: the regional authority OID maps
/// to the regional id, the national authority OID to the national id, and a
/// `usual`-use identifier to the local id with its authority parsed out of
/// the URI.
pub fn patients_from_bundle(
    body: &str,
    reg_oid: &str,
    nhs_oid: &str,
) -> Result<(Vec<Patient>, i64), PdqError> {
    let bundle: Bundle =
        serde_json::from_str(body).map_err(|err| PdqError::Malformed(err.to_string()))?;
    let mut patients = Vec::with_capacity(bundle.entry.len());
    for entry in &bundle.entry {
        let resource = &entry.resource;
        let mut patient = Patient {
            gender: resource.gender.clone(),
            birth_date: resource.birth_date.replace('-', ""),
            ..Patient::default()
        };
        for id in &resource.identifier {
            if id.system == format!("{URN_OID_PREFIX}{reg_oid}") {
                patient.regional_id = id.value.clone();
                patient.regional_oid = reg_oid.to_string();
            }
            if id.system == format!("{URN_OID_PREFIX}{nhs_oid}") {
                patient.national_id = id.value.clone();
                patient.national_oid = nhs_oid.to_string();
            }
            if id.use_code == "usual" {
                patient.local_id = id.value.clone();
                patient.local_oid = id
                    .system
                    .strip_prefix(URN_OID_PREFIX)
                    .unwrap_or(&id.system)
                    .to_string();
            }
        }
        let given: Vec<&str> = resource
            .name
            .iter()
            .flat_map(|n| n.given.iter().map(String::as_str))
            .collect();
        patient.given_name = given.join(" ");
        if let Some(name) = resource.name.first() {
            patient.family_name = name.family.clone();
        }
        if let Some(addr) = resource.address.first() {
            patient.postcode = addr.postal_code.clone();
            if let Some(line) = addr.line.first() {
                patient.street = line.clone();
            }
            if let Some(line) = addr.line.get(1) {
                patient.town = line.clone();
            }
            patient.city = addr.city.clone();
            patient.country = addr.country.clone();
        }
        patients.push(patient);
    }
    Ok((patients, bundle.total))
}

#[cfg(test)]
mod tests {
    use super::patients_from_bundle;

    const REG_OID: &str = "2.16.840.1.113883.2.1.3.9";
    const NHS_OID: &str = "2.16.840.1.113883.2.1.4.1";

    const BUNDLE: &str = r#"{
        "resourceType": "Bundle",
        "total": 1,
        "entry": [{
            "resource": {
                "resourceType": "Patient",
                "identifier": [
                    {"use": "usual", "system": "urn:oid:1.2.36.146.595.217.0.1", "value": "MRN001"},
                    {"system": "urn:oid:2.16.840.1.113883.2.1.3.9", "value": "REG001"},
                    {"system": "urn:oid:2.16.840.1.113883.2.1.4.1", "value": "9999999468"}
                ],
                "name": [{"family": "Lovelace", "given": ["Ada", "Augusta"]}],
                "gender": "female",
                "birthDate": "1968-11-27",
                "address": [{
                    "line": ["1 High Street", "Headingley"],
                    "city": "Leeds",
                    "postalCode": "LS1 1AA",
                    "country": "GBR"
                }]
            }
        }]
    }"#;

    #[test]
    fn classifies_identifiers_by_system_uri() {
        let (patients, total) =
            patients_from_bundle(BUNDLE, REG_OID, NHS_OID).expect("bundle decodes");
        assert_eq!(total, 1);
        let p = &patients[0];
        assert_eq!(p.local_id, "MRN001");
        assert_eq!(p.local_oid, "1.2.36.146.595.217.0.1");
        assert_eq!(p.regional_id, "REG001");
        assert_eq!(p.regional_oid, REG_OID);
        assert_eq!(p.national_id, "9999999468");
        assert_eq!(p.national_oid, NHS_OID);
    }

    #[test]
    fn joins_given_names_and_strips_birth_date_dashes() {
        let (patients, _) = patients_from_bundle(BUNDLE, REG_OID, NHS_OID).expect("bundle decodes");
        let p = &patients[0];
        assert_eq!(p.given_name, "Ada Augusta");
        assert_eq!(p.family_name, "Lovelace");
        assert_eq!(p.birth_date, "19681127");
        assert_eq!(p.street, "1 High Street");
        assert_eq!(p.town, "Headingley");
        assert_eq!(p.postcode, "LS1 1AA");
    }

    #[test]
    fn empty_bundle_yields_no_patients() {
        let (patients, total) =
            patients_from_bundle(r#"{"resourceType":"Bundle","total":0}"#, REG_OID, NHS_OID)
                .expect("bundle decodes");
        assert_eq!(total, 0);
        assert!(patients.is_empty());
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(patients_from_bundle("{not json", REG_OID, NHS_OID).is_err());
    }
}
