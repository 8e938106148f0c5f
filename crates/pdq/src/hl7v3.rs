//! Streaming extraction of the handful of fields consumed from HL7v3 SOAP
//! responses. The response schemas are deep; rather than mirroring them
//! structurally, the reader walks the element stream and pulls values by
//! local element name and ancestry.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::PdqError;

/// Fields extracted from a PRPA_IN201306UV02 or PRPA_IN201310UV02 response.
/// The cross-reference response populates the name fields only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hl7v3Extract {
    pub ack_code: String,
    pub total: i64,
    pub given: String,
    pub family: String,
    pub birth_time: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, PdqError> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| PdqError::Malformed(err.to_string()))?;
    match attr {
        Some(a) => {
            let value = a
                .unescape_value()
                .map_err(|err| PdqError::Malformed(err.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

fn in_stack(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.iter().any(|n| n == name)
}

fn element(
    e: &BytesStart<'_>,
    local: &[u8],
    stack: &[Vec<u8>],
    out: &mut Hl7v3Extract,
) -> Result<(), PdqError> {
    match local {
        b"typeCode" if in_stack(stack, b"acknowledgement") => {
            if let Some(code) = attribute(e, "code")? {
                out.ack_code = code;
            }
        }
        b"resultTotalQuantity" => {
            if let Some(value) = attribute(e, "value")? {
                out.total = value.parse().unwrap_or(0);
            }
        }
        b"birthTime" if in_stack(stack, b"patientPerson") => {
            if let Some(value) = attribute(e, "value")? {
                out.birth_time = value;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Extract the consumed fields from a raw HL7v3 SOAP response body.
pub fn extract(xml: &str) -> Result<Hl7v3Extract, PdqError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut out = Hl7v3Extract::default();
    loop {
        let event = reader
            .read_event()
            .map_err(|err| PdqError::Malformed(err.to_string()))?;
        match event {
            Event::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                element(&e, &local, &stack, &mut out)?;
                stack.push(local);
            }
            Event::Empty(e) => {
                let local = e.local_name().as_ref().to_vec();
                element(&e, &local, &stack, &mut out)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                if !in_stack(&stack, b"patientPerson") {
                    continue;
                }
                let text = t
                    .unescape()
                    .map_err(|err| PdqError::Malformed(err.to_string()))?
                    .into_owned();
                let Some(current) = stack.last() else {
                    continue;
                };
                match current.as_slice() {
                    b"given" if in_stack(&stack, b"name") => out.given = text,
                    b"family" if in_stack(&stack, b"name") => out.family = text,
                    b"streetAddressLine" if in_stack(&stack, b"addr") => out.street = text,
                    b"city" if in_stack(&stack, b"addr") => out.city = text,
                    b"state" if in_stack(&stack, b"addr") => out.state = text,
                    b"postalCode" if in_stack(&stack, b"addr") => out.postcode = text,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::extract;

    const PDQV3_RESPONSE: &str = "<soap:Envelope xmlns:soap='http://www.w3.org/2003/05/soap-envelope'>\
        <soap:Body><PRPA_IN201306UV02 xmlns='urn:hl7-org:v3'>\
        <acknowledgement><typeCode code='AA'/></acknowledgement>\
        <controlActProcess><subject><registrationEvent><subject1><patient>\
        <patientPerson>\
        <name><given>Ada</given><family>Lovelace</family></name>\
        <birthTime value='19681127'/>\
        <addr><streetAddressLine>1 High Street</streetAddressLine><city>Leeds</city><state>West Yorkshire</state><postalCode>LS1 1AA</postalCode></addr>\
        </patientPerson>\
        </patient></subject1></registrationEvent></subject>\
        <queryAck><resultTotalQuantity value='1'/></queryAck>\
        </controlActProcess></PRPA_IN201306UV02></soap:Body></soap:Envelope>";

    #[test]
    fn extracts_demographics_from_pdqv3_response() {
        let out = extract(PDQV3_RESPONSE).expect("response parses");
        assert_eq!(out.ack_code, "AA");
        assert_eq!(out.total, 1);
        assert_eq!(out.given, "Ada");
        assert_eq!(out.family, "Lovelace");
        assert_eq!(out.birth_time, "19681127");
        assert_eq!(out.street, "1 High Street");
        assert_eq!(out.city, "Leeds");
        assert_eq!(out.state, "West Yorkshire");
        assert_eq!(out.postcode, "LS1 1AA");
    }

    #[test]
    fn negative_acknowledgement_is_reported() {
        let xml = "<Envelope><Body><PRPA_IN201310UV02>\
            <acknowledgement><typeCode code='AE'/></acknowledgement>\
            </PRPA_IN201310UV02></Body></Envelope>";
        let out = extract(xml).expect("response parses");
        assert_eq!(out.ack_code, "AE");
        assert_eq!(out.total, 0);
    }

    #[test]
    fn type_codes_outside_acknowledgement_are_ignored() {
        let xml = "<Envelope><Body><receiver><typeCode code='RCV'/></receiver>\
            <acknowledgement><typeCode code='AA'/></acknowledgement></Body></Envelope>";
        let out = extract(xml).expect("response parses");
        assert_eq!(out.ack_code, "AA");
    }

    #[test]
    fn empty_body_yields_defaults() {
        let out = extract("<Envelope><Body/></Envelope>").expect("response parses");
        assert_eq!(out.ack_code, "");
        assert_eq!(out.total, 0);
    }
}
