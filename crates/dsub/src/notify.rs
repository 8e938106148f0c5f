//! Streaming parse of an inbound WS-Notification `Notify` envelope.
//!
//! The notification wraps an ebRIM `SubmitObjectsRequest` describing one
//! document entry. Only the fields consumed downstream are pulled out; the
//! reader walks the element stream by local name rather than mirroring the
//! registry schema.

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use hie_types::consts::{
    AUTHOR_INSTITUTION, AUTHOR_PERSON, REPOSITORY_UID, URN_AUTHOR, URN_CLASS_CODE, URN_CONF_CODE,
    URN_FACILITY_CODE, URN_FORMAT_CODE, URN_PRACTICE_CODE, URN_TYPE_CODE, URN_XDS_DOCUID,
    URN_XDS_PID,
};
use hie_types::Event;

use crate::{author, DsubError};

/// The fields extracted from one `Notify` envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotifyMessage {
    pub broker_ref: String,
    pub doc_name: String,
    pub class_code: String,
    pub conf_code: String,
    pub format_code: String,
    pub facility_code: String,
    pub practice_code: String,
    /// Document type code, compared against workflow slot names.
    pub expression: String,
    pub author_person: String,
    pub author_institution: String,
    pub repository_unique_id: String,
    pub xds_pid: String,
    pub xds_doc_entry_uid: String,
}

impl NotifyMessage {
    /// Build the canonical event shell. Workflow name, topic and national id
    /// are filled in once a subscription match is confirmed.
    pub fn into_event(self) -> Event {
        Event {
            created: Some(chrono::Utc::now()),
            doc_name: self.doc_name,
            class_code: self.class_code,
            conf_code: self.conf_code,
            format_code: self.format_code,
            facility_code: self.facility_code,
            role: self.practice_code.clone(),
            practice_code: self.practice_code,
            expression: self.expression,
            xds_pid: self.xds_pid,
            xds_doc_entry_uid: self.xds_doc_entry_uid,
            repository_unique_id: self.repository_unique_id,
            user: self.author_person,
            org: self.author_institution,
            broker_ref: self.broker_ref,
            ..Event::default()
        }
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, DsubError> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| DsubError::Malformed(err.to_string()))?;
    match attr {
        Some(a) => Ok(Some(
            a.unescape_value()
                .map_err(|err| DsubError::Malformed(err.to_string()))?
                .into_owned(),
        )),
        None => Ok(None),
    }
}

fn in_stack(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.iter().any(|n| n == name)
}

/// Parse a raw notification body. Fails with [`DsubError::Malformed`] when
/// the XML is unreadable or carries no `Notify` element.
pub fn parse_notify(message: &str) -> Result<NotifyMessage, DsubError> {
    let mut reader = Reader::from_str(message);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut out = NotifyMessage::default();
    let mut seen_notify = false;
    // Context carried across events while walking one classification/slot.
    let mut scheme = String::new();
    let mut slot = String::new();
    let mut persons: Vec<String> = Vec::new();
    let mut institutions: Vec<String> = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|err| DsubError::Malformed(err.to_string()))?;
        match event {
            XmlEvent::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                match local.as_slice() {
                    b"Notify" => seen_notify = true,
                    b"Classification" => {
                        scheme = attribute(&e, "classificationScheme")?.unwrap_or_default();
                    }
                    b"Slot" => {
                        slot = attribute(&e, "name")?.unwrap_or_default();
                    }
                    b"LocalizedString" => {
                        if let Some(value) = attribute(&e, "value")? {
                            assign_localized(&mut out, &stack, &scheme, value);
                        }
                    }
                    b"ExternalIdentifier" => {
                        assign_external_identifier(&mut out, &e)?;
                    }
                    _ => {}
                }
                stack.push(local);
            }
            XmlEvent::Empty(e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"LocalizedString" => {
                        if let Some(value) = attribute(&e, "value")? {
                            assign_localized(&mut out, &stack, &scheme, value);
                        }
                    }
                    b"ExternalIdentifier" => {
                        assign_external_identifier(&mut out, &e)?;
                    }
                    _ => {}
                }
            }
            XmlEvent::End(e) => {
                match e.local_name().as_ref() {
                    b"Classification" => scheme.clear(),
                    b"Slot" => slot.clear(),
                    _ => {}
                }
                stack.pop();
            }
            XmlEvent::Text(t) => {
                if !in_stack(&stack, b"Notify") {
                    continue;
                }
                let text = t
                    .unescape()
                    .map_err(|err| DsubError::Malformed(err.to_string()))?
                    .into_owned();
                let Some(current) = stack.last() else {
                    continue;
                };
                match current.as_slice() {
                    b"Address" if in_stack(&stack, b"SubscriptionReference") => {
                        out.broker_ref = text;
                    }
                    b"Value" if in_stack(&stack, b"Classification") => {
                        if scheme == URN_AUTHOR {
                            match slot.as_str() {
                                AUTHOR_PERSON => persons.push(author::pretty_person(&text)),
                                AUTHOR_INSTITUTION => {
                                    institutions.push(author::pretty_institution(&text));
                                }
                                _ => {}
                            }
                        }
                    }
                    b"Value" if slot == REPOSITORY_UID => {
                        if out.repository_unique_id.is_empty() {
                            out.repository_unique_id = text;
                        }
                    }
                    _ => {}
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }
    if !seen_notify {
        return Err(DsubError::Malformed(
            "no Notify element in received message".to_string(),
        ));
    }
    out.author_person = persons.join(";");
    out.author_institution = institutions.join(";");
    Ok(out)
}

fn assign_localized(out: &mut NotifyMessage, stack: &[Vec<u8>], scheme: &str, value: String) {
    if !in_stack(stack, b"ExtrinsicObject") {
        return;
    }
    if in_stack(stack, b"Classification") {
        match scheme {
            URN_CLASS_CODE => out.class_code = value,
            URN_CONF_CODE => out.conf_code = value,
            URN_FORMAT_CODE => out.format_code = value,
            URN_FACILITY_CODE => out.facility_code = value,
            URN_PRACTICE_CODE => out.practice_code = value,
            URN_TYPE_CODE => out.expression = value,
            _ => {}
        }
    } else if in_stack(stack, b"Name") && out.doc_name.is_empty() {
        out.doc_name = value;
    }
}

fn assign_external_identifier(out: &mut NotifyMessage, e: &BytesStart<'_>) -> Result<(), DsubError> {
    let scheme = attribute(e, "identificationScheme")?.unwrap_or_default();
    let value = attribute(e, "value")?.unwrap_or_default();
    match scheme.as_str() {
        URN_XDS_PID => {
            out.xds_pid = value
                .split("^^^")
                .next()
                .unwrap_or_default()
                .to_string();
        }
        URN_XDS_DOCUID => out.xds_doc_entry_uid = value,
        _ => {}
    }
    Ok(())
}
