//! IHE wire constants: assigning-authority OIDs, ebRIM classification-scheme
//! URNs and the WS-Addressing SOAP actions used by the protocol clients.

/// Official national patient-id assigning authority (NHS number).
pub const NHS_OID_DEFAULT: &str = "2.16.840.1.113883.2.1.4.1";

/// Prefix FHIR identifier systems carry in front of a bare OID.
pub const URN_OID_PREFIX: &str = "urn:oid:";

// ebRIM classification schemes on an XDS DocumentEntry.
pub const URN_CLASS_CODE: &str = "urn:uuid:41a5887f-8865-4c09-adf7-e362475b143a";
pub const URN_CONF_CODE: &str = "urn:uuid:f4f85eac-e6cb-4883-b524-f2705394840f";
pub const URN_FORMAT_CODE: &str = "urn:uuid:a09d5840-386c-46f2-b5ad-9c3699a4309d";
pub const URN_FACILITY_CODE: &str = "urn:uuid:f33fb8ac-18af-42cc-ae0e-ed0b0bdb91e1";
pub const URN_PRACTICE_CODE: &str = "urn:uuid:cccf5598-8b07-4b77-a05e-ae952c785ead";
pub const URN_TYPE_CODE: &str = "urn:uuid:f0306f51-975f-434e-a61c-c59651d33983";
pub const URN_AUTHOR: &str = "urn:uuid:93606bcf-9494-43ec-9b4e-a7748d1a838d";

// ebRIM external identifier schemes.
pub const URN_XDS_PID: &str = "urn:uuid:58a6f841-87b3-4a3e-92fd-a8ffeff98427";
pub const URN_XDS_DOCUID: &str = "urn:uuid:2e82c1f6-a085-4c72-9da3-8640a32e42ab";

// Slot names inside the author classification / document entry.
pub const AUTHOR_PERSON: &str = "authorPerson";
pub const AUTHOR_INSTITUTION: &str = "authorInstitution";
pub const REPOSITORY_UID: &str = "repositoryUniqueId";

// SOAP actions.
pub const SOAP_ACTION_PDQV3: &str = "urn:hl7-org:v3:PRPA_IN201305UV02";
pub const SOAP_ACTION_PIXV3: &str = "urn:hl7-org:v3:PRPA_IN201309UV02";
pub const SOAP_ACTION_SUBSCRIBE: &str =
    "http://docs.oasis-open.org/wsn/bw-2/NotificationProducer/SubscribeRequest";
pub const SOAP_ACTION_UNSUBSCRIBE: &str =
    "http://docs.oasis-open.org/wsn/bw-2/SubscriptionManager/UnsubscribeRequest";

/// Topic slot name the broker filter subscribes on (document type code).
pub const DSUB_TOPIC_TYPE_CODE: &str = "$XDSDocumentEntryTypeCode";
