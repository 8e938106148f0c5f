//! Display formatting for HL7 author values carried in document metadata.
//!
//! Author persons arrive as XCN components (`id^family^given^...`), author
//! institutions as XON components (`name^...`). Only the human-readable
//! parts are kept.

/// `id^Family^Given` becomes `Given Family`. Values with fewer than three
/// components are passed through unchanged.
pub fn pretty_person(xcn: &str) -> String {
    let parts: Vec<&str> = xcn.split('^').collect();
    if parts.len() > 2 {
        format!("{} {}", parts[2], parts[1])
    } else {
        xcn.to_string()
    }
}

/// The organisation name is the first XON component.
pub fn pretty_institution(xon: &str) -> String {
    match xon.split_once('^') {
        Some((name, _)) => name.to_string(),
        None => xon.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_reorders_given_and_family() {
        assert_eq!(pretty_person("1234^Lovelace^Ada^^^Dr"), "Ada Lovelace");
    }

    #[test]
    fn person_without_components_is_unchanged() {
        assert_eq!(pretty_person("on-call clinician"), "on-call clinician");
    }

    #[test]
    fn institution_keeps_first_component() {
        assert_eq!(
            pretty_institution("Leeds Teaching Hospitals^^^^^^^^^1.2.3"),
            "Leeds Teaching Hospitals"
        );
        assert_eq!(pretty_institution("St James's"), "St James's");
    }
}
