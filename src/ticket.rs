//! Ticket helpers shared by the generate and send actions

use serde_json::{Map, Value};

/// Names of extracted ticket fields that have no value
///
/// A field is missing when its value is JSON `null`. Order follows the
/// object's key order.
pub fn detect_missing_fields(extracted: &Map<String, Value>) -> Vec<String> {
    extracted
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(key, _)| key.clone())
        .collect()
}

/// Pick the missing-field list for a generate request
///
/// An explicit list wins, even when empty. Otherwise the fields are
/// detected from the extracted variables, if any were sent.
pub fn resolve_missing_fields(
    missing_variables: Option<Vec<String>>,
    extracted_variables: Option<&Map<String, Value>>,
) -> Vec<String> {
    match (missing_variables, extracted_variables) {
        (Some(explicit), _) => explicit,
        (None, Some(extracted)) => detect_missing_fields(extracted),
        (None, None) => Vec::new(),
    }
}

/// Default subject for a missing-information email
pub fn ticket_subject(ticket_name: &str) -> String {
    format!("Missing Information for Ticket: {ticket_name}")
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, Value, json};

    use super::{detect_missing_fields, resolve_missing_fields, ticket_subject};

    fn extracted() -> Map<String, Value> {
        let Value::Object(map) = json!({
            "correctedPrice": 44.44,
            "currentPrice": 55.55,
            "environment": null,
            "issuer": "ivona@example.com",
            "itemId": "1234-44",
            "itemName": null,
            "ticketName": "Update price of discombobulator"
        }) else {
            unreachable!("literal is an object");
        };
        map
    }

    #[test]
    fn null_fields_are_missing_in_key_order() {
        assert_eq!(
            detect_missing_fields(&extracted()),
            ["environment", "itemName"]
        );
    }

    #[test]
    fn explicit_list_wins_over_detection() {
        let map = extracted();
        assert_eq!(
            resolve_missing_fields(Some(vec!["priority".to_owned()]), Some(&map)),
            ["priority"]
        );
        assert!(resolve_missing_fields(Some(Vec::new()), Some(&map)).is_empty());
    }

    #[test]
    fn detection_is_used_without_explicit_list() {
        let map = extracted();
        assert_eq!(
            resolve_missing_fields(None, Some(&map)),
            ["environment", "itemName"]
        );
        assert!(resolve_missing_fields(None, None).is_empty());
    }

    #[test]
    fn subject_names_the_ticket() {
        assert_eq!(
            ticket_subject("ITSM-HCL-5"),
            "Missing Information for Ticket: ITSM-HCL-5"
        );
    }
}
