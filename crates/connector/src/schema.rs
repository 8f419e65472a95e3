//! Account schema discovery for the virtual sources.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSchema {
    pub attributes: Vec<SchemaAttribute>,
    pub display_attribute: &'static str,
    pub identity_attribute: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAttribute {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub multi: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub entitlement: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_object_type: Option<&'static str>,
}

fn attribute(name: &'static str, description: &'static str) -> SchemaAttribute {
    SchemaAttribute {
        name,
        description,
        kind: "string",
        multi: false,
        entitlement: false,
        schema_object_type: None,
    }
}

/// Schema of the records the merging and orphan passes write.
pub fn record_schema() -> AccountSchema {
    AccountSchema {
        attributes: vec![
            attribute("id", "ID"),
            attribute("name", "Name"),
            attribute("source", "Source name"),
            SchemaAttribute { multi: true, ..attribute("history", "History") },
            SchemaAttribute {
                multi: true,
                entitlement: true,
                ..attribute("statuses", "Statuses")
            },
            SchemaAttribute {
                multi: true,
                entitlement: true,
                schema_object_type: Some("review"),
                ..attribute("reviews", "Reviews")
            },
        ],
        display_attribute: "name",
        identity_attribute: "id",
    }
}

/// Schema of the accounts the authoritative pass emits.
pub fn authoritative_schema() -> AccountSchema {
    AccountSchema {
        attributes: vec![
            attribute("id", "Unique ID"),
            attribute("name", "Name"),
            attribute("email", "Email address"),
        ],
        display_attribute: "name",
        identity_attribute: "id",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_schema_marks_entitlement_attributes() {
        let wire = serde_json::to_value(record_schema()).unwrap();
        assert_eq!(wire["displayAttribute"], "name");
        assert_eq!(wire["identityAttribute"], "id");

        let attrs = wire["attributes"].as_array().unwrap();
        let reviews = attrs.iter().find(|a| a["name"] == "reviews").unwrap();
        assert_eq!(reviews["entitlement"], true);
        assert_eq!(reviews["schemaObjectType"], "review");

        // Plain string attributes stay flat.
        let id = attrs.iter().find(|a| a["name"] == "id").unwrap();
        assert!(id.get("multi").is_none());
        assert!(id.get("entitlement").is_none());
    }

    #[test]
    fn authoritative_schema_is_flat() {
        let schema = authoritative_schema();
        assert_eq!(schema.attributes.len(), 3);
        assert!(schema.attributes.iter().all(|a| !a.multi && !a.entitlement));
    }
}
