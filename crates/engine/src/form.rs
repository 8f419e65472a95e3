//! Review form builder.
//!
//! Pure data construction: builds the dynamic decision form presented to a
//! human reviewer (candidate select, auto-filled detail fields, conditional
//! visibility rules). Nothing here talks to the platform.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::model::{Account, Identity, OwnerRef};

/// Sentinel select value: the entity is a brand new identity.
pub const NEW_IDENTITY: &str = "#newIdentity#";
/// Sentinel select value: the account is a confirmed orphan.
pub const CONFIRMED_ORPHAN: &str = "#orphanAccount#";
/// Key of the single-select element carrying the reviewer's choice.
pub const SELECT_KEY: &str = "identities";

const TOP_SECTION: &str = "topSection";
const IDENTITIES_SECTION: &str = "identitiesSection";
const SELECTION_SECTION: &str = "selectionSection";

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// A form definition ready to persist on the platform.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner: OwnerRef,
    pub form_input: Vec<FormInput>,
    pub form_elements: Vec<FormElement>,
    pub form_conditions: Vec<FormCondition>,
}

/// Declared form input: a named value frozen into the form at creation time.
#[derive(Debug, Clone, Serialize)]
pub struct FormInput {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormElement {
    pub id: String,
    pub key: String,
    pub element_type: ElementType,
    /// Element-specific payload; this is the loosely-typed edge of the
    /// platform's form model.
    pub config: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    Text,
    Select,
    Section,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub validation_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormCondition {
    pub rule_operator: &'static str,
    pub rules: Vec<ConditionRule>,
    pub effects: Vec<ConditionEffect>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRule {
    pub source_type: SourceType,
    pub source: String,
    pub operator: RuleOperator,
    pub value_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Element,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleOperator {
    Eq,
    Em,
    NotEm,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionEffect {
    pub effect_type: EffectType,
    pub config: EffectConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectType {
    Hide,
    Show,
    Disable,
    SetDefaultValue,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value_label: Option<String>,
}

// ---------------------------------------------------------------------------
// Element builders
// ---------------------------------------------------------------------------

fn input(id: impl Into<String>, description: Option<String>) -> FormInput {
    let id = id.into();
    FormInput { label: id.clone(), id, kind: "STRING", description }
}

fn text_element(key: &str, label: &str) -> FormElement {
    FormElement {
        id: key.into(),
        key: key.into(),
        element_type: ElementType::Text,
        config: json!({ "label": label }),
        validations: Vec::new(),
    }
}

fn select_element(key: &str, label: &str, options: &[SelectOption]) -> FormElement {
    FormElement {
        id: key.into(),
        key: key.into(),
        element_type: ElementType::Select,
        config: json!({
            "dataSource": {
                "config": { "options": options },
                "dataSourceType": "STATIC",
            },
            "forceSelect": true,
            "label": label,
            "maximum": 1,
            "required": true,
        }),
        validations: vec![Validation { validation_type: "REQUIRED" }],
    }
}

fn section(id: &str, label: &str, style: &str, description: Option<&str>, children: Vec<FormElement>) -> FormElement {
    let mut config = json!({
        "alignment": "CENTER",
        "label": label,
        "labelStyle": style,
        "showLabel": true,
        "formElements": children,
    });
    if let Some(desc) = description {
        config["description"] = json!(desc);
    }
    FormElement {
        id: id.into(),
        key: id.into(),
        element_type: ElementType::Section,
        config,
        validations: Vec::new(),
    }
}

fn top_section(label: &str, description: &str, attributes: &[String]) -> FormElement {
    let fields = attributes.iter().map(|a| text_element(a, a)).collect();
    section(TOP_SECTION, label, "h2", Some(description), fields)
}

fn identities_section(options: &[SelectOption]) -> FormElement {
    section(
        IDENTITIES_SECTION,
        "Existing identities",
        "h3",
        None,
        vec![select_element(SELECT_KEY, "Identities", options)],
    )
}

fn selection_section(attributes: &[String]) -> FormElement {
    let fields = attributes.iter().map(|a| text_element(&format!("{a}.selected"), a)).collect();
    section(SELECTION_SECTION, "Identity details", "h4", None, fields)
}

fn candidate_options(targets: &[&Identity], sentinel_label: &str, sentinel: &str) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = targets
        .iter()
        .map(|t| SelectOption { label: t.display_or_name().to_string(), value: t.id.clone() })
        .collect();
    options.push(SelectOption { label: sentinel_label.into(), value: sentinel.into() });
    options
}

// ---------------------------------------------------------------------------
// Condition builders
// ---------------------------------------------------------------------------

fn select_rule(operator: RuleOperator, value: Option<&str>) -> ConditionRule {
    ConditionRule {
        source_type: SourceType::Element,
        source: SELECT_KEY.into(),
        operator,
        value_type: "STRING",
        value: value.map(Into::into),
    }
}

fn effect(effect_type: EffectType, element: &str) -> ConditionEffect {
    ConditionEffect {
        effect_type,
        config: EffectConfig { element: Some(element.into()), ..Default::default() },
    }
}

fn default_from_input(input_id: &str, element: &str) -> ConditionEffect {
    ConditionEffect {
        effect_type: EffectType::SetDefaultValue,
        config: EffectConfig {
            element: Some(element.into()),
            default_value_label: Some(input_id.into()),
        },
    }
}

/// One rule per attribute: when the entity's own value input is populated,
/// default the matching top-section field to it and lock the field.
fn lock_entity_fields(attributes: &[String], sentinel: &str) -> Vec<FormCondition> {
    attributes
        .iter()
        .map(|attribute| {
            let input_id = format!("{sentinel}.{attribute}");
            FormCondition {
                rule_operator: "AND",
                rules: vec![ConditionRule {
                    source_type: SourceType::Input,
                    source: input_id.clone(),
                    operator: RuleOperator::NotEm,
                    value_type: "STRING",
                    value: None,
                }],
                effects: vec![
                    default_from_input(&input_id, attribute),
                    effect(EffectType::Disable, attribute),
                ],
            }
        })
        .collect()
}

fn merge_conditions(attributes: &[String], targets: &[&Identity], sentinel: &str) -> Vec<FormCondition> {
    let mut conditions = vec![
        // Sentinel selected: nothing to copy from, hide the details section.
        FormCondition {
            rule_operator: "AND",
            rules: vec![select_rule(RuleOperator::Eq, Some(sentinel))],
            effects: vec![effect(EffectType::Hide, SELECTION_SECTION)],
        },
        // No selection yet: keep the details section hidden.
        FormCondition {
            rule_operator: "AND",
            rules: vec![select_rule(RuleOperator::Em, None)],
            effects: vec![effect(EffectType::Hide, SELECTION_SECTION)],
        },
        // Any selection locks the detail fields; they mirror, never edit.
        FormCondition {
            rule_operator: "AND",
            rules: vec![select_rule(RuleOperator::NotEm, None)],
            effects: attributes
                .iter()
                .map(|a| effect(EffectType::Disable, &format!("{a}.selected")))
                .collect(),
        },
    ];

    conditions.extend(lock_entity_fields(attributes, sentinel));

    for target in targets {
        let filled = attributes.iter().filter(|a| target.attributes.contains_key(*a));
        let mut effects = vec![effect(EffectType::Show, SELECTION_SECTION)];
        effects.extend(filled.map(|attribute| {
            default_from_input(&format!("{}.{attribute}", target.id), &format!("{attribute}.selected"))
        }));
        conditions.push(FormCondition {
            rule_operator: "AND",
            rules: vec![select_rule(RuleOperator::Eq, Some(&target.id))],
            effects,
        });
    }

    conditions
}

// ---------------------------------------------------------------------------
// Form variants
// ---------------------------------------------------------------------------

/// Identity-merge decision form: pick one of the similar identities, or
/// declare the entity a new identity.
pub fn merge_form(
    name: &str,
    owner: OwnerRef,
    identity: &Identity,
    targets: &[&Identity],
    attributes: &[String],
) -> Result<FormSpec, EngineError> {
    let native_account = identity
        .authoritative_source()
        .and_then(|source_id| identity.account_on(source_id))
        .ok_or_else(|| {
            EngineError::FormBuild(format!(
                "identity {} has no account on its authoritative source",
                identity.name
            ))
        })?;

    let mut form_input = Vec::new();
    for attribute in attributes {
        for target in targets {
            if let Some(value) = target.attr_str(attribute) {
                form_input.push(input(format!("{}.{attribute}", target.id), Some(value.into())));
            }
        }
        let own = identity.attr_str(attribute).map(String::from);
        form_input.push(input(format!("{NEW_IDENTITY}.{attribute}"), own));
    }
    form_input.push(input("id", Some(identity.id.clone())));
    form_input.push(input("account", Some(native_account.name.clone())));
    form_input.push(input(
        "source",
        native_account.source.as_ref().map(|s| s.name.clone()),
    ));

    let options = candidate_options(targets, "This is a new identity", NEW_IDENTITY);

    Ok(FormSpec {
        name: name.into(),
        description: None,
        owner,
        form_elements: vec![
            top_section(
                "Identity merge request",
                "Potentially duplicated identity was found. Please review the list of possible \
                 matches from existing identities and select the right one.",
                attributes,
            ),
            identities_section(&options),
            selection_section(attributes),
        ],
        form_conditions: merge_conditions(attributes, targets, NEW_IDENTITY),
        form_input,
    })
}

/// Orphan-assignment decision form: pick the identity the account belongs
/// to, or confirm it as an orphan.
pub fn orphan_form(
    name: &str,
    owner: OwnerRef,
    account: &Account,
    targets: &[&Identity],
    attributes: &[String],
) -> FormSpec {
    let friendly = format!("{}@{}", account.display_name(), account.source_name);

    let mut form_input = Vec::new();
    for attribute in attributes {
        for target in targets {
            if let Some(value) = target.attr_str(attribute) {
                form_input.push(input(format!("{}.{attribute}", target.id), Some(value.into())));
            }
        }
        let own = account.attr_str(attribute).map(String::from);
        form_input.push(input(format!("{CONFIRMED_ORPHAN}.{attribute}"), own));
    }
    form_input.push(input("id", Some(account.id.clone())));
    form_input.push(input("account", Some(account.display_name().to_string())));
    form_input.push(input("source", Some(account.source_name.clone())));

    let options = candidate_options(targets, "I cannot find a match", CONFIRMED_ORPHAN);

    FormSpec {
        name: name.into(),
        description: Some(friendly.clone()),
        owner,
        form_elements: vec![
            top_section(
                &format!("{friendly} orphan account assignment request"),
                "Orphan account was found. Please review the list of possible matches from \
                 existing identities and select the right one.",
                attributes,
            ),
            identities_section(&options),
        ],
        form_conditions: lock_entity_fields(attributes, CONFIRMED_ORPHAN),
        form_input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn identity(id: &str, name: &str, attrs: &[(&str, &str)]) -> Identity {
        Identity {
            id: id.into(),
            name: name.into(),
            display_name: None,
            protected: false,
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), json!(v))).collect(),
            accounts: Vec::new(),
            source: None,
        }
    }

    fn unmatched_identity() -> Identity {
        let mut identity = identity(
            "id-new",
            "jane.doe",
            &[("uid", "jane.doe"), ("firstname", "Jane"), ("authoritativeSource", "src-hr")],
        );
        identity.accounts.push(crate::model::AccountRef {
            id: "acc-hr".into(),
            name: "jdoe".into(),
            source: Some(crate::model::SourceRef { id: "src-hr".into(), name: "HR".into() }),
        });
        identity
    }

    fn attrs() -> Vec<String> {
        vec!["uid".into(), "firstname".into()]
    }

    #[test]
    fn merge_form_lists_candidates_plus_sentinel() {
        let target = identity("id-1", "j.doe", &[("uid", "j.doe"), ("firstname", "Jane")]);
        let spec = merge_form(
            "Identity merge - jane.doe",
            OwnerRef::identity("owner-1"),
            &unmatched_identity(),
            &[&target],
            &attrs(),
        )
        .unwrap();

        let select = &spec.form_elements[1];
        let options = select.config["formElements"][0]["config"]["dataSource"]["config"]["options"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0]["value"], "id-1");
        assert_eq!(options[1]["value"], NEW_IDENTITY);

        // Frozen inputs: target values, entity values, entity id/account/source.
        let ids: Vec<&str> = spec.form_input.iter().map(|i| i.id.as_str()).collect();
        assert!(ids.contains(&"id-1.uid"));
        assert!(ids.contains(&"#newIdentity#.uid"));
        assert!(ids.contains(&"id"));
        assert!(ids.contains(&"account"));
        assert!(ids.contains(&"source"));
    }

    #[test]
    fn merge_form_needs_a_native_account() {
        let orphaned = identity("id-x", "x", &[("authoritativeSource", "src-gone")]);
        let target = identity("id-1", "y", &[("uid", "y")]);
        let err = merge_form("n", OwnerRef::identity("o"), &orphaned, &[&target], &attrs());
        assert!(err.is_err());
    }

    #[test]
    fn merge_conditions_cover_sentinel_and_each_target() {
        let target = identity("id-1", "j.doe", &[("uid", "j.doe")]);
        let spec = merge_form(
            "n",
            OwnerRef::identity("o"),
            &unmatched_identity(),
            &[&target],
            &attrs(),
        )
        .unwrap();

        // 3 select-driven rules + one lock rule per attribute + one per target.
        assert_eq!(spec.form_conditions.len(), 3 + 2 + 1);

        let target_rule = spec.form_conditions.last().unwrap();
        assert_eq!(target_rule.rules[0].value.as_deref(), Some("id-1"));
        assert_eq!(target_rule.effects[0].effect_type, EffectType::Show);
        // Only attributes present on the target get a default-fill effect.
        assert_eq!(target_rule.effects.len(), 2);
    }

    #[test]
    fn orphan_form_has_no_selection_section() {
        let account = Account {
            id: "acc-9".into(),
            native_identity: "u123".into(),
            name: Some("Jane D".into()),
            source_id: "src-ad".into(),
            source_name: "AD".into(),
            identity_id: None,
            uncorrelated: true,
            attributes: HashMap::new(),
        };
        let target = identity("id-1", "jane", &[("uid", "jane")]);
        let spec = orphan_form(
            "Orphan account assignment - u123 (AD)",
            OwnerRef::identity("o"),
            &account,
            &[&target],
            &attrs(),
        );

        assert_eq!(spec.description.as_deref(), Some("Jane D@AD"));
        assert_eq!(spec.form_elements.len(), 2);
        // One lock rule per attribute, nothing select-driven.
        assert_eq!(spec.form_conditions.len(), 2);
        assert_eq!(
            spec.form_conditions[0].rules[0].source,
            format!("{CONFIRMED_ORPHAN}.uid")
        );
    }

    #[test]
    fn serializes_camel_case_wire_shape() {
        let target = identity("id-1", "j", &[("uid", "j")]);
        let spec = merge_form(
            "n",
            OwnerRef::identity("o"),
            &unmatched_identity(),
            &[&target],
            &attrs(),
        )
        .unwrap();
        let wire = serde_json::to_value(&spec).unwrap();
        assert!(wire["formInput"].is_array());
        assert_eq!(wire["formElements"][0]["elementType"], "SECTION");
        assert_eq!(wire["formConditions"][0]["ruleOperator"], "AND");
        assert_eq!(wire["formConditions"][2]["rules"][0]["operator"], "NOT_EM");
        assert_eq!(wire["owner"]["type"], "IDENTITY");
    }
}
