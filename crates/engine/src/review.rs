use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::form;
use crate::model::{FormInstance, Identity};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of a review, mirroring the platform's form-instance states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl ReviewState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Assigned => 1,
            Self::InProgress => 2,
            Self::Completed | Self::Cancelled => 3,
        }
    }

    /// Forward-only transition table. Terminal states never advance.
    pub fn can_advance(self, next: ReviewState) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Assigned => write!(f, "ASSIGNED"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// The two flavors of human review this engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKind {
    IdentityMerge,
    OrphanAssignment,
}

impl ReviewKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::IdentityMerge => "Identity merge",
            Self::OrphanAssignment => "Orphan account assignment",
        }
    }

    /// Sentinel option value meaning "none of the candidates".
    pub fn sentinel(self) -> &'static str {
        match self {
            Self::IdentityMerge => form::NEW_IDENTITY,
            Self::OrphanAssignment => form::CONFIRMED_ORPHAN,
        }
    }

    /// Deterministic review key for one entity. The same entity always maps
    /// to the same form name, which is how repeated passes find an already
    /// open review instead of creating a duplicate.
    pub fn form_name(self, entity_label: &str) -> String {
        format!("{} - {}", self.title(), entity_label)
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// What the reviewer picked on a completed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// An existing identity was selected as the match.
    Candidate(String),
    /// The sentinel option: confirmed new identity / confirmed orphan.
    /// Carries the entity id recorded on the form at creation time.
    Sentinel { entity_id: String },
}

/// A resolved review decision, ready to apply.
#[derive(Debug, Clone)]
pub struct Decision {
    pub selection: Selection,
    /// Human-readable history line identifying the reviewer.
    pub message: String,
    /// Non-fatal problem observed while extracting the decision.
    pub warning: Option<String>,
}

/// Extract the decision from a COMPLETED form instance.
///
/// The decision is valid even when the deciding reviewer's identity can no
/// longer be resolved; that case only degrades the history message and is
/// surfaced as a warning.
pub fn decide(
    kind: ReviewKind,
    instance: &FormInstance,
    reviewer: Option<&Identity>,
) -> Result<Decision, EngineError> {
    debug_assert_eq!(instance.state, ReviewState::Completed);

    let raw = instance
        .form_data
        .get(form::SELECT_KEY)
        .ok_or_else(|| {
            EngineError::Decision(format!(
                "completed instance {} has no '{}' answer",
                instance.id,
                form::SELECT_KEY
            ))
        })?;
    let choice = raw.as_str().map(str::to_string).unwrap_or_else(|| raw.to_string());

    let warning = reviewer.is_none().then(|| {
        format!("Recipient for form not found ({choice})")
    });
    let reviewer_name =
        reviewer.map(Identity::display_or_name).unwrap_or("an unknown reviewer").to_string();

    if choice == kind.sentinel() {
        let entity_id = instance
            .input_str("id")
            .ok_or_else(|| {
                EngineError::Decision(format!("instance {} is missing the 'id' input", instance.id))
            })?
            .to_string();
        let message = match kind {
            ReviewKind::IdentityMerge => format!("New identity approved by {reviewer_name}"),
            ReviewKind::OrphanAssignment => {
                format!("Orphan account confirmed by {reviewer_name}")
            }
        };
        return Ok(Decision { selection: Selection::Sentinel { entity_id }, message, warning });
    }

    let account = instance.input_str("account").unwrap_or("?");
    let source = instance.input_str("source").unwrap_or("?");
    let message = format!("Assignment of {account} from {source} approved by {reviewer_name}");
    Ok(Decision { selection: Selection::Candidate(choice), message, warning })
}

// ---------------------------------------------------------------------------
// Entitlement surface
// ---------------------------------------------------------------------------

/// Outstanding review exposed through the entitlement-list surface.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRef {
    pub id: String,
    pub name: String,
    pub entity: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn completed_instance(choice: &str) -> FormInstance {
        FormInstance {
            id: "fi-1".into(),
            form_definition_id: "fd-1".into(),
            state: ReviewState::Completed,
            form_data: HashMap::from([(form::SELECT_KEY.to_string(), json!(choice))]),
            form_input: HashMap::from([
                ("id".to_string(), json!("entity-1")),
                ("account".to_string(), json!("jdoe")),
                ("source".to_string(), json!("HR")),
            ]),
            recipients: vec![],
            stand_alone_form_url: Some("https://forms/fi-1".into()),
            expire: None,
        }
    }

    fn reviewer() -> Identity {
        Identity {
            id: "rev-1".into(),
            name: "admin".into(),
            display_name: Some("Ada Admin".into()),
            protected: false,
            attributes: HashMap::new(),
            accounts: vec![],
            source: None,
        }
    }

    #[test]
    fn transitions_are_forward_only() {
        use ReviewState::*;
        assert!(Pending.can_advance(Assigned));
        assert!(Assigned.can_advance(InProgress));
        assert!(Assigned.can_advance(Completed));
        assert!(InProgress.can_advance(Cancelled));
        assert!(!InProgress.can_advance(Assigned));
        assert!(!Completed.can_advance(Cancelled));
        assert!(!Cancelled.can_advance(InProgress));
        assert!(!Assigned.can_advance(Assigned));
    }

    #[test]
    fn state_serde_round_trips_platform_strings() {
        let s: ReviewState = serde_json::from_value(json!("IN_PROGRESS")).unwrap();
        assert_eq!(s, ReviewState::InProgress);
        assert_eq!(serde_json::to_value(ReviewState::Cancelled).unwrap(), json!("CANCELLED"));
    }

    #[test]
    fn form_names_are_deterministic() {
        assert_eq!(
            ReviewKind::IdentityMerge.form_name("jane.doe"),
            "Identity merge - jane.doe"
        );
        assert_eq!(
            ReviewKind::OrphanAssignment.form_name("u123 (AD)"),
            "Orphan account assignment - u123 (AD)"
        );
    }

    #[test]
    fn candidate_decision_names_the_reviewer() {
        let instance = completed_instance("identity-42");
        let decision = decide(ReviewKind::IdentityMerge, &instance, Some(&reviewer())).unwrap();
        assert_eq!(decision.selection, Selection::Candidate("identity-42".into()));
        assert_eq!(decision.message, "Assignment of jdoe from HR approved by Ada Admin");
        assert!(decision.warning.is_none());
    }

    #[test]
    fn sentinel_decision_uses_recorded_entity_id() {
        let instance = completed_instance(form::NEW_IDENTITY);
        let decision = decide(ReviewKind::IdentityMerge, &instance, Some(&reviewer())).unwrap();
        assert_eq!(decision.selection, Selection::Sentinel { entity_id: "entity-1".into() });
        assert_eq!(decision.message, "New identity approved by Ada Admin");
    }

    #[test]
    fn orphan_sentinel_message() {
        let instance = completed_instance(form::CONFIRMED_ORPHAN);
        let decision = decide(ReviewKind::OrphanAssignment, &instance, Some(&reviewer())).unwrap();
        assert_eq!(decision.message, "Orphan account confirmed by Ada Admin");
    }

    #[test]
    fn missing_reviewer_degrades_to_warning() {
        let instance = completed_instance("identity-42");
        let decision = decide(ReviewKind::IdentityMerge, &instance, None).unwrap();
        assert_eq!(decision.selection, Selection::Candidate("identity-42".into()));
        assert!(decision.warning.as_deref().unwrap().contains("identity-42"));
        assert!(decision.message.contains("an unknown reviewer"));
    }

    #[test]
    fn missing_answer_is_an_error() {
        let mut instance = completed_instance("x");
        instance.form_data.clear();
        assert!(decide(ReviewKind::IdentityMerge, &instance, None).is_err());
    }
}
