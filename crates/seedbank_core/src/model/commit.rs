//! Structured commit messages embedded in CRDT history.
//!
//! Every commit produced by this crate carries a JSON-encoded message so the
//! provenance of each change can be read back from the document itself.

use crate::model::revision::PersonId;
use serde::{Deserialize, Serialize};

/// Who or what produced a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CommitMessage {
    /// Edit made by a person through an editing session.
    HumanAction { person_id: PersonId },
    /// Automated maintenance, e.g. data cleanup.
    SystemCleanup { reason: String },
    /// Machine translation of locale content.
    AiTranslation { model: String },
}

impl CommitMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(message: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(message)
    }

    /// Person behind the commit, when it was a human edit.
    pub fn person_id(&self) -> Option<PersonId> {
        match self {
            Self::HumanAction { person_id } => Some(*person_id),
            Self::SystemCleanup { .. } | Self::AiTranslation { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CommitMessage;
    use uuid::Uuid;

    #[test]
    fn human_action_uses_tagged_kebab_case() {
        let person_id = Uuid::nil();
        let encoded = CommitMessage::HumanAction { person_id }.encode().unwrap();
        assert_eq!(
            encoded,
            r#"{"type":"human-action","person_id":"00000000-0000-0000-0000-000000000000"}"#
        );
        let decoded = CommitMessage::decode(&encoded).unwrap();
        assert_eq!(decoded.person_id(), Some(person_id));
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        assert!(CommitMessage::decode(r#"{"type":"robot","id":"x"}"#).is_err());
    }
}
