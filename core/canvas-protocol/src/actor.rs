use serde::{Deserialize, Serialize};

/// Who originated a mutation.
///
/// Serialized as `{"type": "user"}` or
/// `{"type": "ai", "model": ..., "session_id": ...}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Actor {
    /// Human at the keyboard.
    #[default]
    User,
    /// AI agent acting through the external control channel.
    Ai {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

impl Actor {
    pub fn ai(model: Option<String>, session_id: Option<String>) -> Self {
        Actor::Ai { model, session_id }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Actor::Ai { .. })
    }

    /// Short label used in sync calls and audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::User => "user",
            Actor::Ai { .. } => "ai",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_serializes_as_tagged_object() {
        let value = serde_json::to_value(Actor::User).unwrap();
        assert_eq!(value, json!({"type": "user"}));
    }

    #[test]
    fn ai_omits_missing_fields() {
        let value = serde_json::to_value(Actor::ai(None, None)).unwrap();
        assert_eq!(value, json!({"type": "ai"}));
    }

    #[test]
    fn ai_parses_model_and_session() {
        let actor: Actor =
            serde_json::from_value(json!({"type": "ai", "model": "m-1", "session_id": "s-1"}))
                .unwrap();
        assert_eq!(
            actor,
            Actor::ai(Some("m-1".to_string()), Some("s-1".to_string()))
        );
        assert!(actor.is_ai());
        assert_eq!(actor.as_str(), "ai");
    }
}
