use serde::{Deserialize, Serialize};

use crate::core::constants::WELCOME_MESSAGE;

/// Who authored a transcript entry. Only these two roles exist; app-side
/// notices (failures, placeholders) are written as assistant messages so the
/// persisted shape stays uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

/// One transcript entry. Immutable once created; sessions only ever append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The greeting every fresh session is seeded with.
    pub fn welcome() -> Self {
        Self::assistant(WELCOME_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_to_plain_strings() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn unknown_roles_are_rejected_on_deserialize() {
        let result: Result<Message, _> =
            serde_json::from_str(r#"{"role":"system","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn welcome_is_an_assistant_message() {
        let msg = Message::welcome();
        assert!(msg.role.is_assistant());
        assert_eq!(msg.content, WELCOME_MESSAGE);
    }
}
